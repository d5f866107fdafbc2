// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Auxiliary hash map for 4-bit register exceptions
//!
//! Stores slot-value pairs for registers that don't fit in the 4-bit main array.
//! Uses open addressing with stride-based probing for collision resolution.

use crate::hll::RESIZE_DENOMINATOR;
use crate::hll::RESIZE_NUMERATOR;
use crate::hll::get_slot;
use crate::hll::get_value;
use crate::hll::pack_coupon;

const ENTRY_EMPTY: u32 = 0;

/// Open-addressing hash table for exception values
///
/// This hash map stores (slot, value) pairs where the value, after the
/// `cur_min` offset, no longer fits in the 4-bit array. Values are absolute
/// register values, so they stay valid when `cur_min` moves.
///
/// # Entry Encoding
///
/// Each entry is an u32 packed as: [value (upper 6 bits) | slot (lower 26 bits)].
/// Empty entries are represented as 0; a stored value is never 0.
#[derive(Debug, Clone)]
pub(super) struct AuxMap {
    lg_size: u8,
    lg_config_k: u8,
    entries: Box<[u32]>,
    count: u32,
}

impl PartialEq for AuxMap {
    fn eq(&self, other: &Self) -> bool {
        // Same entries regardless of internal storage order
        if self.lg_config_k != other.lg_config_k || self.count != other.count {
            return false;
        }

        let mut entries1: Vec<(u32, u8)> = self.iter().collect();
        let mut entries2: Vec<(u32, u8)> = other.iter().collect();

        entries1.sort_unstable();
        entries2.sort_unstable();

        entries1 == entries2
    }
}

/// Initial lg size of the map for a given lg_config_k
fn lg_aux_arr_ints(lg_config_k: u8) -> u8 {
    const LG_AUX_ARR_INTS: &[u8] = &[
        0, 2, 2, 2, 2, 2, 2, 3, 3, 3, // 0-9
        4, 4, 5, 5, 6, 7, 8, 9, 10, 11, // 10-19
        12, 13, 14, 15, 16, 17, 18, // 20-26
    ];

    LG_AUX_ARR_INTS[lg_config_k as usize]
}

impl AuxMap {
    pub fn new(lg_config_k: u8) -> Self {
        let lg_size = lg_aux_arr_ints(lg_config_k);
        Self {
            lg_size,
            lg_config_k,
            entries: vec![ENTRY_EMPTY; 1 << lg_size].into_boxed_slice(),
            count: 0,
        }
    }

    /// Number of exceptions stored
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Insert a new slot-value pair
    pub fn insert(&mut self, slot: u32, value: u8) {
        debug_assert!(value > 0);
        match self.find(slot) {
            FindResult::Found(_) => {
                // Invariant: Array4 always checks existence before inserting
                // a new value on the same slot.
                unreachable!("slot {slot} already exists in aux map");
            }
            FindResult::Empty(idx) => {
                self.entries[idx] = pack_coupon(slot, value);
                self.count += 1;
                self.check_grow();
            }
        }
    }

    /// Get value for a slot, `None` if the slot holds no exception
    pub fn get(&self, slot: u32) -> Option<u8> {
        match self.find(slot) {
            FindResult::Found(idx) => Some(get_value(self.entries[idx])),
            FindResult::Empty(_) => None,
        }
    }

    /// Replace value for an existing slot
    pub fn replace(&mut self, slot: u32, value: u8) {
        match self.find(slot) {
            FindResult::Found(idx) => {
                self.entries[idx] = pack_coupon(slot, value);
            }
            FindResult::Empty(_) => {
                // Invariant: Array4 only replaces slots it marked as exceptions.
                unreachable!("slot {slot} not found in aux map");
            }
        }
    }

    /// Probe for `slot`: the index holding it, or the empty index where it belongs.
    fn find(&self, slot: u32) -> FindResult {
        let mask = (1 << self.lg_size) - 1;
        let config_k_mask = (1 << self.lg_config_k) - 1;
        let stride = (slot >> self.lg_size) | 1; // odd stride visits every index
        let mut probe = slot & mask;
        let start = probe;

        loop {
            let entry = self.entries[probe as usize];

            if entry == ENTRY_EMPTY {
                return FindResult::Empty(probe as usize);
            }

            if get_slot(entry) & config_k_mask == slot {
                return FindResult::Found(probe as usize);
            }

            probe = (probe + stride) & mask;

            if probe == start {
                // Invariant: insert grows the map before it can fill up.
                unreachable!("AuxMap full; no empty slots");
            }
        }
    }

    /// Grow past a 75% load factor
    fn check_grow(&mut self) {
        let size = 1 << self.lg_size;
        if (RESIZE_DENOMINATOR * self.count) > (RESIZE_NUMERATOR * size) {
            self.grow();
        }
    }

    /// Double the table size and rehash all entries
    fn grow(&mut self) {
        let old_entries = std::mem::take(&mut self.entries);
        self.lg_size += 1;
        self.entries = vec![ENTRY_EMPTY; 1 << self.lg_size].into_boxed_slice();

        for &entry in old_entries.iter().filter(|&&e| e != ENTRY_EMPTY) {
            match self.find(get_slot(entry)) {
                FindResult::Empty(idx) => self.entries[idx] = entry,
                FindResult::Found(_) => unreachable!("duplicate slot while rehashing aux map"),
            }
        }
    }

    /// Iterate over (slot, value) pairs without consuming the map
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        let config_k_mask = (1 << self.lg_config_k) - 1;
        self.entries
            .iter()
            .filter(|&&entry| entry != ENTRY_EMPTY)
            .map(move |&entry| (get_slot(entry) & config_k_mask, get_value(entry)))
    }
}

/// Result of a find operation
enum FindResult {
    Found(usize),
    Empty(usize),
}
