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

//! HyperLogLog Array4 - 4-bit packed register storage with exception handling
//!
//! Array4 stores register values using 4 bits per slot (2 slots per byte),
//! relative to the sketch's current minimum register value `cur_min`. Values
//! whose offset from `cur_min` does not fit in 4 bits are stored in an
//! auxiliary hash map and marked with [`AUX_TOKEN`] in the main array.
//!
//! `cur_min` itself lives in the estimator state; Array4 is the only
//! representation that ever moves it, through [`Array4::shift_to_bigger_cur_min`].

use crate::hll::aux_map::AuxMap;

/// Nibble value marking a slot whose register lives in the aux map
const AUX_TOKEN: u8 = 15;

/// Core Array4 data structure - stores 4-bit offsets efficiently
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Array4 {
    lg_config_k: u8,
    /// Packed 4-bit values: 2 values per byte
    /// Even slots use low nibble, odd slots use high nibble
    bytes: Box<[u8]>,
    /// Exception table for offsets >= 15; absent until the first exception
    aux_map: Option<AuxMap>,
}

impl Array4 {
    pub fn new(lg_config_k: u8) -> Self {
        let num_bytes = 1 << (lg_config_k - 1);
        Self {
            lg_config_k,
            bytes: vec![0u8; num_bytes].into_boxed_slice(),
            aux_map: None,
        }
    }

    /// Build an array holding `values[slot]` at every slot.
    ///
    /// Returns the array together with the minimum value it is based on and
    /// the number of slots at that minimum.
    pub fn from_values(lg_config_k: u8, values: &[u8]) -> (Self, u8, u32) {
        debug_assert_eq!(values.len(), 1 << lg_config_k);
        let cur_min = values.iter().copied().min().unwrap_or(0);
        let num_at_cur_min = values.iter().filter(|&&v| v == cur_min).count() as u32;

        let mut array = Self::new(lg_config_k);
        for (slot, &value) in values.iter().enumerate() {
            let shifted = value - cur_min;
            if shifted >= AUX_TOKEN {
                array.put_raw(slot as u32, AUX_TOKEN);
                array
                    .aux_map
                    .get_or_insert_with(|| AuxMap::new(lg_config_k))
                    .insert(slot as u32, value);
            } else if shifted > 0 {
                array.put_raw(slot as u32, shifted);
            }
        }
        (array, cur_min, num_at_cur_min)
    }

    /// Get raw 4-bit value from slot (not adjusted for cur_min)
    #[inline]
    fn get_raw(&self, slot: u32) -> u8 {
        debug_assert!(slot >> 1 < self.bytes.len() as u32);

        let byte = self.bytes[(slot >> 1) as usize];
        if slot & 1 == 0 {
            byte & 15 // low nibble for even slots
        } else {
            byte >> 4 // high nibble for odd slots
        }
    }

    /// Set raw 4-bit value in slot
    #[inline]
    fn put_raw(&mut self, slot: u32, value: u8) {
        debug_assert!(value <= AUX_TOKEN);
        debug_assert!(slot >> 1 < self.bytes.len() as u32);

        let byte_idx = (slot >> 1) as usize;
        let old_byte = self.bytes[byte_idx];
        self.bytes[byte_idx] = if slot & 1 == 0 {
            (old_byte & 0xF0) | (value & 0x0F) // set low nibble
        } else {
            (old_byte & 0x0F) | (value << 4) // set high nibble
        };
    }

    /// Get the actual register value at a slot
    ///
    /// - If raw < 15: value = cur_min + raw
    /// - If raw == 15 (AUX_TOKEN): value is in aux_map
    pub fn get(&self, slot: u32, cur_min: u8) -> u8 {
        let raw = self.get_raw(slot);
        if raw < AUX_TOKEN {
            cur_min + raw
        } else {
            self.aux_map
                .as_ref()
                .and_then(|map| map.get(slot))
                .unwrap_or_else(|| unreachable!("slot {slot} holds AUX_TOKEN but has no aux entry"))
        }
    }

    /// Store `new_value` at `slot`, moving it into or within the aux map as needed.
    ///
    /// The caller guarantees `new_value` is above the slot's current value, and
    /// therefore above `cur_min`.
    pub fn put(&mut self, slot: u32, new_value: u8, cur_min: u8) {
        debug_assert!(new_value > cur_min);
        let raw_stored = self.get_raw(slot);
        let shifted_new = new_value - cur_min;

        match (raw_stored == AUX_TOKEN, shifted_new >= AUX_TOKEN) {
            // Both old and new are exceptions
            (true, true) => {
                self.aux_map
                    .as_mut()
                    .unwrap_or_else(|| unreachable!("AUX_TOKEN present without an aux map"))
                    .replace(slot, new_value);
            }
            // Values only grow, so an exception cannot fall back into the array
            // without cur_min moving
            (true, false) => {
                unreachable!("AUX_TOKEN present with non-exception new value");
            }
            // New exception
            (false, true) => {
                self.put_raw(slot, AUX_TOKEN);
                let lg_config_k = self.lg_config_k;
                self.aux_map
                    .get_or_insert_with(|| AuxMap::new(lg_config_k))
                    .insert(slot, new_value);
            }
            (false, false) => {
                self.put_raw(slot, shifted_new);
            }
        }
    }

    /// Increment cur_min and re-base all stored offsets.
    ///
    /// Called when no slot remains at `cur_min`. Every offset in the main array
    /// is decremented by one, and exceptions that fit in 4 bits again move back
    /// out of the aux map. Returns the new cur_min and the number of slots at it.
    pub fn shift_to_bigger_cur_min(&mut self, cur_min: u8) -> (u8, u32) {
        let new_cur_min = cur_min + 1;
        let k = 1u32 << self.lg_config_k;
        let mut num_at_new = 0;

        for slot in 0..k {
            let raw = self.get_raw(slot);
            debug_assert_ne!(raw, 0, "no slot may sit at cur_min when shifting");
            if raw < AUX_TOKEN {
                let decremented = raw - 1;
                self.put_raw(slot, decremented);
                if decremented == 0 {
                    num_at_new += 1;
                }
            }
        }

        // Some exceptions may no longer be exceptions
        if let Some(old_aux) = self.aux_map.take() {
            let mut new_aux = None;

            for (slot, value) in old_aux.iter() {
                let new_shifted = value - new_cur_min;
                if new_shifted < AUX_TOKEN {
                    self.put_raw(slot, new_shifted);
                } else {
                    new_aux
                        .get_or_insert_with(|| AuxMap::new(self.lg_config_k))
                        .insert(slot, value);
                }
            }
            self.aux_map = new_aux;
        }

        (new_cur_min, num_at_new)
    }

    /// Length of the packed register array in bytes (excluding the aux map)
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn aux_map(&self) -> Option<&AuxMap> {
        self.aux_map.as_ref()
    }

    pub fn lg_config_k(&self) -> u8 {
        self.lg_config_k
    }
}
