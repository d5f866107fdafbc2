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

//! Register storage behind a dense HLL sketch
//!
//! [`Registers`] is a tagged union over the three packed encodings. It gives the
//! estimator a single read/write surface and re-encodes between types.

use crate::hll::HllType;
use crate::hll::array4::Array4;
use crate::hll::array6::Array6;
use crate::hll::array8::Array8;
use crate::hll::aux_map::AuxMap;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Registers {
    Array4(Array4),
    Array6(Array6),
    Array8(Array8),
}

impl Registers {
    /// All-zero registers in the requested encoding
    pub fn new(lg_config_k: u8, hll_type: HllType) -> Self {
        match hll_type {
            HllType::Hll4 => Registers::Array4(Array4::new(lg_config_k)),
            HllType::Hll6 => Registers::Array6(Array6::new(lg_config_k)),
            HllType::Hll8 => Registers::Array8(Array8::new(lg_config_k)),
        }
    }

    pub fn hll_type(&self) -> HllType {
        match self {
            Registers::Array4(_) => HllType::Hll4,
            Registers::Array6(_) => HllType::Hll6,
            Registers::Array8(_) => HllType::Hll8,
        }
    }

    pub fn lg_config_k(&self) -> u8 {
        match self {
            Registers::Array4(arr) => arr.lg_config_k(),
            Registers::Array6(arr) => arr.lg_config_k(),
            Registers::Array8(arr) => arr.lg_config_k(),
        }
    }

    /// Value of the register at `slot`.
    ///
    /// `cur_min` is only consulted by the 4-bit encoding, which stores offsets.
    pub fn get(&self, slot: u32, cur_min: u8) -> u8 {
        match self {
            Registers::Array4(arr) => arr.get(slot, cur_min),
            Registers::Array6(arr) => arr.get(slot),
            Registers::Array8(arr) => arr.get(slot),
        }
    }

    /// Overwrite the register at `slot` with a larger value
    pub fn put(&mut self, slot: u32, value: u8, cur_min: u8) {
        match self {
            Registers::Array4(arr) => arr.put(slot, value, cur_min),
            Registers::Array6(arr) => arr.put(slot, value),
            Registers::Array8(arr) => arr.put(slot, value),
        }
    }

    /// Every `(slot, value)` pair, in slot order, overflow entries included.
    pub fn iter(&self, cur_min: u8) -> impl Iterator<Item = (u32, u8)> + '_ {
        let k = 1u32 << self.lg_config_k();
        (0..k).map(move |slot| (slot, self.get(slot, cur_min)))
    }

    /// Length of the packed register bytes, excluding any overflow entries
    pub fn byte_len(&self) -> usize {
        match self {
            Registers::Array4(arr) => arr.byte_len(),
            Registers::Array6(arr) => arr.byte_len(),
            Registers::Array8(arr) => arr.byte_len(),
        }
    }

    pub fn aux_map(&self) -> Option<&AuxMap> {
        match self {
            Registers::Array4(arr) => arr.aux_map(),
            Registers::Array6(_) | Registers::Array8(_) => None,
        }
    }

    /// Re-encode the registers into `target`.
    ///
    /// Returns the new registers with the `cur_min` and `num_at_cur_min` they
    /// imply: the true minimum for Hll4, zero for Hll6 and Hll8.
    pub fn convert(&self, cur_min: u8, target: HllType) -> (Registers, u8, u32) {
        let lg_config_k = self.lg_config_k();
        let values: Vec<u8> = self.iter(cur_min).map(|(_, value)| value).collect();

        match target {
            HllType::Hll4 => {
                let (arr, cur_min, num_at_cur_min) = Array4::from_values(lg_config_k, &values);
                (Registers::Array4(arr), cur_min, num_at_cur_min)
            }
            HllType::Hll6 => {
                let num_zeros = count_zeros(&values);
                let arr = Array6::from_values(lg_config_k, &values);
                (Registers::Array6(arr), 0, num_zeros)
            }
            HllType::Hll8 => {
                let num_zeros = count_zeros(&values);
                let arr = Array8::from_values(lg_config_k, &values);
                (Registers::Array8(arr), 0, num_zeros)
            }
        }
    }
}

fn count_zeros(values: &[u8]) -> u32 {
    values.iter().filter(|&&v| v == 0).count() as u32
}
