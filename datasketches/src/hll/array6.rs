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

//! HyperLogLog Array6 - 6-bit packed register storage
//!
//! Array6 stores register values using 6 bits per slot, providing a range of 0-63.
//! This covers every register value without needing exception handling or a
//! cur_min offset like Array4.

const VAL_MASK_6: u16 = 0x3F; // 6 bits: 0b0011_1111

/// Bytes needed to pack `k` 6-bit values; one spare byte keeps 16-bit reads in bounds.
fn num_bytes_for_k(k: usize) -> usize {
    ((k * 6) >> 3) + 1
}

/// Core Array6 data structure - stores 6-bit values with cross-byte packing
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Array6 {
    lg_config_k: u8,
    /// Packed 6-bit values, may cross byte boundaries
    bytes: Box<[u8]>,
}

impl Array6 {
    pub fn new(lg_config_k: u8) -> Self {
        let num_bytes = num_bytes_for_k(1 << lg_config_k);
        Self {
            lg_config_k,
            bytes: vec![0u8; num_bytes].into_boxed_slice(),
        }
    }

    /// Build an array holding `values[slot]` at every slot
    pub fn from_values(lg_config_k: u8, values: &[u8]) -> Self {
        debug_assert_eq!(values.len(), 1 << lg_config_k);
        let mut array = Self::new(lg_config_k);
        for (slot, &value) in values.iter().enumerate() {
            if value != 0 {
                array.put(slot as u32, value);
            }
        }
        array
    }

    /// Get value from a slot (6-bit value)
    ///
    /// Uses 16-bit window reads to handle values crossing byte boundaries.
    #[inline]
    pub fn get(&self, slot: u32) -> u8 {
        let start_bit = slot * 6;
        let byte_idx = (start_bit >> 3) as usize;
        let shift = (start_bit & 7) as u8;

        let two_bytes = u16::from_le_bytes([self.bytes[byte_idx], self.bytes[byte_idx + 1]]);

        ((two_bytes >> shift) & VAL_MASK_6) as u8
    }

    /// Set value in a slot (6-bit value)
    ///
    /// Uses read-modify-write on a 16-bit window to preserve surrounding bits.
    #[inline]
    pub fn put(&mut self, slot: u32, value: u8) {
        debug_assert!(value <= 63, "6-bit value must be 0-63");

        let start_bit = slot * 6;
        let byte_idx = (start_bit >> 3) as usize;
        let shift = (start_bit & 7) as u8;

        let mut two_bytes = u16::from_le_bytes([self.bytes[byte_idx], self.bytes[byte_idx + 1]]);
        two_bytes &= !(VAL_MASK_6 << shift);
        two_bytes |= ((value as u16) & VAL_MASK_6) << shift;

        let [lo, hi] = two_bytes.to_le_bytes();
        self.bytes[byte_idx] = lo;
        self.bytes[byte_idx + 1] = hi;
    }

    /// Length of the register array in bytes
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn lg_config_k(&self) -> u8 {
        self.lg_config_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len() {
        assert_eq!(Array6::new(4).byte_len(), 13);
        assert_eq!(Array6::new(10).byte_len(), 769);
    }

    #[test]
    fn test_packing_preserves_neighbours() {
        let mut arr = Array6::new(4);
        for slot in 0..16u32 {
            arr.put(slot, 63 - slot as u8);
        }
        for slot in 0..16u32 {
            assert_eq!(arr.get(slot), 63 - slot as u8);
        }

        // overwrite every other slot, neighbours stay intact
        for slot in (0..16u32).step_by(2) {
            arr.put(slot, 1);
        }
        for slot in 0..16u32 {
            let expected = if slot % 2 == 0 { 1 } else { 63 - slot as u8 };
            assert_eq!(arr.get(slot), expected);
        }
    }

    #[test]
    fn test_from_values() {
        let values: Vec<u8> = (0..32).map(|v| (v * 5 % 64) as u8).collect();
        let arr = Array6::from_values(5, &values);
        assert_eq!(arr.lg_config_k(), 5);
        for (slot, &v) in values.iter().enumerate() {
            assert_eq!(arr.get(slot as u32), v);
        }
    }
}
