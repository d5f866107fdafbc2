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

//! HyperLogLog Array8 - 8-bit (1 byte per slot) register storage
//!
//! Array8 is the simplest register array, storing one byte per slot.
//! There is no bit-packing and no exception handling.

/// Core Array8 data structure - one byte per slot, no packing
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Array8 {
    lg_config_k: u8,
    /// Direct byte array: bytes[slot] = value
    bytes: Box<[u8]>,
}

impl Array8 {
    pub fn new(lg_config_k: u8) -> Self {
        let k = 1usize << lg_config_k;
        Self {
            lg_config_k,
            bytes: vec![0u8; k].into_boxed_slice(),
        }
    }

    /// Build an array holding `values[slot]` at every slot
    pub fn from_values(lg_config_k: u8, values: &[u8]) -> Self {
        debug_assert_eq!(values.len(), 1 << lg_config_k);
        Self {
            lg_config_k,
            bytes: values.into(),
        }
    }

    /// Get value from a slot
    #[inline]
    pub fn get(&self, slot: u32) -> u8 {
        self.bytes[slot as usize]
    }

    /// Set value in a slot
    #[inline]
    pub fn put(&mut self, slot: u32, value: u8) {
        self.bytes[slot as usize] = value;
    }

    /// Length of the register array in bytes
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn lg_config_k(&self) -> u8 {
        self.lg_config_k
    }
}
