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

//! Dense HLL sketch: register storage driven together with its estimator state

use crate::common::NumStdDev;
use crate::error::Error;
use crate::hll::HllType;
use crate::hll::MAX_LG_K;
use crate::hll::MAX_REGISTER_VALUE;
use crate::hll::MIN_LG_K;
use crate::hll::estimator::HipAccumulator;
use crate::hll::registers::Registers;
use crate::hll::serialization::AUX_ENTRY_SIZE_BYTES;
use crate::hll::serialization::HLL_BYTE_ARR_START;

/// A dense-mode HyperLogLog sketch.
///
/// Holds `K = 2^lg_config_k` registers in one of the three [`HllType`]
/// encodings together with the HIP accumulator, the `kxq` sums and the
/// minimum-register bookkeeping derived from them.
///
/// Cloning produces a fully independent deep copy, overflow entries included.
///
/// See the [module level documentation](super) for an example.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseHll {
    accumulator: HipAccumulator,
    registers: Registers,
}

impl DenseHll {
    /// Creates an empty sketch with `2^lg_config_k` registers.
    ///
    /// # Panics
    ///
    /// Panics if `lg_config_k` is not in the range `[4, 21]`.
    pub fn new(lg_config_k: u8, hll_type: HllType) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_config_k),
            "lg_config_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_config_k}"
        );
        Self {
            accumulator: HipAccumulator::new(lg_config_k),
            registers: Registers::new(lg_config_k, hll_type),
        }
    }

    /// Creates an empty sketch, rejecting an out-of-range `lg_config_k`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `lg_config_k` is not in the range `[4, 21]`.
    pub fn try_new(lg_config_k: u8, hll_type: HllType) -> Result<Self, Error> {
        if !(MIN_LG_K..=MAX_LG_K).contains(&lg_config_k) {
            return Err(Error::invalid_argument(format!(
                "lg_config_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_config_k}"
            ))
            .with_context("hll_type", format!("{hll_type:?}")));
        }
        Ok(Self::new(lg_config_k, hll_type))
    }

    /// Raises the register at `slot` to `value`.
    ///
    /// Values not above the current register are ignored. Every effective raise
    /// is reported to the HIP accumulator before the register is written.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= K` or `value > 63`.
    pub fn update(&mut self, slot: u32, value: u8) {
        assert!(
            value <= MAX_REGISTER_VALUE,
            "register value must be at most {MAX_REGISTER_VALUE}, got {value}"
        );
        let k = 1u32 << self.lg_config_k();
        assert!(slot < k, "slot must be less than {k}, got {slot}");

        let cur_min = self.accumulator.cur_min();
        let old_value = self.registers.get(slot, cur_min);
        if value <= old_value {
            return;
        }

        self.accumulator.incremental_update(old_value, value);
        self.registers.put(slot, value, cur_min);

        if old_value == cur_min {
            self.accumulator.decrement_num_at_cur_min();
            if let Registers::Array4(arr) = &mut self.registers {
                while self.accumulator.num_at_cur_min() == 0 {
                    let (new_cur_min, num_at_new) =
                        arr.shift_to_bigger_cur_min(self.accumulator.cur_min());
                    self.accumulator.rebase(new_cur_min, num_at_new);
                }
            }
        }
    }

    /// Returns the cardinality estimate.
    ///
    /// This is the HIP estimate unless the sketch is out of order, in which
    /// case the composite estimate is used.
    pub fn estimate(&self) -> f64 {
        self.accumulator.estimate()
    }

    /// Returns the composite (interpolated raw HLL + linear counting) estimate,
    /// regardless of the out-of-order flag.
    pub fn composite_estimate(&self) -> f64 {
        self.accumulator.composite_estimate()
    }

    /// Returns the approximate lower error bound given the specified number of standard deviations.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.accumulator.lower_bound(num_std_dev)
    }

    /// Returns the approximate upper error bound given the specified number of standard deviations.
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.accumulator.upper_bound(num_std_dev)
    }

    /// Returns the relative standard error factor in effect (HIP or non-HIP).
    pub fn rse_factor(&self) -> f64 {
        self.accumulator.rse_factor()
    }

    /// Returns the relative standard error at one standard deviation.
    pub fn rse(&self) -> f64 {
        self.accumulator.rse()
    }

    /// Returns true if no register has ever been raised.
    pub fn is_empty(&self) -> bool {
        self.accumulator.is_empty()
    }

    /// Returns the log2 of the number of registers.
    pub fn lg_config_k(&self) -> u8 {
        self.registers.lg_config_k()
    }

    /// Returns the register encoding of this sketch.
    pub fn target_type(&self) -> HllType {
        self.registers.hll_type()
    }

    /// Returns the HIP accumulator.
    pub fn hip_accum(&self) -> f64 {
        self.accumulator.hip_accum()
    }

    /// Returns the sum of `2^-v` over registers below 32.
    pub fn kxq0(&self) -> f64 {
        self.accumulator.kxq0()
    }

    /// Returns the sum of `2^-v` over registers of 32 and above.
    pub fn kxq1(&self) -> f64 {
        self.accumulator.kxq1()
    }

    /// Returns the baseline register value tracked by the encoding.
    pub fn cur_min(&self) -> u8 {
        self.accumulator.cur_min()
    }

    /// Returns how many registers sit at [`cur_min`](Self::cur_min).
    pub fn num_at_cur_min(&self) -> u32 {
        self.accumulator.num_at_cur_min()
    }

    /// Returns true if estimates come from the composite estimator.
    pub fn is_out_of_order(&self) -> bool {
        self.accumulator.is_out_of_order()
    }

    /// Marks the sketch as no longer fed in order, e.g. after a merge.
    ///
    /// From then on [`estimate`](Self::estimate) and the bounds use the
    /// composite estimator. There is no way back.
    pub fn mark_out_of_order(&mut self) {
        self.accumulator.mark_out_of_order();
    }

    /// Returns the value of the register at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= K`.
    pub fn get(&self, slot: u32) -> u8 {
        let k = 1u32 << self.lg_config_k();
        assert!(slot < k, "slot must be less than {k}, got {slot}");
        self.registers.get(slot, self.accumulator.cur_min())
    }

    /// Iterates over all `(slot, value)` pairs in slot order.
    ///
    /// The iterator is finite and can be recreated at will.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.registers.iter(self.accumulator.cur_min())
    }

    /// Iterates over the `(slot, value)` pairs held in the Hll4 overflow map.
    ///
    /// Empty for Hll6 and Hll8, and for Hll4 sketches without exceptions.
    pub fn aux_iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.registers.aux_map().into_iter().flat_map(|map| map.iter())
    }

    /// Returns an independent sketch holding the same registers in `hll_type`.
    ///
    /// The HIP accumulator, the kxq sums and the out-of-order flag are copied
    /// verbatim; the minimum-register bookkeeping follows the new encoding.
    pub fn convert_to(&self, hll_type: HllType) -> DenseHll {
        if hll_type == self.target_type() {
            return self.clone();
        }
        let (registers, cur_min, num_at_cur_min) = self
            .registers
            .convert(self.accumulator.cur_min(), hll_type);
        DenseHll {
            accumulator: self.accumulator.clone().with_cur_min(cur_min, num_at_cur_min),
            registers,
        }
    }

    /// Returns the number of bytes a serialized image of this sketch occupies.
    pub fn serialization_size(&self) -> usize {
        let aux_bytes = self
            .registers
            .aux_map()
            .map_or(0, |map| map.count() as usize * AUX_ENTRY_SIZE_BYTES);
        HLL_BYTE_ARR_START + self.registers.byte_len() + aux_bytes
    }
}
