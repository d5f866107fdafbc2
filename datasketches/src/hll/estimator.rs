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

//! HIP (Historic Inverse Probability) and composite estimators for dense HLL
//!
//! [`HipAccumulator`] owns every statistic a dense sketch needs to turn its
//! registers into a cardinality estimate. It never looks at the registers
//! themselves: the owning sketch reports each register raise through
//! [`HipAccumulator::incremental_update`] and keeps the minimum-register
//! bookkeeping current.

use crate::common::NumStdDev;
use crate::common::inv_pow2;
use crate::hll::MIN_LG_K;
use crate::hll::composite_interpolation;
use crate::hll::cubic_interpolation;
use crate::hll::harmonic_numbers;

// Empirical RSE factors for lg_config_k = 4, 5, 6 and >= 7.
const HLL_HIP_RSE_FACTORS: [f64; 4] = [0.862, 0.8467, 0.8397, 0.8360];
const HLL_NON_HIP_RSE_FACTORS: [f64; 4] = [1.1059, 1.0706, 1.0545, 1.0464];

/// Registers with values at or above this threshold contribute to `kxq1`.
const KXQ_SPLIT: u8 = 32;

/// Accumulated estimator state of a dense HLL sketch
///
/// The estimator supports two modes:
/// - **In-order mode**: uses the HIP accumulator, which is exact in expectation as
///   long as every register change was observed in sequence
/// - **Out-of-order mode**: uses the composite estimator (interpolated raw HLL +
///   linear counting) once sequential updates can no longer be assumed
#[derive(Debug, Clone, PartialEq)]
pub(super) struct HipAccumulator {
    lg_config_k: u8,
    hip_rse_factor: f64,
    non_hip_rse_factor: f64,
    /// Minimum register value; only moved by the 4-bit array's rebase
    cur_min: u8,
    /// Number of registers exactly at `cur_min`
    num_at_cur_min: u32,
    hip_accum: f64,
    /// Sum of 1/2^v over registers with v < 32
    kxq0: f64,
    /// Sum of 1/2^v over registers with v >= 32
    kxq1: f64,
    out_of_order: bool,
}

impl HipAccumulator {
    /// Create the accumulator of an empty sketch with 2^lg_config_k registers
    pub fn new(lg_config_k: u8) -> Self {
        let k = 1u32 << lg_config_k;
        let idx = (lg_config_k.min(7) - MIN_LG_K) as usize;
        Self {
            lg_config_k,
            hip_rse_factor: HLL_HIP_RSE_FACTORS[idx],
            non_hip_rse_factor: HLL_NON_HIP_RSE_FACTORS[idx],
            cur_min: 0,
            num_at_cur_min: k,
            hip_accum: 0.0,
            kxq0: k as f64, // all registers start at 0, each contributing 1/2^0
            kxq1: 0.0,
            out_of_order: false,
        }
    }

    /// Account for one register rising from `old_value` to `new_value`.
    ///
    /// The HIP increment must use the kxq sums *before* they absorb the change,
    /// so the order of the three steps below is significant.
    ///
    /// # Panics
    ///
    /// If `new_value <= old_value`. Registers only ever grow; a caller reporting
    /// anything else has corrupted the sketch.
    pub fn incremental_update(&mut self, old_value: u8, new_value: u8) {
        assert!(
            new_value > old_value,
            "register values only increase: old {old_value}, new {new_value}"
        );

        let k = (1u32 << self.lg_config_k) as f64;
        self.hip_accum += k / (self.kxq0 + self.kxq1);

        // subtract first, then add
        if old_value < KXQ_SPLIT {
            self.kxq0 -= inv_pow2(old_value);
        } else {
            self.kxq1 -= inv_pow2(old_value);
        }
        if new_value < KXQ_SPLIT {
            self.kxq0 += inv_pow2(new_value);
        } else {
            self.kxq1 += inv_pow2(new_value);
        }
    }

    /// Record that one register has left `cur_min`.
    pub fn decrement_num_at_cur_min(&mut self) {
        debug_assert!(self.num_at_cur_min > 0);
        self.num_at_cur_min -= 1;
    }

    /// Move the minimum-register baseline after the 4-bit array rebased its registers.
    pub fn rebase(&mut self, cur_min: u8, num_at_cur_min: u32) {
        debug_assert!(cur_min >= self.cur_min);
        self.cur_min = cur_min;
        self.num_at_cur_min = num_at_cur_min;
    }

    /// Re-derive the minimum-register bookkeeping for a different register encoding.
    ///
    /// Used by representation conversion, where the registers themselves are
    /// unchanged but the destination encoding may track a different baseline.
    pub fn with_cur_min(mut self, cur_min: u8, num_at_cur_min: u32) -> Self {
        self.cur_min = cur_min;
        self.num_at_cur_min = num_at_cur_min;
        self
    }

    pub fn estimate(&self) -> f64 {
        if self.out_of_order {
            self.composite_estimate()
        } else {
            self.hip_accum
        }
    }

    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        let k = 1u32 << self.lg_config_k;
        let estimate = self.estimate() / (1.0 + self.eps(num_std_dev));
        let num_non_zeros = if self.cur_min == 0 {
            k - self.num_at_cur_min
        } else {
            k
        };
        estimate.max(num_non_zeros as f64)
    }

    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.estimate() / (1.0 - self.eps(num_std_dev))
    }

    /// Relative error margin for `num_std_dev` standard deviations
    fn eps(&self, num_std_dev: NumStdDev) -> f64 {
        let k = (1u32 << self.lg_config_k) as f64;
        num_std_dev.as_f64() * self.rse_factor() / k.sqrt()
    }

    pub fn rse_factor(&self) -> f64 {
        if self.out_of_order {
            self.non_hip_rse_factor
        } else {
            self.hip_rse_factor
        }
    }

    pub fn rse(&self) -> f64 {
        let k = (1u32 << self.lg_config_k) as f64;
        self.rse_factor() / k.sqrt()
    }

    /// Raw HyperLogLog estimate: `correction_factor * k^2 / (kxq0 + kxq1)`
    pub fn raw_estimate(&self) -> f64 {
        let k = (1u32 << self.lg_config_k) as f64;
        (correction_factor(self.lg_config_k) * k * k) / (self.kxq0 + self.kxq1)
    }

    /// Linear counting estimate from the number of registers never hit.
    fn bitmap_estimate(&self) -> f64 {
        let k = 1u32 << self.lg_config_k;
        let num_unhit = if self.cur_min == 0 {
            self.num_at_cur_min
        } else {
            0
        };

        if num_unhit == 0 {
            return (k as f64) * (k as f64 / 0.5).ln();
        }

        harmonic_numbers::bitmap_estimate(k, k - num_unhit)
    }

    /// The non-HIP estimator.
    ///
    /// It is called "composite" because several estimators are pasted together:
    /// the raw HLL estimate is bias-corrected through the interpolation table, and
    /// at small cardinalities blended with the linear counting estimate.
    pub fn composite_estimate(&self) -> f64 {
        let raw_est = self.raw_estimate();

        let x_arr = composite_interpolation::x_arr(self.lg_config_k);
        let y_stride = composite_interpolation::y_stride(self.lg_config_k);
        let x_arr_len_m1 = x_arr.len() - 1;

        if raw_est < x_arr[0] {
            return 0.0;
        }

        if raw_est > x_arr[x_arr_len_m1] {
            let final_y = y_stride * (x_arr_len_m1 as f64);
            let factor = final_y / x_arr[x_arr_len_m1];
            return raw_est * factor;
        }

        let adj_est = cubic_interpolation::using_x_arr_and_y_stride(x_arr, y_stride, raw_est);

        // Linear counting can be wildly off above 3k; the threshold is safe for
        // 2^4 <= k <= 2^21.
        let k = 1u32 << self.lg_config_k;
        if adj_est > (3 * k) as f64 {
            return adj_est;
        }

        let lin_est = self.bitmap_estimate();

        // Comparing the average of both estimators against the crossover point
        // creates less bias than comparing either one alone.
        let avg_est = (adj_est + lin_est) / 2.0;

        let cross_over = match self.lg_config_k {
            4 => 0.718,
            5 => 0.672,
            _ => 0.64,
        };

        if avg_est > cross_over * (k as f64) {
            adj_est
        } else {
            lin_est
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cur_min == 0 && self.num_at_cur_min == (1u32 << self.lg_config_k)
    }

    pub fn cur_min(&self) -> u8 {
        self.cur_min
    }

    pub fn num_at_cur_min(&self) -> u32 {
        self.num_at_cur_min
    }

    pub fn hip_accum(&self) -> f64 {
        self.hip_accum
    }

    pub fn kxq0(&self) -> f64 {
        self.kxq0
    }

    pub fn kxq1(&self) -> f64 {
        self.kxq1
    }

    pub fn is_out_of_order(&self) -> bool {
        self.out_of_order
    }

    /// Stop trusting the HIP accumulator.
    ///
    /// One-way: once registers may have been raised out of sequence the HIP
    /// estimate stays invalid. The accumulator keeps advancing but is no longer
    /// consulted.
    pub fn mark_out_of_order(&mut self) {
        self.out_of_order = true;
    }
}

/// Empirical correction factor of the raw HLL estimator
pub(super) fn correction_factor(lg_config_k: u8) -> f64 {
    match lg_config_k {
        4 => 0.673,
        5 => 0.697,
        6 => 0.709,
        _ => {
            let k = (1u32 << lg_config_k) as f64;
            0.7213 / (1.0 + 1.079 / k)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Force the kxq sums so that the raw estimate equals `raw_est`.
    fn set_raw_estimate(acc: &mut HipAccumulator, raw_est: f64) {
        let k = (1u32 << acc.lg_config_k) as f64;
        acc.kxq0 = correction_factor(acc.lg_config_k) * k * k / raw_est;
        acc.kxq1 = 0.0;
    }

    #[test]
    fn test_fresh_state() {
        for lg_k in 4..=21u8 {
            let acc = HipAccumulator::new(lg_k);
            let k = 1u32 << lg_k;
            assert_eq!(acc.cur_min(), 0);
            assert_eq!(acc.num_at_cur_min(), k);
            assert_eq!(acc.hip_accum(), 0.0);
            assert_eq!(acc.kxq0(), k as f64);
            assert_eq!(acc.kxq1(), 0.0);
            assert!(acc.is_empty());
            assert_eq!(acc.estimate(), 0.0);
        }
    }

    #[test]
    fn test_rse_factor_selection() {
        assert_eq!(HipAccumulator::new(4).hip_rse_factor, 0.862);
        assert_eq!(HipAccumulator::new(5).hip_rse_factor, 0.8467);
        assert_eq!(HipAccumulator::new(6).non_hip_rse_factor, 1.0545);
        for lg_k in 7..=21u8 {
            let acc = HipAccumulator::new(lg_k);
            assert_eq!(acc.hip_rse_factor, 0.8360);
            assert_eq!(acc.non_hip_rse_factor, 1.0464);
        }

        let mut acc = HipAccumulator::new(10);
        assert_eq!(acc.rse(), 0.8360 / 32.0);
        acc.mark_out_of_order();
        assert_eq!(acc.rse_factor(), 1.0464);
        assert_eq!(acc.rse(), 1.0464 / 32.0);
    }

    #[test]
    fn test_first_update_lg_k_4() {
        let mut acc = HipAccumulator::new(4);
        acc.incremental_update(0, 1);
        assert_eq!(acc.hip_accum(), 1.0);
        assert_eq!(acc.kxq0(), 15.5);
        assert_eq!(acc.kxq1(), 0.0);
    }

    #[test]
    fn test_hip_uses_sums_before_update() {
        let mut acc = HipAccumulator::new(4);
        acc.incremental_update(0, 1); // kxq0 = 15.5
        acc.incremental_update(0, 2); // += 16 / 15.5, then kxq0 = 14.75
        assert_eq!(acc.hip_accum(), 1.0 + 16.0 / 15.5);
        assert_eq!(acc.kxq0(), 14.75);
    }

    #[test]
    fn test_kxq_split() {
        let mut acc = HipAccumulator::new(8);

        acc.incremental_update(0, 10);
        assert_eq!(acc.kxq0(), 255.0 + inv_pow2(10));
        assert_eq!(acc.kxq1(), 0.0);

        // crossing the split moves the contribution from kxq0 to kxq1
        acc.incremental_update(10, 50);
        assert_eq!(acc.kxq0(), 255.0);
        assert_eq!(acc.kxq1(), inv_pow2(50));

        acc.incremental_update(50, 60);
        assert_eq!(acc.kxq1(), inv_pow2(50) - inv_pow2(50) + inv_pow2(60));
    }

    #[test]
    #[should_panic(expected = "register values only increase")]
    fn test_non_increasing_update_panics() {
        let mut acc = HipAccumulator::new(4);
        acc.incremental_update(3, 3);
    }

    #[test]
    fn test_out_of_order_uses_composite() {
        let mut acc = HipAccumulator::new(10);
        for _ in 0..100 {
            acc.incremental_update(0, 1);
            acc.decrement_num_at_cur_min();
        }
        let hip = acc.hip_accum();
        assert_eq!(acc.estimate(), hip);

        acc.mark_out_of_order();
        assert_eq!(acc.hip_accum(), hip);
        assert_eq!(acc.estimate(), acc.composite_estimate());
        assert!((acc.estimate() - 100.0).abs() < 10.0);
    }

    #[test]
    fn test_composite_below_table_is_zero() {
        let mut acc = HipAccumulator::new(8);
        let x_arr = composite_interpolation::x_arr(8);
        set_raw_estimate(&mut acc, x_arr[0] * 0.5);
        assert_eq!(acc.composite_estimate(), 0.0);
    }

    #[test]
    fn test_composite_extrapolates_above_table() {
        for lg_k in 4..=21u8 {
            let mut acc = HipAccumulator::new(lg_k);
            let x_arr = composite_interpolation::x_arr(lg_k);
            let y_stride = composite_interpolation::y_stride(lg_k);
            let last = x_arr.len() - 1;

            set_raw_estimate(&mut acc, x_arr[last] * 2.0);
            let raw_est = acc.raw_estimate();
            assert!(raw_est > x_arr[last]);

            let final_y = y_stride * last as f64;
            let expected = raw_est * (final_y / x_arr[last]);
            assert_eq!(acc.composite_estimate(), expected, "lg_k={lg_k}");
        }
    }

    #[test]
    fn test_composite_skips_linear_counting_above_3k() {
        let mut acc = HipAccumulator::new(10);
        let x_arr = composite_interpolation::x_arr(10);
        let y_stride = composite_interpolation::y_stride(10);
        // a node whose y value is 4k
        let idx = (4 * 1024) / y_stride as usize;
        set_raw_estimate(&mut acc, x_arr[idx]);
        let raw_est = acc.raw_estimate();
        let adj_est = cubic_interpolation::using_x_arr_and_y_stride(x_arr, y_stride, raw_est);
        assert!(adj_est > 3.0 * 1024.0);

        // with every register unhit the linear estimate would be 0
        assert_eq!(acc.num_at_cur_min(), 1024);
        assert_eq!(acc.composite_estimate(), adj_est);
    }

    #[test]
    fn test_composite_crossover_lg_k_4() {
        let k = 16u32;
        let threshold = 0.718 * k as f64;

        let mut acc = HipAccumulator::new(4);
        let x_arr = composite_interpolation::x_arr(4);
        set_raw_estimate(&mut acc, x_arr[12]);
        let raw_est = acc.raw_estimate();
        let adj_est = cubic_interpolation::using_x_arr_and_y_stride(x_arr, 1.0, raw_est);
        assert!((adj_est - 12.0).abs() < 1e-6);

        let mut picked_adj = false;
        let mut picked_lin = false;
        for num_unhit in 1..=k {
            acc.num_at_cur_min = num_unhit;
            let lin_est = harmonic_numbers::bitmap_estimate(k, k - num_unhit);
            let avg_est = (adj_est + lin_est) / 2.0;
            if avg_est > threshold {
                assert_eq!(acc.composite_estimate(), adj_est, "unhit={num_unhit}");
                picked_adj = true;
            } else {
                assert_eq!(acc.composite_estimate(), lin_est, "unhit={num_unhit}");
                picked_lin = true;
            }
        }
        assert!(picked_adj && picked_lin);

        // 7 unhit registers: avg ~ 12.3, just above 11.488
        acc.num_at_cur_min = 7;
        assert_eq!(acc.composite_estimate(), adj_est);
        // 8 unhit registers: avg ~ 11.3, just below
        acc.num_at_cur_min = 8;
        assert_eq!(
            acc.composite_estimate(),
            harmonic_numbers::bitmap_estimate(k, 8)
        );
    }

    #[test]
    fn test_composite_without_unhit_registers() {
        let mut acc = HipAccumulator::new(4);
        let x_arr = composite_interpolation::x_arr(4);
        set_raw_estimate(&mut acc, x_arr[5]);
        acc.num_at_cur_min = 0;
        // adj ~ 5, lin = 16 * ln(32) ~ 55.5, avg above the crossover
        let raw_est = acc.raw_estimate();
        let adj_est = cubic_interpolation::using_x_arr_and_y_stride(x_arr, 1.0, raw_est);
        assert_eq!(acc.composite_estimate(), adj_est);

        // a non-zero cur_min means there are no unhit registers either
        acc.cur_min = 1;
        acc.num_at_cur_min = 16;
        assert_eq!(acc.composite_estimate(), adj_est);
    }

    #[test]
    fn test_bounds() {
        let mut acc = HipAccumulator::new(4);
        for _ in 0..8 {
            acc.incremental_update(0, 1);
            acc.decrement_num_at_cur_min();
        }
        let est = acc.estimate();
        let eps = 2.0 * 0.862 / 4.0;
        assert_eq!(acc.upper_bound(NumStdDev::Two), est / (1.0 - eps));
        assert_eq!(
            acc.lower_bound(NumStdDev::Two),
            (est / (1.0 + eps)).max(8.0)
        );
        for nsd in [NumStdDev::One, NumStdDev::Two, NumStdDev::Three] {
            assert!(acc.lower_bound(nsd) <= est);
            assert!(acc.upper_bound(nsd) >= est);
        }
    }

    #[test]
    fn test_lower_bound_floor_with_cur_min() {
        let mut acc = HipAccumulator::new(4);
        acc.rebase(1, 16);
        // every register is non-zero, so the floor is k
        assert_eq!(acc.lower_bound(NumStdDev::One), 16.0);
        assert!(!acc.is_empty());
    }
}
