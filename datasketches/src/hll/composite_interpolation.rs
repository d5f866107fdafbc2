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

//! Interpolation tables for the composite estimator
//!
//! For every lg_config_k in [4, 21] the table maps raw HLL estimates (x) to
//! cardinalities (y). The y values are evenly spaced, `y[i] = i * y_stride`,
//! so only the x values are stored.
//!
//! `x[i]` is the expected raw estimate after `i * y_stride` distinct items.
//! Under the Poisson model each register is the maximum of `Poisson(n / k)`
//! geometric draws, so `P(register <= v) = exp(-(n / k) * 2^-v)` and
//! `raw(n) = correction_factor * k / E[2^-register]`. At `n = 0` this gives
//! `x[0] = correction_factor * k`, the raw estimate of an empty sketch.
//!
//! Tables reach a cardinality of `5k`, comfortably past the `3k` point above
//! which the composite estimator no longer consults linear counting. They are
//! built once per process and never mutated.
//!
//! These are model tables, not the empirically measured tables shipped with
//! other DataSketches implementations. They share the same strides, shape and
//! monotonicity, but composite estimates (and therefore out-of-order estimates
//! and bounds) will not match those implementations bit for bit.

use std::sync::LazyLock;

use crate::common::inv_pow2;
use crate::hll::MAX_LG_K;
use crate::hll::MAX_REGISTER_VALUE;
use crate::hll::MIN_LG_K;
use crate::hll::estimator::correction_factor;

/// Spacing of the y values, indexed by `lg_config_k - 4`
const Y_STRIDES: [u32; (MAX_LG_K - MIN_LG_K + 1) as usize] = [
    1, 2, 3, 5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240, 20480, 40960, 81920,
];

/// Tables cover cardinalities up to this multiple of k
const COVERAGE_FACTOR: u32 = 5;

static X_ARRS: LazyLock<Vec<Box<[f64]>>> =
    LazyLock::new(|| (MIN_LG_K..=MAX_LG_K).map(build_x_arr).collect());

/// The x values (raw estimates) for `lg_config_k`
pub(super) fn x_arr(lg_config_k: u8) -> &'static [f64] {
    &X_ARRS[(lg_config_k - MIN_LG_K) as usize]
}

/// The y stride (cardinality step between x values) for `lg_config_k`
pub(super) fn y_stride(lg_config_k: u8) -> f64 {
    Y_STRIDES[(lg_config_k - MIN_LG_K) as usize] as f64
}

fn build_x_arr(lg_config_k: u8) -> Box<[f64]> {
    let k = 1u32 << lg_config_k;
    let stride = Y_STRIDES[(lg_config_k - MIN_LG_K) as usize];
    let len = (COVERAGE_FACTOR * k / stride + 1) as usize;
    let scale = correction_factor(lg_config_k) * k as f64;

    (0..len)
        .map(|i| {
            let lambda = (i as u64 * stride as u64) as f64 / k as f64;
            scale / expected_inv_pow2_register(lambda)
        })
        .collect()
}

/// E[2^-M] where M is the register value after Poisson(`lambda`) hits
fn expected_inv_pow2_register(lambda: f64) -> f64 {
    // P(M <= v) = exp(-lambda * 2^-v); P(M = 0) = exp(-lambda)
    let mut prev_cdf = (-lambda).exp();
    let mut sum = prev_cdf;
    for v in 1..MAX_REGISTER_VALUE {
        let cdf = (-lambda * inv_pow2(v)).exp();
        sum += (cdf - prev_cdf) * inv_pow2(v);
        prev_cdf = cdf;
    }
    // registers saturate at the largest value
    sum + (1.0 - prev_cdf) * inv_pow2(MAX_REGISTER_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        for lg_k in MIN_LG_K..=MAX_LG_K {
            let k = 1u32 << lg_k;
            let x_arr = x_arr(lg_k);
            assert!(x_arr.len() >= 4);
            assert_eq!(x_arr[0], correction_factor(lg_k) * k as f64);

            // the last y value reaches past 3k
            let last_y = y_stride(lg_k) * (x_arr.len() - 1) as f64;
            assert!(last_y > 3.0 * k as f64, "lg_k={lg_k}");

            for w in x_arr.windows(2) {
                assert!(w[0] < w[1], "lg_k={lg_k} not increasing");
            }
        }
    }

    #[test]
    fn test_y_strides() {
        assert_eq!(y_stride(4), 1.0);
        assert_eq!(y_stride(7), 5.0);
        assert_eq!(y_stride(21), 81920.0);
    }

    #[test]
    fn test_expected_inv_pow2_register() {
        assert_eq!(expected_inv_pow2_register(0.0), 1.0);
        let mut prev = 1.0;
        for i in 1..50 {
            let e = expected_inv_pow2_register(i as f64 * 0.1);
            assert!(e < prev);
            assert!(e > 0.0);
            prev = e;
        }
    }

    #[test]
    fn test_tables_are_shared() {
        assert!(std::ptr::eq(x_arr(12), x_arr(12)));
    }

    #[test]
    fn test_tables_follow_register_model() {
        // the raw estimator is asymptotically unbiased, so the model tables end
        // close to the diagonal once k is moderately large
        for lg_k in 7..=MAX_LG_K {
            let x_arr = x_arr(lg_k);
            let last = x_arr.len() - 1;
            let ratio = x_arr[last] / (y_stride(lg_k) * last as f64);
            assert!((ratio - 1.0).abs() < 0.01, "lg_k={lg_k} ratio={ratio}");
        }
        // the fixed small-k correction factors underestimate at 5k
        let x_arr = x_arr(4);
        let last = x_arr.len() - 1;
        assert!(x_arr[last] < y_stride(4) * last as f64);
    }
}
