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

//! Cubic interpolation over the composite estimator's lookup tables
//!
//! Implements Lagrange cubic interpolation through four consecutive table
//! points, where the table is an increasing x array paired with y values at a
//! uniform stride (`y[i] = i * y_stride`).

/// Interpolate Y value from X using X array and uniform Y stride
pub(super) fn using_x_arr_and_y_stride(x_arr: &[f64], y_stride: f64, x: f64) -> f64 {
    let len = x_arr.len();
    debug_assert!(len >= 4);

    let last_idx = len - 1;
    debug_assert!(x >= x_arr[0] && x <= x_arr[last_idx]);

    if x == x_arr[last_idx] {
        // corner case
        return y_stride * (last_idx as f64);
    }

    let offset = find_straddle(x_arr, x);
    let len_m2 = len - 2;
    debug_assert!(offset <= len_m2);

    // Select a 4-point window that keeps x inside its middle when possible
    let start = if offset == 0 {
        0
    } else if offset == len_m2 {
        offset - 2
    } else {
        offset - 1
    };

    cubic_interpolate(
        x_arr[start],
        y_stride * start as f64,
        x_arr[start + 1],
        y_stride * (start + 1) as f64,
        x_arr[start + 2],
        y_stride * (start + 2) as f64,
        x_arr[start + 3],
        y_stride * (start + 3) as f64,
        x,
    )
}

/// Cubic interpolation using the Lagrange interpolation formula.
fn cubic_interpolate(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
    x: f64,
) -> f64 {
    let l0_numerator = (x - x1) * (x - x2) * (x - x3);
    let l1_numerator = (x - x0) * (x - x2) * (x - x3);
    let l2_numerator = (x - x0) * (x - x1) * (x - x3);
    let l3_numerator = (x - x0) * (x - x1) * (x - x2);

    let l0_denominator = (x0 - x1) * (x0 - x2) * (x0 - x3);
    let l1_denominator = (x1 - x0) * (x1 - x2) * (x1 - x3);
    let l2_denominator = (x2 - x0) * (x2 - x1) * (x2 - x3);
    let l3_denominator = (x3 - x0) * (x3 - x1) * (x3 - x2);

    let term0 = y0 * l0_numerator / l0_denominator;
    let term1 = y1 * l1_numerator / l1_denominator;
    let term2 = y2 * l2_numerator / l2_denominator;
    let term3 = y3 * l3_numerator / l3_denominator;

    term0 + term1 + term2 + term3
}

/// Find index `i` such that x_arr[i] <= x < x_arr[i+1] by binary search.
fn find_straddle(x_arr: &[f64], x: f64) -> usize {
    debug_assert!(x_arr.len() >= 2);
    let mut left = 0;
    let mut right = x_arr.len() - 1;
    debug_assert!(x_arr[left] <= x && x < x_arr[right]);

    while left + 1 < right {
        let middle = left + (right - left) / 2;
        if x_arr[middle] <= x {
            left = middle;
        } else {
            right = middle;
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;

    const X_ARR: [f64; 6] = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0];

    #[test]
    fn test_find_straddle() {
        assert_eq!(find_straddle(&X_ARR, 1.0), 0);
        assert_eq!(find_straddle(&X_ARR, 3.9), 1);
        assert_eq!(find_straddle(&X_ARR, 4.0), 2);
        assert_eq!(find_straddle(&X_ARR, 31.0), 4);
    }

    #[test]
    fn test_interpolation_hits_nodes() {
        for (i, &x) in X_ARR.iter().enumerate() {
            let y = using_x_arr_and_y_stride(&X_ARR, 3.0, x);
            assert!((y - 3.0 * i as f64).abs() < 1e-9, "node {i}: {y}");
        }
    }

    #[test]
    fn test_interpolation_is_exact_for_linear_data() {
        // y = x - 1 with stride 1 over x = 1..=8
        let x_arr: Vec<f64> = (1..=8).map(|v| v as f64).collect();
        for x in [1.25, 2.5, 4.75, 7.9] {
            let y = using_x_arr_and_y_stride(&x_arr, 1.0, x);
            assert!((y - (x - 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_interpolation_is_monotone_between_nodes() {
        let mut prev = using_x_arr_and_y_stride(&X_ARR, 1.0, 1.0);
        let mut x = 1.0;
        while x < 32.0 {
            let y = using_x_arr_and_y_stride(&X_ARR, 1.0, x);
            assert!(y >= prev - 1e-9);
            prev = y;
            x += 0.25;
        }
    }
}
