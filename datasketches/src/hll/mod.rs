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

//! Dense HyperLogLog estimator core.
//!
//! This module provides the dense-array half of a HyperLogLog (HLL) sketch: the
//! register array that a sketch grows into once it has seen enough distinct
//! values, together with the statistics that turn those registers into a
//! cardinality estimate.
//!
//! # Overview
//!
//! A [`DenseHll`] holds `K = 2^lg_config_k` registers. Every register raise is
//! reported to an accumulator that maintains:
//!
//! - the HIP (Historic Inverse Probability) estimate, updated incrementally
//!   before each register change;
//! - the `kxq0`/`kxq1` sums of `2^-register`, split at register value 32 so
//!   that tiny contributions are not swallowed by large ones;
//! - the current minimum register value and how many registers hold it.
//!
//! While the sketch is fed sequentially, [`DenseHll::estimate`] returns the HIP
//! estimate. Once it has been marked out-of-order (for example after a merge)
//! it falls back to the composite estimator, which blends a bias-corrected raw
//! HLL estimate with a linear-counting estimate.
//!
//! # HLL Types
//!
//! Three register encodings are supported, trading update speed for memory:
//!
//! - [`HllType::Hll4`]: 4 bits per register (most compact)
//! - [`HllType::Hll6`]: 6 bits per register (balanced)
//! - [`HllType::Hll8`]: 8 bits per register (fastest)
//!
//! [`DenseHll::convert_to`] re-encodes a sketch into any of the three types
//! without touching its statistics.
//!
//! # Usage
//!
//! ```rust
//! # use datasketches_hll::common::NumStdDev;
//! # use datasketches_hll::hll::DenseHll;
//! # use datasketches_hll::hll::HllType;
//! let mut sketch = DenseHll::new(12, HllType::Hll8);
//! sketch.update(7, 3);
//! sketch.update(1024, 1);
//!
//! let estimate = sketch.estimate();
//! assert!(sketch.lower_bound(NumStdDev::Two) <= estimate);
//! assert!(sketch.upper_bound(NumStdDev::Two) >= estimate);
//!
//! let compact = sketch.convert_to(HllType::Hll4);
//! assert_eq!(compact.estimate(), estimate);
//! ```

mod array4;
mod array6;
mod array8;
mod aux_map;
mod composite_interpolation;
mod cubic_interpolation;
mod dense;
mod estimator;
mod harmonic_numbers;
mod registers;
mod serialization;

pub use self::dense::DenseHll;
pub use self::serialization::FAMILY_BYTE;
pub use self::serialization::HLL_BYTE_ARR_START;
pub use self::serialization::HLL_FAMILY_ID;
pub use self::serialization::HLL_PREINTS;
pub use self::serialization::PREAMBLE_INTS_BYTE;
pub use self::serialization::SER_VER;
pub use self::serialization::SER_VER_BYTE;
pub use self::serialization::validate_preamble;

/// Target HLL type.
///
/// See [module level documentation](self) for more details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HllType {
    /// Uses a 4-bit field per HLL bucket and for large counts may require the use of a
    /// small internal auxiliary array for storing statistical exceptions, which are rare.
    /// For lg_config_k > 13 (K = 8192), this additional array adds about 3%
    /// to the overall storage.
    ///
    /// It is generally the slowest in terms of update time, but has the smallest storage
    /// footprint of about K/2 * 1.03 bytes.
    Hll4,
    /// Uses a 6-bit field per HLL bucket. It is generally the next fastest in terms
    /// of update time with a storage footprint of about 3/4 * K bytes.
    Hll6,
    /// Uses an 8-bit byte per HLL bucket. It is generally the fastest in terms of update
    /// time but has the largest storage footprint of about K bytes.
    Hll8,
}

/// Smallest supported lg_config_k.
pub const MIN_LG_K: u8 = 4;
/// Largest supported lg_config_k.
pub const MAX_LG_K: u8 = 21;
/// Largest value a register can hold (values are 6-bit coupon values).
pub const MAX_REGISTER_VALUE: u8 = 63;

const KEY_BITS_26: u32 = 26;
const KEY_MASK_26: u32 = (1 << KEY_BITS_26) - 1;

const RESIZE_NUMERATOR: u32 = 3; // Resize at 3/4 = 75% load factor
const RESIZE_DENOMINATOR: u32 = 4;

/// Extract slot number (low 26 bits) from coupon
#[inline]
fn get_slot(coupon: u32) -> u32 {
    coupon & KEY_MASK_26
}

/// Extract value (upper 6 bits) from coupon
#[inline]
fn get_value(coupon: u32) -> u8 {
    (coupon >> KEY_BITS_26) as u8
}

/// Pack slot number and value into a coupon
///
/// Format: [value (6 bits) << 26] | [slot (26 bits)]
#[inline]
fn pack_coupon(slot: u32, value: u8) -> u32 {
    ((value as u32) << KEY_BITS_26) | (slot & KEY_MASK_26)
}
