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

//! Serialization constants and preamble validation for dense HLL sketches.

use crate::codec::Family;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_preamble_ints_is;
use crate::codec::assert::ensure_serial_version_is;
use crate::codec::assert::insufficient_data;
use crate::error::Error;

/// Offset of preamble ints byte.
pub const PREAMBLE_INTS_BYTE: usize = 0;
/// Offset of serialization version byte.
pub const SER_VER_BYTE: usize = 1;
/// Offset of family ID byte.
pub const FAMILY_BYTE: usize = 2;

/// Preamble size of a dense HLL image, in 4-byte ints.
pub const HLL_PREINTS: u8 = 10;
/// Serialization version.
pub const SER_VER: u8 = 1;
/// Family ID for HLL sketches.
pub const HLL_FAMILY_ID: u8 = Family::HLL.id;

/// Offset of the register array in a serialized dense image.
pub const HLL_BYTE_ARR_START: usize = 40;
/// Size of one serialized overflow entry.
pub(super) const AUX_ENTRY_SIZE_BYTES: usize = 4;

/// Checks the three leading preamble fields of a serialized HLL image.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidData`](crate::error::ErrorKind::InvalidData) if the
/// buffer is shorter than the three fields, or if the preamble ints, serial
/// version or family id differ from [`HLL_PREINTS`], [`SER_VER`] and
/// [`HLL_FAMILY_ID`]. The error carries a `buffer` context describing the input.
///
/// # Examples
///
/// ```
/// # use datasketches_hll::hll::validate_preamble;
/// let mut bytes = [0u8; 40];
/// bytes[..3].copy_from_slice(&[10, 1, 7]);
/// assert!(validate_preamble(&bytes).is_ok());
///
/// bytes[2] = 3;
/// assert!(validate_preamble(&bytes).is_err());
/// ```
pub fn validate_preamble(bytes: &[u8]) -> Result<(), Error> {
    check_preamble(bytes).map_err(|err| err.with_context("buffer", describe(bytes)))
}

fn check_preamble(bytes: &[u8]) -> Result<(), Error> {
    let mut cursor = SketchSlice::new(bytes);
    let preamble_ints = cursor
        .read_u8()
        .map_err(insufficient_data("preamble_ints"))?;
    let serial_version = cursor
        .read_u8()
        .map_err(insufficient_data("serial_version"))?;
    let family_id = cursor.read_u8().map_err(insufficient_data("family_id"))?;

    ensure_preamble_ints_is(HLL_PREINTS, preamble_ints)?;
    ensure_serial_version_is(SER_VER, serial_version)?;
    Family::HLL.validate_id(family_id)
}

fn describe(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(FAMILY_BYTE + 1)];
    format!("{} bytes, preamble {head:02x?}", bytes.len())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::error::ErrorKind;

    fn canonical() -> Vec<u8> {
        let mut bytes = vec![0u8; HLL_BYTE_ARR_START];
        bytes[PREAMBLE_INTS_BYTE] = HLL_PREINTS;
        bytes[SER_VER_BYTE] = SER_VER;
        bytes[FAMILY_BYTE] = HLL_FAMILY_ID;
        bytes
    }

    #[test]
    fn test_canonical_preamble() {
        assert!(validate_preamble(&canonical()).is_ok());
        // only the three leading fields are inspected
        assert!(validate_preamble(&[10, 1, 7]).is_ok());
    }

    #[test]
    fn test_bad_preamble_ints() {
        let mut bytes = canonical();
        bytes[PREAMBLE_INTS_BYTE] = 2;
        let err = validate_preamble(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_snapshot!(
            err,
            @"InvalidData, context: { buffer: 40 bytes, preamble [02, 01, 07] } => invalid preamble ints: expected 10, got 2"
        );
    }

    #[test]
    fn test_bad_serial_version() {
        let mut bytes = canonical();
        bytes[SER_VER_BYTE] = 2;
        let err = validate_preamble(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(
            err.message(),
            "unsupported serial version: expected 1, got 2"
        );
    }

    #[test]
    fn test_bad_family() {
        let mut bytes = canonical();
        bytes[FAMILY_BYTE] = 16;
        let err = validate_preamble(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.message(), "invalid family: expected 7 (HLL), got 16");
        assert_eq!(err.context("buffer"), Some("40 bytes, preamble [0a, 01, 10]"));
    }

    #[test]
    fn test_truncated_preamble() {
        for len in 0..3 {
            let err = validate_preamble(&canonical()[..len]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
            assert!(err.message().starts_with("insufficient data"));
        }
        let err = validate_preamble(&[10, 1]).unwrap_err();
        assert_snapshot!(
            err,
            @"InvalidData, context: { buffer: 2 bytes, preamble [0a, 01] } => insufficient data: family_id"
        );
    }
}
