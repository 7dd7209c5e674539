//! Integer coding primitives of the tile format.

use crate::EncodeError;

/// Zig-zag decode a 16-bit stream value into a signed delta.
///
/// Maps `0, 1, 2, 3, 4, ...` to `0, -1, 1, -2, 2, ...`.
#[must_use]
#[inline]
pub fn zigzag_decode(value: u16) -> i32 {
    let v = i32::from(value);
    (v >> 1) ^ -(v & 1)
}

/// Zig-zag encode a signed delta.
///
/// Deltas outside `[-32768, 32767]` do not fit the 16-bit stream and wrap.
#[must_use]
#[inline]
pub fn zigzag_encode(value: i32) -> u16 {
    ((value << 1) ^ (value >> 31)) as u16
}

/// Decode high-water-mark coded triangle indices.
///
/// Each code is the distance below the highest index seen so far; a zero code
/// introduces the next new vertex.
#[must_use]
pub fn decode_high_water_mark(codes: &[u32]) -> Vec<u32> {
    let mut highest: u32 = 0;
    codes
        .iter()
        .map(|&code| {
            let index = highest.wrapping_sub(code);
            if code == 0 {
                highest += 1;
            }
            index
        })
        .collect()
}

/// Encode triangle indices with high-water-mark coding.
///
/// Fails when an index appears before every smaller index has been
/// introduced, which the coding cannot express.
pub fn encode_high_water_mark(indices: &[u32]) -> Result<Vec<u32>, EncodeError> {
    let mut highest: u32 = 0;
    let mut codes = Vec::with_capacity(indices.len());
    for &index in indices {
        if index > highest {
            return Err(EncodeError::NotHighWaterOrdered { index, highest });
        }
        let code = highest - index;
        if code == 0 {
            highest += 1;
        }
        codes.push(code);
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_small_values() {
        let decoded: Vec<i32> = (0u16..6).map(zigzag_decode).collect();
        assert_eq!(decoded, vec![0, -1, 1, -2, 2, -3]);
    }

    #[test]
    fn test_zigzag_is_self_inverse_over_full_range() {
        for v in i32::from(i16::MIN)..=i32::from(i16::MAX) {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v, "value {v}");
        }
        for code in 0..=u16::MAX {
            assert_eq!(zigzag_encode(zigzag_decode(code)), code);
        }
    }

    #[test]
    fn test_high_water_mark_reference_sequence() {
        assert_eq!(decode_high_water_mark(&[0, 0, 1, 0, 2]), vec![0, 1, 1, 2, 1]);
    }

    #[test]
    fn test_high_water_mark_roundtrip_grid() {
        let indices = [0, 1, 2, 1, 3, 2, 2, 3, 4, 0, 2, 4];
        let codes = encode_high_water_mark(&indices).unwrap();
        assert_eq!(decode_high_water_mark(&codes), indices);
    }

    #[test]
    fn test_high_water_mark_rejects_forward_jump() {
        assert_eq!(
            encode_high_water_mark(&[0, 2, 1]),
            Err(EncodeError::NotHighWaterOrdered {
                index: 2,
                highest: 1
            })
        );
    }
}
