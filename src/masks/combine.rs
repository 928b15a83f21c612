//! Merging binary masks into composite masks.
//!
//! Masks are treated as bit planes. For `N` masks, the mask at list
//! position `i` contributes bit `N - 1 - i`: the first mask is the most
//! significant bit and the last mask is the least significant bit. With
//! masks `[a, b]`, a cell value of `2` (`10`) means "signal in `a` only"
//! and `3` (`11`) means "signal in both".

use std::collections::BTreeSet;

use ndarray::Zip;
use rayon::prelude::*;
use thiserror::Error;

use super::{BinaryMask, FlagMask};

/// Largest number of masks that fit in one [`FlagMask`] cell.
pub const MAX_MASKS: usize = u32::BITS as usize;

/// Errors that can occur while combining or decoding masks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombineError {
    #[error("no masks to combine")]
    EmptyList,

    #[error("{count} masks exceed the {max}-bit flag capacity")]
    TooManyMasks { count: usize, max: usize },

    #[error("mask {index} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("mask {index} holds {value} at sample {sample}, ping {ping}; binary masks may only hold 0 or 1")]
    InvalidValue {
        index: usize,
        sample: usize,
        ping: usize,
        value: u8,
    },

    #[error("flag value {value} at sample {sample}, ping {ping} does not fit in {count} bits")]
    FlagOutOfRange {
        value: u32,
        sample: usize,
        ping: usize,
        count: usize,
    },
}

/// Check the shared contract of a mask list: non-empty, at most
/// [`MAX_MASKS`] long, one shape, values in {0, 1}.
///
/// Returns the common shape.
pub fn validate_masks(masks: &[BinaryMask]) -> Result<(usize, usize), CombineError> {
    let first = masks.first().ok_or(CombineError::EmptyList)?;
    check_mask_count(masks.len())?;

    let expected = first.dim();
    if let Some(err) = masks
        .par_iter()
        .enumerate()
        .find_map_first(|(index, mask)| check_mask(index, expected, mask).err())
    {
        return Err(err);
    }

    Ok(expected)
}

fn check_mask(index: usize, expected: (usize, usize), mask: &BinaryMask) -> Result<(), CombineError> {
    if mask.dim() != expected {
        return Err(CombineError::ShapeMismatch {
            index,
            expected,
            found: mask.dim(),
        });
    }
    if let Some(((sample, ping), &value)) = mask.indexed_iter().find(|(_, &v)| v > 1) {
        return Err(CombineError::InvalidValue {
            index,
            sample,
            ping,
            value,
        });
    }
    Ok(())
}

fn check_mask_count(count: usize) -> Result<(), CombineError> {
    if count == 0 {
        return Err(CombineError::EmptyList);
    }
    if count > MAX_MASKS {
        return Err(CombineError::TooManyMasks {
            count,
            max: MAX_MASKS,
        });
    }
    Ok(())
}

/// Bit weight of the mask at `index` in a list of `count` masks.
#[inline]
fn bit_weight(index: usize, count: usize) -> u32 {
    1u32 << (count - 1 - index)
}

/// Combine binary masks into one flag mask, first mask most significant.
///
/// Each output cell is `sum(mask_i * 2^(N - 1 - i))`, so it lies in
/// `0..=2^N - 1`. The inputs are left untouched.
///
/// # Errors
///
/// Fails if the list is empty or longer than [`MAX_MASKS`], if shapes
/// differ, or if any cell is not 0 or 1.
///
/// # Example
///
/// ```
/// use echomask::masks::combine_masks;
/// use ndarray::array;
///
/// let a = array![[1u8, 0], [0, 1]];
/// let b = array![[1u8, 1], [0, 0]];
/// let flags = combine_masks(&[a, b]).unwrap();
/// assert_eq!(flags, array![[3u32, 1], [0, 2]]);
/// ```
pub fn combine_masks(masks: &[BinaryMask]) -> Result<FlagMask, CombineError> {
    let shape = validate_masks(masks)?;
    let count = masks.len();

    let mut flags = FlagMask::zeros(shape);
    for (index, mask) in masks.iter().enumerate() {
        let weight = bit_weight(index, count);
        Zip::from(&mut flags)
            .and(mask)
            .par_for_each(|flag, &bit| *flag |= u32::from(bit) * weight);
    }

    log::debug!("combined {} masks of shape {:?}", count, shape);
    Ok(flags)
}

/// Split a flag mask back into its `count` binary masks, in list order.
///
/// Mask `i` is `(flags >> (count - 1 - i)) & 1`.
///
/// # Errors
///
/// Fails if `count` is 0 or larger than [`MAX_MASKS`], or if a cell holds a
/// value that needs more than `count` bits.
pub fn decode_flag_mask(flags: &FlagMask, count: usize) -> Result<Vec<BinaryMask>, CombineError> {
    check_mask_count(count)?;

    if count < MAX_MASKS {
        let limit = 1u32 << count;
        if let Some(((sample, ping), &value)) = flags.indexed_iter().find(|(_, &v)| v >= limit) {
            return Err(CombineError::FlagOutOfRange {
                value,
                sample,
                ping,
                count,
            });
        }
    }

    let masks = (0..count)
        .map(|index| {
            let shift = count - 1 - index;
            flags.mapv(|flag| ((flag >> shift) & 1) as u8)
        })
        .collect();

    Ok(masks)
}

/// `count`-character bit string of a flag value, first mask first.
///
/// `flag_bits(2, 2)` is `"10"`: signal in the first mask only.
pub fn flag_bits(value: u32, count: usize) -> String {
    format!("{:0width$b}", value, width = count)
}

/// Sorted distinct values present in a flag mask.
pub fn unique_flags(flags: &FlagMask) -> Vec<u32> {
    flags
        .iter()
        .copied()
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect()
}

/// Presence/absence mask: 1 wherever any of the masks is 1.
///
/// # Errors
///
/// Same validation as [`combine_masks`].
pub fn presence_absence(masks: &[BinaryMask]) -> Result<BinaryMask, CombineError> {
    let shape = validate_masks(masks)?;

    let mut presence = BinaryMask::zeros(shape);
    for mask in masks {
        Zip::from(&mut presence)
            .and(mask)
            .par_for_each(|cell, &bit| *cell |= bit);
    }

    Ok(presence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn pattern_mask(shape: (usize, usize), seed: usize) -> BinaryMask {
        Array2::from_shape_fn(shape, |(i, j)| ((i * 7 + j * 13 + seed * 5) % 3 == 0) as u8)
    }

    #[test]
    fn test_combine_two_masks_example() {
        let a = array![[1u8, 0], [0, 1]];
        let b = array![[1u8, 1], [0, 0]];
        let flags = combine_masks(&[a, b]).unwrap();

        assert_eq!(flags, array![[3u32, 1], [0, 2]]);
        assert_eq!(unique_flags(&flags), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_decode_two_masks_example() {
        let a = array![[1u8, 0], [0, 1]];
        let b = array![[1u8, 1], [0, 0]];
        let flags = combine_masks(&[a.clone(), b.clone()]).unwrap();

        let decoded = decode_flag_mask(&flags, 2).unwrap();
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn test_validate_reports_first_bad_mask() {
        let good = Array2::<u8>::ones((2, 2));
        let bad_value = array![[0u8, 3], [0, 0]];
        let bad_shape = Array2::<u8>::zeros((1, 2));
        assert_eq!(
            validate_masks(&[good.clone(), bad_value, good, bad_shape]),
            Err(CombineError::InvalidValue {
                index: 1,
                sample: 0,
                ping: 1,
                value: 3
            })
        );
    }

    #[test]
    fn test_combine_first_mask_is_most_significant() {
        let ones = Array2::<u8>::ones((1, 1));
        let zeros = Array2::<u8>::zeros((1, 1));

        let flags = combine_masks(&[ones.clone(), zeros.clone(), zeros.clone()]).unwrap();
        assert_eq!(flags[[0, 0]], 0b100);

        let flags = combine_masks(&[zeros.clone(), zeros, ones]).unwrap();
        assert_eq!(flags[[0, 0]], 0b001);
    }

    #[test]
    fn test_combine_single_mask_is_identity() {
        let mask = pattern_mask((4, 5), 1);
        let flags = combine_masks(std::slice::from_ref(&mask)).unwrap();
        assert_eq!(flags, mask.mapv(u32::from));
    }

    #[test]
    fn test_combine_is_reversible() {
        let masks: Vec<BinaryMask> = (0..5).map(|seed| pattern_mask((6, 9), seed)).collect();
        let flags = combine_masks(&masks).unwrap();
        let n = masks.len();

        for (i, mask) in masks.iter().enumerate() {
            for ((idx, &flag), &bit) in flags.indexed_iter().zip(mask.iter()) {
                assert_eq!(((flag >> (n - 1 - i)) & 1) as u8, bit, "mask {} cell {:?}", i, idx);
            }
        }

        let decoded = decode_flag_mask(&flags, n).unwrap();
        assert_eq!(decoded, masks);
    }

    #[test]
    fn test_combine_value_range() {
        let masks: Vec<BinaryMask> = (0..4).map(|seed| pattern_mask((8, 8), seed)).collect();
        let flags = combine_masks(&masks).unwrap();
        assert!(flags.iter().all(|&v| v <= (1 << masks.len()) - 1));
    }

    #[test]
    fn test_combine_full_width() {
        let masks = vec![Array2::<u8>::ones((2, 2)); MAX_MASKS];
        let flags = combine_masks(&masks).unwrap();
        assert!(flags.iter().all(|&v| v == u32::MAX));
        assert_eq!(decode_flag_mask(&flags, MAX_MASKS).unwrap(), masks);
    }

    #[test]
    fn test_combine_does_not_mutate_inputs() {
        let masks: Vec<BinaryMask> = (0..3).map(|seed| pattern_mask((3, 3), seed)).collect();
        let before = masks.clone();
        let _ = combine_masks(&masks).unwrap();
        assert_eq!(masks, before);
    }

    #[test]
    fn test_combine_rejects_empty_list() {
        assert_eq!(combine_masks(&[]), Err(CombineError::EmptyList));
    }

    #[test]
    fn test_combine_rejects_too_many_masks() {
        let masks = vec![Array2::<u8>::zeros((1, 1)); MAX_MASKS + 1];
        assert_eq!(
            combine_masks(&masks),
            Err(CombineError::TooManyMasks {
                count: MAX_MASKS + 1,
                max: MAX_MASKS
            })
        );
    }

    #[test]
    fn test_combine_rejects_shape_mismatch() {
        let a = Array2::<u8>::zeros((2, 3));
        let b = Array2::<u8>::zeros((3, 2));
        assert_eq!(
            combine_masks(&[a, b]),
            Err(CombineError::ShapeMismatch {
                index: 1,
                expected: (2, 3),
                found: (3, 2)
            })
        );
    }

    #[test]
    fn test_combine_rejects_non_binary_value() {
        let a = array![[0u8, 1], [1, 0]];
        let b = array![[0u8, 1], [2, 0]];
        assert_eq!(
            combine_masks(&[a, b]),
            Err(CombineError::InvalidValue {
                index: 1,
                sample: 1,
                ping: 0,
                value: 2
            })
        );
    }

    #[test]
    fn test_decode_rejects_out_of_range() {
        let flags = array![[0u32, 4]];
        assert_eq!(
            decode_flag_mask(&flags, 2),
            Err(CombineError::FlagOutOfRange {
                value: 4,
                sample: 0,
                ping: 1,
                count: 2
            })
        );
        assert_eq!(decode_flag_mask(&flags, 0), Err(CombineError::EmptyList));
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(flag_bits(0, 2), "00");
        assert_eq!(flag_bits(1, 2), "01");
        assert_eq!(flag_bits(2, 2), "10");
        assert_eq!(flag_bits(3, 2), "11");
        assert_eq!(flag_bits(5, 4), "0101");
    }

    #[test]
    fn test_presence_absence() {
        let a = array![[1u8, 0], [0, 0]];
        let b = array![[0u8, 1], [0, 0]];
        let c = array![[1u8, 0], [0, 0]];
        let presence = presence_absence(&[a, b, c]).unwrap();
        assert_eq!(presence, array![[1u8, 1], [0, 0]]);
    }

    #[test]
    fn test_presence_absence_validates() {
        let a = Array2::<u8>::zeros((2, 2));
        let b = Array2::<u8>::zeros((2, 1));
        assert!(matches!(
            presence_absence(&[a, b]),
            Err(CombineError::ShapeMismatch { index: 1, .. })
        ));
    }
}
