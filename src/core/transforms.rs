//! Grid operations that sit between masks and their consumers.

use ndarray::{Array2, ArrayView2, Zip};

use super::grid::{check_same_shape, GridError};

/// Keep Sv where `mask` is 1 and replace everything else with NaN.
///
/// Used to draw an echogram with a mask applied. Neither input is modified.
///
/// # Errors
///
/// Returns [`GridError::ShapeMismatch`] if the mask does not match the grid.
pub fn apply_mask(
    sv: ArrayView2<'_, f64>,
    mask: ArrayView2<'_, u8>,
) -> Result<Array2<f64>, GridError> {
    check_same_shape(sv.dim(), mask.dim())?;

    Ok(Zip::from(&sv)
        .and(&mask)
        .par_map_collect(|&value, &bit| if bit == 1 { value } else { f64::NAN }))
}

/// Fraction of cells marked as signal (value 1).
///
/// Returns 0.0 for an empty mask.
pub fn mask_coverage(mask: ArrayView2<'_, u8>) -> f64 {
    if mask.is_empty() {
        return 0.0;
    }
    let signal = mask.iter().filter(|&&v| v == 1).count();
    signal as f64 / mask.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_apply_mask() {
        let sv = array![[-80.0, -70.0], [-60.0, -90.0]];
        let mask = array![[0u8, 1], [1, 0]];
        let masked = apply_mask(sv.view(), mask.view()).unwrap();

        assert!(masked[[0, 0]].is_nan());
        assert_eq!(masked[[0, 1]], -70.0);
        assert_eq!(masked[[1, 0]], -60.0);
        assert!(masked[[1, 1]].is_nan());
        // source untouched
        assert_eq!(sv[[0, 0]], -80.0);
    }

    #[test]
    fn test_apply_mask_shape_mismatch() {
        let sv = array![[-80.0, -70.0]];
        let mask = array![[1u8], [1]];
        assert_eq!(
            apply_mask(sv.view(), mask.view()),
            Err(GridError::ShapeMismatch {
                expected: (1, 2),
                found: (2, 1)
            })
        );
    }

    #[test]
    fn test_mask_coverage() {
        let mask = array![[1u8, 0, 0, 1]];
        assert_eq!(mask_coverage(mask.view()), 0.5);

        let empty = Array2::<u8>::zeros((0, 3));
        assert_eq!(mask_coverage(empty.view()), 0.0);
    }
}
