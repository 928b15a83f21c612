//! Signal mask from a plain Sv threshold.

use ndarray::{ArrayView2, Zip};

use super::BinaryMask;
use crate::core::grid::{validate_grid, validate_parameter, GridError};

/// Mark every cell whose Sv is strictly above `threshold` as signal.
///
/// NaN cells are always 0: a missing value is never evidence of signal.
///
/// # Arguments
///
/// * `sv` - Sv grid (dB re 1 m^-1), shape (samples, pings)
/// * `threshold` - Threshold in the same units as `sv`
///
/// # Errors
///
/// Returns an error if the grid is empty or `threshold` is not finite.
pub fn threshold_mask(sv: ArrayView2<'_, f64>, threshold: f64) -> Result<BinaryMask, GridError> {
    validate_grid(sv)?;
    validate_parameter("threshold", threshold)?;

    let mask = Zip::from(&sv).par_map_collect(|&value| {
        if !value.is_nan() && value > threshold {
            1u8
        } else {
            0u8
        }
    });

    log::debug!(
        "threshold mask {:?} at {} dB: {} signal cells",
        mask.dim(),
        threshold,
        mask.iter().filter(|&&v| v == 1).count()
    );

    Ok(mask)
}
