//! Impulse (interference spike) mask.

use ndarray::{ArrayView2, Zip};

use super::BinaryMask;
use crate::core::grid::{validate_grid, validate_parameter, GridError};

/// True when `centre` stands out from both vertical neighbours by more than `threshold`.
///
/// Any NaN in the window makes the differences NaN, so the sample is kept.
#[inline]
pub fn is_spike(above: f64, centre: f64, below: f64, threshold: f64) -> bool {
    centre - above > threshold && centre - below > threshold
}

/// Mask isolated single-sample spikes caused by impulse noise.
///
/// Each interior sample is compared with the sample directly above and
/// below it in the same ping. When it exceeds both by more than
/// `threshold` it is set to 0. The first and last samples have no
/// two-sided context and are always 1.
///
/// # Arguments
///
/// * `sv` - Sv grid (dB re 1 m^-1), shape (samples, pings)
/// * `threshold` - Minimum rise above both neighbours (dB)
pub fn impulse_mask(sv: ArrayView2<'_, f64>, threshold: f64) -> Result<BinaryMask, GridError> {
    validate_grid(sv)?;
    validate_parameter("threshold", threshold)?;

    let mut mask = BinaryMask::ones(sv.dim());
    let samples = sv.nrows();

    if samples >= 3 {
        Zip::from(mask.columns_mut())
            .and(sv.columns())
            .par_for_each(|mut mask_column, sv_column| {
                for sample in 1..samples - 1 {
                    if is_spike(
                        sv_column[sample - 1],
                        sv_column[sample],
                        sv_column[sample + 1],
                        threshold,
                    ) {
                        mask_column[sample] = 0;
                    }
                }
            });
    }

    log::debug!(
        "impulse mask {:?} at {} dB: {} spikes",
        mask.dim(),
        threshold,
        mask.iter().filter(|&&v| v == 0).count()
    );

    Ok(mask)
}
