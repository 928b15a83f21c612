//! Transmit pulse and near-field mask.
//!
//! Pulse ringing and near-field returns fill the first samples of every
//! ping. They are removed by walking each ping down from the surface until
//! the signal first drops to the noise floor and masking everything above
//! that point.

use ndarray::{s, Array1, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::BinaryMask;
use crate::core::grid::{validate_grid, validate_parameter, GridError};

/// Lowest Sv the instrument reports; anything at or below it is noise.
pub const NOISE_FLOOR_DB: f64 = -999.0;

/// Errors that can occur while building a pulse mask.
#[derive(Debug, Error, PartialEq)]
pub enum PulseError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("ping {ping} never reaches the noise level ({noise_level} dB)")]
    NoiseFloorNotReached { ping: usize, noise_level: f64 },
}

/// What to do with a ping whose samples all stay above the noise level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFloorPolicy {
    /// Leave the ping unmasked and report it in [`PulseMask::unmasked_pings`].
    #[default]
    Skip,
    /// Fail the whole call with [`PulseError::NoiseFloorNotReached`].
    Fail,
}

/// Pulse mask plus the pings that could not be masked.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseMask {
    pub mask: BinaryMask,
    /// Pings (column indices, ascending) that never reached the noise level.
    pub unmasked_pings: Vec<usize>,
}

impl PulseMask {
    /// True when every ping reached the noise level.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.unmasked_pings.is_empty()
    }
}

/// Index of the first sample at or below `noise_level`, scanning from the top.
///
/// NaN samples never count as having reached the noise level.
pub fn first_noise_sample(column: ArrayView1<'_, f64>, noise_level: f64) -> Option<usize> {
    column.iter().position(|&value| value <= noise_level)
}

/// Build a pulse/near-field mask.
///
/// The mask starts as all signal. For each ping, the samples above the
/// first sample at or below `noise_level` are set to 0. If that first sample
/// is the top one, nothing is masked in that ping.
///
/// # Arguments
///
/// * `sv` - Sv grid (dB re 1 m^-1), shape (samples, pings)
/// * `noise_level` - Background noise level (dB re 1 m^-1), usually [`NOISE_FLOOR_DB`]
/// * `policy` - Handling of pings that never reach `noise_level`
///
/// # Errors
///
/// Returns an error for an empty grid or non-finite `noise_level`, and
/// under [`MissingFloorPolicy::Fail`] for the first ping that never reaches
/// the noise level.
pub fn pulse_mask(
    sv: ArrayView2<'_, f64>,
    noise_level: f64,
    policy: MissingFloorPolicy,
) -> Result<PulseMask, PulseError> {
    validate_grid(sv)?;
    validate_parameter("noise_level", noise_level)?;

    let mut mask = BinaryMask::ones(sv.dim());

    let floor_samples: Array1<Option<usize>> = Zip::from(mask.columns_mut())
        .and(sv.columns())
        .par_map_collect(|mut mask_column, sv_column| {
            let floor = first_noise_sample(sv_column, noise_level);
            if let Some(idx) = floor {
                mask_column.slice_mut(s![..idx]).fill(0);
            }
            floor
        });

    let unmasked_pings: Vec<usize> = floor_samples
        .iter()
        .enumerate()
        .filter(|(_, floor)| floor.is_none())
        .map(|(ping, _)| ping)
        .collect();

    if let Some(&ping) = unmasked_pings.first() {
        match policy {
            MissingFloorPolicy::Fail => {
                return Err(PulseError::NoiseFloorNotReached { ping, noise_level });
            }
            MissingFloorPolicy::Skip => {
                log::warn!(
                    "{} of {} pings never reach {} dB and were left unmasked (first: ping {})",
                    unmasked_pings.len(),
                    sv.ncols(),
                    noise_level,
                    ping
                );
            }
        }
    }

    Ok(PulseMask {
        mask,
        unmasked_pings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_first_noise_sample() {
        let column = array![-20.0, -40.0, -999.0, -30.0, -999.0];
        assert_eq!(first_noise_sample(column.view(), NOISE_FLOOR_DB), Some(2));
        assert_eq!(first_noise_sample(column.view(), -1000.0), None);
    }

    #[test]
    fn test_first_noise_sample_skips_nan() {
        let column = array![f64::NAN, -10.0, -999.0];
        assert_eq!(first_noise_sample(column.view(), NOISE_FLOOR_DB), Some(2));
    }

    #[test]
    fn test_pulse_mask_per_ping() {
        // ping 0 hits the floor at sample 2, ping 1 at sample 0, ping 2 at sample 3
        let sv = array![
            [-20.0, -999.0, -10.0],
            [-30.0, -50.0, -15.0],
            [-999.0, -999.0, -25.0],
            [-60.0, -70.0, -999.0],
        ];
        let result = pulse_mask(sv.view(), NOISE_FLOOR_DB, MissingFloorPolicy::Skip).unwrap();

        assert!(result.is_complete());
        assert_eq!(
            result.mask,
            array![[0u8, 1, 0], [0, 1, 0], [1, 1, 0], [1, 1, 1]]
        );
    }

    #[test]
    fn test_pulse_mask_threshold_is_inclusive() {
        let sv = array![[-10.0], [-80.0], [-90.0]];
        let result = pulse_mask(sv.view(), -80.0, MissingFloorPolicy::Skip).unwrap();
        assert_eq!(result.mask, array![[0u8], [1], [1]]);
    }

    #[test]
    fn test_pulse_mask_missing_floor_skip() {
        let sv = array![[-20.0, -20.0], [-30.0, -999.0], [-40.0, -50.0]];
        let result = pulse_mask(sv.view(), -999.0, MissingFloorPolicy::Skip).unwrap();

        assert_eq!(result.unmasked_pings, vec![0]);
        assert!(!result.is_complete());
        // ping 0 is left untouched, ping 1 is masked above its floor sample
        assert_eq!(result.mask, array![[1u8, 0], [1, 1], [1, 1]]);
    }

    #[test]
    fn test_pulse_mask_missing_floor_fail() {
        let sv = array![[-20.0, -20.0, -20.0], [-999.0, -30.0, -30.0]];
        let err = pulse_mask(sv.view(), -999.0, MissingFloorPolicy::Fail).unwrap_err();
        assert_eq!(
            err,
            PulseError::NoiseFloorNotReached {
                ping: 1,
                noise_level: -999.0
            }
        );
    }

    #[test]
    fn test_pulse_mask_all_nan_column_is_unmasked() {
        let sv = array![[f64::NAN], [f64::NAN]];
        let result = pulse_mask(sv.view(), NOISE_FLOOR_DB, MissingFloorPolicy::Skip).unwrap();
        assert_eq!(result.unmasked_pings, vec![0]);
        assert_eq!(result.mask, array![[1u8], [1]]);
    }

    #[test]
    fn test_pulse_mask_is_idempotent() {
        let sv = Array2::from_shape_fn((20, 8), |(i, j)| {
            if i == 3 + j % 5 {
                NOISE_FLOOR_DB
            } else {
                -40.0 - i as f64
            }
        });
        let first = pulse_mask(sv.view(), NOISE_FLOOR_DB, MissingFloorPolicy::Skip).unwrap();
        let second = pulse_mask(sv.view(), NOISE_FLOOR_DB, MissingFloorPolicy::Skip).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.mask.column(0).iter().filter(|&&v| v == 0).count(), 3);
        assert_eq!(first.mask.column(4).iter().filter(|&&v| v == 0).count(), 7);
    }

    #[test]
    fn test_pulse_mask_rejects_empty_grid() {
        let sv = Array2::<f64>::zeros((3, 0));
        let err = pulse_mask(sv.view(), NOISE_FLOOR_DB, MissingFloorPolicy::Skip).unwrap_err();
        assert_eq!(err, PulseError::Grid(GridError::Empty { samples: 3, pings: 0 }));
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: MissingFloorPolicy = serde_yaml::from_str("fail").unwrap();
        assert_eq!(policy, MissingFloorPolicy::Fail);
        assert_eq!(serde_yaml::to_string(&MissingFloorPolicy::Skip).unwrap().trim(), "skip");
    }
}
