//! Mask generators and the mask combinator.
//!
//! Binary masks use 1 for signal and 0 for noise. Every mask has the shape
//! of the Sv grid it was generated from.

pub mod combine;
pub mod impulse;
pub mod pulse;
pub mod threshold;

use ndarray::Array2;
use thiserror::Error;

use crate::config::MaskConfig;
use crate::core::grid::{GridError, SvGrid};

// Re-export key types for convenience
pub use combine::{
    combine_masks, decode_flag_mask, flag_bits, presence_absence, unique_flags, validate_masks,
    CombineError, MAX_MASKS,
};
pub use impulse::impulse_mask;
pub use pulse::{pulse_mask, MissingFloorPolicy, PulseError, PulseMask, NOISE_FLOOR_DB};
pub use threshold::threshold_mask;

/// 0/1 mask, 1 = signal.
pub type BinaryMask = Array2<u8>;

/// Composite mask; bit `N - 1 - i` records mask `i` of `N`.
pub type FlagMask = Array2<u32>;

/// Errors from running a configured set of generators.
#[derive(Debug, Error, PartialEq)]
pub enum MaskSetError {
    #[error("threshold mask: {0}")]
    Threshold(#[source] GridError),

    #[error("pulse mask: {0}")]
    Pulse(#[from] PulseError),

    #[error("impulse mask: {0}")]
    Impulse(#[source] GridError),

    #[error("no mask generator is enabled")]
    NothingEnabled,
}

/// A generated mask with the name it is exported under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMask {
    pub name: &'static str,
    pub mask: BinaryMask,
}

/// Masks produced from one grid by the enabled generators.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSet {
    /// In generation order: threshold, pulse, impulse.
    pub masks: Vec<NamedMask>,
    /// Pings the pulse mask had to leave unmasked.
    pub unmasked_pings: Vec<usize>,
}

impl MaskSet {
    /// Names in list order (first = most significant bit once combined).
    pub fn names(&self) -> Vec<&'static str> {
        self.masks.iter().map(|m| m.name).collect()
    }

    /// Combine the set into a flag mask.
    pub fn combine(&self) -> Result<FlagMask, CombineError> {
        let masks: Vec<BinaryMask> = self.masks.iter().map(|m| m.mask.clone()).collect();
        combine_masks(&masks)
    }
}

/// Run every enabled generator on `grid`.
pub fn build_mask_set(grid: &SvGrid, config: &MaskConfig) -> Result<MaskSet, MaskSetError> {
    let sv = grid.view();
    let mut masks = Vec::with_capacity(3);
    let mut unmasked_pings = Vec::new();

    if config.threshold.enabled {
        let mask = threshold_mask(sv, config.threshold.threshold_db)
            .map_err(MaskSetError::Threshold)?;
        masks.push(NamedMask {
            name: "threshold",
            mask,
        });
    }

    if config.pulse.enabled {
        let pulse = pulse_mask(
            sv,
            config.pulse.noise_level_db,
            config.pulse.on_missing_floor,
        )?;
        unmasked_pings = pulse.unmasked_pings;
        masks.push(NamedMask {
            name: "pulse",
            mask: pulse.mask,
        });
    }

    if config.impulse.enabled {
        let mask =
            impulse_mask(sv, config.impulse.threshold_db).map_err(MaskSetError::Impulse)?;
        masks.push(NamedMask {
            name: "impulse",
            mask,
        });
    }

    if masks.is_empty() {
        return Err(MaskSetError::NothingEnabled);
    }

    Ok(MaskSet {
        masks,
        unmasked_pings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn test_grid() -> SvGrid {
        SvGrid::new(array![
            [-20.0, -30.0],
            [-999.0, -999.0],
            [-60.0, -80.0],
            [-20.0, -85.0],
            [-70.0, -90.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_build_mask_set_default() {
        let set = build_mask_set(&test_grid(), &MaskConfig::default()).unwrap();

        assert_eq!(set.names(), vec!["threshold", "pulse", "impulse"]);
        assert!(set.unmasked_pings.is_empty());
        assert_eq!(set.masks[0].mask, array![[1u8, 1], [0, 0], [1, 0], [1, 0], [1, 0]]);
        assert_eq!(set.masks[1].mask, array![[0u8, 0], [1, 1], [1, 1], [1, 1], [1, 1]]);
        assert_eq!(set.masks[2].mask, array![[1u8, 1], [1, 1], [1, 1], [0, 1], [1, 1]]);

        let flags = set.combine().unwrap();
        assert_eq!(flags, array![[5u32, 5], [3, 3], [7, 3], [6, 3], [7, 3]]);
    }

    #[test]
    fn test_build_mask_set_respects_enabled() {
        let mut config = MaskConfig::default();
        config.pulse.enabled = false;
        config.impulse.enabled = false;

        let set = build_mask_set(&test_grid(), &config).unwrap();
        assert_eq!(set.names(), vec!["threshold"]);

        config.threshold.enabled = false;
        assert_eq!(
            build_mask_set(&test_grid(), &config),
            Err(MaskSetError::NothingEnabled)
        );
    }

    #[test]
    fn test_build_mask_set_pulse_failure() {
        let mut config = MaskConfig::default();
        config.pulse.noise_level_db = -1000.0;
        config.pulse.on_missing_floor = MissingFloorPolicy::Fail;

        let err = build_mask_set(&test_grid(), &config).unwrap_err();
        assert!(matches!(
            err,
            MaskSetError::Pulse(PulseError::NoiseFloorNotReached { ping: 0, .. })
        ));
    }
}
