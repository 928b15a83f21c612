//! Signal and noise masking for echosounder Sv grids.
//!
//! This crate provides tools for:
//! - Generating binary masks from gridded Sv (threshold, transmit pulse,
//!   impulse noise), column-parallel with rayon
//! - Combining binary masks into bit-packed composite flag masks and
//!   decoding them again
//! - Reading and writing depth-by-ping CSV grids
//! - Rendering echograms and flag masks to PNG
//!
//! # Example
//!
//! ```no_run
//! use echomask::{core::loaders::load_sv_csv, masks::{combine_masks, threshold_mask}};
//!
//! let sv18 = load_sv_csv("sv_18khz.csv").unwrap();
//! let sv38 = load_sv_csv("sv_38khz.csv").unwrap();
//! let masks = vec![
//!     threshold_mask(sv18.view(), -75.0).unwrap(),
//!     threshold_mask(sv38.view(), -85.0).unwrap(),
//! ];
//! let flags = combine_masks(&masks).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod masks;
pub mod visualization;

pub use config::{ImpulseConfig, MaskConfig, PipelineConfig, PlotConfig, PulseConfig, ThresholdConfig};
pub use crate::core::grid::{GridAxes, SvGrid};
pub use masks::{BinaryMask, FlagMask};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
