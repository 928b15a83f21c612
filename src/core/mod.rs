//! Core data types and I/O operations.

pub mod grid;
pub mod loaders;
pub mod transforms;
pub mod writers;

pub use grid::{GridAxes, GridError, SvGrid};
pub use loaders::{load_flag_csv, load_mask_csv, load_sv_csv, LoaderError};
pub use transforms::{apply_mask, mask_coverage};
pub use writers::{write_grid_csv, WriteError};
