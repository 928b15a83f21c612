//! CSV readers for Sv grids and masks.
//!
//! Grids are stored one sample per row:
//!
//! ```text
//! depth,2013-08-18T15:00:06,2013-08-18T15:00:08,...
//! 0.5,-64.2,-65.0,...
//! 1.0,-999,-71.3,...
//! ```
//!
//! The first column holds the depth of each sample and the header names
//! each ping. Empty Sv cells and `nan` are read as NaN.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use ndarray::Array2;
use thiserror::Error;

use super::grid::{GridAxes, GridError, SvGrid};
use crate::masks::{BinaryMask, FlagMask};

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Parse error at row {row}, column {column}: '{value}'")]
    ParseError {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

fn parse_sv(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(f64::NAN);
    }
    field.parse().ok()
}

/// Read a depth-by-ping table, parsing each cell with `parse`.
fn read_table<T, F>(path: &Path, parse: F) -> Result<(Array2<T>, GridAxes)>
where
    F: Fn(&str) -> Option<T>,
{
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(LoaderError::MissingColumns(format!(
            "{} needs a depth column and at least one ping column",
            path.display()
        )));
    }

    let pings: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
    let width = pings.len();

    let mut depths = Vec::new();
    let mut values = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = result?;

        if record.len() != width + 1 {
            return Err(GridError::RaggedRow {
                row,
                expected: width,
                found: record.len().saturating_sub(1),
            }
            .into());
        }

        let depth_field = record.get(0).unwrap_or_default();
        let depth: f64 = depth_field
            .trim()
            .parse()
            .map_err(|_| LoaderError::ParseError {
                row,
                column: 0,
                value: depth_field.to_string(),
            })?;
        depths.push(depth);

        for (column, field) in record.iter().enumerate().skip(1) {
            let value = parse(field).ok_or_else(|| LoaderError::ParseError {
                row,
                column,
                value: field.to_string(),
            })?;
            values.push(value);
        }
    }

    if depths.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    let grid = Array2::from_shape_vec((depths.len(), width), values).map_err(GridError::from)?;
    Ok((grid, GridAxes { depths, pings }))
}

/// Load an Sv grid from CSV.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a cell is not a number,
/// rows differ in length, or the file holds no samples.
pub fn load_sv_csv<P: AsRef<Path>>(path: P) -> Result<SvGrid> {
    let path = path.as_ref();
    let (values, axes) = read_table(path, parse_sv)?;
    log::debug!("loaded Sv grid {:?} from {}", values.dim(), path.display());
    Ok(SvGrid::with_axes(values, axes)?)
}

/// Load a binary mask from CSV.
///
/// Cells are read as unsigned bytes; whether they are 0/1 is checked by
/// the consumer (see [`crate::masks::validate_masks`]).
pub fn load_mask_csv<P: AsRef<Path>>(path: P) -> Result<(BinaryMask, GridAxes)> {
    read_table(path.as_ref(), |field| field.trim().parse::<u8>().ok())
}

/// Load a composite flag mask from CSV.
pub fn load_flag_csv<P: AsRef<Path>>(path: P) -> Result<(FlagMask, GridAxes)> {
    read_table(path.as_ref(), |field| field.trim().parse::<u32>().ok())
}
