//! CSV writer for grids and masks.
//!
//! Output uses the same depth-by-ping layout that [`super::loaders`] reads,
//! so masks written here can be loaded again for combination.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use ndarray::ArrayView2;
use thiserror::Error;

use super::grid::{check_axes, GridAxes, GridError};

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Axes that do not describe the grid being written.
    #[error(transparent)]
    AxesMismatch(#[from] GridError),
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write a grid to CSV, one sample per row, preceded by its depth.
///
/// The header is `depth` followed by the ping labels from `axes`.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `values` - Grid to write, shape (samples, pings)
/// * `axes` - Depths and ping labels matching `values`
///
/// # Errors
///
/// Returns an error if:
/// - `axes` does not match the shape of `values`
/// - Parent directories cannot be created
/// - File cannot be created or written to
///
/// # Example
///
/// ```no_run
/// use echomask::core::grid::GridAxes;
/// use echomask::core::writers::write_grid_csv;
/// use ndarray::array;
/// use std::path::Path;
///
/// let mask = array![[1u8, 0], [0, 1]];
/// let axes = GridAxes::indexed(2, 2);
/// write_grid_csv(Path::new("mask.csv"), mask.view(), &axes).unwrap();
/// ```
pub fn write_grid_csv<T: Display>(
    path: &Path,
    values: ArrayView2<'_, T>,
    axes: &GridAxes,
) -> Result<()> {
    check_axes(values.dim(), axes)?;
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let buf_writer = BufWriter::new(file);
    let mut csv_writer = csv::Writer::from_writer(buf_writer);

    let path_str = path.display().to_string();

    // Write header
    let header = std::iter::once("depth").chain(axes.pings.iter().map(String::as_str));
    csv_writer
        .write_record(header)
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    // Write data rows
    let mut record = Vec::with_capacity(values.ncols() + 1);
    for (depth, row) in axes.depths.iter().zip(values.rows()) {
        record.clear();
        record.push(depth.to_string());
        record.extend(row.iter().map(|v| v.to_string()));

        csv_writer
            .write_record(&record)
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::{load_mask_csv, load_sv_csv};
    use ndarray::array;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_mask_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.csv");
        let mask = array![[1u8, 0], [0, 1], [1, 1]];
        let axes = GridAxes {
            depths: vec![0.5, 1.0, 1.5],
            pings: vec!["p0".to_string(), "p1".to_string()],
        };

        write_grid_csv(&path, mask.view(), &axes).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["depth,p0,p1", "0.5,1,0", "1,0,1", "1.5,1,1"]);

        let (loaded, loaded_axes) = load_mask_csv(&path).unwrap();
        assert_eq!(loaded, mask);
        assert_eq!(loaded_axes, axes);
    }

    #[test]
    fn test_write_sv_csv_keeps_nan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sv.csv");
        let sv = array![[-70.5, f64::NAN]];
        let axes = GridAxes::indexed(1, 2);

        write_grid_csv(&path, sv.view(), &axes).unwrap();

        let grid = load_sv_csv(&path).unwrap();
        assert_eq!(grid.values[[0, 0]], -70.5);
        assert!(grid.values[[0, 1]].is_nan());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("nested").join("mask.csv");
        let mask = array![[1u8]];

        write_grid_csv(&path, mask.view(), &GridAxes::indexed(1, 1)).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_write_axes_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.csv");
        let mask = array![[1u8, 0]];

        let result = write_grid_csv(&path, mask.view(), &GridAxes::indexed(2, 2));

        assert!(matches!(
            result,
            Err(WriteError::AxesMismatch(GridError::AxesMismatch { .. }))
        ));
        assert!(!path.exists());
    }
}
