//! Echogram and mask rendering.
//!
//! Grids are drawn as one filled rectangle per cell with pings along the
//! x axis and samples increasing downwards, using the plotters library.

use std::path::Path;

use ndarray::ArrayView2;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::PlotConfig;
use crate::core::grid::{validate_grid, GridError};
use crate::core::transforms::apply_mask;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Invalid colour range: vmin {vmin} dB must be below vmax {vmax} dB")]
    InvalidRange { vmin: f64, vmax: f64 },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Colour ramp for Sv, weakest to strongest (EK500-like).
const SV_RAMP: &[(u8, u8, u8)] = &[
    (255, 255, 255), // White
    (159, 159, 159), // Light gray
    (95, 95, 95),    // Dark gray
    (0, 0, 255),     // Blue
    (0, 0, 127),     // Navy
    (0, 191, 0),     // Green
    (0, 127, 0),     // Dark green
    (255, 255, 0),   // Yellow
    (255, 127, 0),   // Orange
    (255, 0, 191),   // Pink
    (255, 0, 0),     // Red
    (166, 83, 60),   // Brown
];

/// Masked-out and missing cells.
const MASKED_COLOR: (u8, u8, u8) = (200, 200, 200);

/// Palette for flag mask values.
const FLAG_COLORS: &[(u8, u8, u8)] = &[
    (64, 64, 64),    // Dark gray (no mask set)
    (55, 126, 184),  // Blue
    (77, 175, 74),   // Green
    (228, 26, 28),   // Red
    (152, 78, 163),  // Purple
    (255, 127, 0),   // Orange
    (255, 255, 51),  // Yellow
    (166, 86, 40),   // Brown
    (247, 129, 191), // Pink
    (0, 206, 209),   // Turquoise
    (138, 43, 226),  // Blue Violet
    (50, 205, 50),   // Lime Green
    (255, 20, 147),  // Deep Pink
    (0, 191, 255),   // Deep Sky Blue
    (255, 215, 0),   // Gold
    (153, 153, 153), // Gray
];

/// Colour at position `t` in `[0, 1]` along [`SV_RAMP`].
pub fn ramp_color(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (SV_RAMP.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(SV_RAMP.len() - 1);
    let frac = scaled - lower as f64;

    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (SV_RAMP[lower], SV_RAMP[upper]);
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Colour for one Sv value; NaN is drawn like a masked cell.
pub fn sv_color(value: f64, vmin: f64, vmax: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(MASKED_COLOR.0, MASKED_COLOR.1, MASKED_COLOR.2);
    }
    ramp_color((value - vmin) / (vmax - vmin))
}

/// Colour for one flag mask value.
pub fn flag_color(value: u32) -> RGBColor {
    let c = FLAG_COLORS[value as usize % FLAG_COLORS.len()];
    RGBColor(c.0, c.1, c.2)
}

/// Draw a (samples x pings) grid cell by cell.
///
/// Cells are grouped in blocks when the grid is larger than the image so
/// that each block covers at least one pixel; a block takes the colour of
/// its top-left cell.
fn draw_cells<F>(
    output_path: &Path,
    (samples, pings): (usize, usize),
    config: &PlotConfig,
    cell_color: F,
) -> Result<()>
where
    F: Fn(usize, usize) -> RGBColor,
{
    let ping_step = (pings / config.width.max(1) as usize).max(1);
    let sample_step = (samples / config.height.max(1) as usize).max(1);

    let root = BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();

    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(0f64..pings as f64, -(samples as f64)..0f64)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let cells = (0..samples).step_by(sample_step).flat_map(|sample| {
        (0..pings).step_by(ping_step).map(move |ping| (sample, ping))
    });

    chart
        .draw_series(cells.map(|(sample, ping)| {
            let x0 = ping as f64;
            let x1 = (ping + ping_step).min(pings) as f64;
            let y0 = -(sample as f64);
            let y1 = -((sample + sample_step).min(samples) as f64);
            Rectangle::new([(x0, y0), (x1, y1)], cell_color(sample, ping).filled())
        }))
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Render an Sv echogram to PNG, optionally with a mask applied.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `sv` - Sv grid, shape (samples, pings)
/// * `mask` - Optional binary mask; cells where it is 0 are greyed out
/// * `config` - Colour range and image size
pub fn plot_echogram(
    output_path: &Path,
    sv: ArrayView2<'_, f64>,
    mask: Option<ArrayView2<'_, u8>>,
    config: &PlotConfig,
) -> Result<()> {
    validate_grid(sv)?;
    if !(config.vmin_db < config.vmax_db) {
        return Err(VisualizationError::InvalidRange {
            vmin: config.vmin_db,
            vmax: config.vmax_db,
        });
    }

    let masked = mask.map(|mask| apply_mask(sv, mask)).transpose()?;
    let grid = masked.as_ref().map_or(sv.view(), |masked| masked.view());

    draw_cells(output_path, grid.dim(), config, |sample, ping| {
        sv_color(grid[[sample, ping]], config.vmin_db, config.vmax_db)
    })
}

/// Render a composite flag mask to PNG, one colour per value.
pub fn plot_flag_mask(
    output_path: &Path,
    flags: ArrayView2<'_, u32>,
    config: &PlotConfig,
) -> Result<()> {
    validate_grid(flags)?;
    draw_cells(output_path, flags.dim(), config, |sample, ping| {
        flag_color(flags[[sample, ping]])
    })
}
