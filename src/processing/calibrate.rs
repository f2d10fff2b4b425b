use ndarray::{s, Array2, Axis, Zip};

use crate::data::model::{CropRegion, Cube};
use crate::error::{CubeError, Result};

/// Added to the reference span so a flat white/dark pair never divides by zero.
pub const EPSILON: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Reference calibration
// ---------------------------------------------------------------------------

/// Convert raw digital numbers to reflectance and crop to `crop`.
///
/// Each reference is averaged over its rows and applied to every sample row:
///
/// ```text
/// factor * (sample - dark) / (white - dark + EPSILON)
/// ```
///
/// Non-finite results read as 0.0. The crop is clipped to the image the way
/// array slicing clips; a crop with nothing left is an error.
pub fn calibrate(
    sample: &Cube,
    dark: &Cube,
    white: &Cube,
    factor: f64,
    crop: &CropRegion,
) -> Result<Cube> {
    check_reference(sample, dark, "dark reference")?;
    check_reference(sample, white, "white reference")?;

    let (rows, cols, _) = sample.dim();
    let (x1, y1, x2, y2) = crop.clipped(rows, cols).ok_or(CubeError::EmptyRegion {
        x1: crop.x1,
        y1: crop.y1,
        x2: crop.x2,
        y2: crop.y2,
    })?;

    let dark_mean = row_mean(dark)?;
    let white_mean = row_mean(white)?;

    // The formula is per-pixel, so only the cropped window needs evaluating.
    let window = sample.data().slice(s![y1..y2, x1..x2, ..]);
    let shape = window.dim();
    let dark_plane = dark_mean.slice(s![x1..x2, ..]);
    let white_plane = white_mean.slice(s![x1..x2, ..]);
    let dark_b = dark_plane.broadcast(shape).ok_or_else(|| {
        CubeError::shape(format!("{shape:?}"), format!("{:?}", dark_plane.dim()))
    })?;
    let white_b = white_plane.broadcast(shape).ok_or_else(|| {
        CubeError::shape(format!("{shape:?}"), format!("{:?}", white_plane.dim()))
    })?;

    let reflectance = Zip::from(&window)
        .and(&dark_b)
        .and(&white_b)
        .par_map_collect(|&s, &d, &w| reflectance(s, d, w, factor));

    log::debug!("Calibrated window x {x1}..{x2}, y {y1}..{y2} with factor {factor}");
    Cube::new(reflectance)
}

/// Reflectance of one sample against its dark/white reference values.
pub fn reflectance(sample: f64, dark: f64, white: f64, factor: f64) -> f64 {
    let value = factor * (sample - dark) / (white - dark + EPSILON);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn check_reference(sample: &Cube, reference: &Cube, what: &str) -> Result<()> {
    if reference.cols() != sample.cols() || reference.bands() != sample.bands() {
        return Err(CubeError::shape(
            format!("{what} with {} cols x {} bands", sample.cols(), sample.bands()),
            format!("{} cols x {} bands", reference.cols(), reference.bands()),
        ));
    }
    Ok(())
}

/// Mean over the row axis: a (column, band) plane.
fn row_mean(reference: &Cube) -> Result<Array2<f64>> {
    let (rows, cols, bands) = reference.dim();
    reference
        .data()
        .mean_axis(Axis(0))
        .ok_or(CubeError::EmptyCube { rows, cols, bands })
}
