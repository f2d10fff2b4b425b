use ndarray::{s, Array3, Zip};

use crate::data::model::Cube;
use crate::error::{CubeError, Result};

/// For each target, the index of the closest available wavelength.
///
/// Ties keep the lowest index. No interpolation: the result is always an
/// existing band.
pub fn nearest_indices(targets: &[f64], available: &[f64]) -> Result<Vec<usize>> {
    if available.is_empty() {
        return Err(CubeError::shape("at least one wavelength", "none"));
    }
    Ok(targets
        .iter()
        .map(|&target| nearest_index(target, available))
        .collect())
}

fn nearest_index(target: f64, available: &[f64]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &wl) in available.iter().enumerate() {
        let dist = (wl - target).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// False-colour composite
// ---------------------------------------------------------------------------

/// Stack the bands nearest to the first three targets as R, G, B.
///
/// The block is rescaled to `[0, 1]` with one min/max over all three
/// channels, so relative channel brightness survives. A flat block maps to 0.
pub fn false_color_composite(
    cube: &Cube,
    wavelengths: &[f64],
    targets: &[f64],
) -> Result<Array3<f64>> {
    cube.check_wavelengths(wavelengths)?;
    if targets.len() < 3 {
        return Err(CubeError::InvalidTargets(targets.len()));
    }
    let indices = nearest_indices(&targets[..3], wavelengths)?;

    let (rows, cols, _) = cube.dim();
    let mut rgb = Array3::<f64>::zeros((rows, cols, 3));
    for (channel, &band) in indices.iter().enumerate() {
        rgb.slice_mut(s![.., .., channel])
            .assign(&cube.data().slice(s![.., .., band]));
    }

    let (min, max) = rgb
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range.abs() < f64::EPSILON || !range.is_finite() {
        rgb.fill(0.0);
    } else {
        Zip::from(&mut rgb).par_for_each(|v| *v = (*v - min) / range);
    }

    log::debug!("Composite bands {indices:?}, value range {min}..{max}");
    Ok(rgb)
}
