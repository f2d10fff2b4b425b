use ndarray::{s, Axis};

use crate::data::model::Cube;

/// Side length of the click-driven selection window, in pixels.
pub const WINDOW_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// SelectionRegion
// ---------------------------------------------------------------------------

/// Pixel window averaged into the mean spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRegion {
    pub x_start: usize,
    pub y_start: usize,
    pub width: usize,
    pub height: usize,
}

impl SelectionRegion {
    /// A `WINDOW_SIZE` square centred on `(x, y)`, shifted inward so it never
    /// leaves a `cols x rows` image. Along an axis shorter than the window it
    /// covers the whole axis instead.
    pub fn around(x: usize, y: usize, cols: usize, rows: usize) -> Self {
        let (x_start, width) = window_axis(x, cols);
        let (y_start, height) = window_axis(y, rows);
        SelectionRegion { x_start, y_start, width, height }
    }

    pub fn x_end(&self) -> usize {
        self.x_start + self.width
    }

    pub fn y_end(&self) -> usize {
        self.y_start + self.height
    }
}

fn window_axis(center: usize, extent: usize) -> (usize, usize) {
    if extent <= WINDOW_SIZE {
        return (0, extent);
    }
    let start = center.saturating_sub(WINDOW_SIZE / 2).min(extent - WINDOW_SIZE);
    (start, WINDOW_SIZE)
}

// ---------------------------------------------------------------------------
// Spectrum transforms
// ---------------------------------------------------------------------------

/// Mean spectrum of a selection together with its derived transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSet {
    pub mean: Vec<f64>,
    pub standardized: Vec<f64>,
    pub first_derivative: Vec<f64>,
    pub second_derivative: Vec<f64>,
}

impl SpectrumSet {
    pub fn compute(cube: &Cube, region: &SelectionRegion, wavelengths: &[f64]) -> Self {
        let mean = region_mean(cube, region);
        let standardized = standardize(&mean);
        let first_derivative = gradient(&mean, wavelengths);
        let second_derivative = gradient(&first_derivative, wavelengths);
        SpectrumSet {
            mean,
            standardized,
            first_derivative,
            second_derivative,
        }
    }
}

/// Per-band mean over the region's pixels.
pub fn region_mean(cube: &Cube, region: &SelectionRegion) -> Vec<f64> {
    let window = cube.data().slice(s![
        region.y_start..region.y_end(),
        region.x_start..region.x_end(),
        ..
    ]);
    let pixels = (region.width * region.height) as f64;
    window
        .sum_axis(Axis(0))
        .sum_axis(Axis(0))
        .iter()
        .map(|&total| total / pixels)
        .collect()
}

/// Standard normal variate: zero mean, unit population standard deviation.
///
/// A flat spectrum has no spread to divide by and maps to zeros.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Numerical derivative of `values` with respect to the sample positions `x`.
///
/// Interior points use second-order centred differences that account for
/// uneven spacing; the two ends use one-sided differences.
pub fn gradient(values: &[f64], x: &[f64]) -> Vec<f64> {
    let n = values.len().min(x.len());
    match n {
        0 => return Vec::new(),
        1 => return vec![0.0],
        _ => {}
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / (x[1] - x[0]));
    for i in 1..n - 1 {
        let h1 = x[i] - x[i - 1];
        let h2 = x[i + 1] - x[i];
        let a = -h2 / (h1 * (h1 + h2));
        let b = (h2 - h1) / (h1 * h2);
        let c = h1 / (h2 * (h1 + h2));
        out.push(a * values[i - 1] + b * values[i] + c * values[i + 1]);
    }
    out.push((values[n - 1] - values[n - 2]) / (x[n - 1] - x[n - 2]));
    out
}
