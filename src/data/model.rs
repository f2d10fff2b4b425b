use std::fmt;

use ndarray::{Array3, ArrayView1, Axis};

use crate::error::{CubeError, Result};

/// Band centres, one per band of the associated [`Cube`].
pub type Wavelengths = Vec<f64>;

// ---------------------------------------------------------------------------
// Cube – (row, column, band) samples
// ---------------------------------------------------------------------------

/// A hyperspectral cube with axes (row, column, band).
///
/// Every axis has at least one element; that is checked on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    data: Array3<f64>,
}

impl Cube {
    pub fn new(data: Array3<f64>) -> Result<Self> {
        let (rows, cols, bands) = data.dim();
        if rows == 0 || cols == 0 || bands == 0 {
            return Err(CubeError::EmptyCube { rows, cols, bands });
        }
        Ok(Cube { data })
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// `(rows, cols, bands)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Spectrum of a single pixel.
    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f64> {
        self.data.slice(ndarray::s![row, col, ..])
    }

    /// Fails unless `wavelengths` has one entry per band.
    pub fn check_wavelengths(&self, wavelengths: &[f64]) -> Result<()> {
        if wavelengths.len() != self.bands() {
            return Err(CubeError::shape(
                format!("{} wavelengths", self.bands()),
                format!("{} wavelengths", wavelengths.len()),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, c, b) = self.dim();
        write!(f, "{r} rows x {c} cols x {b} bands")
    }
}

// ---------------------------------------------------------------------------
// CropRegion
// ---------------------------------------------------------------------------

/// Half-open rectangle `[x1, x2) x [y1, y2)` in (column, row) space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct CropRegion {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl CropRegion {
    /// Clip to an image of `rows x cols`; `None` if nothing is left.
    pub fn clipped(&self, rows: usize, cols: usize) -> Option<(usize, usize, usize, usize)> {
        let x2 = self.x2.min(cols);
        let y2 = self.y2.min(rows);
        if self.x1 >= x2 || self.y1 >= y2 {
            return None;
        }
        Some((self.x1, self.y1, x2, y2))
    }
}

// ---------------------------------------------------------------------------
// Header – ENVI metadata
// ---------------------------------------------------------------------------

/// A single header entry value: `key = value` or `key = { a, b, c }`.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Scalar(String),
    List(Vec<String>),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Scalar(s) => write!(f, "{s}"),
            HeaderValue::List(items) => write!(f, "{{{}}}", items.join(", ")),
        }
    }
}

impl HeaderValue {
    /// Interpret as a single unsigned integer.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            HeaderValue::Scalar(s) => s.trim().parse().ok(),
            HeaderValue::List(_) => None,
        }
    }

    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            HeaderValue::List(items) => items.iter().map(|s| s.trim().parse().ok()).collect(),
            HeaderValue::Scalar(s) => s.trim().parse().ok().map(|v| vec![v]),
        }
    }
}

/// Ordered key → value metadata of a raster file. Keys are lower case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    entries: Vec<(String, HeaderValue)>,
}

impl Header {
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        let key = key.to_ascii_lowercase();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Insert or replace, keeping the position of an existing key.
    pub fn set(&mut self, key: &str, value: HeaderValue) {
        let key = key.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn set_scalar(&mut self, key: &str, value: impl ToString) {
        self.set(key, HeaderValue::Scalar(value.to_string()));
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        let key = key.to_ascii_lowercase();
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn usize_field(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(HeaderValue::as_usize)
    }

    pub fn wavelengths(&self) -> Option<Wavelengths> {
        self.get("wavelength").and_then(HeaderValue::as_f64_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_cube_rejects_empty_axis() {
        let err = Cube::new(Array3::zeros((0, 3, 2))).unwrap_err();
        assert!(matches!(err, CubeError::EmptyCube { rows: 0, .. }));
    }

    #[test]
    fn test_crop_clipping() {
        let crop = CropRegion { x1: 2, y1: 1, x2: 50, y2: 3 };
        assert_eq!(crop.clipped(10, 8), Some((2, 1, 8, 3)));

        let outside = CropRegion { x1: 9, y1: 0, x2: 12, y2: 2 };
        assert_eq!(outside.clipped(10, 8), None);
    }

    #[test]
    fn test_header_set_keeps_order() {
        let mut header = Header::default();
        header.set_scalar("samples", 4);
        header.set_scalar("Lines", 3);
        header.set_scalar("samples", 5);

        let keys: Vec<&str> = header.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["samples", "lines"]);
        assert_eq!(header.usize_field("SAMPLES"), Some(5));
    }

    #[test]
    fn test_header_value_list_parsing() {
        let value = HeaderValue::List(vec!["400.5".into(), "410".into()]);
        assert_eq!(value.as_f64_list(), Some(vec![400.5, 410.0]));
        assert_eq!(value.to_string(), "{400.5, 410}");
        assert_eq!(HeaderValue::Scalar("x".into()).as_f64_list(), None);
    }
}
