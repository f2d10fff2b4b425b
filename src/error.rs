use thiserror::Error;

/// Failures of the numerical cube operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CubeError {
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid bin size {size} for axis of length {len}")]
    InvalidBinSize { size: usize, len: usize },

    #[error("Cube has an empty axis: {rows}x{cols}x{bands}")]
    EmptyCube { rows: usize, cols: usize, bands: usize },

    #[error("Region ({x1}, {y1})..({x2}, {y2}) is empty after clipping to the image")]
    EmptyRegion { x1: usize, y1: usize, x2: usize, y2: usize },

    #[error("Expected at least 3 target wavelengths, got {0}")]
    InvalidTargets(usize),
}

pub type Result<T> = std::result::Result<T, CubeError>;

impl CubeError {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        CubeError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
