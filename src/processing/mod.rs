/// Numerical core: calibration, binning, band lookup and spectrum transforms.
///
/// ```text
///   raw cube + dark/white references
///        │
///        ▼
///   ┌───────────┐
///   │ calibrate │  reflectance, crop
///   └───────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌─────────┐   ┌──────────┐
///   │ spatial │   │ spectral │  binning
///   └─────────┘   └──────────┘
///                       │
///                       ▼
///   ┌────────────┐  ┌──────────┐
///   │ wavelength │  │ spectrum │  composite, per-click spectra
///   └────────────┘  └──────────┘
/// ```

pub mod binning;
pub mod calibrate;
pub mod spectrum;
pub mod wavelength;
