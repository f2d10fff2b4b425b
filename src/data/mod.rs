/// Data layer: core types, raster I/O, and spectrum export.
///
/// Architecture:
/// ```text
///  .hdr + .img/.dat/.raw
///        │
///        ▼
///   ┌──────────┐
///   │   envi    │  parse header + raw samples → Cube, Wavelengths, Header
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │    model      │  Cube (row, col, band), CropRegion, Header
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  selected spectra → .csv / .json / .parquet
///   └──────────┘
/// ```

pub mod envi;
pub mod export;
pub mod model;
