//! Hyperspectral cube calibration, binning and spectral inspection.
//!
//! The batch side ([`pipeline::run`]) turns a raw ENVI cube into reflectance
//! using dark/white references, crops it, and writes spatially and spectrally
//! binned products. The interactive side ([`app::HyperspecApp`]) shows a
//! false-colour composite and, for each click, the mean spectrum of a 100x100
//! neighbourhood with its standardized and derivative transforms.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod state;
pub mod ui;
