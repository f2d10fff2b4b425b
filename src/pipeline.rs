use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::data::envi;
use crate::data::model::Wavelengths;
use crate::processing::binning::{bin_spatial, bin_spectral};
use crate::processing::calibrate::calibrate;

pub const SPATIAL_OUTPUT: &str = "spatial_binned_image.hdr";
pub const SPECTRAL_OUTPUT: &str = "spectral_binned_image.hdr";

/// What a batch run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub spatial_path: PathBuf,
    pub spectral_path: PathBuf,
    pub binned_wavelengths: Wavelengths,
}

/// Load, calibrate, bin and save both binned products.
pub fn run(config: &Config) -> Result<PipelineOutput> {
    let paths = &config.paths;
    let params = &config.parameters;
    let factor = config.reflectance_factor()?;

    let (sample, wavelengths, header) = envi::load(&paths.header_file)?;
    log::info!("Loaded sample {} ({sample})", paths.header_file.display());
    let (dark, _, _) = envi::load(&paths.dark_reference)?;
    let (white, _, _) = envi::load(&paths.white_reference)?;
    log::info!("Loaded references: dark {dark}, white {white}");

    let reflectance = calibrate(&sample, &dark, &white, factor, &config.crop_params)
        .context("calibrating sample against references")?;
    log::info!("Reflectance cube after crop: {reflectance}");

    let spatial = bin_spatial(&reflectance, params.spatial_bin_size)
        .context("spatial binning")?;
    let (spectral, binned_wavelengths) =
        bin_spectral(&reflectance, params.spectral_bin_size, &wavelengths)
            .context("spectral binning")?;
    log::info!(
        "Binned: spatial x{} -> {spatial}, spectral x{} -> {spectral}",
        params.spatial_bin_size,
        params.spectral_bin_size
    );

    std::fs::create_dir_all(&paths.output_dir)
        .with_context(|| format!("creating output dir {}", paths.output_dir.display()))?;
    let spatial_path = paths.output_dir.join(SPATIAL_OUTPUT);
    let spectral_path = paths.output_dir.join(SPECTRAL_OUTPUT);
    envi::save(&spatial_path, &header, &spatial, &wavelengths)?;
    envi::save(&spectral_path, &header, &spectral, &binned_wavelengths)?;
    log::info!(
        "Wrote {} and {}",
        spatial_path.display(),
        spectral_path.display()
    );

    Ok(PipelineOutput {
        spatial_path,
        spectral_path,
        binned_wavelengths,
    })
}
