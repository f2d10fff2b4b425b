use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;

use hyperspec::app::HyperspecApp;
use hyperspec::config::Config;
use hyperspec::data::envi;
use hyperspec::pipeline;
use hyperspec::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Calibrate, bin and inspect a hyperspectral cube")]
struct Args {
    /// Path to the YAML configuration file
    config_path: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::load(&args.config_path)?;
    let output = pipeline::run(&config)?;

    // The viewer works from the product on disk named in the config.
    let viewed = &config.paths.spectral_binned_file;
    if *viewed != output.spectral_path {
        log::warn!(
            "Viewing {} rather than the product just written ({})",
            viewed.display(),
            output.spectral_path.display()
        );
    }
    let (cube, wavelengths, _) = envi::load(viewed)?;
    let mut state = AppState::new(config.parameters.target_wavelengths);
    state.set_cube(cube, wavelengths, Some(viewed.clone()))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1600.0, 800.0])
            .with_min_inner_size([900.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Hyperspec – Spectral Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(HyperspecApp::new(state)))),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}
