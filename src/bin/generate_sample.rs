use std::path::Path;

use anyhow::Result;
use ndarray::Array3;

use hyperspec::data::envi;
use hyperspec::data::model::{Cube, Header, HeaderValue};

const ROWS: usize = 240;
const COLS: usize = 320;
const BANDS: usize = 160;
const REFERENCE_ROWS: usize = 8;

const DARK_LEVEL: f64 = 120.0;
const WHITE_LEVEL: f64 = 3900.0;

/// Reflectance of one material: a sloped continuum minus Gaussian absorption
/// bands given as `(centre, width, depth)`.
fn reflectance(wavelength: f64, continuum: f64, features: &[(f64, f64, f64)]) -> f64 {
    let slope = continuum + 0.00005 * (wavelength - 1000.0);
    let absorption: f64 = features
        .iter()
        .map(|&(centre, width, depth)| {
            depth * (-(wavelength - centre).powi(2) / (2.0 * width * width)).exp()
        })
        .sum();
    (slope - absorption).max(0.0)
}

/// Seeded detector noise (splitmix64 + Box-Muller), so every run writes the
/// same cubes.
struct DetectorNoise(u64);

impl DetectorNoise {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean read noise with standard deviation `sigma` counts.
    fn sample(&mut self, sigma: f64) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// Per-column detector offset, shared by dark frames and the sample.
fn dark_level(col: usize) -> f64 {
    DARK_LEVEL + 10.0 * (col as f64 / COLS as f64)
}

fn reference_cube(
    noise: &mut DetectorNoise,
    level: impl Fn(usize) -> f64,
    sigma: f64,
) -> Result<Cube> {
    let data = Array3::from_shape_fn((REFERENCE_ROWS, COLS, BANDS), |(_, c, _)| level(c));
    let noisy = data.mapv(|v| v + noise.sample(sigma));
    Ok(Cube::new(noisy)?)
}

fn main() -> Result<()> {
    let mut noise = DetectorNoise(42);
    let out_dir = Path::new("sample_data");
    std::fs::create_dir_all(out_dir)?;

    // SWIR range, 1000 → 2500 nm
    let wavelengths: Vec<f64> = (0..BANDS)
        .map(|i| 1000.0 + i as f64 * 1500.0 / (BANDS - 1) as f64)
        .collect();

    // Three vertical stripes with different absorption signatures.
    let materials: [(f64, Vec<(f64, f64, f64)>); 3] = [
        (0.45, vec![(1730.0, 25.0, 0.12), (2310.0, 30.0, 0.05)]),
        (0.60, vec![(1210.0, 40.0, 0.08), (2330.0, 25.0, 0.20)]),
        (0.30, vec![(1450.0, 60.0, 0.10), (1940.0, 70.0, 0.15)]),
    ];

    let mut sample = Array3::<f64>::zeros((ROWS, COLS, BANDS));
    for ((_, c, b), value) in sample.indexed_iter_mut() {
        let (continuum, features) = &materials[(c * materials.len() / COLS).min(2)];
        let refl = reflectance(wavelengths[b], *continuum, features);
        let dark = dark_level(c);
        *value = dark + refl * (WHITE_LEVEL - dark) + noise.sample(8.0);
    }
    let sample = Cube::new(sample)?;
    let dark = reference_cube(&mut noise, dark_level, 2.0)?;
    let white = reference_cube(&mut noise, |_| WHITE_LEVEL, 15.0)?;

    let mut header = Header::default();
    header.set("description", HeaderValue::List(vec!["synthetic SWIR scene".into()]));
    header.set_scalar("sensor type", "synthetic");
    header.set_scalar("wavelength units", "Nanometers");

    envi::save(&out_dir.join("sample.hdr"), &header, &sample, &wavelengths)?;
    envi::save(&out_dir.join("dark.hdr"), &header, &dark, &wavelengths)?;
    envi::save(&out_dir.join("white.hdr"), &header, &white, &wavelengths)?;

    let config = format!(
        "paths:
  header_file: sample.hdr
  dark_reference: dark.hdr
  white_reference: white.hdr
  output_dir: out
  spectral_binned_file: out/spectral_binned_image.hdr
parameters:
  reflectance_factor: \"1/1\"
  spatial_bin_size: 2
  spectral_bin_size: 4
  target_wavelengths: [1210.0, 1730.0, 2330.0]
crop_params:
  x1: 0
  y1: 0
  x2: {COLS}
  y2: {ROWS}
"
    );
    std::fs::write(out_dir.join("config.yaml"), config)?;

    println!(
        "Wrote {ROWS}x{COLS}x{BANDS} sample cube, references and config.yaml to {}",
        out_dir.display()
    );
    Ok(())
}
