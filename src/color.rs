use eframe::egui::{Color32, ColorImage};
use ndarray::Array3;
use palette::Srgb;

// ---------------------------------------------------------------------------
// Composite → 8-bit RGB
// ---------------------------------------------------------------------------

/// Convert a `[0, 1]` (rows, cols, 3) composite into packed 8-bit RGB,
/// row-major. Values outside `[0, 1]` are clamped.
pub fn composite_to_rgb8(composite: &Array3<f64>) -> Vec<u8> {
    let (rows, cols, _) = composite.dim();
    let mut bytes = Vec::with_capacity(rows * cols * 3);
    for r in 0..rows {
        for c in 0..cols {
            let channel = |k: usize| composite[[r, c, k]].clamp(0.0, 1.0) as f32;
            let rgb = Srgb::new(channel(0), channel(1), channel(2));
            let px: Srgb<u8> = rgb.into_format();
            bytes.extend_from_slice(&[px.red, px.green, px.blue]);
        }
    }
    bytes
}

/// The composite as an egui image, ready for texture upload.
pub fn composite_image(composite: &Array3<f64>) -> ColorImage {
    let (rows, cols, _) = composite.dim();
    ColorImage::from_rgb([cols, rows], &composite_to_rgb8(composite))
}

// ---------------------------------------------------------------------------
// Reference markers on spectrum plots
// ---------------------------------------------------------------------------

/// A fixed absorption band highlighted on every spectrum plot.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceBand {
    pub start: f64,
    pub end: f64,
    pub line: Color32,
    pub fill: Color32,
}

pub const REFERENCE_BANDS: [ReferenceBand; 2] = [
    ReferenceBand {
        start: 1700.0,
        end: 1750.0,
        line: Color32::from_rgb(0, 0, 255),
        // light blue at 30 % opacity, premultiplied
        fill: Color32::from_rgba_premultiplied(52, 65, 69, 77),
    },
    ReferenceBand {
        start: 2300.0,
        end: 2350.0,
        line: Color32::BLACK,
        // light gray at 30 % opacity, premultiplied
        fill: Color32::from_rgba_premultiplied(63, 63, 63, 77),
    },
];

pub const SELECTION_COLOR: Color32 = Color32::RED;
pub const SPECTRUM_COLOR: Color32 = Color32::from_rgb(31, 119, 180);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_rgb8_bounds_and_order() {
        let mut composite = Array3::<f64>::zeros((1, 2, 3));
        composite[[0, 1, 0]] = 1.0;
        composite[[0, 1, 2]] = 1.5;

        let bytes = composite_to_rgb8(&composite);
        assert_eq!(bytes, vec![0, 0, 0, 255, 0, 255]);
    }

    #[test]
    fn test_color_image_size() {
        let composite = Array3::<f64>::zeros((4, 7, 3));
        let image = composite_image(&composite);
        assert_eq!(image.size, [7, 4]);
    }
}
