use eframe::egui::{Stroke, TextureHandle, Ui};
use egui_extras::{Size, StripBuilder};
use egui_plot::{Line, LineStyle, Plot, PlotImage, PlotPoint, PlotPoints, Polygon, VLine};

use crate::color::{REFERENCE_BANDS, SELECTION_COLOR, SPECTRUM_COLOR};
use crate::processing::spectrum::{SelectionRegion, SpectrumSet};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// 2 x 3 grid (central panel)
// ---------------------------------------------------------------------------

/// Composite, mean and standardized spectra on top; derivatives below, with
/// the bottom-left cell left empty.
pub fn plot_grid(ui: &mut Ui, state: &mut AppState, texture: Option<&TextureHandle>) {
    StripBuilder::new(ui)
        .sizes(Size::remainder(), 2)
        .vertical(|mut rows| {
            rows.strip(|builder| {
                builder.sizes(Size::remainder(), 3).horizontal(|mut cells| {
                    cells.cell(|ui| composite_plot(ui, state, texture));
                    cells.cell(|ui| spectrum_plot(ui, state, Transform::Mean));
                    cells.cell(|ui| spectrum_plot(ui, state, Transform::Standardized));
                });
            });
            rows.strip(|builder| {
                builder.sizes(Size::remainder(), 3).horizontal(|mut cells| {
                    cells.empty();
                    cells.cell(|ui| spectrum_plot(ui, state, Transform::FirstDerivative));
                    cells.cell(|ui| spectrum_plot(ui, state, Transform::SecondDerivative));
                });
            });
        });
}

// ---------------------------------------------------------------------------
// Composite image
// ---------------------------------------------------------------------------

/// Render the false-colour composite; a click selects the pixel under the pointer.
pub fn composite_plot(ui: &mut Ui, state: &mut AppState, texture: Option<&TextureHandle>) {
    ui.strong("RGB Image");

    let (Some(viewer), Some(texture)) = (&state.viewer, texture) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a cube to view it  (File → Open cube…)");
        });
        return;
    };

    let (rows, cols, _) = viewer.cube().dim();
    let (height, width) = (rows as f64, cols as f64);
    let region = viewer.selection().region().copied();

    let response = Plot::new("composite_plot")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .include_x(0.0)
        .include_x(width)
        .include_y(0.0)
        .include_y(height)
        .allow_boxed_zoom(true)
        .allow_double_click_reset(true)
        .show(ui, |plot_ui| {
            plot_ui.image(PlotImage::new(
                texture.id(),
                PlotPoint::new(width / 2.0, height / 2.0),
                [cols as f32, rows as f32],
            ));
            if let Some(region) = region {
                plot_ui.line(
                    Line::new(selection_outline(&region, height))
                        .color(SELECTION_COLOR)
                        .width(2.0),
                );
            }
            plot_ui.pointer_coordinate()
        });

    let pixel = response
        .inner
        .and_then(|point| plot_to_pixel(point, rows, cols));
    state.hover = pixel;

    if response.response.clicked() {
        if let Some((x, y)) = pixel {
            if state.on_click(x, y) {
                log::info!("Selected spectrum around pixel ({x}, {y})");
            }
        }
    }
}

/// Map a plot coordinate to an image pixel `(x, y)`.
///
/// The image spans `[0, cols] x [0, rows]` in plot space with row 0 at the top.
pub fn plot_to_pixel(point: PlotPoint, rows: usize, cols: usize) -> Option<(usize, usize)> {
    let x = point.x;
    let y = rows as f64 - point.y;
    if !(x >= 0.0 && y >= 0.0 && x < cols as f64 && y < rows as f64) {
        return None;
    }
    Some((x.floor() as usize, y.floor() as usize))
}

/// Closed outline of a selection in plot space.
fn selection_outline(region: &SelectionRegion, height: f64) -> PlotPoints<'static> {
    let x0 = region.x_start as f64;
    let x1 = region.x_end() as f64;
    let top = height - region.y_start as f64;
    let bottom = height - region.y_end() as f64;
    PlotPoints::new(vec![[x0, top], [x1, top], [x1, bottom], [x0, bottom], [x0, top]])
}

// ---------------------------------------------------------------------------
// Spectrum plots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Mean,
    Standardized,
    FirstDerivative,
    SecondDerivative,
}

impl Transform {
    pub fn title(self) -> &'static str {
        match self {
            Transform::Mean => "Mean Spectrum",
            Transform::Standardized => "Standard Normal Spectrum",
            Transform::FirstDerivative => "First Derivative",
            Transform::SecondDerivative => "Second Derivative",
        }
    }

    pub fn y_label(self) -> &'static str {
        match self {
            Transform::Mean => "Reflectance",
            Transform::Standardized => "Normalized Value",
            Transform::FirstDerivative => "Derivative Value",
            Transform::SecondDerivative => "Second Derivative Value",
        }
    }

    pub fn select(self, spectra: &SpectrumSet) -> &[f64] {
        match self {
            Transform::Mean => &spectra.mean,
            Transform::Standardized => &spectra.standardized,
            Transform::FirstDerivative => &spectra.first_derivative,
            Transform::SecondDerivative => &spectra.second_derivative,
        }
    }
}

/// Render one transform of the current selection with the reference markers.
pub fn spectrum_plot(ui: &mut Ui, state: &AppState, transform: Transform) {
    ui.strong(transform.title());

    let series = state.viewer.as_ref().and_then(|viewer| {
        let spectra = viewer.selection().spectra()?;
        Some((viewer.wavelengths(), transform.select(spectra)))
    });
    let (lo, hi) = series
        .map(|(_, values)| value_range(values))
        .unwrap_or((0.0, 1.0));

    Plot::new(transform.title())
        .x_axis_label("Wavelength (nm)")
        .y_axis_label(transform.y_label())
        .show_grid(true)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for band in REFERENCE_BANDS {
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(vec![
                        [band.start, lo],
                        [band.end, lo],
                        [band.end, hi],
                        [band.start, hi],
                    ]))
                    .fill_color(band.fill)
                    .stroke(Stroke::NONE),
                );
                for x in [band.start, band.end] {
                    plot_ui.vline(
                        VLine::new(x)
                            .color(band.line)
                            .style(LineStyle::dashed_loose())
                            .width(1.5),
                    );
                }
            }

            if let Some((wavelengths, values)) = series {
                let points: PlotPoints = wavelengths
                    .iter()
                    .zip(values.iter())
                    .map(|(&x, &y)| [x, y])
                    .collect();
                plot_ui.line(Line::new(points).color(SPECTRUM_COLOR).width(1.5));
            }
        });
}

/// Finite value range padded by 5 %, so shaded bands span the data.
fn value_range(values: &[f64]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let range = max - min;
    if range.abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    (min - 0.05 * range, max + 0.05 * range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_to_pixel_flips_rows() {
        assert_eq!(plot_to_pixel(PlotPoint::new(0.5, 99.5), 100, 200), Some((0, 0)));
        assert_eq!(plot_to_pixel(PlotPoint::new(199.9, 0.1), 100, 200), Some((199, 99)));
    }

    #[test]
    fn test_plot_to_pixel_outside() {
        assert_eq!(plot_to_pixel(PlotPoint::new(-0.1, 50.0), 100, 200), None);
        assert_eq!(plot_to_pixel(PlotPoint::new(10.0, 100.5), 100, 200), None);
        assert_eq!(plot_to_pixel(PlotPoint::new(200.0, 50.0), 100, 200), None);
        assert_eq!(plot_to_pixel(PlotPoint::new(10.0, 0.0), 100, 200), None);
    }

    #[test]
    fn test_value_range() {
        assert_eq!(value_range(&[]), (0.0, 1.0));
        assert_eq!(value_range(&[2.0, 2.0]), (1.0, 3.0));
        let (lo, hi) = value_range(&[0.0, f64::NAN, 10.0]);
        assert_eq!((lo, hi), (-0.5, 10.5));
    }

    #[test]
    fn test_selection_outline_is_closed() {
        let points = {
            let region = SelectionRegion { x_start: 10, y_start: 20, width: 100, height: 100 };
            selection_outline(&region, 300.0)
        };
        let pts = points.points();
        assert_eq!(pts.len(), 5);
        assert_eq!((pts[0].x, pts[0].y), (10.0, 280.0));
        assert_eq!((pts[2].x, pts[2].y), (110.0, 180.0));
        assert_eq!((pts[4].x, pts[4].y), (pts[0].x, pts[0].y));
    }
}
