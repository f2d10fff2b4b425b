use std::path::Path;

use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::export::{export_composite, export_spectra};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / status bar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open cube…").clicked() {
                open_cube_dialog(state);
                ui.close_menu();
            }

            let has_selection = state
                .viewer
                .as_ref()
                .is_some_and(|v| v.selection().spectra().is_some());
            if ui
                .add_enabled(has_selection, egui::Button::new("Export spectrum…"))
                .clicked()
            {
                export_spectrum_dialog(state);
                ui.close_menu();
            }

            if ui
                .add_enabled(state.viewer.is_some(), egui::Button::new("Export composite…"))
                .clicked()
            {
                export_composite_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(viewer) = &state.viewer {
            if let Some(name) = state.source_name() {
                ui.strong(name);
            }
            let bands = viewer.rgb_bands();
            ui.label(format!("{}  |  RGB bands {bands:?}", viewer.cube()));

            if let Some(region) = viewer.selection().region() {
                ui.separator();
                ui.label(format!(
                    "Selection x {}..{}, y {}..{}",
                    region.x_start,
                    region.x_end(),
                    region.y_start,
                    region.y_end()
                ));
            }
        }

        if let Some((x, y)) = state.hover {
            ui.separator();
            ui.label(format!("Pixel ({x}, {y})"));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_cube_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open hyperspectral cube")
        .add_filter("ENVI header", &["hdr"])
        .pick_file();

    if let Some(path) = file {
        match state.open_cube(&path) {
            Ok(()) => log::info!("Opened {}", path.display()),
            Err(e) => {
                log::error!("Failed to open cube: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

pub fn export_spectrum_dialog(state: &mut AppState) {
    let Some(viewer) = &state.viewer else {
        return;
    };
    let Some(spectra) = viewer.selection().spectra() else {
        return;
    };

    let file = rfd::FileDialog::new()
        .set_title("Export spectrum")
        .set_file_name("spectrum.csv")
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .save_file();

    if let Some(path) = file {
        let result = export_spectra(&path, viewer.wavelengths(), spectra);
        report(state, result, "export spectrum", &path);
    }
}

pub fn export_composite_dialog(state: &mut AppState) {
    let Some(viewer) = &state.viewer else {
        return;
    };

    let file = rfd::FileDialog::new()
        .set_title("Export composite")
        .set_file_name("composite.png")
        .add_filter("PNG", &["png"])
        .save_file();

    if let Some(path) = file {
        let result = export_composite(&path, viewer.composite());
        report(state, result, "export composite", &path);
    }
}

fn report(state: &mut AppState, result: anyhow::Result<()>, action: &str, path: &Path) {
    match result {
        Ok(()) => {
            log::info!("{action}: wrote {}", path.display());
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to {action}: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
