use eframe::egui::{self, TextureHandle, TextureOptions};

use crate::color::composite_image;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct HyperspecApp {
    pub state: AppState,
    /// Uploaded composite and the revision it was built from.
    texture: Option<(u64, TextureHandle)>,
}

impl HyperspecApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            texture: None,
        }
    }

    /// Re-upload the composite when the state holds a newer one.
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let revision = self.state.composite_revision;
        if matches!(&self.texture, Some((rev, _)) if *rev == revision) {
            return;
        }
        self.texture = self.state.viewer.as_ref().map(|viewer| {
            let image = composite_image(viewer.composite());
            (revision, ctx.load_texture("composite", image, TextureOptions::NEAREST))
        });
    }
}

impl eframe::App for HyperspecApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Central panel: 2 x 3 plot grid ----
        let texture = self.texture.as_ref().map(|(_, handle)| handle);
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::plot_grid(ui, &mut self.state, texture);
        });
    }
}
