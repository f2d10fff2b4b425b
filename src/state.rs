use std::path::{Path, PathBuf};

use anyhow::Context;
use ndarray::Array3;

use crate::data::envi;
use crate::data::model::{Cube, Wavelengths};
use crate::error::Result;
use crate::processing::spectrum::{SelectionRegion, SpectrumSet};
use crate::processing::wavelength::{false_color_composite, nearest_indices};

// ---------------------------------------------------------------------------
// Selection state machine
// ---------------------------------------------------------------------------

/// `Idle` until the first accepted click; every later click replaces the
/// selection as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected {
        region: SelectionRegion,
        spectra: SpectrumSet,
    },
}

impl SelectionState {
    pub fn region(&self) -> Option<&SelectionRegion> {
        match self {
            SelectionState::Idle => None,
            SelectionState::Selected { region, .. } => Some(region),
        }
    }

    pub fn spectra(&self) -> Option<&SpectrumSet> {
        match self {
            SelectionState::Idle => None,
            SelectionState::Selected { spectra, .. } => Some(spectra),
        }
    }
}

// ---------------------------------------------------------------------------
// Viewer session over one cube
// ---------------------------------------------------------------------------

/// A binned cube under inspection. The cube itself is never modified.
#[derive(Debug, Clone)]
pub struct ViewerState {
    cube: Cube,
    wavelengths: Wavelengths,
    /// (rows, cols, 3) false-colour image in `[0, 1]`.
    composite: Array3<f64>,
    /// Bands shown as R, G, B.
    rgb_bands: Vec<usize>,
    selection: SelectionState,
}

impl ViewerState {
    pub fn new(cube: Cube, wavelengths: Wavelengths, targets: &[f64]) -> Result<Self> {
        let composite = false_color_composite(&cube, &wavelengths, targets)?;
        let rgb_bands = nearest_indices(&targets[..3], &wavelengths)?;
        Ok(ViewerState {
            cube,
            wavelengths,
            composite,
            rgb_bands,
            selection: SelectionState::Idle,
        })
    }

    /// Handle a click at image pixel `(x, y)`.
    ///
    /// Returns `false` and leaves the selection untouched when the pixel lies
    /// outside the cube.
    pub fn on_click(&mut self, x: usize, y: usize) -> bool {
        let (rows, cols, _) = self.cube.dim();
        if x >= cols || y >= rows {
            return false;
        }
        let region = SelectionRegion::around(x, y, cols, rows);
        let spectra = SpectrumSet::compute(&self.cube, &region, &self.wavelengths);
        log::debug!("Selected {region:?} around ({x}, {y})");
        self.selection = SelectionState::Selected { region, spectra };
        true
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn composite(&self) -> &Array3<f64> {
        &self.composite
    }

    pub fn rgb_bands(&self) -> &[usize] {
        &self.rgb_bands
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Cube under inspection (None until one is loaded).
    pub viewer: Option<ViewerState>,

    /// Wavelengths mapped to R, G, B for every composite.
    pub target_wavelengths: [f64; 3],

    /// Header file the current cube came from.
    pub source: Option<PathBuf>,

    /// Image pixel under the pointer.
    pub hover: Option<(usize, usize)>,

    /// Bumped whenever the composite changes so the texture is re-uploaded.
    pub composite_revision: u64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(target_wavelengths: [f64; 3]) -> Self {
        Self {
            viewer: None,
            target_wavelengths,
            source: None,
            hover: None,
            composite_revision: 0,
            status_message: None,
        }
    }

    /// Start a session on a newly loaded cube.
    pub fn set_cube(
        &mut self,
        cube: Cube,
        wavelengths: Wavelengths,
        source: Option<PathBuf>,
    ) -> Result<()> {
        let viewer = ViewerState::new(cube, wavelengths, &self.target_wavelengths)?;
        log::info!(
            "Viewing {} with RGB bands {:?}",
            viewer.cube(),
            viewer.rgb_bands()
        );
        self.viewer = Some(viewer);
        self.source = source;
        self.hover = None;
        self.composite_revision += 1;
        self.status_message = None;
        Ok(())
    }

    /// Load an ENVI cube from disk and start a session on it.
    pub fn open_cube(&mut self, path: &Path) -> anyhow::Result<()> {
        let (cube, wavelengths, _) = envi::load(path)?;
        self.set_cube(cube, wavelengths, Some(path.to_path_buf()))
            .with_context(|| format!("building composite for {}", path.display()))
    }

    /// File name of the loaded cube, for the status line.
    pub fn source_name(&self) -> Option<String> {
        let path = self.source.as_ref()?;
        let name = path.file_name().unwrap_or(path.as_os_str());
        Some(name.to_string_lossy().into_owned())
    }

    /// Forward a click to the active session; `false` if it was ignored.
    pub fn on_click(&mut self, x: usize, y: usize) -> bool {
        self.viewer
            .as_mut()
            .is_some_and(|viewer| viewer.on_click(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn viewer(rows: usize, cols: usize) -> ViewerState {
        let data = Array3::from_shape_fn((rows, cols, 4), |(r, c, b)| (r + c + b) as f64);
        let cube = Cube::new(data).unwrap();
        let wl = vec![1000.0, 1500.0, 2000.0, 2500.0];
        ViewerState::new(cube, wl, &[2400.0, 1600.0, 900.0]).unwrap()
    }

    #[test]
    fn test_starts_idle_with_composite() {
        let v = viewer(20, 30);
        assert_eq!(v.selection(), &SelectionState::Idle);
        assert_eq!(v.composite().dim(), (20, 30, 3));
        assert_eq!(v.rgb_bands(), &[3, 1, 0]);
    }

    #[test]
    fn test_click_outside_is_ignored() {
        let mut v = viewer(20, 30);
        assert!(!v.on_click(30, 5));
        assert!(!v.on_click(3, 20));
        assert_eq!(v.selection(), &SelectionState::Idle);
    }

    #[test]
    fn test_click_replaces_selection() {
        let mut v = viewer(300, 500);
        assert!(v.on_click(490, 10));
        let first = *v.selection().region().unwrap();
        assert_eq!((first.x_start, first.y_start), (400, 0));
        assert_eq!(v.selection().spectra().unwrap().mean.len(), 4);

        assert!(v.on_click(10, 290));
        let second = *v.selection().region().unwrap();
        assert_eq!((second.x_start, second.y_start), (0, 200));
    }

    #[test]
    fn test_click_does_not_touch_cube() {
        let mut v = viewer(10, 10);
        let before = v.cube().clone();
        v.on_click(5, 5);
        assert_eq!(v.cube(), &before);
        assert_eq!(v.selection().region().unwrap().width, 10);
    }

    #[test]
    fn test_app_state_without_cube_ignores_clicks() {
        let mut state = AppState::new([1.0, 2.0, 3.0]);
        assert!(!state.on_click(0, 0));

        let cube = Cube::new(Array3::from_elem((2, 2, 3), 1.0)).unwrap();
        state.set_cube(cube, vec![1.0, 2.0, 3.0], None).unwrap();
        assert_eq!(state.composite_revision, 1);
        assert_eq!(state.source_name(), None);
        assert!(state.on_click(1, 1));
    }

    #[test]
    fn test_source_name_follows_loaded_cube() {
        let mut state = AppState::new([1.0, 2.0, 3.0]);
        let cube = Cube::new(Array3::from_elem((2, 2, 3), 1.0)).unwrap();
        let source = PathBuf::from("out").join("spectral_binned_image.hdr");
        state.set_cube(cube, vec![1.0, 2.0, 3.0], Some(source)).unwrap();
        assert_eq!(state.source_name().as_deref(), Some("spectral_binned_image.hdr"));
    }
}
