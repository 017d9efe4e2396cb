//! Render loop driver
//!
//! [`Viewer`] owns the camera interactor and the current model, routes input
//! to them and decides each frame whether anything needs drawing.  The
//! actual drawing goes through a [`Backend`], which keeps this module free
//! of any window or GPU code.
use std::ops::Range;

use log::{debug, trace};
use nalgebra::{Matrix4, Vector3};

use crate::input::{Action, Button, CursorPos, Key, Modifiers, WindowSize};
use crate::interactor::Interactor;
use crate::model::{Model, SliceCursor, DEFAULT_DIVISIONS};
use crate::transform::Transform;

/// Settings for the render loop driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerConfig {
    /// Number of slices across the height of each loaded model
    pub divisions: u32,
    /// Horizontal clip-space shift of the mesh (left) and slice (right)
    pub split_offset: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            divisions: DEFAULT_DIVISIONS,
            split_offset: 0.5,
        }
    }
}

/// Flat vertex data for one model, ready to upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelGeometry {
    /// Triangle list, as `x, y, z` triples
    pub mesh: Vec<f32>,
    /// Every slice path back to back, as `x, y, z` triples
    pub outlines: Vec<f32>,
    /// For each slice, the vertex range of each of its paths in `outlines`
    pub slices: Vec<Vec<Range<u32>>>,
}

impl ModelGeometry {
    pub fn new(model: &Model) -> Self {
        let mut outlines = vec![];
        let mut slices = Vec::with_capacity(model.slices.len());
        let mut next = 0;
        for slice in &model.slices {
            let mut ranges = Vec::with_capacity(slice.paths.len());
            for path in &slice.paths {
                for v in path {
                    outlines.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
                }
                let end = next + path.len() as u32;
                ranges.push(next..end);
                next = end;
            }
            slices.push(ranges);
        }
        Self {
            mesh: model.mesh.vertex_buffer(),
            outlines,
            slices,
        }
    }

    pub fn mesh_vertex_count(&self) -> u32 {
        (self.mesh.len() / 3) as u32
    }

    /// Path ranges for one slice; empty if the index is out of range
    pub fn slice_paths(&self, index: usize) -> &[Range<u32>] {
        self.slices.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Drawing operations needed by the [`Viewer`]
///
/// Every call happens on the thread that owns the viewer.
pub trait Backend {
    /// Backend-side resources for one uploaded model
    type Handle;
    type Error;

    fn upload(&mut self, geometry: &ModelGeometry) -> Self::Handle;

    /// Frees a model's resources; called before the replacement is uploaded
    fn release(&mut self, handle: Self::Handle);

    fn resize(&mut self, size: WindowSize);

    /// Starts a frame and clears it
    fn begin_frame(&mut self) -> Result<(), Self::Error>;
    fn draw_mesh(&mut self, handle: &Self::Handle, matrix: &Matrix4<f64>);
    fn draw_slice(
        &mut self,
        handle: &Self::Handle,
        index: usize,
        matrix: &Matrix4<f64>,
    );
    /// Finishes and presents the frame
    fn end_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing changed since the last frame, so nothing was drawn
    Skipped,
    Drawn,
}

/// Compares two matrices bit for bit
fn same_bits(a: &Matrix4<f64>, b: &Matrix4<f64>) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Backend-agnostic render loop driver
pub struct Viewer<B: Backend> {
    config: ViewerConfig,
    backend: B,
    interactor: Box<dyn Interactor>,
    model: Option<(Model, B::Handle)>,
    size: WindowSize,
    cursor: CursorPos,
    last_matrix: Option<Matrix4<f64>>,
    /// Set by anything that changes the picture without changing the matrix
    dirty: bool,
}

impl<B: Backend> Viewer<B> {
    pub fn new(
        backend: B,
        interactor: Box<dyn Interactor>,
        size: WindowSize,
        config: ViewerConfig,
    ) -> Self {
        Self {
            config,
            backend,
            interactor,
            model: None,
            size,
            cursor: CursorPos::default(),
            last_matrix: None,
            dirty: true,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref().map(|(m, _)| m)
    }

    pub fn size(&self) -> WindowSize {
        self.size
    }

    /// Swaps in a new model, releasing the previous one's resources first
    pub fn install(&mut self, mut model: Model) {
        if let Some((_, handle)) = self.model.take() {
            self.backend.release(handle);
        }
        model.cursor = SliceCursor::new(model.slices.len());
        let handle = self.backend.upload(&ModelGeometry::new(&model));
        debug!(
            "installed model with {} triangles and {} slices",
            model.mesh.triangles.len(),
            model.slices.len()
        );
        self.model = Some((model, handle));
        self.dirty = true;
    }

    pub fn cursor_moved(&mut self, pos: CursorPos) {
        self.cursor = pos;
        self.interactor.cursor_moved(pos, self.size);
    }

    pub fn button(&mut self, button: Button, action: Action, mods: Modifiers) {
        self.interactor
            .button(button, action, mods, self.cursor, self.size);
    }

    /// Up and down step through the slices; everything else goes to the
    /// interactor
    pub fn key(&mut self, key: Key, action: Action, mods: Modifiers) {
        let slice_step = matches!(key, Key::Up | Key::Down)
            && action.is_active()
            && mods.is_empty();
        if !slice_step {
            self.interactor.key(key, action, mods);
            return;
        }
        if let Some((model, _)) = &mut self.model {
            let moved = match key {
                Key::Up => model.cursor.step_up(),
                _ => model.cursor.step_down(),
            };
            if moved {
                debug!("showing slice {}", model.cursor.index());
                self.dirty = true;
            }
        }
    }

    pub fn scroll(&mut self, dy: f64) {
        self.interactor.scroll(dy);
    }

    pub fn resize(&mut self, size: WindowSize) {
        self.size = size;
        self.backend.resize(size);
        self.dirty = true;
    }

    /// Camera matrix combined with the model's fit transform
    pub fn matrix(&self) -> Matrix4<f64> {
        let camera = self.interactor.matrix(self.size.aspect());
        match &self.model {
            Some((model, _)) => camera * model.transform,
            None => camera,
        }
    }

    /// Whether a frame drawn with `matrix` would look like the last one
    fn is_current(&self, matrix: &Matrix4<f64>) -> bool {
        !self.dirty
            && self
                .last_matrix
                .as_ref()
                .is_some_and(|m| same_bits(m, matrix))
    }

    /// Checks whether the next call to [`frame`](Self::frame) would draw
    pub fn needs_redraw(&self) -> bool {
        !self.is_current(&self.matrix())
    }

    /// Draws a frame, unless nothing has changed since the last one
    ///
    /// On error the frame is retried next time.
    pub fn frame(&mut self) -> Result<FrameOutcome, B::Error> {
        let matrix = self.matrix();
        if self.is_current(&matrix) {
            trace!("skipping frame");
            return Ok(FrameOutcome::Skipped);
        }

        self.backend.begin_frame()?;
        if let Some((model, handle)) = &self.model {
            let offset = self.config.split_offset;
            let left = Transform::translation(Vector3::new(-offset, 0.0, 0.0));
            let right = Transform::translation(Vector3::new(offset, 0.0, 0.0));
            self.backend.draw_mesh(handle, &(left * matrix));
            self.backend
                .draw_slice(handle, model.cursor.index(), &(right * matrix));
        }
        self.backend.end_frame();

        self.last_matrix = Some(matrix);
        self.dirty = false;
        Ok(FrameOutcome::Drawn)
    }
}
