//! Loaded mesh with its fit transform and slice stack
use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use nalgebra::{Matrix4, Point3};

use crate::error::DecodeError;
use crate::geometry::{BoundingBox, Mesh};
use crate::mesh_io::load_mesh;
use crate::slicer::{slice_mesh, Slice};
use crate::transform::Transform;

/// Default number of slices across the mesh height
pub const DEFAULT_DIVISIONS: u32 = 250;

/// Position within the slice stack, clamped to `[0, max]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceCursor {
    index: usize,
    max: usize,
}

impl SliceCursor {
    /// Cursor at the bottom of a stack of `count` slices
    pub fn new(count: usize) -> Self {
        Self {
            index: 0,
            max: count.saturating_sub(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Moves one slice up, returning `true` if the index changed
    pub fn step_up(&mut self) -> bool {
        if self.index < self.max {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Moves one slice down, returning `true` if the index changed
    pub fn step_down(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }
}

/// Data-quality problem found in a slice
#[derive(Debug, Clone, PartialEq)]
pub enum SliceIssue {
    /// A path vertex doesn't lie on its slice plane
    OffPlane { z: f64, point: Point3<f64> },
    /// A path doesn't end where it starts
    Unclosed {
        z: f64,
        first: Point3<f64>,
        last: Point3<f64>,
    },
}

/// A mesh ready for display
#[derive(Debug, Clone)]
pub struct Model {
    pub mesh: Mesh,
    pub bbox: BoundingBox,
    /// Centers the mesh on the origin and scales it to a fixed span
    pub transform: Matrix4<f64>,
    pub slices: Vec<Slice>,
    pub cursor: SliceCursor,
}

impl Model {
    /// Builds a model, slicing the mesh into `divisions` layers
    ///
    /// Returns `None` for a mesh without triangles.
    pub fn new(mesh: Mesh, divisions: u32) -> Option<Self> {
        let bbox = mesh.bounding_box()?;
        let transform = Transform::fit(&bbox);
        let step = bbox.height() / f64::from(divisions);
        let slices = slice_mesh(&mesh, step);
        let cursor = SliceCursor::new(slices.len());
        let model = Self {
            mesh,
            bbox,
            transform,
            slices,
            cursor,
        };
        model.validate();
        Some(model)
    }

    /// Reads, slices and validates a model from disk
    pub fn load(path: &Path, divisions: u32) -> Result<Self, DecodeError> {
        let start = Instant::now();
        let mesh = load_mesh(path)?;
        let triangles = mesh.triangles.len();
        let model = Self::new(mesh, divisions).ok_or(DecodeError::EmptyMesh)?;
        info!(
            "loaded {} triangles and {} slices from {} in {:.3?}",
            triangles,
            model.slices.len(),
            path.display(),
            start.elapsed()
        );
        Ok(model)
    }

    /// Currently selected slice, if the model has any
    pub fn active_slice(&self) -> Option<&Slice> {
        self.slices.get(self.cursor.index())
    }

    /// Checks that every path is closed and lies on its plane
    ///
    /// Problems are logged and returned; they never stop the model from
    /// being displayed.
    pub fn validate(&self) -> Vec<SliceIssue> {
        let mut issues = vec![];
        for slice in &self.slices {
            for path in &slice.paths {
                for p in path.iter().filter(|p| p.z != slice.z) {
                    issues.push(SliceIssue::OffPlane {
                        z: slice.z,
                        point: *p,
                    });
                }
                if let (Some(first), Some(last)) = (path.first(), path.last()) {
                    if path.len() < 2 || first != last {
                        issues.push(SliceIssue::Unclosed {
                            z: slice.z,
                            first: *first,
                            last: *last,
                        });
                    }
                }
            }
        }
        for issue in &issues {
            match issue {
                SliceIssue::OffPlane { z, point } => {
                    warn!("slice {z} has bad point {point:?}")
                }
                SliceIssue::Unclosed { z, first, last } => {
                    warn!("slice {z} has unclosed path {first:?} .. {last:?}")
                }
            }
        }
        issues
    }
}
