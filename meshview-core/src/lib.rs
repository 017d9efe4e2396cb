//! Meshview Core Library - camera interaction, mesh loading and slicing
//!
//! This library provides everything the viewer does that isn't tied to a
//! window or a GPU: the arcball and turntable interactors, STL/OBJ decoding,
//! the slicing engine, the model container with its background loader, and
//! the render loop driver that talks to a rendering [`Backend`].

pub mod arcball;
pub mod error;
pub mod geometry;
pub mod input;
pub mod interactor;
pub mod loader;
pub mod mesh_io;
pub mod model;
pub mod obj;
pub mod projection;
pub mod slicer;
pub mod stl;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use error::{DecodeError, LoadError};
pub use geometry::{BoundingBox, Mesh, Triangle};
pub use input::{Action, Button, CursorPos, Key, Modifiers, WindowSize};
pub use interactor::{Arcball, CameraMode, Interactor, Turntable};
pub use loader::{LoadResult, Loader};
pub use model::{Model, SliceCursor, SliceIssue};
pub use slicer::{Path, Slice};
pub use viewer::{Backend, FrameOutcome, ModelGeometry, Viewer, ViewerConfig};
