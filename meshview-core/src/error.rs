//! Error types for mesh decoding and model loading
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while decoding a mesh file
#[derive(Error, Debug)]
pub enum DecodeError {
    /// IO error; see inner code for details
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file extension doesn't name a format we can read
    #[error("unsupported mesh format: {0:?}")]
    UnsupportedFormat(String),

    /// Binary data ended before the declared content
    #[error("file truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// Text content could not be parsed
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A face refers to a vertex that doesn't exist
    #[error("face on line {line} refers to missing vertex {index}")]
    BadIndex { line: usize, index: i64 },

    /// The file decoded cleanly but contains no triangles
    #[error("mesh contains no triangles")]
    EmptyMesh,
}

/// Errors produced by a background model load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// The worker thread could not be started
    #[error("could not spawn loader thread: {0}")]
    Spawn(#[source] std::io::Error),
}
