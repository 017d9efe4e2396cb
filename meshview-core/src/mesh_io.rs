//! Mesh file loading with format detection by extension
use std::path::Path;

use log::debug;

use crate::error::DecodeError;
use crate::geometry::Mesh;
use crate::{obj, stl};

/// Supported mesh file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
}

impl MeshFormat {
    /// Detects the format from a (case-insensitive) file extension
    pub fn from_path(path: &Path) -> Result<Self, DecodeError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "stl" => Ok(Self::Stl),
            "obj" => Ok(Self::Obj),
            _ => Err(DecodeError::UnsupportedFormat(ext)),
        }
    }

    /// Decodes raw file contents in this format
    pub fn decode(self, data: &[u8]) -> Result<Mesh, DecodeError> {
        match self {
            Self::Stl => stl::parse_stl(data),
            Self::Obj => {
                let text = std::str::from_utf8(data).map_err(|e| {
                    DecodeError::Parse {
                        line: 1 + data[..e.valid_up_to()]
                            .iter()
                            .filter(|&&b| b == b'\n')
                            .count(),
                        message: e.to_string(),
                    }
                })?;
                obj::parse_obj(text)
            }
        }
    }
}

/// Loads a triangle mesh from disk
///
/// The format is chosen from the file extension before the file is read, so
/// an unsupported extension fails without touching the filesystem.
pub fn load_mesh(path: &Path) -> Result<Mesh, DecodeError> {
    let format = MeshFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    debug!("read {} bytes from {}", data.len(), path.display());
    let mesh = format.decode(&data)?;
    if mesh.is_empty() {
        return Err(DecodeError::EmptyMesh);
    }
    Ok(mesh)
}
