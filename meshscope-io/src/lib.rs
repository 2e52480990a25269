//! I/O operations for meshes
//!
//! This crate reads and writes the basic OBJ subset used to exchange meshes
//! with the viewer: positions, optional per-vertex colors and triangle faces.

pub mod basic_obj;

#[cfg(test)]
mod tests;

pub use basic_obj::{parse_basic_obj, save_basic_obj, write_basic_obj, BasicObjReader, BasicObjWriter};

use meshscope_core::{Result, TriangleMesh};

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<std::path::Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<std::path::Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<std::path::Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("obj") | Some("txt") => BasicObjReader::read_mesh(path),
        _ => Err(meshscope_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<std::path::Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("obj") | Some("txt") => BasicObjWriter::write_mesh(mesh, path),
        _ => Err(meshscope_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}
