//! CPU-side triangle mesh tables

use crate::vertex::{consecutive_triangles, Point3f, Row3, Triangle};
use crate::{ensure, ensure_eq, Result};
use serde::{Deserialize, Serialize};

/// A triangle mesh as plain tables: positions, faces and optional per-vertex
/// colors and normals.
///
/// This is the exchange form used by the text reader/writer and by scene
/// meshes before they are packed into GPU vertex records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Row3>,
    pub faces: Vec<Triangle>,
    pub normals: Option<Vec<Row3>>,
    pub colors: Option<Vec<Row3>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces.
    ///
    /// An empty face table means consecutive vertex triples; in that case
    /// the vertex count must be divisible by three.
    pub fn from_vertices_and_faces(vertices: Vec<Row3>, faces: Vec<Triangle>) -> Result<Self> {
        let mut mesh = Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        };
        mesh.fill_implicit_faces()?;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Attach per-vertex colors; the row count must match the vertices
    pub fn with_colors(mut self, colors: Vec<Row3>) -> Result<Self> {
        ensure_eq!(colors.len(), self.vertices.len());
        self.colors = Some(colors);
        Ok(self)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Replace an empty face table with consecutive triples
    pub fn fill_implicit_faces(&mut self) -> Result<()> {
        if self.faces.is_empty() {
            ensure!(
                self.vertices.len() % 3 == 0,
                "{} vertices cannot form implicit triangles",
                self.vertices.len()
            );
            self.faces = consecutive_triangles(self.vertices.len());
        }
        Ok(())
    }

    /// Check face indices and attribute row counts
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            ensure!(
                face.iter().all(|&v| (v as usize) < count),
                "face {} = {:?} is out of range for {} vertices",
                i,
                face,
                count
            );
        }
        if let Some(colors) = &self.colors {
            ensure_eq!(colors.len(), count);
        }
        if let Some(normals) = &self.normals {
            ensure_eq!(normals.len(), count);
        }
        Ok(())
    }

    /// Axis-aligned bounds, origin for an empty mesh
    pub fn bounding_box(&self) -> (Point3f, Point3f) {
        let Some(first) = self.vertices.first() else {
            return (Point3f::origin(), Point3f::origin());
        };
        let mut min = Point3f::from(*first);
        let mut max = min;
        for vertex in &self.vertices {
            let p = Point3f::from(*vertex);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        (min, max)
    }

    /// Center of the bounding box
    pub fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }
}
