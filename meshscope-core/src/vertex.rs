//! Vertex record layouts and related types

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use bytemuck::{Pod, Zeroable};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// One row of a 3-column float table (position, color, normal)
pub type Row3 = [f32; 3];

/// A texture coordinate
pub type Uv = [f32; 2];

/// A triangle: three vertex indices into the topology it belongs to
pub type Triangle = [u32; 3];

/// Size in bytes of one float column
pub const SCALAR_SIZE: usize = std::mem::size_of::<f32>();

/// Interpretation of the middle three columns of a [`MeshVertex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadingMode {
    /// Colors are interpolated from per-vertex RGB
    #[default]
    VertexColor,
    /// Colors are sampled from textures; the slot holds uv coordinates
    Textured,
}

/// Per-vertex record of a mesh: position, color-or-uv, normal.
///
/// The layout is fixed: columns 0-2 hold the position, 3-5 the color
/// (or uv in the first two columns when textured), 6-8 the normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: Row3,
    pub color: Row3,
    pub normal: Row3,
}

impl MeshVertex {
    /// Number of float columns per record
    pub const COLUMNS: usize = 9;
    /// Byte stride of one record
    pub const STRIDE: usize = Self::COLUMNS * SCALAR_SIZE;
    pub const POSITION_OFFSET: usize = 0;
    pub const COLOR_OFFSET: usize = 3 * SCALAR_SIZE;
    pub const NORMAL_OFFSET: usize = 6 * SCALAR_SIZE;

    pub fn new(position: Row3, color: Row3, normal: Row3) -> Self {
        Self { position, color, normal }
    }

    /// Vertex with uv coordinates stored in the color slot
    pub fn textured(position: Row3, uv: Uv, normal: Row3) -> Self {
        Self::new(position, [uv[0], uv[1], 0.0], normal)
    }

    /// The color slot read as texture coordinates
    pub fn uv(&self) -> Uv {
        [self.color[0], self.color[1]]
    }

    pub fn set_uv(&mut self, uv: Uv) {
        self.color = [uv[0], uv[1], 0.0];
    }

    pub fn position_vec(&self) -> Vector3f {
        Vector3f::from(self.position)
    }
}

/// Per-point record of a point cloud: position and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct PointVertex {
    pub position: Row3,
    pub color: Row3,
}

impl PointVertex {
    pub const COLUMNS: usize = 6;
    pub const STRIDE: usize = Self::COLUMNS * SCALAR_SIZE;
    pub const POSITION_OFFSET: usize = 0;
    pub const COLOR_OFFSET: usize = 3 * SCALAR_SIZE;

    pub fn new(position: Row3, color: Row3) -> Self {
        Self { position, color }
    }
}

/// Faces `(0,1,2), (3,4,5), ...` covering `num_vertices` vertices.
///
/// Callers must check divisibility by three first.
pub fn consecutive_triangles(num_vertices: usize) -> Vec<Triangle> {
    (0..num_vertices as u32 / 3)
        .map(|k| [3 * k, 3 * k + 1, 3 * k + 2])
        .collect()
}
