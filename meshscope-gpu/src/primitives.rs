//! Built-in shapes
//!
//! Every mesh primitive uses textured shading with uv coordinates in the
//! color slot and carries explicit normals, so automatic normals are off.

use crate::mesh::Mesh;
use crate::point_cloud::PointCloud;
use meshscope_core::{ensure, face_normal, MeshVertex, Result, Row3, ShadingMode, Vector3f};
use std::f32::consts::PI;

/// Corners of one cube face as (u, v) pairs, two counter-clockwise triangles
const FACE_CORNERS: [[f32; 2]; 6] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];

/// (normal, u axis, v axis) per cube face, with `u x v = normal`
const CUBE_FACES: [[Row3; 3]; 6] = [
    [[0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    [[-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
    [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]],
    [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
    [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
];

impl Mesh {
    fn primitive(vertices: Vec<MeshVertex>, faces: Vec<meshscope_core::Triangle>) -> Result<Self> {
        let mut mesh = Self::new(vertices.len(), faces.len())?;
        mesh.vertices = vertices;
        if !faces.is_empty() {
            mesh.faces = faces;
        }
        mesh.set_shading(ShadingMode::Textured).set_auto_normals(false);
        Ok(mesh)
    }

    /// Single triangle `a, b, c` with a flat normal
    pub fn triangle(a: Row3, b: Row3, c: Row3) -> Result<Self> {
        let normal: Row3 = face_normal(&a.into(), &b.into(), &c.into()).into();
        Self::primitive(
            vec![
                MeshVertex::textured(a, [0.0, 0.0], normal),
                MeshVertex::textured(b, [0.0, 1.0], normal),
                MeshVertex::textured(c, [1.0, 1.0], normal),
            ],
            Vec::new(),
        )
    }

    /// Unit square in the xy plane centered at the origin, facing +z
    pub fn square() -> Result<Self> {
        let normal = [0.0, 0.0, 1.0];
        Self::primitive(
            vec![
                MeshVertex::textured([0.5, 0.5, 0.0], [1.0, 1.0], normal),
                MeshVertex::textured([0.5, -0.5, 0.0], [1.0, 0.0], normal),
                MeshVertex::textured([-0.5, -0.5, 0.0], [0.0, 0.0], normal),
                MeshVertex::textured([-0.5, 0.5, 0.0], [0.0, 1.0], normal),
            ],
            vec![[0, 3, 1], [1, 3, 2]],
        )
    }

    /// Unit cube centered at the origin; 36 vertices with implicit faces
    pub fn cube() -> Result<Self> {
        let mut vertices = Vec::with_capacity(36);
        for [normal, u_axis, v_axis] in CUBE_FACES {
            let (n, s, t) = (Vector3f::from(normal), Vector3f::from(u_axis), Vector3f::from(v_axis));
            for [u, v] in FACE_CORNERS {
                let position = n * 0.5 + s * (u - 0.5) + t * (v - 0.5);
                vertices.push(MeshVertex::textured(position.into(), [u, v], normal));
            }
        }
        Self::primitive(vertices, Vec::new())
    }

    /// UV sphere of radius 1 centered at the origin.
    ///
    /// `rings` latitude rows from pole to pole and `sectors` longitude
    /// columns; uv spans `[0, 1)` around and `[0, 1]` from south to north.
    pub fn sphere(rings: usize, sectors: usize) -> Result<Self> {
        ensure!(rings >= 2, "a sphere needs at least 2 rings, got {}", rings);
        ensure!(sectors >= 3, "a sphere needs at least 3 sectors, got {}", sectors);
        let ring_step = PI / (rings - 1) as f32;
        let sector_step = 2.0 * PI / sectors as f32;

        let mut vertices = Vec::with_capacity(rings * sectors);
        for r in 0..rings {
            let polar = r as f32 * ring_step;
            for s in 0..sectors {
                let azimuth = s as f32 * sector_step;
                let position = [
                    azimuth.cos() * polar.sin(),
                    (polar - 0.5 * PI).sin(),
                    azimuth.sin() * polar.sin(),
                ];
                let uv = [s as f32 / sectors as f32, r as f32 / (rings - 1) as f32];
                vertices.push(MeshVertex::textured(position, uv, position));
            }
        }

        let mut faces = Vec::with_capacity((rings - 1) * sectors * 2);
        for r in 0..rings - 1 {
            let (row, next_row) = (r * sectors, (r + 1) * sectors);
            for s in 0..sectors {
                let next_s = (s + 1) % sectors;
                faces.push([(row + next_s) as u32, (row + s) as u32, (next_row + s) as u32]);
                faces.push([(next_row + s) as u32, (next_row + next_s) as u32, (row + next_s) as u32]);
            }
        }
        Self::primitive(vertices, faces)
    }
}

impl PointCloud {
    /// Segment from `a` to `b` drawn as a line
    pub fn line(a: Row3, b: Row3, color: Row3) -> Self {
        let mut cloud = Self::new(2);
        cloud.points[0].position = a;
        cloud.points[1].position = b;
        for point in &mut cloud.points {
            point.color = color;
        }
        cloud.draw_lines();
        cloud
    }
}
