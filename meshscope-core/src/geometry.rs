//! Geometry utilities over vertex and face tables

use crate::vertex::{MeshVertex, Row3, Triangle, Vector3f};
use crate::{ensure, ensure_eq, Result};

/// Sentinel for "no position vertex assigned yet" while building a uv map
const UNMAPPED: u32 = u32::MAX;

/// Unit normal of triangle `(a, b, c)` using the `(b - a) x (c - b)` winding.
///
/// Degenerate triangles yield the zero vector.
pub fn face_normal(a: &Vector3f, b: &Vector3f, c: &Vector3f) -> Vector3f {
    (b - a)
        .cross(&(c - b))
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3f::zeros)
}

/// Recompute the normal column of `vertices` by averaging incident face normals.
///
/// With an empty `faces` table every consecutive triple of vertices is treated
/// as one triangle. Vertices not referenced by any face get a zero normal.
pub fn estimate_normals(vertices: &mut [MeshVertex], faces: &[Triangle]) -> Result<()> {
    let count = vertices.len();
    let mut sums = vec![Vector3f::zeros(); count];
    let mut incidence = vec![0u32; count];

    let mut accumulate = |face: [usize; 3], vertices: &[MeshVertex]| {
        let normal = face_normal(
            &vertices[face[0]].position_vec(),
            &vertices[face[1]].position_vec(),
            &vertices[face[2]].position_vec(),
        );
        for &v in &face {
            sums[v] += normal;
            incidence[v] += 1;
        }
    };

    if faces.is_empty() {
        for start in (0..count - count % 3).step_by(3) {
            accumulate([start, start + 1, start + 2], vertices);
        }
    } else {
        for (i, face) in faces.iter().enumerate() {
            for &v in face {
                ensure!(
                    (v as usize) < count,
                    "face {} references vertex {} but the mesh has {} vertices",
                    i,
                    v,
                    count
                );
            }
            accumulate(face.map(|v| v as usize), vertices);
        }
    }

    for ((vertex, sum), n) in vertices.iter_mut().zip(&sums).zip(&incidence) {
        vertex.normal = if *n == 0 {
            [0.0; 3]
        } else {
            (sum / *n as f32).into()
        };
    }
    Ok(())
}

/// Normals for a bare position table, see [`estimate_normals`].
pub fn estimate_position_normals(positions: &[Row3], faces: &[Triangle]) -> Result<Vec<Row3>> {
    let mut vertices: Vec<MeshVertex> = positions
        .iter()
        .map(|p| MeshVertex { position: *p, ..Default::default() })
        .collect();
    estimate_normals(&mut vertices, faces)?;
    Ok(vertices.into_iter().map(|v| v.normal).collect())
}

/// Map each uv vertex to the position vertex at the parallel corner of the
/// parallel position face.
///
/// `faces` and `uv_faces` must have the same length. Every uv vertex in
/// `0..num_uv_vertices` must be referenced by some uv face, and all of its
/// corners must agree on one position vertex.
pub fn uv_to_vertex_map(
    num_uv_vertices: usize,
    num_vertices: usize,
    faces: &[Triangle],
    uv_faces: &[Triangle],
) -> Result<Vec<u32>> {
    ensure_eq!(faces.len(), uv_faces.len());

    let mut map = vec![UNMAPPED; num_uv_vertices];
    for (f, (face, uv_face)) in faces.iter().zip(uv_faces).enumerate() {
        for corner in 0..3 {
            let uv = uv_face[corner] as usize;
            let vert = face[corner];
            ensure!(
                uv < num_uv_vertices,
                "uv face {} references uv vertex {} but only {} exist",
                f,
                uv,
                num_uv_vertices
            );
            ensure!(
                (vert as usize) < num_vertices,
                "face {} references vertex {} but only {} exist",
                f,
                vert,
                num_vertices
            );
            let slot = &mut map[uv];
            ensure!(
                *slot == UNMAPPED || *slot == vert,
                "uv vertex {} maps to both vertex {} and vertex {}",
                uv,
                *slot,
                vert
            );
            *slot = vert;
        }
    }

    let missing = map.iter().position(|&v| v == UNMAPPED);
    ensure!(
        missing.is_none(),
        "uv vertex {} is not referenced by any uv face",
        missing.unwrap_or_default()
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex(p: Row3) -> MeshVertex {
        MeshVertex { position: p, ..Default::default() }
    }

    #[test]
    fn test_face_normal_winding() {
        let n = face_normal(
            &Vector3f::new(0.0, 0.0, 0.0),
            &Vector3f::new(1.0, 0.0, 0.0),
            &Vector3f::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(n, Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let p = Vector3f::new(1.0, 1.0, 1.0);
        assert_eq!(face_normal(&p, &p, &p), Vector3f::zeros());
    }

    #[test]
    fn test_single_triangle_normals_with_faces() {
        let a = [0.0, 0.0, 0.0];
        let b = [2.0, 0.0, 0.0];
        let c = [0.0, 0.0, -3.0];
        let mut verts = vec![vertex(a), vertex(b), vertex(c)];
        estimate_normals(&mut verts, &[[0, 1, 2]]).unwrap();

        let expected = face_normal(&a.into(), &b.into(), &c.into());
        for v in &verts {
            assert_relative_eq!(Vector3f::from(v.normal), expected, epsilon = 1e-6);
        }
        assert_relative_eq!(expected, Vector3f::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_implicit_triples_match_explicit_faces() {
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
        ];
        let implicit = estimate_position_normals(&positions, &[]).unwrap();
        let explicit = estimate_position_normals(&positions, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        assert_eq!(implicit, explicit);
        assert_relative_eq!(Vector3f::from(implicit[1]), Vector3f::new(0.0, 0.0, 1.0));
        assert_relative_eq!(Vector3f::from(implicit[4]), Vector3f::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_shared_vertex_averages_incident_faces() {
        // Two faces of a right-angle fold sharing the edge 0-1
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let faces = [[0, 1, 2], [1, 0, 3]];
        let normals = estimate_position_normals(&positions, &faces).unwrap();

        assert_relative_eq!(Vector3f::from(normals[2]), Vector3f::new(0.0, 0.0, 1.0));
        assert_relative_eq!(Vector3f::from(normals[3]), Vector3f::new(0.0, 1.0, 0.0));
        assert_relative_eq!(Vector3f::from(normals[0]), Vector3f::new(0.0, 0.5, 0.5));
    }

    #[test]
    fn test_unreferenced_vertex_gets_zero_normal() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let normals = estimate_position_normals(&positions, &[[0, 1, 2]]).unwrap();
        assert_eq!(normals[3], [0.0; 3]);
    }

    #[test]
    fn test_out_of_range_face_is_rejected() {
        let mut verts = vec![vertex([0.0; 3]); 3];
        let err = estimate_normals(&mut verts, &[[0, 1, 3]]).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_uv_map_with_seam() {
        // Quad split in two; uv topology duplicates vertex 0 along a seam
        let faces = [[0, 1, 2], [0, 2, 3]];
        let uv_faces = [[0, 1, 2], [4, 2, 3]];
        let map = uv_to_vertex_map(5, 4, &faces, &uv_faces).unwrap();
        assert_eq!(map, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_uv_map_rejects_unreferenced_uv_vertex() {
        let faces = [[0, 1, 2]];
        let uv_faces = [[0, 1, 2]];
        let err = uv_to_vertex_map(4, 3, &faces, &uv_faces).unwrap_err();
        assert!(err.to_string().contains("uv vertex 3"), "{err}");
    }

    #[test]
    fn test_uv_map_rejects_face_count_mismatch() {
        let err = uv_to_vertex_map(3, 3, &[[0, 1, 2]], &[]).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_uv_map_rejects_conflicting_corners() {
        let faces = [[0, 1, 2], [3, 1, 2]];
        let uv_faces = [[0, 1, 2], [0, 1, 2]];
        let err = uv_to_vertex_map(3, 4, &faces, &uv_faces).unwrap_err();
        assert!(err.to_string().contains("maps to both"), "{err}");
    }

    #[test]
    fn test_uv_map_rejects_out_of_range_uv_index() {
        let err = uv_to_vertex_map(2, 3, &[[0, 1, 2]], &[[0, 1, 2]]).unwrap_err();
        assert!(err.is_precondition());
    }
}
