//! Basic OBJ text format
//!
//! A minimal subset of Wavefront OBJ:
//!
//! ```text
//! v x y z [r g b]
//! f i j k
//! ```
//!
//! Vertex lines carry either 3 or 6 numbers, and every vertex line in a file
//! must use the same count. Face references are 1-based; each may be followed
//! by `/`-separated extra fields which are ignored. All other lines are
//! skipped. A file without face lines describes consecutive vertex triples.

use crate::{MeshReader, MeshWriter};
use meshscope_core::{transform_position, Error, Matrix4, Result, Row3, TriangleMesh};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub struct BasicObjReader;
pub struct BasicObjWriter;

impl MeshReader for BasicObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path.as_ref())?;
        let mesh = parse_basic_obj(BufReader::new(file))?;
        log::debug!(
            "read {} vertices and {} faces from {}",
            mesh.vertex_count(),
            mesh.face_count(),
            path.as_ref().display()
        );
        Ok(mesh)
    }
}

impl MeshWriter for BasicObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_basic_obj(mesh, &Matrix4::identity(), &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

enum Record {
    Vertex,
    Face,
}

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::Parse {
        line,
        message: message.into(),
    }
}

/// Parse the basic format from any buffered reader.
///
/// Meshes with 6-number vertex lines get `colors`; meshes with 3-number lines
/// get none. Normals are never present in this format.
pub fn parse_basic_obj<R: BufRead>(reader: R) -> Result<TriangleMesh> {
    let mut vertices: Vec<Row3> = Vec::new();
    let mut colors: Vec<Row3> = Vec::new();
    let mut faces = Vec::new();
    let mut fields_per_vertex: Option<usize> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let (kind, body) = if let Some(body) = line.strip_prefix("v ") {
            (Record::Vertex, body)
        } else if let Some(body) = line.strip_prefix("f ") {
            (Record::Face, body)
        } else {
            continue;
        };

        match kind {
            Record::Vertex => {
                let numbers = body
                    .split_whitespace()
                    .map(|tok| {
                        tok.parse::<f32>()
                            .map_err(|_| parse_error(line_no, format!("invalid number `{tok}`")))
                    })
                    .collect::<Result<Vec<f32>>>()?;

                match fields_per_vertex {
                    None if numbers.len() == 3 || numbers.len() == 6 => {
                        fields_per_vertex = Some(numbers.len());
                    }
                    None => {
                        return Err(parse_error(
                            line_no,
                            format!("vertex has {} numbers, expected 3 or 6", numbers.len()),
                        ));
                    }
                    Some(expected) if expected != numbers.len() => {
                        return Err(parse_error(
                            line_no,
                            format!(
                                "vertex has {} numbers but earlier vertices have {}",
                                numbers.len(),
                                expected
                            ),
                        ));
                    }
                    Some(_) => {}
                }

                vertices.push([numbers[0], numbers[1], numbers[2]]);
                if numbers.len() == 6 {
                    colors.push([numbers[3], numbers[4], numbers[5]]);
                }
            }
            Record::Face => {
                let refs = body
                    .split_whitespace()
                    .map(|tok| parse_face_ref(tok, line_no))
                    .collect::<Result<Vec<u32>>>()?;
                if refs.len() != 3 {
                    return Err(parse_error(
                        line_no,
                        format!("face has {} references, expected 3", refs.len()),
                    ));
                }
                faces.push([refs[0], refs[1], refs[2]]);
            }
        }
    }

    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces)?;
    if fields_per_vertex == Some(6) {
        mesh = mesh.with_colors(colors)?;
    }
    Ok(mesh)
}

/// First `/`-separated field of a face reference, converted to 0-based
fn parse_face_ref(token: &str, line_no: usize) -> Result<u32> {
    let first = token.split('/').next().unwrap_or(token);
    let one_based: u32 = first
        .parse()
        .map_err(|_| parse_error(line_no, format!("invalid face index `{token}`")))?;
    one_based
        .checked_sub(1)
        .ok_or_else(|| parse_error(line_no, "face indices are 1-based"))
}

/// Write `mesh` in the basic format with positions mapped through `transform`.
///
/// Colors are written when the mesh has them.
pub fn write_basic_obj<W: Write>(
    mesh: &TriangleMesh,
    transform: &Matrix4<f32>,
    writer: &mut W,
) -> Result<()> {
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        let [x, y, z] = transform_position(transform, vertex);
        write!(writer, "v {x} {y} {z}")?;
        if let Some([r, g, b]) = mesh.colors.as_ref().map(|c| c[i]) {
            write!(writer, " {r} {g} {b}")?;
        }
        writeln!(writer)?;
    }
    for [a, b, c] in &mesh.faces {
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    Ok(())
}

/// Write the basic format to `path`
pub fn save_basic_obj<P: AsRef<Path>>(
    mesh: &TriangleMesh,
    transform: &Matrix4<f32>,
    path: P,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_basic_obj(mesh, transform, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshscope_core::Vector3;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<TriangleMesh> {
        parse_basic_obj(Cursor::new(text))
    }

    #[test]
    fn test_parse_colored_vertices() {
        let mesh = parse("v 0 0 0 1 0 0\nv 1 0 0 0 1 0\nv 0 1 0 0 0 1\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.colors.unwrap()[1], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_parse_positions_only() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\n").unwrap();
        assert!(mesh.colors.is_none());
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_face_refs_with_slashes() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1/1/1 2/2 3//3\nf 2 4/7 3\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [1, 3, 2]]);
    }

    #[test]
    fn test_other_lines_are_skipped() {
        let text = "# comment\nvn 0 0 1\nvt 0.5 0.5\no name\nv 0 0 0\nv 1 0 0\nv 0 1 0\ns off\n\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_mixed_vertex_fields_fail() {
        let err = parse("v 0 0 0\nv 1 0 0 1 1 1\nv 0 1 0\n").unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_vertex_field_count_fails() {
        assert!(parse("v 0 0\n").is_err());
        assert!(parse("v 0 0 0 1\n").is_err());
    }

    #[test]
    fn test_quad_face_fails() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3 4\n").unwrap_err();
        assert!(err.to_string().contains("expected 3"), "{err}");
    }

    #[test]
    fn test_zero_face_index_fails() {
        assert!(parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").is_err());
    }

    #[test]
    fn test_face_out_of_range_fails() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_write_applies_transform_and_one_based_faces() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Vec::new(),
        )
        .unwrap()
        .with_colors(vec![[0.5, 0.25, 1.0]; 3])
        .unwrap();
        let transform = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));

        let mut out = Vec::new();
        write_basic_obj(&mesh, &transform, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "v 1 2 3 0.5 0.25 1");
        assert_eq!(lines[1], "v 2 2 3 0.5 0.25 1");
        assert_eq!(lines[3], "f 1 2 3");
    }

    #[test]
    fn test_write_without_colors() {
        let mesh = TriangleMesh::from_vertices_and_faces(vec![[1.5, 0.0, -2.0]; 3], Vec::new()).unwrap();
        let mut out = Vec::new();
        write_basic_obj(&mesh, &Matrix4::identity(), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("v 1.5 0 -2\n"));
    }
}
