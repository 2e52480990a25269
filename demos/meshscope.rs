//! Open a mesh file in the viewer
//!
//! Reads the basic OBJ text format (`v x y z [r g b]` and `f i j k` lines),
//! optionally writes it back out, and shows it.

use anyhow::{Context, Result};
use clap::Parser;
use meshscope_core::TriangleMesh;
use meshscope_gpu::Mesh;
use meshscope_io::{BasicObjReader, MeshReader};
use meshscope_viewer::{Camera, Viewer, ViewerConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meshscope", version, about = "View a mesh in the basic OBJ text format")]
struct Args {
    /// Mesh file to open
    path: PathBuf,

    /// Write the loaded mesh to this path before opening the viewer
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Only load (and save), do not open a window
    #[arg(long)]
    no_window: bool,

    /// Window title; defaults to the file name
    #[arg(long)]
    title: Option<String>,

    /// Start in wireframe mode
    #[arg(long)]
    wireframe: bool,

    /// Background color as three values in 0..=1
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"])]
    background: Option<Vec<f32>>,

    /// Hide the axes overlay
    #[arg(long)]
    no_axes: bool,
}

/// Orbit around the center of the mesh bounds, far enough back to see all of it
fn frame_camera(camera: &mut Camera, tables: &TriangleMesh) {
    let (min, max) = tables.bounding_box();
    let radius = (max - min).norm() * 0.5;
    camera.center_of_rot = tables.center().coords;
    if radius > 0.0 {
        camera.dist_to_center = radius / (camera.fovy * 0.5).sin();
    }
}

fn run(args: Args) -> Result<()> {
    let tables = BasicObjReader::read_mesh(&args.path)
        .with_context(|| format!("Failed to load {}", args.path.display()))?;
    let mesh = Mesh::from_triangle_mesh(&tables)?;
    log::info!(
        "loaded {} vertices and {} faces from {}",
        mesh.vertices.len(),
        mesh.faces.len(),
        args.path.display()
    );

    if let Some(save) = &args.save {
        mesh.save_basic_obj(save)
            .with_context(|| format!("Failed to save {}", save.display()))?;
        log::info!("saved {}", save.display());
    }
    if args.no_window {
        return Ok(());
    }

    let mut config = ViewerConfig {
        wireframe: args.wireframe,
        draw_axes: !args.no_axes,
        ..ViewerConfig::default()
    };
    config.title = match args.title {
        Some(title) => title,
        None => args
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(config.title),
    };
    if let Some([r, g, b]) = args.background.as_deref() {
        config.background = [*r, *g, *b];
    }

    let mut viewer = Viewer::with_config(config);
    frame_camera(&mut viewer.camera, &tables);
    viewer.add_mesh(mesh);
    viewer.show()?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshscope_core::Vector3;

    #[test]
    fn test_camera_frames_mesh_bounds() {
        let tables = TriangleMesh::from_vertices_and_faces(
            vec![[1.0, 1.0, 1.0], [3.0, 1.0, 1.0], [1.0, 3.0, 1.0]],
            Vec::new(),
        )
        .unwrap();
        let mut camera = Camera::default();
        frame_camera(&mut camera, &tables);
        assert_relative_eq!(camera.center_of_rot, Vector3::new(2.0, 2.0, 1.0));
        assert!(camera.dist_to_center > 2.0_f32.sqrt());
    }

    #[test]
    fn test_single_point_keeps_distance() {
        let tables = TriangleMesh::from_vertices_and_faces(vec![[0.5; 3]; 3], Vec::new()).unwrap();
        let mut camera = Camera::default();
        frame_camera(&mut camera, &tables);
        assert_eq!(camera.dist_to_center, 3.0);
    }
}
