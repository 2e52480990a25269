//! Viewer Demo
//!
//! Builds a small scene showing each kind of object the viewer draws:
//! - A line and the axes overlay
//! - A cube with generated diffuse and specular textures
//! - A flat colored sphere
//! - A random point cloud
//! - Pyramids with a single color, per-vertex colors and uv-mapped textures
//!
//! Press D to move the textured pyramid, E to lift one of its corners.

use anyhow::Result;
use meshscope_core::{Matrix3, Row3, Transformable, Triangle, Uv, Vector3};
use meshscope_gpu::{Image, Mesh, PointCloud, Texture, TextureKind};
use meshscope_viewer::{Action, Key, Viewer};
use nalgebra::Rotation3;
use rand::Rng;
use std::cell::Cell;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

const PYRAMID: [Row3; 18] = [
    [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0], [0.0, 0.0, 1.0], [-1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0], [0.0, 0.0, 1.0], [1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0], [0.0, 0.0, 1.0], [1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0], [0.0, 0.0, 1.0], [-1.0, -1.0, -1.0],
];

const PYRAMID_COLORS: [Row3; 18] = [
    [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0],
    [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0],
    [1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0],
];

// Demonstration coordinates, not a real unwrap
const PYRAMID_UVS: [Uv; 18] = [
    [0.0, 0.0], [0.0, 1.0], [1.0, 0.0],
    [0.0, 1.0], [1.0, 1.0], [1.0, 0.0],
    [0.0, 0.0], [0.5, 0.5], [0.0, 1.0],
    [0.0, 1.0], [0.5, 0.5], [1.0, 1.0],
    [1.0, 1.0], [0.5, 0.5], [1.0, 0.0],
    [1.0, 0.0], [0.5, 0.5], [0.0, 0.0],
];

/// Vertex lifted by the E key
const LIFTED_VERTEX: usize = 4;

/// Red-green gradient down the rows for diffuse, a ramp across columns for specular
fn generated_textures() -> Result<(Image, Image)> {
    let size = 256;
    let mut diffuse = Vec::with_capacity(size * size * 3);
    let mut specular = Vec::with_capacity(size * size * 3);
    for i in 0..size {
        for j in 0..size {
            let t = i as f32 / 255.0;
            diffuse.extend_from_slice(&[t, 1.0 - t, 0.5]);
            let s = 1.0 - (j as f32 - 128.0) / 128.0;
            specular.extend_from_slice(&[s, s, s]);
        }
    }
    Ok((
        Image::new(size as u32, size as u32, 3, diffuse)?,
        Image::new(size as u32, size as u32, 3, specular)?,
    ))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("meshscope Viewer Demo");
    println!("=====================");

    let mut viewer = Viewer::new();
    viewer.config.draw_axes = true;
    viewer.camera.dist_to_center = 5.0;

    viewer.add_line([-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]);

    let (diffuse, specular) = generated_textures()?;
    let mut cube = Mesh::cube()?;
    cube.translate(&Vector3::new(-2.0, 0.0, 0.0))
        .add_texture(TextureKind::Diffuse, Texture::from_image(diffuse.clone()))
        .add_texture(TextureKind::Specular, Texture::from_image(specular.clone()));
    viewer.add_mesh(cube);

    viewer
        .add_sphere([0.0; 3], 0.5, [1.0, 0.5, 0.0], 30, 30)?
        .translate(&Vector3::new(2.0, 0.0, 0.0))
        .set_shininess(32.0);

    let mut rng = rand::thread_rng();
    let random: Vec<Row3> = (0..150)
        .map(|_| [rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)])
        .collect();
    let rotation: Matrix3<f32> = Rotation3::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2).into_inner();
    viewer
        .add_point_cloud(PointCloud::with_uniform_color(&random, [0.0, 1.0, 1.0])?)
        .rotate(&rotation)
        .scale_uniform(1.5);

    // Empty face lists mean consecutive vertex triples
    viewer
        .add_mesh(Mesh::with_uniform_color(&PYRAMID, &[], [0.0, 1.0, 1.0], None)?)
        .translate(&Vector3::new(0.0, 0.0, 3.0))
        .set_shininess(32.0);

    viewer
        .add_mesh(Mesh::from_tables(&PYRAMID, &[], Some(&PYRAMID_COLORS), None)?)
        .set_shininess(32.0)
        .translate(&Vector3::new(3.0, 3.0, 0.0));

    let uv_faces: Vec<Triangle> = (0..6u32).map(|f| [3 * f, 3 * f + 1, 3 * f + 2]).collect();
    let mut textured = Mesh::from_tables(&PYRAMID, &[], None, None)?;
    textured
        .set_tex_coords(&PYRAMID_UVS, &uv_faces)?
        .translate(&Vector3::new(-3.0, 3.0, 0.0))
        .add_texture(TextureKind::Diffuse, Texture::from_image(diffuse))
        .add_texture(TextureKind::Specular, Texture::from_image(specular));
    viewer.add_mesh(textured);
    let textured_index = viewer.meshes.len() - 1;

    let changed = Rc::new(Cell::new(false));
    let flag = changed.clone();
    viewer.callbacks.on_key = Some(Box::new(move |viewer, key, action, _mods| {
        if action != Action::Release {
            let pyramid = &mut viewer.meshes[textured_index];
            match key {
                Key::Character('d') => {
                    pyramid.translate(&Vector3::new(0.05, 0.0, 0.0));
                }
                Key::Character('e') => {
                    pyramid.vertices[LIFTED_VERTEX].position[2] += 0.1;
                    flag.set(true);
                }
                _ => {}
            }
        }
        true
    }));
    viewer.callbacks.on_loop = Some(Box::new(move |_| changed.replace(false)));

    println!("Controls:");
    println!("  Left drag: rotate (shift: pan, ctrl: roll)");
    println!("  Middle/right drag: pan");
    println!("  Scroll: zoom");
    println!("  A: axes  W: wireframe  C: culling  O: orthographic");
    println!("  Z: reset view  F: fullscreen  Q/Esc: quit");
    println!("  D: move the textured pyramid  E: lift a corner");

    viewer.show()?;
    Ok(())
}
