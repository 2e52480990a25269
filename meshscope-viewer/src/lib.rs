//! Interactive viewing of meshes and point clouds
//!
//! This crate puts meshscope scenes on screen using wgpu and winit:
//! - [`Viewer`]: scene, per-frame rendering and input handling
//! - [`Camera`]: orbit camera with mouse controls
//! - [`window::show`]: native window runner
//!
//! Default controls: left drag rotates (shift pans, ctrl rolls), middle or
//! right drag pans, scroll zooms. Keys: `q`/Esc quit, `a` axes, `w`
//! wireframe, `c` face culling, `o` orthographic, `z` reset view,
//! `f` fullscreen.

pub mod camera;
pub mod config;
pub mod input;
pub mod viewer;
pub mod window;

pub use camera::Camera;
pub use config::{Lighting, ViewerConfig};
pub use input::{Action, InputEvent, Key, Modifiers, MouseButton};
pub use viewer::{Callbacks, Viewer};
pub use window::show;

use meshscope_core::Result;
use meshscope_gpu::{Mesh, PointCloud};

/// Show a single mesh in an interactive viewer
pub fn show_mesh(mesh: Mesh) -> Result<()> {
    let mut viewer = Viewer::new();
    viewer.add_mesh(mesh);
    viewer.show()
}

/// Show a single point cloud in an interactive viewer
pub fn show_point_cloud(cloud: PointCloud) -> Result<()> {
    let mut viewer = Viewer::new();
    viewer.add_point_cloud(cloud);
    viewer.show()
}
