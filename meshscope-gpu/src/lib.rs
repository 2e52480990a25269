//! # meshscope GPU
//!
//! Renderable scene objects and the rendering backends that draw them.
//!
//! [`Mesh`] and [`PointCloud`] keep their data on the CPU and mirror it into
//! GPU buffers on `update`. They never call a graphics API directly: every
//! operation goes through a [`RenderContext`], implemented by the wgpu
//! backend ([`WgpuContext`]) and by the recording [`HeadlessContext`].
//!
//! ## Example Usage
//!
//! ```rust
//! use meshscope_gpu::{HeadlessContext, Mesh, ShaderSet};
//! use meshscope_core::CameraMatrices;
//!
//! # fn main() -> meshscope_core::Result<()> {
//! let mut ctx = HeadlessContext::new();
//! let shaders = ShaderSet::builtin();
//!
//! let mut cube = Mesh::cube()?;
//! cube.update(&mut ctx, false)?;
//! cube.draw(&mut ctx, shaders.for_mesh(cube.shading()), &CameraMatrices::default())?;
//! assert_eq!(ctx.draw_call_count(), 1);
//! # Ok(())
//! # }
//! ```

mod buffers;
pub mod context;
pub mod device;
pub mod handle;
pub mod headless;
pub mod mesh;
pub mod point_cloud;
pub mod primitives;
pub mod shaders;
pub mod texture;
pub mod wgpu_context;

// Re-export commonly used items
pub use context::{set_transform_uniforms, Primitive, RasterState, RenderContext, ShaderUniforms, UniformValue, VertexAttribute};
pub use device::GpuContext;
pub use handle::{BufferId, ContextId, GpuResource, ReleaseQueue, ShaderId, TextureId, VertexArrayId};
pub use headless::{GpuCall, HeadlessContext};
pub use mesh::{Mesh, DEFAULT_SHININESS, MESH_ATTRIBUTES};
pub use point_cloud::{PointCloud, POINT_ATTRIBUTES};
pub use shaders::{ObjectUniforms, Program, ShaderSet};
pub use texture::{Image, Texture, TextureKind, TextureSet, BLANK_GREY, PINK};
pub use wgpu_context::WgpuContext;
