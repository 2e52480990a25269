//! Rendering context interface
//!
//! Scene objects never talk to a graphics API directly. They receive a
//! [`RenderContext`] in `update`, `draw`, `load` and `free`, which lets the
//! same object code run against the wgpu backend or the recording
//! [`HeadlessContext`](crate::HeadlessContext).

use crate::handle::{BufferId, ContextId, GpuResource, ReleaseQueue, ShaderId, TextureId, VertexArrayId};
use crate::texture::Image;
use meshscope_core::{normal_matrix, Matrix2, Matrix3, Matrix4, Result, Vector2, Vector3, Vector4, ViewProjection};

/// A value for a named shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vector2<f32>),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Mat2(Matrix2<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
}

macro_rules! uniform_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for UniformValue {
            fn from(value: $ty) -> Self {
                UniformValue::$variant(value)
            }
        })*
    };
}

uniform_from! {
    i32 => Int,
    f32 => Float,
    Vector2<f32> => Vec2,
    Vector3<f32> => Vec3,
    Vector4<f32> => Vec4,
    Matrix2<f32> => Mat2,
    Matrix3<f32> => Mat3,
    Matrix4<f32> => Mat4,
}

/// Named uniform binding for shader programs
pub trait ShaderUniforms {
    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue);

    fn set_int(&mut self, shader: ShaderId, name: &str, value: i32) {
        self.set_uniform(shader, name, UniformValue::Int(value));
    }

    fn set_float(&mut self, shader: ShaderId, name: &str, value: f32) {
        self.set_uniform(shader, name, UniformValue::Float(value));
    }

    fn set_vec3(&mut self, shader: ShaderId, name: &str, value: Vector3<f32>) {
        self.set_uniform(shader, name, UniformValue::Vec3(value));
    }

    fn set_mat3(&mut self, shader: ShaderId, name: &str, value: Matrix3<f32>) {
        self.set_uniform(shader, name, UniformValue::Mat3(value));
    }

    fn set_mat4(&mut self, shader: ShaderId, name: &str, value: Matrix4<f32>) {
        self.set_uniform(shader, name, UniformValue::Mat4(value));
    }
}

/// Primitive assembly for a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Points,
    Lines,
}

/// One float vertex attribute inside an interleaved vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    /// Number of `f32` components
    pub components: u32,
    /// Byte stride between records
    pub stride: usize,
    /// Byte offset inside a record
    pub offset: usize,
}

/// Rasterizer switches toggled from the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterState {
    pub wireframe: bool,
    pub cull_face: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            wireframe: false,
            cull_face: true,
        }
    }
}

/// Operations a graphics backend provides to scene objects.
///
/// Creation and uploads report failures as [`meshscope_core::Error::Gpu`].
/// Deleting an id that is not live is ignored by every implementation.
pub trait RenderContext: ShaderUniforms {
    /// Whether this context may be used for GPU work right now
    fn is_current(&self) -> bool;

    fn context_id(&self) -> ContextId;

    /// Queue shared with objects holding handles from this context
    fn release_queue(&self) -> &ReleaseQueue;

    fn create_vertex_array(&mut self) -> Result<VertexArrayId>;
    fn create_buffer(&mut self) -> Result<BufferId>;
    fn create_texture(&mut self) -> Result<TextureId>;

    fn delete_vertex_array(&mut self, id: VertexArrayId);
    fn delete_buffer(&mut self, id: BufferId);
    fn delete_texture(&mut self, id: TextureId);

    /// Fill `buffer` with interleaved vertex records and attach it to `vao`
    fn upload_vertex_data(&mut self, vao: VertexArrayId, buffer: BufferId, data: &[u8]) -> Result<()>;

    /// Fill `buffer` with triangle indices and attach it to `vao`
    fn upload_index_data(&mut self, vao: VertexArrayId, buffer: BufferId, indices: &[u32]) -> Result<()>;

    /// Describe one attribute of the vertex buffer attached to `vao`
    fn vertex_attribute(&mut self, vao: VertexArrayId, attribute: VertexAttribute) -> Result<()>;

    fn upload_texture(&mut self, id: TextureId, image: &Image) -> Result<()>;

    /// Bind `id` to sampler unit `unit` for subsequent draws
    fn bind_texture(&mut self, unit: u32, id: TextureId);

    fn set_point_size(&mut self, size: f32);

    fn set_raster_state(&mut self, state: RasterState);

    fn clear(&mut self, color: [f32; 4]);

    /// Indexed draw of `count` indices from the index buffer of `vao`
    fn draw_elements(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize);

    /// Non-indexed draw of the first `count` vertices of `vao`
    fn draw_arrays(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize);

    fn release(&mut self, resource: GpuResource) {
        match resource {
            GpuResource::VertexArray(id) => self.delete_vertex_array(id),
            GpuResource::Buffer(id) => self.delete_buffer(id),
            GpuResource::Texture(id) => self.delete_texture(id),
        }
    }

    /// Delete everything dropped objects queued for this context.
    ///
    /// Returns the number of resources released.
    fn collect_released(&mut self) -> usize {
        let pending = self.release_queue().drain();
        let count = pending.len();
        for resource in pending {
            self.release(resource);
        }
        if count > 0 {
            log::trace!("released {} queued GPU resources", count);
        }
        count
    }
}

/// Set `M`, `MVP` and `NormalMatrix` for an object with local transform `model`
pub fn set_transform_uniforms<C, V>(ctx: &mut C, shader: ShaderId, camera: &V, model: &Matrix4<f32>)
where
    C: ShaderUniforms + ?Sized,
    V: ViewProjection + ?Sized,
{
    ctx.set_mat4(shader, "M", *model);
    ctx.set_mat4(shader, "MVP", camera.view_projection() * model);
    ctx.set_mat3(shader, "NormalMatrix", normal_matrix(model));
}
