//! Recording rendering context without a GPU
//!
//! `HeadlessContext` implements [`RenderContext`] by validating handles and
//! appending every call to a log. Tests use it to check what scene objects
//! ask of the GPU, and tools use it to exercise scenes without a window.

use crate::context::{Primitive, RasterState, RenderContext, ShaderUniforms, UniformValue, VertexAttribute};
use crate::handle::{BufferId, ContextId, GpuResource, ReleaseQueue, ShaderId, TextureId, VertexArrayId};
use crate::texture::Image;
use meshscope_core::{Error, Result};
use std::collections::{HashMap, HashSet};

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    Create(GpuResource),
    Delete(GpuResource),
    UploadVertexData { vao: VertexArrayId, buffer: BufferId, bytes: usize },
    UploadIndexData { vao: VertexArrayId, buffer: BufferId, indices: usize },
    VertexAttribute { vao: VertexArrayId, attribute: VertexAttribute },
    UploadTexture { texture: TextureId, width: u32, height: u32, channels: u8 },
    BindTexture { unit: u32, texture: TextureId },
    SetPointSize(f32),
    SetRasterState(RasterState),
    Clear([f32; 4]),
    DrawElements { shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize },
    DrawArrays { shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize },
}

impl GpuCall {
    pub fn is_draw(&self) -> bool {
        matches!(self, GpuCall::DrawElements { .. } | GpuCall::DrawArrays { .. })
    }
}

/// Rendering context that records instead of rendering
#[derive(Debug)]
pub struct HeadlessContext {
    id: ContextId,
    current: bool,
    next_raw: u32,
    queue: ReleaseQueue,
    live: HashSet<GpuResource>,
    calls: Vec<GpuCall>,
    double_releases: usize,
    uniforms: HashMap<(ShaderId, String), UniformValue>,
    vertex_data: HashMap<BufferId, Vec<u8>>,
    index_data: HashMap<BufferId, Vec<u32>>,
    textures: HashMap<TextureId, Image>,
    bound: HashMap<u32, TextureId>,
}

impl HeadlessContext {
    /// A current context with no resources
    pub fn new() -> Self {
        Self {
            id: ContextId::next(),
            current: true,
            next_raw: 0,
            queue: ReleaseQueue::new(),
            live: HashSet::new(),
            calls: Vec::new(),
            double_releases: 0,
            uniforms: HashMap::new(),
            vertex_data: HashMap::new(),
            index_data: HashMap::new(),
            textures: HashMap::new(),
            bound: HashMap::new(),
        }
    }

    /// A context that reports not being current, so updates skip GPU work
    pub fn detached() -> Self {
        Self {
            current: false,
            ..Self::new()
        }
    }

    pub fn make_current(&mut self, current: bool) {
        self.current = current;
    }

    /// Every call recorded so far
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &GpuCall> {
        self.calls.iter().filter(|c| c.is_draw())
    }

    pub fn draw_call_count(&self) -> usize {
        self.draw_calls().count()
    }

    pub fn live_resource_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, resource: GpuResource) -> bool {
        self.live.contains(&resource)
    }

    /// Deletes of ids that were not live
    pub fn double_release_count(&self) -> usize {
        self.double_releases
    }

    pub fn uniform(&self, shader: ShaderId, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(&(shader, name.to_string()))
    }

    pub fn vertex_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.vertex_data.get(&buffer).map(Vec::as_slice)
    }

    pub fn index_data(&self, buffer: BufferId) -> Option<&[u32]> {
        self.index_data.get(&buffer).map(Vec::as_slice)
    }

    pub fn texture_image(&self, texture: TextureId) -> Option<&Image> {
        self.textures.get(&texture)
    }

    /// Texture bound to `unit` by the latest bind
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.bound.get(&unit).copied()
    }

    fn allocate(&mut self) -> Result<u32> {
        if !self.current {
            return Err(Error::Gpu("context is not current".to_string()));
        }
        let raw = self.next_raw;
        self.next_raw = self
            .next_raw
            .checked_add(1)
            .ok_or_else(|| Error::Gpu("out of handle ids".to_string()))?;
        Ok(raw)
    }

    fn register(&mut self, resource: GpuResource) {
        self.live.insert(resource);
        self.calls.push(GpuCall::Create(resource));
    }

    fn remove(&mut self, resource: GpuResource) {
        if self.live.remove(&resource) {
            self.calls.push(GpuCall::Delete(resource));
            match resource {
                GpuResource::Buffer(id) => {
                    self.vertex_data.remove(&id);
                    self.index_data.remove(&id);
                }
                GpuResource::Texture(id) => {
                    self.textures.remove(&id);
                    self.bound.retain(|_, bound| *bound != id);
                }
                GpuResource::VertexArray(_) => {}
            }
        } else {
            log::warn!("release of {:?}, which is not live", resource);
            self.double_releases += 1;
        }
    }

    fn check_live(&self, resource: GpuResource) -> Result<()> {
        if self.live.contains(&resource) {
            Ok(())
        } else {
            Err(Error::Gpu(format!("{:?} is not a live resource", resource)))
        }
    }
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderUniforms for HeadlessContext {
    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) {
        self.uniforms.insert((shader, name.to_string()), value);
    }
}

impl RenderContext for HeadlessContext {
    fn is_current(&self) -> bool {
        self.current
    }

    fn context_id(&self) -> ContextId {
        self.id
    }

    fn release_queue(&self) -> &ReleaseQueue {
        &self.queue
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId> {
        let raw = self.allocate()?;
        let id = VertexArrayId::from_raw(raw).ok_or_else(|| Error::Gpu("invalid id".to_string()))?;
        self.register(GpuResource::VertexArray(id));
        Ok(id)
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        let raw = self.allocate()?;
        let id = BufferId::from_raw(raw).ok_or_else(|| Error::Gpu("invalid id".to_string()))?;
        self.register(GpuResource::Buffer(id));
        Ok(id)
    }

    fn create_texture(&mut self) -> Result<TextureId> {
        let raw = self.allocate()?;
        let id = TextureId::from_raw(raw).ok_or_else(|| Error::Gpu("invalid id".to_string()))?;
        self.register(GpuResource::Texture(id));
        Ok(id)
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) {
        self.remove(GpuResource::VertexArray(id));
    }

    fn delete_buffer(&mut self, id: BufferId) {
        self.remove(GpuResource::Buffer(id));
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.remove(GpuResource::Texture(id));
    }

    fn upload_vertex_data(&mut self, vao: VertexArrayId, buffer: BufferId, data: &[u8]) -> Result<()> {
        self.check_live(GpuResource::VertexArray(vao))?;
        self.check_live(GpuResource::Buffer(buffer))?;
        self.vertex_data.insert(buffer, data.to_vec());
        self.calls.push(GpuCall::UploadVertexData { vao, buffer, bytes: data.len() });
        Ok(())
    }

    fn upload_index_data(&mut self, vao: VertexArrayId, buffer: BufferId, indices: &[u32]) -> Result<()> {
        self.check_live(GpuResource::VertexArray(vao))?;
        self.check_live(GpuResource::Buffer(buffer))?;
        self.index_data.insert(buffer, indices.to_vec());
        self.calls.push(GpuCall::UploadIndexData { vao, buffer, indices: indices.len() });
        Ok(())
    }

    fn vertex_attribute(&mut self, vao: VertexArrayId, attribute: VertexAttribute) -> Result<()> {
        self.check_live(GpuResource::VertexArray(vao))?;
        self.calls.push(GpuCall::VertexAttribute { vao, attribute });
        Ok(())
    }

    fn upload_texture(&mut self, id: TextureId, image: &Image) -> Result<()> {
        self.check_live(GpuResource::Texture(id))?;
        self.calls.push(GpuCall::UploadTexture {
            texture: id,
            width: image.width,
            height: image.height,
            channels: image.channels,
        });
        self.textures.insert(id, image.clone());
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, id: TextureId) {
        self.bound.insert(unit, id);
        self.calls.push(GpuCall::BindTexture { unit, texture: id });
    }

    fn set_point_size(&mut self, size: f32) {
        self.calls.push(GpuCall::SetPointSize(size));
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.calls.push(GpuCall::SetRasterState(state));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(GpuCall::Clear(color));
    }

    fn draw_elements(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize) {
        self.calls.push(GpuCall::DrawElements { shader, vao, primitive, count });
    }

    fn draw_arrays(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize) {
        self.calls.push(GpuCall::DrawArrays { shader, vao, primitive, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_delete_tracks_live_set() {
        let mut ctx = HeadlessContext::new();
        let vao = ctx.create_vertex_array().unwrap();
        let buf = ctx.create_buffer().unwrap();
        assert_eq!(ctx.live_resource_count(), 2);

        ctx.delete_buffer(buf);
        ctx.delete_vertex_array(vao);
        assert_eq!(ctx.live_resource_count(), 0);

        ctx.delete_buffer(buf);
        assert_eq!(ctx.double_release_count(), 1);
    }

    #[test]
    fn test_detached_context_refuses_allocation() {
        let mut ctx = HeadlessContext::detached();
        assert!(!ctx.is_current());
        assert!(ctx.create_buffer().is_err());
        ctx.make_current(true);
        assert!(ctx.create_buffer().is_ok());
    }

    #[test]
    fn test_upload_requires_live_handles() {
        let mut ctx = HeadlessContext::new();
        let vao = ctx.create_vertex_array().unwrap();
        let buf = ctx.create_buffer().unwrap();
        ctx.upload_index_data(vao, buf, &[0, 1, 2]).unwrap();
        assert_eq!(ctx.index_data(buf), Some(&[0, 1, 2][..]));

        ctx.delete_buffer(buf);
        assert!(ctx.upload_index_data(vao, buf, &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_uniforms_keep_latest_value() {
        let mut ctx = HeadlessContext::new();
        let shader = ShaderId::from_raw(0).unwrap();
        ctx.set_float(shader, "material.shininess", 4.0);
        ctx.set_float(shader, "material.shininess", 10.0);
        assert_eq!(ctx.uniform(shader, "material.shininess"), Some(&UniformValue::Float(10.0)));
    }

    #[test]
    fn test_collect_released_drains_queue() {
        let mut ctx = HeadlessContext::new();
        let tex = ctx.create_texture().unwrap();
        ctx.release_queue().push(GpuResource::Texture(tex));
        assert_eq!(ctx.collect_released(), 1);
        assert!(!ctx.is_live(GpuResource::Texture(tex)));
        assert_eq!(ctx.collect_released(), 0);
    }
}
