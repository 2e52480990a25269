//! Vertex array and buffer handles owned by one scene object

use crate::context::{RenderContext, VertexAttribute};
use crate::handle::{BufferId, GpuResource, ResourceOwner, VertexArrayId};
use meshscope_core::Result;

/// Handles created by one `update` of a mesh or point cloud
#[derive(Debug)]
pub(crate) struct DrawBuffers {
    owner: ResourceOwner,
    pub vao: VertexArrayId,
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<BufferId>,
    /// Elements drawn: indices when indexed, vertices otherwise
    pub count: usize,
}

impl DrawBuffers {
    pub fn create<C: RenderContext + ?Sized>(ctx: &mut C, indexed: bool) -> Result<Self> {
        let vao = ctx.create_vertex_array()?;
        let vertex_buffer = match ctx.create_buffer() {
            Ok(id) => id,
            Err(err) => {
                ctx.delete_vertex_array(vao);
                return Err(err);
            }
        };
        let index_buffer = if indexed {
            match ctx.create_buffer() {
                Ok(id) => Some(id),
                Err(err) => {
                    ctx.delete_buffer(vertex_buffer);
                    ctx.delete_vertex_array(vao);
                    return Err(err);
                }
            }
        } else {
            None
        };
        log::debug!(
            "created vertex array {} (vertex buffer {}, index buffer {:?})",
            vao.raw(),
            vertex_buffer.raw(),
            index_buffer.map(BufferId::raw)
        );
        Ok(Self {
            owner: ResourceOwner::of(ctx),
            vao,
            vertex_buffer,
            index_buffer,
            count: 0,
        })
    }

    pub fn belongs_to<C: RenderContext + ?Sized>(&self, ctx: &C) -> bool {
        self.owner.context == ctx.context_id()
    }

    /// Attach the interleaved layout to the vertex array
    pub fn describe<C: RenderContext + ?Sized>(&self, ctx: &mut C, attributes: &[VertexAttribute]) -> Result<()> {
        for attribute in attributes {
            ctx.vertex_attribute(self.vao, *attribute)?;
        }
        Ok(())
    }

    fn resources(&self) -> Vec<GpuResource> {
        let mut resources = vec![GpuResource::VertexArray(self.vao), GpuResource::Buffer(self.vertex_buffer)];
        resources.extend(self.index_buffer.map(GpuResource::Buffer));
        resources
    }

    /// Delete now if `ctx` owns the handles, otherwise queue them
    pub fn release<C: RenderContext + ?Sized>(self, ctx: &mut C) {
        self.owner.release(ctx, self.resources());
    }

    /// Queue the handles for their owning context
    pub fn defer(self) {
        self.owner.defer(self.resources());
    }
}
