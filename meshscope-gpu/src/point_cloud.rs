//! Renderable point clouds and polylines

use crate::buffers::DrawBuffers;
use crate::context::{set_transform_uniforms, Primitive, RenderContext, VertexAttribute};
use crate::handle::ShaderId;
use meshscope_core::{ensure, ensure_eq, Matrix4, PointVertex, Result, Row3, Transformable, ViewProjection};

/// Layout of [`PointVertex`] records as seen by the vertex shader
pub const POINT_ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute {
        location: 0,
        components: 3,
        stride: PointVertex::STRIDE,
        offset: PointVertex::POSITION_OFFSET,
    },
    VertexAttribute {
        location: 1,
        components: 3,
        stride: PointVertex::STRIDE,
        offset: PointVertex::COLOR_OFFSET,
    },
];

/// Colored points, drawn as points or as a line list
#[derive(Debug)]
pub struct PointCloud {
    pub points: Vec<PointVertex>,
    pub transform: Matrix4<f32>,
    pub enabled: bool,
    /// Rasterized point size in pixels
    pub point_size: f32,
    /// Draw consecutive pairs as line segments instead of points
    pub lines: bool,
    buffers: Option<DrawBuffers>,
}

impl PointCloud {
    /// `num_points` zeroed points
    pub fn new(num_points: usize) -> Self {
        Self {
            points: vec![PointVertex::default(); num_points],
            transform: Matrix4::identity(),
            enabled: true,
            point_size: 1.0,
            lines: false,
            buffers: None,
        }
    }

    /// Points at `positions`, colored by `colors` or white
    pub fn from_positions(positions: &[Row3], colors: Option<&[Row3]>) -> Result<Self> {
        let mut cloud = Self::new(0);
        match colors {
            Some(colors) => {
                ensure_eq!(colors.len(), positions.len());
                cloud.points = positions
                    .iter()
                    .zip(colors)
                    .map(|(p, c)| PointVertex::new(*p, *c))
                    .collect();
            }
            None => {
                cloud.points = positions.iter().map(|p| PointVertex::new(*p, [1.0; 3])).collect();
            }
        }
        Ok(cloud)
    }

    pub fn with_uniform_color(positions: &[Row3], color: Row3) -> Result<Self> {
        ensure!(!positions.is_empty(), "a uniformly colored point cloud needs points");
        let mut cloud = Self::new(0);
        cloud.points = positions.iter().map(|p| PointVertex::new(*p, color)).collect();
        Ok(cloud)
    }

    /// Discard the points, allocate `num_points` zeroed ones and reset the transform
    pub fn resize(&mut self, num_points: usize) -> &mut Self {
        self.points = vec![PointVertex::default(); num_points];
        self.transform = Matrix4::identity();
        self
    }

    pub fn set_point_size(&mut self, size: f32) -> &mut Self {
        self.point_size = size;
        self
    }

    /// Draw pairs of points as segments
    pub fn draw_lines(&mut self) -> &mut Self {
        self.lines = true;
        self
    }

    pub fn draw_points(&mut self) -> &mut Self {
        self.lines = false;
        self
    }

    pub fn enable(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    /// Mirror the points into GPU buffers; a no-op without a current context
    pub fn update<C: RenderContext + ?Sized>(&mut self, ctx: &mut C, force_init: bool) -> Result<()> {
        if !ctx.is_current() {
            return Ok(());
        }
        let reuse = !force_init && self.buffers.as_ref().is_some_and(|b| b.belongs_to(ctx));
        if !reuse {
            if let Some(old) = self.buffers.take() {
                old.release(ctx);
            }
            self.buffers = Some(DrawBuffers::create(ctx, false)?);
        }
        let Some(buffers) = self.buffers.as_mut() else {
            return Ok(());
        };
        ctx.upload_vertex_data(buffers.vao, buffers.vertex_buffer, bytemuck::cast_slice(&self.points))?;
        buffers.describe(ctx, &POINT_ATTRIBUTES)?;
        buffers.count = self.points.len();
        Ok(())
    }

    /// Issue the draw with `shader`; disabled and empty clouds draw nothing
    pub fn draw<C, V>(&self, ctx: &mut C, shader: ShaderId, camera: &V) -> Result<()>
    where
        C: RenderContext + ?Sized,
        V: ViewProjection + ?Sized,
    {
        if !self.enabled || self.points.is_empty() {
            return Ok(());
        }
        let Some(buffers) = self.buffers.as_ref() else {
            log::error!("PointCloud::draw called before PointCloud::update, skipping");
            return Ok(());
        };
        ctx.set_point_size(self.point_size);
        set_transform_uniforms(ctx, shader, camera, &self.transform);
        let primitive = if self.lines { Primitive::Lines } else { Primitive::Points };
        ctx.draw_arrays(shader, buffers.vao, primitive, buffers.count);
        Ok(())
    }

    pub fn free<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) {
        if let Some(buffers) = self.buffers.take() {
            buffers.release(ctx);
        }
    }
}

impl Transformable for PointCloud {
    fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Matrix4<f32> {
        &mut self.transform
    }
}

impl Drop for PointCloud {
    fn drop(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            buffers.defer();
        }
    }
}
