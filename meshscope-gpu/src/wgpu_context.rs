//! wgpu implementation of [`RenderContext`]
//!
//! Objects talk to the context in immediate-mode terms: bind, set uniforms,
//! draw. `WgpuContext` records each draw together with a snapshot of the
//! uniforms and texture bindings it saw, then replays the whole frame in one
//! render pass in [`WgpuContext::submit_frame`]. Pipelines are built lazily
//! and cached per program, topology, raster state and vertex layout.

use crate::context::{Primitive, RasterState, RenderContext, ShaderUniforms, UniformValue, VertexAttribute};
use crate::device::GpuContext;
use crate::handle::{BufferId, ContextId, ReleaseQueue, ShaderId, TextureId, VertexArrayId};
use crate::shaders::{gl_to_wgpu_clip, ObjectUniforms, Program, DEPTH_FORMAT, FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::texture::{Image, TextureKind};
use meshscope_core::{Error, Matrix4, Result};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct VertexArray {
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    attributes: Vec<VertexAttribute>,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct DrawCommand {
    program: Program,
    vao: VertexArrayId,
    primitive: Primitive,
    count: u32,
    indexed: bool,
    uniforms: ObjectUniforms,
    diffuse: Option<TextureId>,
    specular: Option<TextureId>,
    raster: RasterState,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: Program,
    primitive: Primitive,
    raster: RasterState,
    attributes: Vec<VertexAttribute>,
}

struct PreparedDraw {
    key: PipelineKey,
    _uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: BufferId,
    index_buffer: Option<BufferId>,
    count: u32,
}

/// Rendering context backed by a wgpu device
pub struct WgpuContext {
    gpu: GpuContext,
    id: ContextId,
    release: ReleaseQueue,
    color_format: wgpu::TextureFormat,
    next_raw: u32,
    vertex_arrays: HashMap<VertexArrayId, VertexArray>,
    buffers: HashMap<BufferId, Option<wgpu::Buffer>>,
    textures: HashMap<TextureId, Option<GpuTexture>>,
    uniforms: HashMap<Program, ObjectUniforms>,
    sampler_units: HashMap<(Program, TextureKind), u32>,
    bound: HashMap<u32, TextureId>,
    raster: RasterState,
    clear_color: [f32; 4],
    commands: Vec<DrawCommand>,
    modules: HashMap<Program, wgpu::ShaderModule>,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    sampler: wgpu::Sampler,
    fallback: GpuTexture,
    warned_point_size: bool,
}

impl WgpuContext {
    /// Context rendering into targets of `color_format`
    pub fn new(gpu: GpuContext, color_format: wgpu::TextureFormat) -> Self {
        let modules = Program::ALL
            .into_iter()
            .map(|program| (program, gpu.create_shader_module(program.label(), program.source())))
            .collect();

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("object_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let fallback = create_texture(&gpu, &Image::solid([1.0; 3]));

        Self {
            gpu,
            id: ContextId::next(),
            release: ReleaseQueue::new(),
            color_format,
            next_raw: 0,
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            uniforms: HashMap::new(),
            sampler_units: HashMap::new(),
            bound: HashMap::new(),
            raster: RasterState::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            commands: Vec::new(),
            modules,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            sampler,
            fallback,
            warned_point_size: false,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Draws recorded since the last submit or clear
    pub fn pending_draws(&self) -> usize {
        self.commands.len()
    }

    fn allocate(&mut self) -> Result<u32> {
        let raw = self.next_raw;
        self.next_raw = self
            .next_raw
            .checked_add(1)
            .ok_or_else(|| Error::Gpu("out of handle ids".to_string()))?;
        Ok(raw)
    }

    fn vertex_array_mut(&mut self, vao: VertexArrayId) -> Result<&mut VertexArray> {
        self.vertex_arrays
            .get_mut(&vao)
            .ok_or_else(|| Error::Gpu(format!("vertex array {} does not exist", vao.raw())))
    }

    fn upload_buffer(&mut self, buffer: BufferId, data: &[u8], usage: wgpu::BufferUsages) -> Result<()> {
        let slot = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| Error::Gpu(format!("buffer {} does not exist", buffer.raw())))?;
        *slot = if data.is_empty() {
            None
        } else {
            Some(self.gpu.create_buffer_init("object buffer", data, usage))
        };
        Ok(())
    }

    fn record(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize, indexed: bool) {
        let Some(program) = Program::from_id(shader) else {
            log::warn!("draw with unknown shader {}", shader.raw());
            return;
        };
        let Ok(count) = u32::try_from(count) else {
            log::warn!("draw of {} elements exceeds the index range", count);
            return;
        };
        let mut uniforms = self.uniforms.get(&program).copied().unwrap_or_default();
        uniforms.mvp = (gl_to_wgpu_clip() * Matrix4::from(uniforms.mvp)).into();
        let sampled = |kind| {
            self.sampler_units
                .get(&(program, kind))
                .and_then(|unit| self.bound.get(unit))
                .copied()
        };
        let (diffuse, specular) = if program.is_textured() {
            (sampled(TextureKind::Diffuse), sampled(TextureKind::Specular))
        } else {
            (None, None)
        };
        self.commands.push(DrawCommand {
            program,
            vao,
            primitive,
            count,
            indexed,
            uniforms,
            diffuse,
            specular,
            raster: self.raster,
        });
    }

    fn texture_view(&self, id: Option<TextureId>) -> &wgpu::TextureView {
        id.and_then(|id| self.textures.get(&id))
            .and_then(Option::as_ref)
            .map_or(&self.fallback.view, |t| &t.view)
    }

    fn create_pipeline(&self, key: &PipelineKey) -> Result<wgpu::RenderPipeline> {
        let module = self
            .modules
            .get(&key.program)
            .ok_or_else(|| Error::Gpu(format!("no shader module for {}", key.program.label())))?;
        let stride = key.attributes.first().map_or(0, |a| a.stride) as wgpu::BufferAddress;
        let attributes: Vec<wgpu::VertexAttribute> = key
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: match a.components {
                    1 => wgpu::VertexFormat::Float32,
                    2 => wgpu::VertexFormat::Float32x2,
                    3 => wgpu::VertexFormat::Float32x3,
                    _ => wgpu::VertexFormat::Float32x4,
                },
                offset: a.offset as wgpu::BufferAddress,
                shader_location: a.location,
            })
            .collect();

        let triangles = key.primitive == Primitive::Triangles;
        let polygon_mode = if triangles && key.raster.wireframe && self.gpu.supports_wireframe() {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };
        log::debug!("building pipeline for {} ({:?})", key.program.label(), key.primitive);

        Ok(self.gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.program.label()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: VERTEX_ENTRY,
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: FRAGMENT_ENTRY,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: match key.primitive {
                    Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
                    Primitive::Points => wgpu::PrimitiveTopology::PointList,
                    Primitive::Lines => wgpu::PrimitiveTopology::LineList,
                },
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: (triangles && key.raster.cull_face).then_some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        }))
    }

    fn prepare(&mut self, command: &DrawCommand) -> Result<Option<PreparedDraw>> {
        let Some(vao) = self.vertex_arrays.get(&command.vao) else {
            log::warn!("draw of deleted vertex array {}", command.vao.raw());
            return Ok(None);
        };
        let Some(vertex_buffer) = vao.vertex_buffer else {
            return Ok(None);
        };
        let index_buffer = if command.indexed {
            match vao.index_buffer {
                Some(id) => Some(id),
                None => return Ok(None),
            }
        } else {
            None
        };
        if command.count == 0 || vao.attributes.is_empty() {
            return Ok(None);
        }

        let key = PipelineKey {
            program: command.program,
            primitive: command.primitive,
            raster: command.raster,
            attributes: vao.attributes.clone(),
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(&key)?;
            self.pipelines.insert(key.clone(), pipeline);
        }

        let uniform_buffer = self.gpu.create_buffer_init(
            "object uniforms",
            bytemuck::bytes_of(&command.uniforms),
            wgpu::BufferUsages::UNIFORM,
        );
        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.texture_view(command.diffuse)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(self.texture_view(command.specular)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        Ok(Some(PreparedDraw {
            key,
            _uniform_buffer: uniform_buffer,
            bind_group,
            vertex_buffer,
            index_buffer,
            count: command.count,
        }))
    }

    /// Render every recorded draw into `target` and start a new frame.
    ///
    /// `width` and `height` are the target size in pixels.
    pub fn submit_frame(&mut self, target: &wgpu::TextureView, width: u32, height: u32) -> Result<()> {
        let commands = std::mem::take(&mut self.commands);
        let mut prepared = Vec::with_capacity(commands.len());
        for command in &commands {
            if let Some(draw) = self.prepare(command)? {
                prepared.push(draw);
            }
        }

        let depth = self.gpu.create_depth_texture(width, height);
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        {
            let [r, g, b, a] = self.clear_color.map(f64::from);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &prepared {
                let (Some(pipeline), Some(Some(vertex_buffer))) =
                    (self.pipelines.get(&draw.key), self.buffers.get(&draw.vertex_buffer))
                else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &draw.bind_group, &[]);
                render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                match draw.index_buffer {
                    Some(index_buffer) => {
                        let Some(Some(index_buffer)) = self.buffers.get(&index_buffer) else {
                            continue;
                        };
                        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..draw.count, 0, 0..1);
                    }
                    None => render_pass.draw(0..draw.count, 0..1),
                }
            }
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("submitted frame with {} draws", prepared.len());
        Ok(())
    }
}

fn create_texture(gpu: &GpuContext, image: &Image) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("material texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.to_rgba8(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(image.width * 4),
            rows_per_image: Some(image.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

impl ShaderUniforms for WgpuContext {
    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) {
        let Some(program) = Program::from_id(shader) else {
            log::warn!("uniform {} set on unknown shader {}", name, shader.raw());
            return;
        };
        if let (Some(slot), UniformValue::Int(unit)) = (name.strip_prefix("material."), value) {
            if let Some(kind) = TextureKind::ALL.into_iter().find(|k| k.name() == slot) {
                self.sampler_units.insert((program, kind), unit.max(0) as u32);
                return;
            }
        }
        if !self.uniforms.entry(program).or_default().set(name, value) {
            log::trace!("{} has no uniform {}", program.label(), name);
        }
    }
}

impl RenderContext for WgpuContext {
    fn is_current(&self) -> bool {
        true
    }

    fn context_id(&self) -> ContextId {
        self.id
    }

    fn release_queue(&self) -> &ReleaseQueue {
        &self.release
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId> {
        let raw = self.allocate()?;
        let id = VertexArrayId::from_raw(raw).ok_or_else(|| Error::Gpu("invalid id".to_string()))?;
        self.vertex_arrays.insert(id, VertexArray::default());
        Ok(id)
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        let raw = self.allocate()?;
        let id = BufferId::from_raw(raw).ok_or_else(|| Error::Gpu("invalid id".to_string()))?;
        self.buffers.insert(id, None);
        Ok(id)
    }

    fn create_texture(&mut self) -> Result<TextureId> {
        let raw = self.allocate()?;
        let id = TextureId::from_raw(raw).ok_or_else(|| Error::Gpu("invalid id".to_string()))?;
        self.textures.insert(id, None);
        Ok(id)
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) {
        if self.vertex_arrays.remove(&id).is_none() {
            log::warn!("delete of unknown vertex array {}", id.raw());
        }
    }

    fn delete_buffer(&mut self, id: BufferId) {
        match self.buffers.remove(&id) {
            Some(Some(buffer)) => buffer.destroy(),
            Some(None) => {}
            None => log::warn!("delete of unknown buffer {}", id.raw()),
        }
    }

    fn delete_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_none() {
            log::warn!("delete of unknown texture {}", id.raw());
        }
        self.bound.retain(|_, bound| *bound != id);
    }

    fn upload_vertex_data(&mut self, vao: VertexArrayId, buffer: BufferId, data: &[u8]) -> Result<()> {
        self.vertex_array_mut(vao)?;
        self.upload_buffer(buffer, data, wgpu::BufferUsages::VERTEX)?;
        self.vertex_array_mut(vao)?.vertex_buffer = Some(buffer);
        Ok(())
    }

    fn upload_index_data(&mut self, vao: VertexArrayId, buffer: BufferId, indices: &[u32]) -> Result<()> {
        self.vertex_array_mut(vao)?;
        self.upload_buffer(buffer, bytemuck::cast_slice(indices), wgpu::BufferUsages::INDEX)?;
        self.vertex_array_mut(vao)?.index_buffer = Some(buffer);
        Ok(())
    }

    fn vertex_attribute(&mut self, vao: VertexArrayId, attribute: VertexAttribute) -> Result<()> {
        let attributes = &mut self.vertex_array_mut(vao)?.attributes;
        attributes.retain(|a| a.location != attribute.location);
        attributes.push(attribute);
        attributes.sort_by_key(|a| a.location);
        Ok(())
    }

    fn upload_texture(&mut self, id: TextureId, image: &Image) -> Result<()> {
        if image.width == 0 || image.height == 0 {
            return Err(Error::Gpu(format!("texture {} has an empty image", id.raw())));
        }
        let texture = create_texture(&self.gpu, image);
        let slot = self
            .textures
            .get_mut(&id)
            .ok_or_else(|| Error::Gpu(format!("texture {} does not exist", id.raw())))?;
        *slot = Some(texture);
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, id: TextureId) {
        self.bound.insert(unit, id);
    }

    fn set_point_size(&mut self, size: f32) {
        if (size - 1.0).abs() > f32::EPSILON && !self.warned_point_size {
            log::warn!("point size {} requested; wgpu rasterizes points at 1 px", size);
            self.warned_point_size = true;
        }
    }

    fn set_raster_state(&mut self, state: RasterState) {
        if state.wireframe && !self.raster.wireframe && !self.gpu.supports_wireframe() {
            log::warn!("adapter has no line polygon mode, wireframe is drawn filled");
        }
        self.raster = state;
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = color;
        self.commands.clear();
    }

    fn draw_elements(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize) {
        self.record(shader, vao, primitive, count, true);
    }

    fn draw_arrays(&mut self, shader: ShaderId, vao: VertexArrayId, primitive: Primitive, count: usize) {
        self.record(shader, vao, primitive, count, false);
    }
}
