//! Renderable triangle meshes
//!
//! A [`Mesh`] keeps its vertex records and faces on the CPU, where they can
//! be edited freely, and mirrors them into GPU buffers on [`Mesh::update`].
//! Textured meshes may carry a second "uv topology": their own uv vertex
//! table and uv faces, parallel to the position faces. The upload then uses
//! one vertex per uv vertex, pulling position and normal through the derived
//! uv-to-vertex map.

use crate::buffers::DrawBuffers;
use crate::context::{set_transform_uniforms, Primitive, RenderContext, VertexAttribute};
use crate::handle::ShaderId;
use crate::texture::{Texture, TextureKind, TextureSet, BLANK_GREY};
use meshscope_core::{
    consecutive_triangles, ensure, ensure_eq, estimate_normals, uv_to_vertex_map, Matrix4, MeshVertex,
    Result, Row3, ShadingMode, Transformable, Triangle, TriangleMesh, Uv, ViewProjection,
};
use meshscope_io::{BasicObjReader, MeshReader};
use std::borrow::Cow;
use std::path::Path;

/// Default specular exponent
pub const DEFAULT_SHININESS: f32 = 10.0;

/// Layout of [`MeshVertex`] records as seen by the vertex shader
pub const MESH_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        location: 0,
        components: 3,
        stride: MeshVertex::STRIDE,
        offset: MeshVertex::POSITION_OFFSET,
    },
    VertexAttribute {
        location: 1,
        components: 3,
        stride: MeshVertex::STRIDE,
        offset: MeshVertex::COLOR_OFFSET,
    },
    VertexAttribute {
        location: 2,
        components: 3,
        stride: MeshVertex::STRIDE,
        offset: MeshVertex::NORMAL_OFFSET,
    },
];

#[derive(Debug, Clone)]
struct UvTopology {
    coords: Vec<Uv>,
    faces: Vec<Triangle>,
    vertex_map: Vec<u32>,
}

/// A triangle mesh with GPU buffers
#[derive(Debug)]
pub struct Mesh {
    /// Position, color-or-uv and normal per vertex
    pub vertices: Vec<MeshVertex>,
    pub faces: Vec<Triangle>,
    pub textures: TextureSet,
    pub shininess: f32,
    pub transform: Matrix4<f32>,
    pub enabled: bool,
    shading: ShadingMode,
    auto_normals: bool,
    uv: Option<UvTopology>,
    buffers: Option<DrawBuffers>,
    blank: Option<Texture>,
}

impl Mesh {
    /// `num_vertices` zeroed vertices and `num_faces` zeroed faces.
    ///
    /// With `num_faces == 0` the faces are consecutive vertex triples.
    pub fn new(num_vertices: usize, num_faces: usize) -> Result<Self> {
        let mut mesh = Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            textures: TextureSet::default(),
            shininess: DEFAULT_SHININESS,
            transform: Matrix4::identity(),
            enabled: true,
            shading: ShadingMode::VertexColor,
            auto_normals: true,
            uv: None,
            buffers: None,
            blank: None,
        };
        mesh.resize(num_vertices, num_faces)?;
        Ok(mesh)
    }

    /// Mesh from position rows with optional faces, colors and normals.
    ///
    /// Without `normals` the mesh computes its own on every update.
    pub fn from_tables(
        positions: &[Row3],
        faces: &[Triangle],
        colors: Option<&[Row3]>,
        normals: Option<&[Row3]>,
    ) -> Result<Self> {
        let mut mesh = Self::new(positions.len(), faces.len())?;
        if !faces.is_empty() {
            mesh.faces.copy_from_slice(faces);
        }
        mesh.check_faces()?;
        for (vertex, position) in mesh.vertices.iter_mut().zip(positions) {
            vertex.position = *position;
        }
        if let Some(colors) = colors {
            ensure_eq!(colors.len(), positions.len());
            for (vertex, color) in mesh.vertices.iter_mut().zip(colors) {
                vertex.color = *color;
            }
        }
        if let Some(normals) = normals {
            mesh.set_normals(normals)?;
        }
        Ok(mesh)
    }

    /// Mesh where every vertex has the same color
    pub fn with_uniform_color(
        positions: &[Row3],
        faces: &[Triangle],
        color: Row3,
        normals: Option<&[Row3]>,
    ) -> Result<Self> {
        ensure!(!positions.is_empty(), "a uniformly colored mesh needs vertices");
        let colors = vec![color; positions.len()];
        Self::from_tables(positions, faces, Some(&colors), normals)
    }

    /// Mesh from CPU tables.
    ///
    /// Meshes without colors use textured shading, so they render with the
    /// grey placeholder until textures are added.
    pub fn from_triangle_mesh(source: &TriangleMesh) -> Result<Self> {
        let mut mesh = Self::from_tables(
            &source.vertices,
            &source.faces,
            source.colors.as_deref(),
            source.normals.as_deref(),
        )?;
        if source.colors.is_none() {
            mesh.shading = ShadingMode::Textured;
        }
        Ok(mesh)
    }

    /// Load a basic OBJ file, see [`meshscope_io::basic_obj`]
    pub fn from_basic_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_triangle_mesh(&BasicObjReader::read_mesh(path)?)
    }

    /// Replace the geometry with a basic OBJ file and reset the transform.
    ///
    /// Textures and GPU handles are kept; call [`update`](Self::update) after.
    pub fn load_basic_obj<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut loaded = Self::from_basic_obj(path)?;
        self.vertices = std::mem::take(&mut loaded.vertices);
        self.faces = std::mem::take(&mut loaded.faces);
        self.shading = loaded.shading;
        self.auto_normals = loaded.auto_normals;
        self.uv = None;
        self.transform = Matrix4::identity();
        Ok(())
    }

    /// CPU tables with positions as stored (no transform applied)
    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        TriangleMesh {
            vertices: self.vertices.iter().map(|v| v.position).collect(),
            faces: self.faces.clone(),
            normals: Some(self.vertices.iter().map(|v| v.normal).collect()),
            colors: (self.shading == ShadingMode::VertexColor)
                .then(|| self.vertices.iter().map(|v| v.color).collect()),
        }
    }

    /// Write positions (through the local transform), colors in vertex-color
    /// mode, and 1-based faces
    pub fn save_basic_obj<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        meshscope_io::save_basic_obj(&self.to_triangle_mesh(), &self.transform, path)
    }

    /// Discard the tables and allocate new zeroed ones; resets the transform
    pub fn resize(&mut self, num_vertices: usize, num_faces: usize) -> Result<&mut Self> {
        if num_faces == 0 {
            ensure!(
                num_vertices % 3 == 0,
                "{} vertices cannot form implicit triangles",
                num_vertices
            );
            self.faces = consecutive_triangles(num_vertices);
        } else {
            self.faces = vec![[0; 3]; num_faces];
        }
        self.vertices = vec![MeshVertex::default(); num_vertices];
        self.uv = None;
        self.transform = Matrix4::identity();
        Ok(self)
    }

    pub fn shading(&self) -> ShadingMode {
        self.shading
    }

    /// Switch between vertex colors and textures without touching uv topology
    pub fn set_shading(&mut self, shading: ShadingMode) -> &mut Self {
        self.shading = shading;
        self
    }

    pub fn auto_normals(&self) -> bool {
        self.auto_normals
    }

    pub fn set_auto_normals(&mut self, enabled: bool) -> &mut Self {
        self.auto_normals = enabled;
        self
    }

    /// Overwrite the normal column and stop computing normals automatically
    pub fn set_normals(&mut self, normals: &[Row3]) -> Result<&mut Self> {
        ensure_eq!(normals.len(), self.vertices.len());
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = *normal;
        }
        self.auto_normals = false;
        Ok(self)
    }

    /// Mutable normal column; turns automatic normals off
    pub fn normals_mut(&mut self) -> impl Iterator<Item = &mut Row3> {
        self.auto_normals = false;
        self.vertices.iter_mut().map(|v| &mut v.normal)
    }

    /// Overwrite the color column and switch to vertex-color shading
    pub fn set_colors(&mut self, colors: &[Row3]) -> Result<&mut Self> {
        ensure_eq!(colors.len(), self.vertices.len());
        for (vertex, color) in self.vertices.iter_mut().zip(colors) {
            vertex.color = *color;
        }
        self.shading = ShadingMode::VertexColor;
        Ok(self)
    }

    /// Use a separate uv topology and switch to textured shading.
    ///
    /// `uv_faces` must be parallel to [`faces`](Self::faces), every uv vertex
    /// must be used, and each uv vertex must sit on exactly one position
    /// vertex.
    pub fn set_tex_coords(&mut self, coords: &[Uv], uv_faces: &[Triangle]) -> Result<&mut Self> {
        ensure!(
            coords.len() >= self.vertices.len(),
            "{} uv vertices cannot cover {} position vertices",
            coords.len(),
            self.vertices.len()
        );
        let vertex_map = uv_to_vertex_map(coords.len(), self.vertices.len(), &self.faces, uv_faces)?;
        self.uv = Some(UvTopology {
            coords: coords.to_vec(),
            faces: uv_faces.to_vec(),
            vertex_map,
        });
        self.shading = ShadingMode::Textured;
        Ok(self)
    }

    /// Drop the uv topology and go back to vertex colors
    pub fn unset_tex_coords(&mut self) -> &mut Self {
        self.uv = None;
        self.shading = ShadingMode::VertexColor;
        self
    }

    pub fn tex_coords(&self) -> Option<&[Uv]> {
        self.uv.as_ref().map(|uv| uv.coords.as_slice())
    }

    pub fn uv_faces(&self) -> Option<&[Triangle]> {
        self.uv.as_ref().map(|uv| uv.faces.as_slice())
    }

    /// Position vertex of each uv vertex
    pub fn uv_vertex_map(&self) -> Option<&[u32]> {
        self.uv.as_ref().map(|uv| uv.vertex_map.as_slice())
    }

    /// Append a texture to the list for `kind`
    pub fn add_texture(&mut self, kind: TextureKind, texture: Texture) -> &mut Self {
        self.textures.get_mut(kind).push(texture);
        self
    }

    pub fn set_shininess(&mut self, shininess: f32) -> &mut Self {
        self.shininess = shininess;
        self
    }

    pub fn enable(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether GPU buffers exist
    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    fn check_faces(&self) -> Result<()> {
        let count = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            ensure!(
                face.iter().all(|&v| (v as usize) < count),
                "face {} = {:?} is out of range for {} vertices",
                i,
                face,
                count
            );
        }
        Ok(())
    }

    /// Vertex records and faces in upload order
    fn upload_tables(&self) -> Result<(Cow<'_, [MeshVertex]>, &[Triangle])> {
        let Some(uv) = &self.uv else {
            return Ok((Cow::Borrowed(self.vertices.as_slice()), self.faces.as_slice()));
        };
        let count = self.vertices.len();
        let stray = uv.vertex_map.iter().copied().find(|&v| v as usize >= count);
        ensure!(
            stray.is_none(),
            "uv map points at vertex {:?} but the mesh has {} vertices",
            stray,
            count
        );
        let records = uv
            .coords
            .iter()
            .zip(&uv.vertex_map)
            .map(|(coord, &vertex)| {
                let source = &self.vertices[vertex as usize];
                MeshVertex::textured(source.position, *coord, source.normal)
            })
            .collect();
        Ok((Cow::Owned(records), uv.faces.as_slice()))
    }

    /// Synchronize derived data and GPU buffers with the CPU tables.
    ///
    /// Normals are recomputed first when automatic. Without a current context
    /// nothing else happens. Handles are (re)created when missing, when they
    /// belong to another context, or when `force_init` is set; otherwise only
    /// textures without a valid handle are loaded.
    pub fn update<C: RenderContext + ?Sized>(&mut self, ctx: &mut C, force_init: bool) -> Result<()> {
        if self.auto_normals {
            estimate_normals(&mut self.vertices, &self.faces)?;
        }
        if !ctx.is_current() {
            return Ok(());
        }
        self.check_faces()?;

        let reuse = !force_init && self.buffers.as_ref().is_some_and(|b| b.belongs_to(ctx));
        if reuse {
            for texture in self.textures.iter_mut() {
                if !texture.is_loaded_in(ctx) {
                    texture.load(ctx)?;
                }
            }
        } else {
            for texture in self.textures.iter_mut() {
                texture.load(ctx)?;
            }
            if let Some(mut blank) = self.blank.take() {
                blank.free(ctx);
            }
            if let Some(old) = self.buffers.take() {
                old.release(ctx);
            }
            self.buffers = Some(DrawBuffers::create(ctx, true)?);
        }

        let Some((vao, vertex_buffer, index_buffer)) =
            self.buffers.as_ref().map(|b| (b.vao, b.vertex_buffer, b.index_buffer))
        else {
            return Ok(());
        };
        let (records, faces) = self.upload_tables()?;
        let count = faces.len() * 3;
        ctx.upload_vertex_data(vao, vertex_buffer, bytemuck::cast_slice(&*records))?;
        if let Some(index_buffer) = index_buffer {
            ctx.upload_index_data(vao, index_buffer, bytemuck::cast_slice(faces))?;
        }
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.describe(ctx, &MESH_ATTRIBUTES)?;
            buffers.count = count;
        }
        Ok(())
    }

    fn blank_texture<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> Result<Option<crate::TextureId>> {
        if let Some(blank) = self.blank.as_ref().filter(|b| b.is_loaded_in(ctx)) {
            return Ok(blank.id());
        }
        let mut blank = Texture::from_color(BLANK_GREY);
        blank.load(ctx)?;
        let id = blank.id();
        if let Some(mut stale) = self.blank.replace(blank) {
            stale.free(ctx);
        }
        Ok(id)
    }

    /// Issue the draw for this mesh with `shader`.
    ///
    /// Disabled and empty meshes draw nothing. Drawing before
    /// [`update`](Self::update) logs an error and draws nothing.
    pub fn draw<C, V>(&mut self, ctx: &mut C, shader: ShaderId, camera: &V) -> Result<()>
    where
        C: RenderContext + ?Sized,
        V: ViewProjection + ?Sized,
    {
        if !self.enabled || self.vertices.is_empty() {
            return Ok(());
        }
        let Some((vao, count)) = self.buffers.as_ref().map(|b| (b.vao, b.count)) else {
            log::error!("Mesh::draw called before Mesh::update, skipping");
            return Ok(());
        };

        if self.shading == ShadingMode::Textured {
            for kind in TextureKind::ALL {
                if self.textures.get(kind).is_empty() {
                    if let Some(blank) = self.blank_texture(ctx)? {
                        ctx.set_int(shader, &format!("material.{}", kind.name()), 0);
                        ctx.bind_texture(0, blank);
                    }
                }
            }
            let mut unit = 1u32;
            for kind in TextureKind::ALL {
                for (nth, texture) in self.textures.get(kind).iter().rev().enumerate() {
                    let name = match nth {
                        0 => format!("material.{}", kind.name()),
                        n => format!("material.{}{}", kind.name(), n),
                    };
                    ctx.set_int(shader, &name, unit as i32);
                    match texture.id() {
                        Some(id) => ctx.bind_texture(unit, id),
                        None => log::warn!("{} texture {} is not loaded", kind.name(), nth),
                    }
                    unit += 1;
                }
            }
        }
        ctx.set_float(shader, "material.shininess", self.shininess);
        set_transform_uniforms(ctx, shader, camera, &self.transform);
        ctx.draw_elements(shader, vao, Primitive::Triangles, count);
        Ok(())
    }

    /// Release every GPU handle; a no-op when nothing is held
    pub fn free<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) {
        if let Some(buffers) = self.buffers.take() {
            buffers.release(ctx);
        }
        if let Some(mut blank) = self.blank.take() {
            blank.free(ctx);
        }
        for texture in self.textures.iter_mut() {
            texture.free(ctx);
        }
    }
}

impl Transformable for Mesh {
    fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Matrix4<f32> {
        &mut self.transform
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            buffers.defer();
        }
    }
}
