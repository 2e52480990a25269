//! Built-in shader programs
//!
//! Three programs cover every object: meshes shaded with vertex colors,
//! meshes shaded with diffuse and specular textures, and flat-colored points
//! or lines. Both mesh programs use Blinn-Phong lighting from one point light.
//! All programs share the [`ObjectUniforms`] block at binding 0; the textured
//! program also reads bindings 1 (diffuse), 2 (specular) and 3 (sampler).

use crate::context::UniformValue;
use crate::handle::ShaderId;
use bytemuck::{Pod, Zeroable};
use meshscope_core::{Matrix3, Matrix4, ShadingMode, Vector3};

/// Depth attachment format used by the wgpu backend
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Shader entry points
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

macro_rules! uniform_block {
    () => {
        r#"
struct Uniforms {
    model: mat4x4<f32>,
    mvp: mat4x4<f32>,
    normal_matrix: mat3x3<f32>,
    view_pos: vec4<f32>,
    light_position: vec4<f32>,
    light_ambient: vec4<f32>,
    light_diffuse: vec4<f32>,
    light_specular: vec4<f32>,
    shininess: f32,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
"#
    };
}

macro_rules! mesh_vertex_stage {
    () => {
        r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) normal: vec3<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.mvp * vec4<f32>(input.position, 1.0);
    out.world_position = (u.model * vec4<f32>(input.position, 1.0)).xyz;
    out.color = input.color;
    out.normal = u.normal_matrix * input.normal;
    return out;
}

fn shade(position: vec3<f32>, normal: vec3<f32>, diffuse_color: vec3<f32>, specular_color: vec3<f32>) -> vec3<f32> {
    let ambient = u.light_ambient.xyz * diffuse_color;

    let norm = normalize(normal);
    let light_dir = normalize(u.light_position.xyz - position);
    let diff = max(dot(norm, light_dir), 0.0);
    let diffuse = u.light_diffuse.xyz * diff * diffuse_color;

    let view_dir = normalize(u.view_pos.xyz - position);
    let halfway_dir = normalize(light_dir + view_dir);
    let spec = pow(max(dot(view_dir, halfway_dir), 0.0), u.shininess);
    let specular = u.light_specular.xyz * spec * specular_color;

    return ambient + diffuse + specular;
}
"#
    };
}

/// Mesh program using interpolated per-vertex colors
pub const MESH_COLOR_SHADER: &str = concat!(
    uniform_block!(),
    mesh_vertex_stage!(),
    r#"
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(shade(input.world_position, input.normal, input.color, vec3<f32>(1.0)), 1.0);
}
"#
);

/// Mesh program sampling diffuse and specular textures at the uv stored in
/// the color slot
pub const MESH_TEXTURE_SHADER: &str = concat!(
    uniform_block!(),
    mesh_vertex_stage!(),
    r#"
@group(0) @binding(1) var diffuse_texture: texture_2d<f32>;
@group(0) @binding(2) var specular_texture: texture_2d<f32>;
@group(0) @binding(3) var material_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = input.color.xy;
    let diffuse = textureSample(diffuse_texture, material_sampler, uv).rgb;
    let specular = textureSample(specular_texture, material_sampler, uv).rgb;
    return vec4<f32>(shade(input.world_position, input.normal, diffuse, specular), 1.0);
}
"#
);

/// Flat-colored points and lines
pub const POINT_SHADER: &str = concat!(
    uniform_block!(),
    r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.mvp * vec4<f32>(input.position, 1.0);
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(input.color, 1.0);
}
"#
);

/// The built-in programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    MeshColor,
    MeshTexture,
    Points,
}

impl Program {
    pub const ALL: [Program; 3] = [Program::MeshColor, Program::MeshTexture, Program::Points];

    pub fn source(self) -> &'static str {
        match self {
            Program::MeshColor => MESH_COLOR_SHADER,
            Program::MeshTexture => MESH_TEXTURE_SHADER,
            Program::Points => POINT_SHADER,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Program::MeshColor => "mesh (vertex color)",
            Program::MeshTexture => "mesh (textured)",
            Program::Points => "point cloud",
        }
    }

    pub fn id(self) -> ShaderId {
        match self {
            Program::MeshColor => ShaderId::builtin(0),
            Program::MeshTexture => ShaderId::builtin(1),
            Program::Points => ShaderId::builtin(2),
        }
    }

    pub fn from_id(id: ShaderId) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn is_textured(self) -> bool {
        self == Program::MeshTexture
    }
}

/// Ids of the built-in programs, as passed to `draw`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSet {
    pub mesh_color: ShaderId,
    pub mesh_texture: ShaderId,
    pub points: ShaderId,
}

impl ShaderSet {
    pub fn builtin() -> Self {
        Self {
            mesh_color: Program::MeshColor.id(),
            mesh_texture: Program::MeshTexture.id(),
            points: Program::Points.id(),
        }
    }

    /// Program for a mesh with the given shading
    pub fn for_mesh(&self, shading: ShadingMode) -> ShaderId {
        match shading {
            ShadingMode::VertexColor => self.mesh_color,
            ShadingMode::Textured => self.mesh_texture,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ShaderId> {
        [self.mesh_color, self.mesh_texture, self.points].into_iter()
    }
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Maps OpenGL clip space (z in `-w..w`) to wgpu clip space (z in `0..w`)
#[rustfmt::skip]
pub fn gl_to_wgpu_clip() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

fn vec4(v: Vector3<f32>, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

fn mat3_columns(m: &Matrix3<f32>) -> [[f32; 4]; 3] {
    [0, 1, 2].map(|c| vec4(m.column(c).into_owned(), 0.0))
}

/// Uniform block shared by the built-in programs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub mvp: [[f32; 4]; 4],
    /// Columns of the 3x3 normal matrix, each padded to 16 bytes
    pub normal_matrix: [[f32; 4]; 3],
    pub view_pos: [f32; 4],
    pub light_position: [f32; 4],
    pub light_ambient: [f32; 4],
    pub light_diffuse: [f32; 4],
    pub light_specular: [f32; 4],
    pub shininess: f32,
    pub _padding: [f32; 3],
}

impl Default for ObjectUniforms {
    fn default() -> Self {
        Self {
            model: Matrix4::identity().into(),
            mvp: Matrix4::identity().into(),
            normal_matrix: mat3_columns(&Matrix3::identity()),
            view_pos: [0.0, 0.0, 0.0, 1.0],
            light_position: [0.0, 0.0, 0.0, 1.0],
            light_ambient: [0.2, 0.2, 0.2, 0.0],
            light_diffuse: [1.0, 1.0, 1.0, 0.0],
            light_specular: [1.0, 1.0, 1.0, 0.0],
            shininess: 10.0,
            _padding: [0.0; 3],
        }
    }
}

impl ObjectUniforms {
    /// Store a named uniform.
    ///
    /// Returns `false` for names the block has no field for, which includes
    /// sampler units (`material.diffuse`, ...).
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            ("M", UniformValue::Mat4(m)) => self.model = m.into(),
            ("MVP", UniformValue::Mat4(m)) => self.mvp = m.into(),
            ("NormalMatrix", UniformValue::Mat3(m)) => self.normal_matrix = mat3_columns(&m),
            ("viewPos", UniformValue::Vec3(v)) => self.view_pos = vec4(v, 1.0),
            ("light.position", UniformValue::Vec3(v)) => self.light_position = vec4(v, 1.0),
            ("light.ambient", UniformValue::Vec3(v)) => self.light_ambient = vec4(v, 0.0),
            ("light.diffuse", UniformValue::Vec3(v)) => self.light_diffuse = vec4(v, 0.0),
            ("light.specular", UniformValue::Vec3(v)) => self.light_specular = vec4(v, 0.0),
            ("material.shininess", UniformValue::Float(s)) => self.shininess = s,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshscope_core::Vector4;

    #[test]
    fn test_uniform_block_layout() {
        // mat4 + mat4 + mat3 (3 x vec4) + 5 x vec4 + f32 rounded up to 16
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 272);
        assert_eq!(std::mem::offset_of!(ObjectUniforms, shininess), 256);
    }

    #[test]
    fn test_set_known_names() {
        let mut block = ObjectUniforms::default();
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert!(block.set("M", UniformValue::Mat4(m)));
        assert_eq!(block.model[3], [1.0, 2.0, 3.0, 1.0]);

        assert!(block.set("light.ambient", UniformValue::Vec3(Vector3::new(0.1, 0.2, 0.3))));
        assert_eq!(block.light_ambient, [0.1, 0.2, 0.3, 0.0]);

        assert!(block.set("NormalMatrix", UniformValue::Mat3(Matrix3::from_diagonal_element(2.0))));
        assert_eq!(block.normal_matrix[1], [0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_set_ignores_samplers_and_mismatched_types() {
        let mut block = ObjectUniforms::default();
        assert!(!block.set("material.diffuse", UniformValue::Int(1)));
        assert!(!block.set("M", UniformValue::Float(1.0)));
        assert_eq!(block, ObjectUniforms::default());
    }

    #[test]
    fn test_clip_conversion_maps_depth_range() {
        let clip = gl_to_wgpu_clip();
        let near = clip * Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = clip * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert_relative_eq!(near.z, 0.0);
        assert_relative_eq!(far.z, 1.0);
    }

    #[test]
    fn test_shader_set_ids_are_distinct() {
        let set = ShaderSet::builtin();
        assert_ne!(set.mesh_color, set.mesh_texture);
        assert_ne!(set.mesh_texture, set.points);
        assert_eq!(set.for_mesh(ShadingMode::Textured), set.mesh_texture);
        assert_eq!(Program::from_id(set.points), Some(Program::Points));
    }

    #[test]
    fn test_sources_declare_entry_points() {
        for program in Program::ALL {
            assert!(program.source().contains("fn vs_main"));
            assert!(program.source().contains("fn fs_main"));
        }
        assert!(MESH_TEXTURE_SHADER.contains("@binding(3)"));
        assert!(!POINT_SHADER.contains("texture_2d"));
    }
}
