//! Scene objects driven end to end through the recording context

use approx::assert_relative_eq;
use meshscope_core::{CameraMatrices, Row3, ShadingMode, Transformable, Triangle, Vector3};
use meshscope_gpu::{
    GpuCall, GpuResource, HeadlessContext, Image, Mesh, PointCloud, Primitive, RenderContext, ShaderSet, Texture,
    TextureKind,
};

fn unit_cube() -> (Vec<Row3>, Vec<Triangle>) {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    (positions, faces)
}

#[test]
fn test_colored_cube_draws_once() {
    let mut ctx = HeadlessContext::new();
    let shaders = ShaderSet::builtin();
    let (positions, faces) = unit_cube();
    let mut cube = Mesh::with_uniform_color(&positions, &faces, [1.0, 0.0, 0.0], None).unwrap();
    assert_eq!(cube.shading(), ShadingMode::VertexColor);

    cube.update(&mut ctx, false).unwrap();
    cube.draw(&mut ctx, shaders.for_mesh(cube.shading()), &CameraMatrices::default())
        .unwrap();

    let draws: Vec<&GpuCall> = ctx.draw_calls().collect();
    assert_eq!(draws.len(), 1);
    match draws[0] {
        GpuCall::DrawElements { shader, primitive, count, .. } => {
            assert_eq!(*shader, shaders.mesh_color);
            assert_eq!(*primitive, Primitive::Triangles);
            assert_eq!(*count, 36);
        }
        other => panic!("unexpected draw {other:?}"),
    }

    // Corner normals are the mean of the three incident face directions, not renormalized
    let corner = Vector3::from(cube.vertices[6].normal);
    assert_relative_eq!(corner, Vector3::new(1.0, 1.0, 1.0) / 3.0, epsilon = 1e-5);
}

#[test]
fn test_disabled_cube_draws_nothing() {
    let mut ctx = HeadlessContext::new();
    let (positions, faces) = unit_cube();
    let mut cube = Mesh::with_uniform_color(&positions, &faces, [1.0, 0.0, 0.0], None).unwrap();
    cube.update(&mut ctx, false).unwrap();
    cube.enable(false);
    cube.draw(&mut ctx, ShaderSet::builtin().mesh_color, &CameraMatrices::default())
        .unwrap();
    assert_eq!(ctx.draw_call_count(), 0);
}

#[test]
fn test_scene_releases_everything() {
    let mut ctx = HeadlessContext::new();
    let mut mesh = Mesh::sphere(8, 8).unwrap();
    mesh.add_texture(TextureKind::Diffuse, Texture::from_color([0.2, 0.4, 0.6]));
    let mut cloud = PointCloud::from_positions(&[[0.0; 3], [1.0; 3], [2.0; 3]], None).unwrap();

    mesh.update(&mut ctx, false).unwrap();
    cloud.update(&mut ctx, false).unwrap();
    let shaders = ShaderSet::builtin();
    let camera = CameraMatrices::default();
    mesh.draw(&mut ctx, shaders.for_mesh(mesh.shading()), &camera).unwrap();
    cloud.draw(&mut ctx, shaders.points, &camera).unwrap();
    assert_eq!(ctx.draw_call_count(), 2);
    assert!(ctx.live_resource_count() > 0);

    mesh.free(&mut ctx);
    mesh.free(&mut ctx);
    drop(cloud);
    ctx.collect_released();
    assert_eq!(ctx.live_resource_count(), 0);
    assert_eq!(ctx.double_release_count(), 0);
}

#[test]
fn test_dropped_texture_is_released_by_its_context() {
    let mut ctx = HeadlessContext::new();
    let mut texture = Texture::from_image(Image::solid([0.0, 0.0, 1.0]));
    texture.load(&mut ctx).unwrap();
    let id = texture.id().unwrap();
    drop(texture);

    assert!(ctx.is_live(GpuResource::Texture(id)));
    assert_eq!(ctx.collect_released(), 1);
    assert!(!ctx.is_live(GpuResource::Texture(id)));
}

#[test]
fn test_basic_obj_round_trip_through_mesh() {
    let path = std::env::temp_dir().join(format!("meshscope_gpu_roundtrip_{}.obj", std::process::id()));
    let (positions, faces) = unit_cube();
    let colors: Vec<Row3> = (0..8).map(|i| [i as f32 / 8.0, 0.5, 1.0]).collect();
    let mut mesh = Mesh::from_tables(&positions, &faces, Some(&colors), None).unwrap();
    mesh.translate(&Vector3::new(0.0, 0.0, 2.0));
    mesh.save_basic_obj(&path).unwrap();

    let loaded = Mesh::from_basic_obj(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.faces, faces);
    for (i, vertex) in loaded.vertices.iter().enumerate() {
        let expected = Vector3::from(positions[i]) + Vector3::new(0.0, 0.0, 2.0);
        assert_relative_eq!(vertex.position_vec(), expected, epsilon = 1e-6);
        assert_relative_eq!(Vector3::from(vertex.color), Vector3::from(colors[i]), epsilon = 1e-6);
    }
}

#[test]
fn test_textured_mesh_saves_without_colors() {
    let path = std::env::temp_dir().join(format!("meshscope_gpu_textured_{}.obj", std::process::id()));
    let mesh = Mesh::square().unwrap();
    mesh.save_basic_obj(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let first = text.lines().next().unwrap();
    assert_eq!(first.split_whitespace().count(), 4);
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 2);
}

#[test]
fn test_line_primitive_draws_a_segment() {
    let mut ctx = HeadlessContext::new();
    let mut line = PointCloud::line([0.0; 3], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]);
    line.update(&mut ctx, false).unwrap();
    line.draw(&mut ctx, ShaderSet::builtin().points, &CameraMatrices::default())
        .unwrap();
    assert!(matches!(
        ctx.draw_calls().next(),
        Some(GpuCall::DrawArrays { primitive: Primitive::Lines, count: 2, .. })
    ));
}

/// Render the cube offscreen on a real adapter; needs a GPU
#[test]
#[ignore]
fn test_wgpu_offscreen_frame() {
    use meshscope_gpu::{GpuContext, WgpuContext};

    let gpu = pollster::block_on(GpuContext::new()).unwrap();
    let format = wgpu::TextureFormat::Rgba8Unorm;
    let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen target"),
        size: wgpu::Extent3d {
            width: 64,
            height: 64,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let mut ctx = WgpuContext::new(gpu, format);

    let mut cube = Mesh::cube().unwrap();
    cube.update(&mut ctx, false).unwrap();
    cube.draw(&mut ctx, ShaderSet::builtin().mesh_texture, &CameraMatrices::default())
        .unwrap();
    assert_eq!(ctx.pending_draws(), 1);
    ctx.submit_frame(&view, 64, 64).unwrap();
    assert_eq!(ctx.pending_draws(), 0);
}
