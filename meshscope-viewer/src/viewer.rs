//! Scene composition, per-frame rendering and input handling
//!
//! The [`Viewer`] owns the scene objects, camera and lighting. A window
//! runner (see [`crate::window`]) calls [`Viewer::open`] once a rendering
//! context exists, [`Viewer::handle_event`] for every input event,
//! [`Viewer::frame`] for every redraw and [`Viewer::close`] at the end.
//! Everything here talks to the GPU only through [`RenderContext`], so the
//! whole loop also runs against a `HeadlessContext`.

use crate::camera::Camera;
use crate::config::{Lighting, ViewerConfig};
use crate::input::{Action, InputEvent, Key, Modifiers, MouseButton};
use meshscope_core::{Matrix4, Result, Row3, Vector3, Vector4, ViewProjection};
use meshscope_gpu::{Mesh, PointCloud, RasterState, RenderContext, ShaderSet, Texture, TextureKind};

/// Called once after the context is ready, and once before it goes away
pub type LifecycleCallback = Box<dyn FnMut(&mut Viewer)>;
/// Called every frame; return `true` when scene data changed and every object
/// should be updated
pub type LoopCallback = Box<dyn FnMut(&mut Viewer) -> bool>;
/// Return `false` to skip the default handling
pub type KeyCallback = Box<dyn FnMut(&mut Viewer, Key, Action, Modifiers) -> bool>;
/// Return `false` to skip the default handling
pub type MouseButtonCallback = Box<dyn FnMut(&mut Viewer, MouseButton, Action, Modifiers) -> bool>;
/// Receives (x, y) for moves and (x offset, y offset) for scrolls; return
/// `false` to skip the default handling
pub type PointerCallback = Box<dyn FnMut(&mut Viewer, f64, f64) -> bool>;

/// User hooks into the render loop
#[derive(Default)]
pub struct Callbacks {
    pub on_open: Option<LifecycleCallback>,
    pub on_close: Option<LifecycleCallback>,
    pub on_loop: Option<LoopCallback>,
    pub on_key: Option<KeyCallback>,
    pub on_mouse_button: Option<MouseButtonCallback>,
    pub on_mouse_move: Option<PointerCallback>,
    pub on_scroll: Option<PointerCallback>,
}

/// Run callback `$name` with the viewer, keeping it installed afterwards
/// unless it installed a replacement. Evaluates to `Option<return value>`.
macro_rules! run_callback {
    ($viewer:ident, $name:ident $(, $arg:expr)*) => {
        match $viewer.callbacks.$name.take() {
            Some(mut callback) => {
                let result = callback($viewer $(, $arg)*);
                if $viewer.callbacks.$name.is_none() {
                    $viewer.callbacks.$name = Some(callback);
                }
                Some(result)
            }
            None => None,
        }
    };
}

/// Interactive scene of meshes and point clouds
pub struct Viewer {
    pub meshes: Vec<Mesh>,
    pub point_clouds: Vec<PointCloud>,
    pub camera: Camera,
    pub lighting: Lighting,
    pub config: ViewerConfig,
    pub shaders: ShaderSet,
    pub callbacks: Callbacks,
    width: u32,
    height: u32,
    mouse: Option<(f64, f64)>,
    mouse_button: Option<MouseButton>,
    mouse_mods: Modifiers,
    looping: bool,
    close_requested: bool,
    fullscreen: bool,
    axes: PointCloud,
}

fn axes() -> PointCloud {
    let mut axes = PointCloud::new(6);
    let ends: [(Row3, Row3); 3] = [
        ([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    ];
    for (pair, (end, color)) in axes.points.chunks_mut(2).zip(ends) {
        pair[0].color = color;
        pair[1].position = end;
        pair[1].color = color;
    }
    axes.draw_lines();
    axes
}

impl Viewer {
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::default())
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        Self {
            meshes: Vec::new(),
            point_clouds: Vec::new(),
            camera: Camera::default(),
            lighting: Lighting::default(),
            width: config.width,
            height: config.height,
            config,
            shaders: ShaderSet::builtin(),
            callbacks: Callbacks::default(),
            mouse: None,
            mouse_button: None,
            mouse_mods: Modifiers::default(),
            looping: false,
            close_requested: false,
            fullscreen: false,
            axes: axes(),
        }
    }

    /// Add a mesh to the scene
    pub fn add_mesh(&mut self, mesh: Mesh) -> &mut Mesh {
        let index = self.meshes.len();
        self.meshes.push(mesh);
        &mut self.meshes[index]
    }

    /// Add a point cloud to the scene
    pub fn add_point_cloud(&mut self, cloud: PointCloud) -> &mut PointCloud {
        let index = self.point_clouds.len();
        self.point_clouds.push(cloud);
        &mut self.point_clouds[index]
    }

    fn add_shape(&mut self, mut mesh: Mesh, center: Row3, scale: f32, color: Row3) -> &mut Mesh {
        let center = Vector3::from(center);
        for vertex in &mut mesh.vertices {
            vertex.position = (center + vertex.position_vec() * scale).into();
        }
        mesh.add_texture(TextureKind::Diffuse, Texture::from_color(color));
        self.add_mesh(mesh)
    }

    /// Cube with side `side` around `center`, flat colored.
    ///
    /// Points are placed directly; the transform stays the identity.
    pub fn add_cube(&mut self, center: Row3, side: f32, color: Row3) -> Result<&mut Mesh> {
        Ok(self.add_shape(Mesh::cube()?, center, side, color))
    }

    /// Square with side `side` around `center`, facing +z
    pub fn add_square(&mut self, center: Row3, side: f32, color: Row3) -> Result<&mut Mesh> {
        Ok(self.add_shape(Mesh::square()?, center, side, color))
    }

    /// UV sphere of `radius` around `center`
    pub fn add_sphere(
        &mut self,
        center: Row3,
        radius: f32,
        color: Row3,
        rings: usize,
        sectors: usize,
    ) -> Result<&mut Mesh> {
        Ok(self.add_shape(Mesh::sphere(rings, sectors)?, center, radius, color))
    }

    /// Line segment from `a` to `b`
    pub fn add_line(&mut self, a: Row3, b: Row3, color: Row3) -> &mut PointCloud {
        self.add_point_cloud(PointCloud::line(a, b, color))
    }

    /// Framebuffer size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Last cursor position, once the cursor has moved over the window
    pub fn mouse_position(&self) -> Option<(f64, f64)> {
        self.mouse
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Ask the window runner to end the loop after this frame
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    /// Whether the window should be fullscreen (toggle: `f`)
    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Create GPU resources for the whole scene and run `on_open`
    pub fn open<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> Result<()> {
        log::info!(
            "opening viewer with {} meshes and {} point clouds",
            self.meshes.len(),
            self.point_clouds.len()
        );
        self.looping = true;
        self.close_requested = false;
        self.camera.set_viewport(self.width, self.height);
        self.camera.set_home();
        self.update_all(ctx, true)?;
        run_callback!(self, on_open);
        Ok(())
    }

    /// Run `on_close` and release every GPU resource of the scene
    pub fn close<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) {
        run_callback!(self, on_close);
        for mesh in &mut self.meshes {
            mesh.free(ctx);
        }
        for cloud in &mut self.point_clouds {
            cloud.free(ctx);
        }
        self.axes.free(ctx);
        ctx.collect_released();
        self.looping = false;
        log::info!("viewer closed");
    }

    /// Update every object, re-creating GPU buffers when `force_init` is set
    pub fn update_all<C: RenderContext + ?Sized>(&mut self, ctx: &mut C, force_init: bool) -> Result<()> {
        for mesh in &mut self.meshes {
            mesh.update(ctx, force_init)?;
        }
        for cloud in &mut self.point_clouds {
            cloud.update(ctx, force_init)?;
        }
        self.axes.update(ctx, force_init)
    }

    /// Update objects added since the last frame
    fn update_new<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> Result<()> {
        for mesh in self.meshes.iter_mut().filter(|m| !m.is_initialized()) {
            mesh.update(ctx, false)?;
        }
        for cloud in self.point_clouds.iter_mut().filter(|c| !c.is_initialized()) {
            cloud.update(ctx, false)?;
        }
        if !self.axes.is_initialized() {
            self.axes.update(ctx, false)?;
        }
        Ok(())
    }

    fn set_lighting_uniforms<C: RenderContext + ?Sized>(&self, ctx: &mut C) {
        let view = self.camera.view_matrix();
        let view_to_world = view.try_inverse().unwrap_or_else(Matrix4::identity);
        let [x, y, z] = self.lighting.position;
        let light_position = (view_to_world * Vector4::new(x, y, z, 1.0)).xyz();
        let eye = self.camera.position().coords;
        for shader in [self.shaders.mesh_color, self.shaders.mesh_texture] {
            ctx.set_vec3(shader, "light.position", light_position);
            ctx.set_vec3(shader, "light.ambient", self.lighting.ambient.into());
            ctx.set_vec3(shader, "light.diffuse", self.lighting.diffuse.into());
            ctx.set_vec3(shader, "light.specular", self.lighting.specular.into());
            ctx.set_vec3(shader, "viewPos", eye);
        }
    }

    /// Render one frame.
    ///
    /// Runs `on_loop` first; when it reports changes every object is updated,
    /// otherwise only objects that were never uploaded.
    pub fn frame<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> Result<()> {
        ctx.collect_released();
        if run_callback!(self, on_loop).unwrap_or(false) {
            self.update_all(ctx, false)?;
        } else {
            self.update_new(ctx)?;
        }

        let [r, g, b] = self.config.background;
        ctx.clear([r, g, b, 1.0]);
        ctx.set_raster_state(RasterState {
            wireframe: self.config.wireframe,
            cull_face: self.config.cull_face,
        });
        self.set_lighting_uniforms(ctx);

        for mesh in &mut self.meshes {
            let shader = self.shaders.for_mesh(mesh.shading());
            mesh.draw(ctx, shader, &self.camera)?;
        }
        for cloud in &self.point_clouds {
            cloud.draw(ctx, self.shaders.points, &self.camera)?;
        }
        if self.config.draw_axes {
            self.axes.draw(ctx, self.shaders.points, &self.camera)?;
        }
        Ok(())
    }

    /// Dispatch one input event to the callbacks and the default handlers
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { key, action, mods } => self.handle_key(key, action, mods),
            InputEvent::MouseButton { button, action, mods } => self.handle_mouse_button(button, action, mods),
            InputEvent::MouseMove { x, y } => self.handle_mouse_move(x, y),
            InputEvent::Scroll { x_offset, y_offset } => {
                if run_callback!(self, on_scroll, x_offset, y_offset) != Some(false) {
                    self.camera.zoom_with_mouse(y_offset as f32);
                }
            }
            InputEvent::Resize { width, height } => {
                self.width = width;
                self.height = height;
                self.camera.set_viewport(width, height);
            }
        }
    }

    fn handle_key(&mut self, key: Key, action: Action, mods: Modifiers) {
        if run_callback!(self, on_key, key, action, mods) == Some(false) || action != Action::Press {
            return;
        }
        match key {
            Key::Escape | Key::Character('q') => self.request_close(),
            Key::Character('a') => self.config.draw_axes = !self.config.draw_axes,
            Key::Character('w') => self.config.wireframe = !self.config.wireframe,
            Key::Character('c') => self.config.cull_face = !self.config.cull_face,
            Key::Character('o') => self.camera.ortho = !self.camera.ortho,
            Key::Character('z') => self.camera.reset_view(),
            Key::Character('f') => self.fullscreen = !self.fullscreen,
            _ => {}
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, action: Action, mods: Modifiers) {
        if run_callback!(self, on_mouse_button, button, action, mods) == Some(false) {
            return;
        }
        match action {
            Action::Press => {
                self.mouse_button = Some(button);
                self.mouse_mods = mods;
            }
            Action::Release => self.mouse_button = None,
            Action::Repeat => {}
        }
    }

    fn handle_mouse_move(&mut self, x: f64, y: f64) {
        let previous = self.mouse.replace((x, y));
        if run_callback!(self, on_mouse_move, x, y) == Some(false) {
            return;
        }
        let Some((last_x, last_y)) = previous else {
            return;
        };
        let (dx, dy) = ((x - last_x) as f32, (y - last_y) as f32);
        match self.mouse_button {
            Some(MouseButton::Left) if self.mouse_mods.control => self.camera.roll_with_mouse(dx, dy),
            Some(MouseButton::Left) if self.mouse_mods.shift => self.camera.pan_with_mouse(dx, dy),
            Some(MouseButton::Left) => self.camera.rotate_with_mouse(dx, dy),
            Some(MouseButton::Middle) | Some(MouseButton::Right) => self.camera.pan_with_mouse(dx, dy),
            _ => {}
        }
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshscope_gpu::{GpuCall, HeadlessContext, Primitive, UniformValue};
    use std::cell::Cell;
    use std::rc::Rc;

    fn press(c: char) -> InputEvent {
        InputEvent::Key {
            key: Key::from_char(c),
            action: Action::Press,
            mods: Modifiers::default(),
        }
    }

    fn scene() -> Viewer {
        let mut viewer = Viewer::new();
        viewer.add_cube([0.0; 3], 1.0, [1.0, 0.5, 0.0]).unwrap();
        viewer.add_line([0.0; 3], [1.0; 3], [1.0; 3]);
        viewer
    }

    #[test]
    fn test_frame_draws_scene_and_axes() {
        let mut ctx = HeadlessContext::new();
        let mut viewer = scene();
        viewer.open(&mut ctx).unwrap();
        viewer.frame(&mut ctx).unwrap();

        let draws: Vec<&GpuCall> = ctx.draw_calls().collect();
        assert_eq!(draws.len(), 3);
        assert!(matches!(
            draws[0],
            GpuCall::DrawElements { primitive: Primitive::Triangles, count: 36, .. }
        ));

        ctx.clear_calls();
        viewer.handle_event(press('a'));
        viewer.frame(&mut ctx).unwrap();
        assert_eq!(ctx.draw_call_count(), 2);
    }

    #[test]
    fn test_frame_sets_background_and_raster_state() {
        let mut ctx = HeadlessContext::new();
        let mut viewer = scene();
        viewer.config.background = [0.1, 0.2, 0.3];
        viewer.open(&mut ctx).unwrap();
        viewer.handle_event(press('w'));
        viewer.handle_event(press('c'));
        viewer.frame(&mut ctx).unwrap();

        assert!(ctx.calls().contains(&GpuCall::Clear([0.1, 0.2, 0.3, 1.0])));
        assert!(ctx.calls().contains(&GpuCall::SetRasterState(RasterState {
            wireframe: true,
            cull_face: false,
        })));
    }

    #[test]
    fn test_light_follows_camera() {
        let mut ctx = HeadlessContext::new();
        let mut viewer = scene();
        viewer.lighting.position = [0.0, 0.0, 0.0];
        viewer.open(&mut ctx).unwrap();
        viewer.frame(&mut ctx).unwrap();

        // A light at the view-space origin sits at the camera position
        let Some(UniformValue::Vec3(light)) = ctx.uniform(viewer.shaders.mesh_texture, "light.position") else {
            panic!("light position not set");
        };
        assert_relative_eq!(*light, Vector3::new(0.0, 0.0, 3.0), epsilon = 1e-5);
        assert_eq!(
            ctx.uniform(viewer.shaders.mesh_color, "light.ambient"),
            Some(&UniformValue::Vec3(Vector3::new(0.2, 0.2, 0.2)))
        );
    }

    #[test]
    fn test_add_cube_moves_points() {
        let mut viewer = Viewer::new();
        let cube = viewer.add_cube([1.0, 2.0, 3.0], 2.0, [0.0, 1.0, 0.0]).unwrap();
        assert_eq!(cube.transform, Matrix4::identity());
        assert!(cube
            .vertices
            .iter()
            .all(|v| (v.position[0] - 1.0).abs() == 1.0 && (v.position[2] - 3.0).abs() == 1.0));
        assert_eq!(cube.textures.diffuse.len(), 1);
    }

    #[test]
    fn test_quit_keys_request_close() {
        let mut viewer = Viewer::new();
        viewer.handle_event(press('Q'));
        assert!(viewer.should_close());

        let mut viewer = Viewer::new();
        viewer.handle_event(InputEvent::Key {
            key: Key::Escape,
            action: Action::Press,
            mods: Modifiers::default(),
        });
        assert!(viewer.should_close());
    }

    #[test]
    fn test_key_callback_can_suppress_default() {
        let mut viewer = Viewer::new();
        viewer.callbacks.on_key = Some(Box::new(|_, key, _, _| key != Key::Character('a')));
        viewer.handle_event(press('a'));
        assert!(viewer.config.draw_axes);
        viewer.handle_event(press('w'));
        assert!(viewer.config.wireframe);
    }

    #[test]
    fn test_on_loop_change_updates_everything() {
        let mut ctx = HeadlessContext::new();
        let mut viewer = scene();
        let changed = Rc::new(Cell::new(false));
        let flag = changed.clone();
        viewer.callbacks.on_loop = Some(Box::new(move |_| flag.get()));
        viewer.open(&mut ctx).unwrap();

        let uploads = |ctx: &HeadlessContext| {
            ctx.calls()
                .iter()
                .filter(|c| matches!(c, GpuCall::UploadVertexData { .. }))
                .count()
        };
        ctx.clear_calls();
        viewer.frame(&mut ctx).unwrap();
        assert_eq!(uploads(&ctx), 0);

        changed.set(true);
        ctx.clear_calls();
        viewer.frame(&mut ctx).unwrap();
        assert_eq!(uploads(&ctx), 3);
    }

    #[test]
    fn test_objects_added_while_open_are_uploaded() {
        let mut ctx = HeadlessContext::new();
        let mut viewer = Viewer::new();
        viewer.open(&mut ctx).unwrap();
        viewer.add_square([0.0; 3], 1.0, [1.0; 3]).unwrap();
        viewer.frame(&mut ctx).unwrap();
        assert!(viewer.meshes[0].is_initialized());
    }

    #[test]
    fn test_close_releases_everything() {
        let mut ctx = HeadlessContext::new();
        let mut viewer = scene();
        let closed = Rc::new(Cell::new(false));
        let flag = closed.clone();
        viewer.callbacks.on_close = Some(Box::new(move |_| flag.set(true)));
        viewer.open(&mut ctx).unwrap();
        viewer.frame(&mut ctx).unwrap();
        viewer.close(&mut ctx);

        assert!(closed.get());
        assert!(!viewer.is_looping());
        assert_eq!(ctx.live_resource_count(), 0);
        assert_eq!(ctx.double_release_count(), 0);
    }

    #[test]
    fn test_left_drag_rotates_camera() {
        let mut viewer = Viewer::new();
        let yaw = viewer.camera.yaw;
        viewer.handle_event(InputEvent::MouseMove { x: 10.0, y: 10.0 });
        viewer.handle_event(InputEvent::MouseButton {
            button: MouseButton::Left,
            action: Action::Press,
            mods: Modifiers::default(),
        });
        viewer.handle_event(InputEvent::MouseMove { x: 30.0, y: 10.0 });
        assert!(viewer.camera.yaw > yaw);

        viewer.handle_event(InputEvent::MouseButton {
            button: MouseButton::Left,
            action: Action::Release,
            mods: Modifiers::default(),
        });
        let yaw = viewer.camera.yaw;
        viewer.handle_event(InputEvent::MouseMove { x: 60.0, y: 10.0 });
        assert_eq!(viewer.camera.yaw, yaw);
    }

    #[test]
    fn test_scroll_zooms_and_resize_sets_aspect() {
        let mut viewer = Viewer::new();
        viewer.handle_event(InputEvent::Scroll { x_offset: 0.0, y_offset: 1.0 });
        assert!(viewer.camera.dist_to_center < 3.0);
        viewer.handle_event(InputEvent::Resize { width: 800, height: 400 });
        assert_eq!(viewer.size(), (800, 400));
        assert_relative_eq!(viewer.camera.aspect, 2.0);
    }
}
