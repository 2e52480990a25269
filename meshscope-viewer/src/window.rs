//! Native window runner built on winit and wgpu

use crate::input::{Action, InputEvent, Key, Modifiers, MouseButton};
use crate::viewer::Viewer;
use meshscope_core::{Error, Result};
use meshscope_gpu::{GpuContext, WgpuContext};
use std::sync::Arc;
use winit::{
    event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key as WinitKey, ModifiersState, NamedKey},
    window::{Fullscreen, Window, WindowBuilder},
};

fn window_error(what: &str, e: impl std::fmt::Display) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", what, e)))
}

fn modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        control: state.control_key(),
        alt: state.alt_key(),
        logo: state.super_key(),
    }
}

fn key_event(event: &KeyEvent, mods: Modifiers) -> InputEvent {
    let key = match &event.logical_key {
        WinitKey::Character(text) => text.chars().next().map(Key::from_char).unwrap_or(Key::Other),
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        _ => Key::Other,
    };
    let action = match (event.state, event.repeat) {
        (ElementState::Released, _) => Action::Release,
        (ElementState::Pressed, true) => Action::Repeat,
        (ElementState::Pressed, false) => Action::Press,
    };
    InputEvent::Key { key, action, mods }
}

fn mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        _ => MouseButton::Other,
    }
}

/// Translate a window event into a viewer event, if the viewer cares about it
fn input_event(event: &WindowEvent, mods: Modifiers) -> Option<InputEvent> {
    match event {
        WindowEvent::KeyboardInput { event, .. } => Some(key_event(event, mods)),
        WindowEvent::MouseInput { state, button, .. } => Some(InputEvent::MouseButton {
            button: mouse_button(*button),
            action: match state {
                ElementState::Pressed => Action::Press,
                ElementState::Released => Action::Release,
            },
            mods,
        }),
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::MouseMove {
            x: position.x,
            y: position.y,
        }),
        WindowEvent::MouseWheel { delta, .. } => {
            let (x_offset, y_offset) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (*x as f64, *y as f64),
                MouseScrollDelta::PixelDelta(pos) => (pos.x / 100.0, pos.y / 100.0),
            };
            Some(InputEvent::Scroll { x_offset, y_offset })
        }
        WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => Some(InputEvent::Resize {
            width: size.width,
            height: size.height,
        }),
        _ => None,
    }
}

/// Surface plus the rendering context drawing into it
struct WindowTarget {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    ctx: WgpuContext,
}

impl WindowTarget {
    fn new(window: Arc<Window>) -> Result<Self> {
        let instance = GpuContext::instance();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| window_error("Failed to create surface", e))?;
        let gpu = pollster::block_on(GpuContext::for_surface(instance, &surface))?;

        let caps = surface.get_capabilities(&gpu.adapter);
        // Textures are uploaded as linear Rgba8Unorm, so skip sRGB encoding
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("surface reports no formats".to_string()))?;
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        log::debug!("surface format {:?}, {}x{}", format, config.width, config.height);

        Ok(Self {
            window,
            surface,
            config,
            ctx: WgpuContext::new(gpu, format),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.ctx.gpu().device, &self.config);
    }

    fn render(&mut self, viewer: &mut Viewer) -> Result<()> {
        viewer.frame(&mut self.ctx)?;
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.ctx.gpu().device, &self.config);
                self.window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to acquire frame: {}", e))),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.ctx.submit_frame(&view, self.config.width, self.config.height)?;
        frame.present();
        Ok(())
    }
}

/// Open a window showing the viewer's scene and run until it closes.
///
/// Blocks the calling thread; on most platforms this must be the main thread.
pub fn show(mut viewer: Viewer) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| window_error("Failed to create event loop", e))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(viewer.config.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(viewer.config.width, viewer.config.height))
            .build(&event_loop)
            .map_err(|e| window_error("Failed to create window", e))?,
    );

    let mut target = WindowTarget::new(window.clone())?;
    let size = window.inner_size();
    viewer.handle_event(InputEvent::Resize {
        width: size.width.max(1),
        height: size.height.max(1),
    });
    viewer.open(&mut target.ctx)?;

    let mut failure: Option<Error> = None;
    let failure_slot = &mut failure;
    let mut mods = Modifiers::default();
    let mut closed = false;

    event_loop
        .run(move |event, elwt| {
            if closed {
                return;
            }
            elwt.set_control_flow(if viewer.config.loop_wait_events {
                ControlFlow::Wait
            } else {
                ControlFlow::Poll
            });

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => viewer.request_close(),
                    WindowEvent::ModifiersChanged(state) => mods = modifiers(state.state()),
                    WindowEvent::RedrawRequested => {
                        if let Err(e) = target.render(&mut viewer) {
                            log::error!("frame failed: {}", e);
                            *failure_slot = Some(e);
                            viewer.request_close();
                        }
                    }
                    other => {
                        if let Some(input) = input_event(&other, mods) {
                            if let InputEvent::Resize { width, height } = input {
                                target.resize(width, height);
                            }
                            viewer.handle_event(input);
                            window.request_redraw();
                        }
                    }
                },
                Event::AboutToWait => {
                    if viewer.fullscreen() != window.fullscreen().is_some() {
                        window.set_fullscreen(viewer.fullscreen().then_some(Fullscreen::Borderless(None)));
                    }
                    if !viewer.config.loop_wait_events {
                        window.request_redraw();
                    }
                }
                _ => {}
            }

            if viewer.should_close() {
                viewer.close(&mut target.ctx);
                closed = true;
                elwt.exit();
            }
        })
        .map_err(|e| window_error("Event loop error", e))?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl Viewer {
    /// Show this viewer in a native window; see [`show`]
    pub fn show(self) -> Result<()> {
        show(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn test_resize_to_zero_is_dropped() {
        let mods = Modifiers::default();
        assert_eq!(input_event(&WindowEvent::Resized(PhysicalSize::new(0, 10)), mods), None);
        assert_eq!(
            input_event(&WindowEvent::Resized(PhysicalSize::new(640, 480)), mods),
            Some(InputEvent::Resize { width: 640, height: 480 })
        );
    }

    #[test]
    fn test_modifier_translation() {
        let mods = modifiers(ModifiersState::SHIFT | ModifiersState::CONTROL);
        assert!(mods.shift && mods.control && !mods.alt && !mods.logo);
    }

    #[test]
    fn test_button_translation() {
        assert_eq!(mouse_button(winit::event::MouseButton::Middle), MouseButton::Middle);
        assert_eq!(mouse_button(winit::event::MouseButton::Back), MouseButton::Other);
    }
}
