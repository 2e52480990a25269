//! Orbit camera for the viewer

use meshscope_core::{Matrix4, ViewProjection};
use nalgebra::{Orthographic3, Perspective3, Point3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

/// Pitch stays just short of straight up or down so `front x world_up` is defined
const MAX_PITCH: f32 = FRAC_PI_2 - 0.01;

/// View parameters restored by [`Camera::reset_view`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ViewState {
    center_of_rot: Vector3<f32>,
    dist_to_center: f32,
    yaw: f32,
    pitch: f32,
    roll: f32,
}

/// A camera orbiting a center of rotation.
///
/// The position is derived: `center_of_rot - dist_to_center * front`, where
/// `front` follows from `yaw` and `pitch`. `roll` turns the up vector around
/// `front`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center_of_rot: Vector3<f32>,
    pub world_up: Vector3<f32>,
    pub dist_to_center: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub ortho: bool,
    /// Vertical field of view in radians
    pub fovy: f32,
    pub aspect: f32,
    pub z_close: f32,
    pub z_far: f32,
    pub pan_speed: f32,
    pub rotate_speed: f32,
    /// Distance factor per scroll step
    pub scroll_factor: f32,
    home: ViewState,
}

impl Camera {
    /// Camera looking at `center_of_rot` from `dist_to_center` along -z
    pub fn new(center_of_rot: Vector3<f32>, dist_to_center: f32) -> Self {
        let mut camera = Self {
            center_of_rot,
            world_up: Vector3::y(),
            dist_to_center,
            yaw: -FRAC_PI_2,
            pitch: 0.0,
            roll: 0.0,
            ortho: false,
            fovy: FRAC_PI_4,
            aspect: 5.0 / 3.0,
            z_close: 0.01,
            z_far: 1e3,
            pan_speed: 0.0015,
            rotate_speed: 0.008,
            scroll_factor: 1.1,
            home: ViewState {
                center_of_rot,
                dist_to_center,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
            },
        };
        camera.set_home();
        camera
    }

    /// Unit vector from the camera towards the center of rotation
    pub fn front(&self) -> Vector3<f32> {
        Vector3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Unit vector to the right of the view
    pub fn right(&self) -> Vector3<f32> {
        let front = self.front();
        let right = front.cross(&self.world_up).normalize();
        if self.roll == 0.0 {
            return right;
        }
        Rotation3::from_axis_angle(&Unit::new_normalize(front), self.roll) * right
    }

    /// Unit up vector of the view, including roll
    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(&self.front()).normalize()
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::from(self.center_of_rot - self.dist_to_center * self.front())
    }

    /// Turn around the center of rotation by a mouse offset in pixels
    pub fn rotate_with_mouse(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.rotate_speed;
        self.pitch = (self.pitch - y_offset * self.rotate_speed).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Roll around the view direction by a horizontal mouse offset
    pub fn roll_with_mouse(&mut self, x_offset: f32, _y_offset: f32) {
        self.roll += x_offset * self.rotate_speed;
    }

    /// Move the center of rotation in the view plane; faster when far away
    pub fn pan_with_mouse(&mut self, x_offset: f32, y_offset: f32) {
        let scale = self.pan_speed * self.dist_to_center;
        self.center_of_rot += (self.up() * y_offset - self.right() * x_offset) * scale;
    }

    /// Move towards (positive `amount`) or away from the center of rotation
    pub fn zoom_with_mouse(&mut self, amount: f32) {
        self.dist_to_center *= self.scroll_factor.powf(-amount);
    }

    /// Remember the current view as the one [`reset_view`](Self::reset_view) returns to
    pub fn set_home(&mut self) {
        self.home = ViewState {
            center_of_rot: self.center_of_rot,
            dist_to_center: self.dist_to_center,
            yaw: self.yaw,
            pitch: self.pitch,
            roll: self.roll,
        };
    }

    pub fn reset_view(&mut self) {
        let home = self.home;
        self.center_of_rot = home.center_of_rot;
        self.dist_to_center = home.dist_to_center;
        self.yaw = home.yaw;
        self.pitch = home.pitch;
        self.roll = home.roll;
    }

    /// Aspect ratio from a framebuffer size; ignores empty sizes
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector3::zeros(), 3.0)
    }
}

impl ViewProjection for Camera {
    fn view_matrix(&self) -> Matrix4<f32> {
        let eye = self.position();
        Matrix4::look_at_rh(&eye, &Point3::from(self.center_of_rot), &self.up())
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        if self.ortho {
            let half_height = self.dist_to_center * (self.fovy * 0.5).tan();
            let half_width = half_height * self.aspect;
            Orthographic3::new(-half_width, half_width, -half_height, half_height, self.z_close, self.z_far)
                .into_inner()
        } else {
            Perspective3::new(self.aspect, self.fovy, self.z_close, self.z_far).into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.position(), Point3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
        assert_relative_eq!(camera.front(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(camera.up(), Vector3::y(), epsilon = 1e-6);

        let center = camera.view_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(center, Vector4::new(0.0, 0.0, -3.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_zoom_scales_distance() {
        let mut camera = Camera::default();
        camera.zoom_with_mouse(1.0);
        assert_relative_eq!(camera.dist_to_center, 3.0 / 1.1, epsilon = 1e-6);
        camera.zoom_with_mouse(-1.0);
        assert_relative_eq!(camera.dist_to_center, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.rotate_with_mouse(0.0, -1e5);
        assert_relative_eq!(camera.pitch, MAX_PITCH);
        assert!(camera.view_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pan_moves_center_in_view_plane() {
        let mut camera = Camera::default();
        camera.pan_with_mouse(100.0, 0.0);
        assert!(camera.center_of_rot.x < 0.0);
        assert_relative_eq!(camera.center_of_rot.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_roll_turns_up_vector() {
        let mut camera = Camera::default();
        camera.roll = FRAC_PI_2;
        assert_relative_eq!(camera.up().dot(&Vector3::y()), 0.0, epsilon = 1e-6);
        assert_relative_eq!(camera.up().dot(&camera.front()), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reset_returns_home() {
        let mut camera = Camera::default();
        camera.dist_to_center = 5.0;
        camera.set_home();
        camera.rotate_with_mouse(40.0, 12.0);
        camera.pan_with_mouse(3.0, 4.0);
        camera.zoom_with_mouse(2.0);
        camera.reset_view();
        assert_relative_eq!(camera.position(), Point3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_projection_is_affine() {
        let mut camera = Camera::default();
        camera.ortho = true;
        let proj = camera.projection_matrix();
        assert_eq!(proj[(3, 2)], 0.0);
        assert_eq!(proj[(3, 3)], 1.0);
    }
}
