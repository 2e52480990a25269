//! Core traits for meshscope

use nalgebra::Matrix4;

/// Anything able to supply view and projection matrices for a frame
pub trait ViewProjection {
    /// World to view space
    fn view_matrix(&self) -> Matrix4<f32>;

    /// View to clip space
    fn projection_matrix(&self) -> Matrix4<f32>;

    /// Product `projection * view`
    fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Fixed view and projection matrices.
///
/// Useful for offscreen rendering and tests where no interactive camera exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }
}

impl ViewProjection for CameraMatrices {
    fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_view_projection_order() {
        let cam = CameraMatrices {
            view: Matrix4::new_translation(&Vector3::new(0.0, 0.0, -5.0)),
            projection: Matrix4::new_scaling(2.0),
        };
        assert_eq!(cam.view_projection(), cam.projection * cam.view);
        assert_eq!(cam.view_projection()[(2, 3)], -10.0);
    }
}
