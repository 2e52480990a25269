//! Local transform model shared by meshes and point clouds

use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::vertex::{Point3f, Row3};

/// Objects carrying a 4x4 local transform.
///
/// Implementors only expose their matrix; the mutators are provided and all
/// return `&mut Self` so calls can be chained:
///
/// ```
/// # use meshscope_core::{Transformable, Matrix4, Vector3};
/// # struct Obj(Matrix4<f32>);
/// # impl Transformable for Obj {
/// #     fn transform(&self) -> &Matrix4<f32> { &self.0 }
/// #     fn transform_mut(&mut self) -> &mut Matrix4<f32> { &mut self.0 }
/// # }
/// let mut obj = Obj(Matrix4::identity());
/// obj.translate(&Vector3::new(1.0, 0.0, 0.0)).scale_uniform(2.0);
/// assert_eq!(obj.transform()[(0, 0)], 2.0);
/// ```
pub trait Transformable {
    fn transform(&self) -> &Matrix4<f32>;

    fn transform_mut(&mut self) -> &mut Matrix4<f32>;

    /// Add `v` to the translation column
    fn translate(&mut self, v: &Vector3<f32>) -> &mut Self {
        let mut column = self.transform_mut().fixed_view_mut::<3, 1>(0, 3);
        column += v;
        self
    }

    /// Overwrite the translation column
    fn set_translation(&mut self, v: &Vector3<f32>) -> &mut Self {
        self.transform_mut().fixed_view_mut::<3, 1>(0, 3).copy_from(v);
        self
    }

    /// Left-multiply the upper-left 3x3 block by `rotation`
    fn rotate(&mut self, rotation: &Matrix3<f32>) -> &mut Self {
        let block = rotation * self.transform().fixed_view::<3, 3>(0, 0);
        self.transform_mut().fixed_view_mut::<3, 3>(0, 0).copy_from(&block);
        self
    }

    /// Multiply every column of the 3x3 block elementwise by `k`.
    ///
    /// Row `i` of the block is scaled by `k[i]`, so this does not commute
    /// with [`rotate`](Self::rotate).
    fn scale(&mut self, k: &Vector3<f32>) -> &mut Self {
        let mut block = self.transform_mut().fixed_view_mut::<3, 3>(0, 0);
        for mut column in block.column_iter_mut() {
            column.component_mul_assign(k);
        }
        self
    }

    fn scale_uniform(&mut self, k: f32) -> &mut Self {
        self.scale(&Vector3::repeat(k))
    }

    /// Left-multiply the whole transform by `m`
    fn apply_transform(&mut self, m: &Matrix4<f32>) -> &mut Self {
        let composed = m * self.transform();
        *self.transform_mut() = composed;
        self
    }

    fn set_transform(&mut self, m: &Matrix4<f32>) -> &mut Self {
        *self.transform_mut() = *m;
        self
    }

    /// Current translation column
    fn translation(&self) -> Vector3<f32> {
        self.transform().fixed_view::<3, 1>(0, 3).into_owned()
    }
}

/// Inverse-transpose of the upper-left 3x3 block of `model`.
///
/// Singular blocks fall back to the identity.
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let block: Matrix3<f32> = model.fixed_view::<3, 3>(0, 0).into_owned();
    block
        .try_inverse()
        .map(|inv| inv.transpose())
        .unwrap_or_else(Matrix3::identity)
}

/// Apply `m` to a position row, treating it as a point
pub fn transform_position(m: &Matrix4<f32>, position: &Row3) -> Row3 {
    let p = m.transform_point(&Point3f::from(*position));
    [p.x, p.y, p.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Probe {
        matrix: Matrix4<f32>,
    }

    impl Probe {
        fn new() -> Self {
            Self { matrix: Matrix4::identity() }
        }
    }

    impl Transformable for Probe {
        fn transform(&self) -> &Matrix4<f32> {
            &self.matrix
        }
        fn transform_mut(&mut self) -> &mut Matrix4<f32> {
            &mut self.matrix
        }
    }

    fn rot_z_90() -> Matrix3<f32> {
        Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_translations_accumulate() {
        let mut p = Probe::new();
        p.translate(&Vector3::new(1.0, 2.0, 3.0))
            .translate(&Vector3::new(-0.5, 0.5, 1.0));
        assert_relative_eq!(p.translation(), Vector3::new(0.5, 2.5, 4.0));
    }

    #[test]
    fn test_set_translation_overwrites() {
        let mut p = Probe::new();
        p.translate(&Vector3::new(1.0, 1.0, 1.0))
            .set_translation(&Vector3::new(0.0, 5.0, 0.0));
        assert_eq!(p.translation(), Vector3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_scale_then_rotate_differs_from_rotate_then_scale() {
        let k = Vector3::new(2.0, 1.0, 1.0);

        let mut a = Probe::new();
        a.scale(&k).rotate(&rot_z_90());
        let mut b = Probe::new();
        b.rotate(&rot_z_90()).scale(&k);

        assert!((a.matrix - b.matrix).norm() > 1e-3);
    }

    #[test]
    fn test_scale_multiplies_each_column_by_k() {
        let mut p = Probe::new();
        let k = Vector3::new(2.0, 3.0, 4.0);
        p.rotate(&rot_z_90()).scale(&k);
        let block = p.matrix.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(block, Matrix3::from_diagonal(&k) * rot_z_90());
    }

    #[test]
    fn test_scale_leaves_translation() {
        let mut p = Probe::new();
        p.translate(&Vector3::new(1.0, 1.0, 1.0)).scale_uniform(5.0);
        assert_eq!(p.translation(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(p.matrix[(1, 1)], 5.0);
    }

    #[test]
    fn test_rotate_keeps_translation() {
        let mut p = Probe::new();
        p.translate(&Vector3::new(1.0, 0.0, 0.0)).rotate(&rot_z_90());
        assert_eq!(p.translation(), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_apply_transform_left_multiplies() {
        let mut p = Probe::new();
        p.translate(&Vector3::new(1.0, 0.0, 0.0));
        let rot = rot_z_90().to_homogeneous();
        p.apply_transform(&rot);
        // Left multiplication rotates the translation as well
        assert_relative_eq!(p.translation(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_set_transform_replaces() {
        let mut p = Probe::default();
        p.set_transform(&Matrix4::new_scaling(3.0));
        assert_eq!(p.matrix, Matrix4::new_scaling(3.0));
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        let model = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 4.0, 1.0));
        let nm = normal_matrix(&model);
        assert_relative_eq!(nm, Matrix3::from_diagonal(&Vector3::new(0.5, 0.25, 1.0)));
    }

    #[test]
    fn test_normal_matrix_of_singular_block_is_identity() {
        let model = Matrix4::new_nonuniform_scaling(&Vector3::new(0.0, 1.0, 1.0));
        assert_eq!(normal_matrix(&model), Matrix3::identity());
    }

    #[test]
    fn test_transform_position() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(transform_position(&m, &[1.0, 1.0, 1.0]), [2.0, 3.0, 4.0]);
    }
}
