use crate::{Matrix3, Quaternion, Vector3};
use nalgebra::Rotation3;

/// A 4x3 affine transform: a 3x3 linear part plus a translation, stored without the trailing
/// `[0 0 0 1]` row a full 4x4 homogeneous matrix would carry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine3 {
    pub linear: Matrix3,
    pub translation: Vector3,
}

impl Affine3 {
    pub fn identity() -> Affine3 {
        Affine3 {
            linear: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn from_trs(translation: Vector3, rotation: Quaternion, scale: Vector3) -> Affine3 {
        let rotation_matrix = rotation.to_rotation_matrix();
        let scale_matrix = Matrix3::new(
            scale.x, 0.0, 0.0, //
            0.0, scale.y, 0.0, //
            0.0, 0.0, scale.z,
        );
        Affine3 {
            linear: rotation_matrix.matrix() * scale_matrix,
            translation,
        }
    }

    /// `self * rhs`, i.e. `self` is the parent and `rhs` the child's local transform.
    pub fn compose(&self, rhs: &Affine3) -> Affine3 {
        Affine3 {
            linear: self.linear * rhs.linear,
            translation: self.linear * rhs.translation + self.translation,
        }
    }

    pub fn transform_point(&self, p: Vector3) -> Vector3 {
        self.linear * p + self.translation
    }

    /// Full affine inverse: `None` if the linear part is singular (collapsed scale), matching the
    /// same "never invert a singular linear part" boundary the abs-space setters rely on.
    pub fn inverse(&self) -> Option<Affine3> {
        let inv_linear = self.linear.try_inverse()?;
        Some(Affine3 {
            linear: inv_linear,
            translation: -(inv_linear * self.translation),
        })
    }

    /// Decomposes back into translation/rotation/non-uniform-scale, assuming the linear part
    /// carries no shear (true for every transform this engine ever constructs via `from_trs`).
    /// Returns `None` if any axis has collapsed to zero scale, matching the "never invert a
    /// singular linear part" boundary behavior the abs-space setters rely on.
    pub fn decompose(&self) -> Option<(Vector3, Quaternion, Vector3)> {
        let col0 = self.linear.column(0).into_owned();
        let col1 = self.linear.column(1).into_owned();
        let col2 = self.linear.column(2).into_owned();
        let scale = Vector3::new(col0.norm(), col1.norm(), col2.norm());
        if scale.x == 0.0 || scale.y == 0.0 || scale.z == 0.0 {
            return None;
        }
        let rotation_matrix =
            Matrix3::from_columns(&[col0 / scale.x, col1 / scale.y, col2 / scale.z]);
        let rotation = Quaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
            rotation_matrix,
        ));
        Some((self.translation, rotation, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_composes_to_identity() {
        let child = Affine3::from_trs(Vector3::new(1.0, 2.0, 3.0), Quaternion::identity(), Vector3::new(1.0, 1.0, 1.0));
        let composed = Affine3::identity().compose(&child);
        assert_eq!(composed.translation, child.translation);
    }

    #[test]
    fn transform_propagation_matches_scenario() {
        let parent = Affine3::from_trs(Vector3::new(10.0, 0.0, 0.0), Quaternion::identity(), Vector3::new(1.0, 1.0, 1.0));
        let child_local = Affine3::from_trs(Vector3::new(1.0, 0.0, 0.0), Quaternion::identity(), Vector3::new(1.0, 1.0, 1.0));
        let child_abs = parent.compose(&child_local);
        assert_eq!(child_abs.translation, Vector3::new(11.0, 0.0, 0.0));
    }

    #[test]
    fn zero_scale_decompose_returns_none() {
        let degenerate = Affine3::from_trs(Vector3::zeros(), Quaternion::identity(), Vector3::new(0.0, 1.0, 1.0));
        assert!(degenerate.decompose().is_none());
    }

    #[test]
    fn inverse_undoes_compose() {
        let parent = Affine3::from_trs(Vector3::new(10.0, 0.0, 0.0), Quaternion::identity(), Vector3::new(2.0, 2.0, 2.0));
        let inv = parent.inverse().unwrap();
        let point = Vector3::new(12.0, 0.0, 0.0);
        let local = inv.transform_point(point);
        assert_eq!(local, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn singular_linear_has_no_inverse() {
        let degenerate = Affine3::from_trs(Vector3::zeros(), Quaternion::identity(), Vector3::new(0.0, 1.0, 1.0));
        assert!(degenerate.inverse().is_none());
    }
}
