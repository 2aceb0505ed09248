//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The hierarchy stores plain [`Mat4`]s; [`Transform`]
//! is the translation/rotation/scale form most scene code wants to write.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// A 3D transform: position, rotation, and scale.
///
/// Converted to a local matrix with [`matrix`](Transform::matrix) when handed
/// to [`World::set_transform`](crate::ecs::World::set_transform).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Create a transform at the given 2D position (z = 0).
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self::from_xyz(x, y, 0.0)
    }

    /// Return a copy rotated by `angle` radians about `axis`.
    pub fn with_rotation(mut self, axis: Vec3, angle: f32) -> Self {
        self.rotation = Quat::from_axis_angle(axis.normalize(), angle);
        self
    }

    /// Recover translation, rotation and scale from an affine matrix.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix() {
        assert_eq!(Transform::IDENTITY.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn matrix_round_trips_through_trs() {
        let t = Transform::from_xyz(1.0, -2.0, 3.0)
            .with_rotation(Vec3::Y, 0.5)
            .with_scale(2.0);
        let back = Transform::from_matrix(t.matrix());
        assert!(back.translation.abs_diff_eq(t.translation, 1e-5));
        assert!(back.scale.abs_diff_eq(t.scale, 1e-5));
        assert!(back.matrix().abs_diff_eq(t.matrix(), 1e-5));
    }

    #[test]
    fn scale_applies_before_translation() {
        let m = Transform::from_xy(10.0, 0.0).with_scale(2.0).matrix();
        assert_eq!(m.transform_point3(Vec3::X), Vec3::new(12.0, 0.0, 0.0));
    }
}
