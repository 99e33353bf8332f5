use glam::{Mat3, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Forward axis. Nodes look down `-Z`.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (point * self.scale) + self.position
    }

    /// Composes `self` (parent) with `local` (child) into the child's world transform.
    pub fn mul_transform(&self, local: &Self) -> Self {
        Self {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
            scale: self.scale * local.scale,
        }
    }

    /// Rotation whose `-Z` axis points along `forward` with `+Y` as close to `up` as possible.
    ///
    /// Returns `None` when `forward` is zero or parallel to `up`.
    pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
        let forward = forward.try_normalize()?;
        let right = forward.cross(up).try_normalize()?;
        let corrected_up = right.cross(forward);

        Some(Quat::from_mat3(&Mat3::from_cols(right, corrected_up, -forward)).normalize())
    }

    /// Builds a transform at `position` looking at `target`.
    ///
    /// Falls back to `+Z` as the up hint when the view direction is vertical,
    /// and to the identity rotation when `target` coincides with `position`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let forward = target - position;
        let rotation = Self::look_rotation(forward, up)
            .or_else(|| Self::look_rotation(forward, Vec3::Z))
            .unwrap_or(Quat::IDENTITY);

        Self::from_position_rotation(position, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let t = Transform::look_at(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), Vec3::Y);
        assert!((t.forward() - Vec3::X).length() < 1e-5);
        assert!((t.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn look_at_vertical_uses_fallback_up() {
        let t = Transform::look_at(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!((t.forward() - Vec3::Y).length() < 1e-5);
        assert!(t.rotation.is_finite());
    }

    #[test]
    fn mul_transform_composes_parent_and_child() {
        let parent = Transform::from_position_rotation(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let child = Transform::from_position(Vec3::Y);
        let world = parent.mul_transform(&child);
        assert!((world.position - Vec3::new(0.0, 0.0, 0.0)).length() < 1e-5);
    }
}
