use glam::{Quat, Vec3};

use crate::math::{self, DIRECTION_EPSILON};

/// Corrections smaller than this (radians) are skipped.
const CORRECTION_EPSILON: f32 = 1e-4;

/// How a constrained joint is meant to move.
///
/// Solvers only enforce the min/max bend angle; the kind is kept for callers
/// that layer richer joint models on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LimitType {
    Hinge,
    #[default]
    Ball,
    Twist,
}

/// Angle limits for one bone of a chain, in radians.
///
/// The bend angle is measured between the parent→bone and parent→child directions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneConstraint {
    pub bone_index: usize,
    pub min_angle: Option<f32>,
    pub max_angle: Option<f32>,
    pub axis: Option<Vec3>,
    pub limit_type: LimitType,
    pub twist_min: Option<f32>,
    pub twist_max: Option<f32>,
    pub swing_limit: Option<f32>,
}

impl BoneConstraint {
    pub fn new(bone_index: usize) -> Self {
        Self {
            bone_index,
            min_angle: None,
            max_angle: None,
            axis: None,
            limit_type: LimitType::default(),
            twist_min: None,
            twist_max: None,
            swing_limit: None,
        }
    }

    pub fn hinge(bone_index: usize, min_angle: f32, max_angle: f32) -> Self {
        Self {
            limit_type: LimitType::Hinge,
            ..Self::new(bone_index).with_range(min_angle, max_angle)
        }
    }

    /// Cone limit of `swing_limit` radians; also caps the bend angle.
    pub fn ball(bone_index: usize, swing_limit: f32) -> Self {
        Self {
            limit_type: LimitType::Ball,
            swing_limit: Some(swing_limit),
            max_angle: Some(swing_limit),
            ..Self::new(bone_index)
        }
    }

    pub fn twist(bone_index: usize, twist_min: f32, twist_max: f32) -> Self {
        Self {
            limit_type: LimitType::Twist,
            twist_min: Some(twist_min),
            twist_max: Some(twist_max),
            ..Self::new(bone_index)
        }
    }

    pub fn from_degrees(bone_index: usize, min_degrees: f32, max_degrees: f32) -> Self {
        Self::new(bone_index).with_range(min_degrees.to_radians(), max_degrees.to_radians())
    }

    pub fn with_range(mut self, min_angle: f32, max_angle: f32) -> Self {
        self.min_angle = Some(min_angle.min(max_angle));
        self.max_angle = Some(max_angle.max(min_angle));
        self
    }

    pub fn with_min_angle(mut self, min_angle: f32) -> Self {
        self.min_angle = Some(min_angle);
        self
    }

    pub fn with_max_angle(mut self, max_angle: f32) -> Self {
        self.max_angle = Some(max_angle);
        self
    }

    pub fn with_axis(mut self, axis: Vec3) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Clamps `angle` into the configured bounds; unset bounds do not clamp.
    pub fn clamp_angle(&self, angle: f32) -> f32 {
        let mut clamped = angle;
        if let Some(min) = self.min_angle {
            clamped = clamped.max(min);
        }
        if let Some(max) = self.max_angle {
            clamped = clamped.min(max);
        }
        clamped
    }
}

/// Pulls every constrained interior joint back inside its bend limits.
///
/// The joint is rotated about its parent, so the parent→joint length is kept.
/// Constraints on the root or the end effector are ignored.
pub fn apply_angle_constraints(positions: &mut [Vec3], constraints: &[BoneConstraint]) {
    let n = positions.len();
    if n < 3 {
        return;
    }

    for constraint in constraints {
        let idx = constraint.bone_index;
        if idx == 0 || idx >= n - 1 {
            log::debug!("ignoring constraint on bone {} of a {}-bone chain", idx, n);
            continue;
        }

        let parent = positions[idx - 1];
        let current = positions[idx];
        let child = positions[idx + 1];

        let to_current = current - parent;
        let to_child = child - parent;
        if to_current.length() < DIRECTION_EPSILON || to_child.length() < DIRECTION_EPSILON {
            continue;
        }

        let angle = to_current.angle_between(to_child);
        let correction = constraint.clamp_angle(angle) - angle;
        if correction.abs() < CORRECTION_EPSILON {
            continue;
        }

        let Some(axis) = math::rotation_axis(to_child, to_current) else {
            continue;
        };

        positions[idx] = parent + Quat::from_axis_angle(axis, correction) * to_current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bend_angle(positions: &[Vec3], idx: usize) -> f32 {
        let parent = positions[idx - 1];
        (positions[idx] - parent).angle_between(positions[idx + 1] - parent)
    }

    #[test]
    fn clamp_angle_respects_unset_bounds() {
        let only_max = BoneConstraint::new(1).with_max_angle(0.5);
        assert_eq!(only_max.clamp_angle(-3.0), -3.0);
        assert_eq!(only_max.clamp_angle(1.0), 0.5);

        let hinge = BoneConstraint::hinge(1, 0.2, 0.4);
        assert_eq!(hinge.clamp_angle(0.0), 0.2);
        assert_eq!(hinge.limit_type, LimitType::Hinge);
    }

    #[test]
    fn widens_a_joint_below_min_angle() {
        let mut positions = vec![
            Vec3::ZERO,
            Vec3::new(0.1, 1.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let before_len = (positions[1] - positions[0]).length();
        let constraints = [BoneConstraint::new(1).with_min_angle(0.3)];

        apply_angle_constraints(&mut positions, &constraints);

        assert!((bend_angle(&positions, 1) - 0.3).abs() < 1e-4);
        assert!(((positions[1] - positions[0]).length() - before_len).abs() < 1e-5);
        assert!(positions[1].x > 0.1);
    }

    #[test]
    fn narrows_a_joint_above_max_angle() {
        let mut positions = vec![Vec3::ZERO, Vec3::new(1.0, 0.2, 0.0), Vec3::new(0.0, 2.0, 0.0)];
        let constraints = [BoneConstraint::ball(1, 0.5)];

        apply_angle_constraints(&mut positions, &constraints);

        assert!((bend_angle(&positions, 1) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn ignores_end_indices_and_colinear_joints() {
        let original = vec![Vec3::ZERO, Vec3::Y, Vec3::new(0.0, 2.0, 0.0)];

        let mut positions = original.clone();
        apply_angle_constraints(
            &mut positions,
            &[BoneConstraint::new(0).with_min_angle(1.0), BoneConstraint::new(2).with_min_angle(1.0)],
        );
        assert_eq!(positions, original);

        // Colinear: the rotation axis is degenerate, so nothing moves.
        apply_angle_constraints(&mut positions, &[BoneConstraint::new(1).with_min_angle(1.0)]);
        assert_eq!(positions, original);
    }
}
