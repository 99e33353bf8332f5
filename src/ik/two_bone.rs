use crate::math;
use crate::scene::{BoneId, SceneGraph};
use glam::{Quat, Vec3};

/// Floor applied to every triangle side before dividing.
const MIN_SIDE: f32 = 1e-4;

/// Keeps the limb just short of full extension, where the bend plane is undefined.
const MAX_REACH_FACTOR: f32 = 0.9999;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TwoBoneResult {
    pub mid_position: Vec3,
    pub end_position: Vec3,
    /// World rotation of the upper bone (root→mid).
    pub upper_rotation: Quat,
    /// World rotation of the lower bone (mid→end).
    pub lower_rotation: Quat,
}

/// Closed-form solver for exactly two bones (shoulder/elbow/wrist, hip/knee/ankle).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBoneSolver {
    /// Local axis each bone points along towards its child. Default `+Y`.
    pub reference_axis: Vec3,
}

impl Default for TwoBoneSolver {
    fn default() -> Self {
        Self {
            reference_axis: Vec3::Y,
        }
    }
}

impl TwoBoneSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference_axis(mut self, axis: Vec3) -> Self {
        self.reference_axis = math::direction(axis).unwrap_or(Vec3::Y);
        self
    }

    /// Places the mid joint with the law of cosines, bending towards `pole`.
    ///
    /// Never fails: zero lengths and coincident points collapse to a stable
    /// pose instead of NaN.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &self,
        root: Vec3,
        mid: Vec3,
        end: Vec3,
        target: Vec3,
        pole: Vec3,
        upper_length: f32,
        lower_length: f32,
    ) -> TwoBoneResult {
        let upper = upper_length.max(MIN_SIDE);
        let lower = lower_length.max(MIN_SIDE);

        let to_target = target - root;
        let reach = (upper_length.max(0.0) + lower_length.max(0.0)) * MAX_REACH_FACTOR;
        let distance = to_target.length().min(reach).max(MIN_SIDE);

        let target_dir = math::direction(to_target)
            .or_else(|| math::direction_between(root, end))
            .or_else(|| math::direction_between(root, mid))
            .unwrap_or(self.reference_axis);

        let cos_root = (upper * upper + distance * distance - lower * lower) / (2.0 * upper * distance);
        let root_angle = cos_root.clamp(-1.0, 1.0).acos();

        let bend_axis = math::rotation_axis(target_dir, pole - root)
            .or_else(|| math::rotation_axis(target_dir, mid - root))
            .unwrap_or_else(|| math::perpendicular(target_dir));

        let upper_dir = Quat::from_axis_angle(bend_axis, root_angle) * target_dir;
        let mid_position = root + upper_dir * upper_length.max(0.0);

        let reach_point = root + target_dir * distance;
        let lower_dir = math::direction_between(mid_position, reach_point).unwrap_or(upper_dir);
        let end_position = mid_position + lower_dir * lower_length.max(0.0);

        TwoBoneResult {
            mid_position,
            end_position,
            upper_rotation: Quat::from_rotation_arc(self.reference_axis, upper_dir),
            lower_rotation: Quat::from_rotation_arc(self.reference_axis, lower_dir),
        }
    }

    /// Solves a limb straight from the scene and writes parent-local
    /// rotations onto `root` and `mid`.
    pub fn solve_limb<S: SceneGraph + ?Sized>(
        &self,
        scene: &mut S,
        root: BoneId,
        mid: BoneId,
        end: BoneId,
        target: Vec3,
        pole: Vec3,
    ) -> TwoBoneResult {
        let root_pos = scene.world_position(root);
        let mid_pos = scene.world_position(mid);
        let end_pos = scene.world_position(end);

        let result = self.solve(
            root_pos,
            mid_pos,
            end_pos,
            target,
            pole,
            (mid_pos - root_pos).length(),
            (end_pos - mid_pos).length(),
        );

        let root_parent = scene.parent_world_orientation(root);
        scene.set_local_orientation(root, math::to_local(root_parent, result.upper_rotation));
        scene.set_local_orientation(mid, math::to_local(result.upper_rotation, result.lower_rotation));

        result
    }
}
