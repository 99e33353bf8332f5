use glam::{Quat, Vec3};

use crate::math::{self, Transform};
use crate::scene::{BoneId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LookAtConfig {
    /// Largest turn away from the node's current forward axis, radians. Default 60°.
    pub max_angle: f32,
    /// Targets closer than this are ignored. Default 0.05.
    pub deadzone: f32,
    /// Exponential smoothing rate per second. Default 8.
    pub speed: f32,
    /// Up hint for the look rotation. Default `+Y`.
    pub up: Vec3,
}

impl Default for LookAtConfig {
    fn default() -> Self {
        Self {
            max_angle: 60f32.to_radians(),
            deadzone: 0.05,
            speed: 8.0,
            up: Vec3::Y,
        }
    }
}

impl LookAtConfig {
    pub fn with_max_angle(mut self, max_angle: f32) -> Self {
        self.max_angle = max_angle;
        self
    }

    pub fn with_max_angle_degrees(self, degrees: f32) -> Self {
        self.with_max_angle(degrees.to_radians())
    }

    pub fn with_deadzone(mut self, deadzone: f32) -> Self {
        self.deadzone = deadzone;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn validated(self) -> Self {
        Self {
            max_angle: self.max_angle.clamp(0.0, std::f32::consts::PI),
            deadzone: self.deadzone.max(0.0),
            speed: self.speed.max(0.0),
            up: math::direction(self.up).unwrap_or(Vec3::Y),
        }
    }
}

/// Smoothed parent-local orientation tracked by a [`LookAtController`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LookAtState {
    pub orientation: Quat,
}

impl Default for LookAtState {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
        }
    }
}

/// Turns a head, eye or turret node towards a target within an angular limit.
#[derive(Debug, Clone)]
pub struct LookAtController {
    config: LookAtConfig,
    state: LookAtState,
}

impl Default for LookAtController {
    fn default() -> Self {
        Self::new(LookAtConfig::default())
    }
}

impl LookAtController {
    pub fn new(config: LookAtConfig) -> Self {
        Self {
            config: config.validated(),
            state: LookAtState::default(),
        }
    }

    /// Starts smoothing from `orientation` instead of the identity.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.state.orientation = orientation;
        self
    }

    pub fn config(&self) -> &LookAtConfig {
        &self.config
    }

    pub fn state(&self) -> &LookAtState {
        &self.state
    }

    pub fn orientation(&self) -> Quat {
        self.state.orientation
    }

    pub fn reset(&mut self, orientation: Quat) {
        self.state.orientation = orientation;
    }

    /// Reads `node` from the scene and returns the new parent-local orientation.
    /// The scene is not written; see [`apply`](Self::apply).
    pub fn update<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &S,
        node: BoneId,
        target: Vec3,
        dt: f32,
    ) -> Quat {
        self.update_pose(
            scene.world_position(node),
            scene.world_orientation(node),
            scene.parent_world_orientation(node),
            target,
            dt,
        )
    }

    pub fn apply<S: SceneGraph + ?Sized>(&self, scene: &mut S, node: BoneId) {
        scene.set_local_orientation(node, self.state.orientation);
    }

    /// Scene-free form of [`update`](Self::update).
    pub fn update_pose(
        &mut self,
        position: Vec3,
        world_orientation: Quat,
        parent_world_orientation: Quat,
        target: Vec3,
        dt: f32,
    ) -> Quat {
        if position.distance(target) < self.config.deadzone {
            return self.state.orientation;
        }

        let Some(world_target) = self.target_orientation(position, world_orientation, target) else {
            return self.state.orientation;
        };

        let local_target = math::to_local(parent_world_orientation, world_target);
        let t = 1.0 - (-self.config.speed * dt.max(0.0)).exp();
        self.state.orientation = self.state.orientation.slerp(local_target, t).normalize();

        self.state.orientation
    }

    /// Unsmoothed world orientation facing `target`, at most `max_angle` away
    /// from the current forward axis.
    pub fn target_orientation(
        &self,
        position: Vec3,
        world_orientation: Quat,
        target: Vec3,
    ) -> Option<Quat> {
        let desired = math::direction_between(position, target)?;
        let forward = Transform::from_position_rotation(position, world_orientation)
            .forward()
            .normalize();

        let angle = forward.angle_between(desired);
        let facing = if angle > self.config.max_angle {
            let axis = math::rotation_axis(forward, desired).unwrap_or_else(|| math::perpendicular(forward));
            Quat::from_axis_angle(axis, self.config.max_angle) * forward
        } else {
            desired
        };

        Some(Transform::look_at(position, position + facing, self.config.up).rotation)
    }
}
