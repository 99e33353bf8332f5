use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3};

use crate::math;

/// Below this speed the gait holds an idle pose.
const IDLE_SPEED: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaitConfig {
    /// Distance covered by one full cycle. Default 0.8.
    pub step_length: f32,
    /// Peak foot lift. Default 0.15.
    pub step_height: f32,
    /// Right-foot phase lead, 0.5 for an alternating walk.
    pub phase_offset: f32,
    /// Lateral distance from the body centre to each hip. Default 0.15.
    pub hip_width: f32,
    /// Extra stride reach as a fraction of `step_length`. Default 0.2.
    pub foot_overshoot: f32,
    /// Vertical body oscillation amplitude. Default 0.04.
    pub body_bob: f32,
    /// Lateral body oscillation amplitude. Default 0.03.
    pub body_sway: f32,
    /// Hip yaw amplitude in radians. Default 0.08.
    pub hip_rotation: f32,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            step_length: 0.8,
            step_height: 0.15,
            phase_offset: 0.5,
            hip_width: 0.15,
            foot_overshoot: 0.2,
            body_bob: 0.04,
            body_sway: 0.03,
            hip_rotation: 0.08,
        }
    }
}

impl GaitConfig {
    pub fn with_step(mut self, step_length: f32, step_height: f32) -> Self {
        self.step_length = step_length;
        self.step_height = step_height;
        self
    }

    pub fn with_phase_offset(mut self, phase_offset: f32) -> Self {
        self.phase_offset = phase_offset;
        self
    }

    pub fn with_hip_width(mut self, hip_width: f32) -> Self {
        self.hip_width = hip_width;
        self
    }

    pub fn validated(self) -> Self {
        Self {
            step_length: self.step_length.max(0.01),
            step_height: self.step_height.max(0.0),
            phase_offset: wrap_phase(self.phase_offset),
            foot_overshoot: self.foot_overshoot.max(0.0),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaitState {
    pub phase: f32,
    pub left_foot_target: Vec3,
    pub right_foot_target: Vec3,
    pub left_foot_lifted: bool,
    pub right_foot_lifted: bool,
    pub body_offset: Vec3,
    pub body_rotation: Quat,
}

#[derive(Debug, Clone, Copy, Default)]
struct FootMemory {
    grounded: Option<Vec3>,
    lifted: bool,
}

/// Phase-driven biped walk cycle.
///
/// Each foot spends the first half of its phase in the air and the second
/// half planted.
#[derive(Debug, Clone)]
pub struct ProceduralGait {
    config: GaitConfig,
    phase: f32,
    left: FootMemory,
    right: FootMemory,
}

impl Default for ProceduralGait {
    fn default() -> Self {
        Self::new(GaitConfig::default())
    }
}

impl ProceduralGait {
    pub fn new(config: GaitConfig) -> Self {
        Self {
            config: config.validated(),
            phase: 0.0,
            left: FootMemory::default(),
            right: FootMemory::default(),
        }
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Forgets cached foot placements and restarts the cycle.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.left = FootMemory::default();
        self.right = FootMemory::default();
    }

    pub fn update(&mut self, body_position: Vec3, body_forward: Vec3, velocity: Vec3, dt: f32) -> GaitState {
        let right_dir = math::rotation_axis(body_forward, Vec3::Y).unwrap_or(Vec3::X);
        let left_base = ground(body_position - right_dir * self.config.hip_width);
        let right_base = ground(body_position + right_dir * self.config.hip_width);

        let speed = velocity.length();
        if speed < IDLE_SPEED {
            let left = *self.left.grounded.get_or_insert(left_base);
            let right = *self.right.grounded.get_or_insert(right_base);
            self.left.lifted = false;
            self.right.lifted = false;

            return GaitState {
                phase: self.phase,
                left_foot_target: left,
                right_foot_target: right,
                left_foot_lifted: false,
                right_foot_lifted: false,
                body_offset: Vec3::ZERO,
                body_rotation: Quat::IDENTITY,
            };
        }

        if dt > 0.0 {
            self.phase = wrap_phase(self.phase + speed / self.config.step_length * dt);
        }

        let move_dir = velocity / speed;
        let left_phase = self.phase;
        let right_phase = wrap_phase(self.phase + self.config.phase_offset);

        let (left_foot_target, left_foot_lifted) =
            Self::place_foot(&self.config, &mut self.left, left_base, left_phase, move_dir);
        let (right_foot_target, right_foot_lifted) =
            Self::place_foot(&self.config, &mut self.right, right_base, right_phase, move_dir);

        let wave = (self.phase * TAU).sin();

        GaitState {
            phase: self.phase,
            left_foot_target,
            right_foot_target,
            left_foot_lifted,
            right_foot_lifted,
            body_offset: right_dir * (wave * self.config.body_sway) + Vec3::Y * (wave * self.config.body_bob),
            body_rotation: Quat::from_rotation_y(wave * self.config.hip_rotation),
        }
    }

    fn place_foot(
        config: &GaitConfig,
        memory: &mut FootMemory,
        base: Vec3,
        foot_phase: f32,
        move_dir: Vec3,
    ) -> (Vec3, bool) {
        let lifted = foot_phase < 0.5;

        let target = if lifted {
            let lift_phase = foot_phase * 2.0;
            let stride = move_dir * (config.step_length * (1.0 + config.foot_overshoot) * (1.0 - lift_phase));
            base + stride + Vec3::Y * ((lift_phase * PI).sin() * config.step_height)
        } else {
            if memory.lifted || memory.grounded.is_none() {
                memory.grounded = Some(base);
            }
            base
        };

        memory.lifted = lifted;
        (target, lifted)
    }
}

/// Wraps into `[0, 1)`.
fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(1.0);
    if wrapped >= 1.0 || !wrapped.is_finite() {
        0.0
    } else {
        wrapped
    }
}

fn ground(position: Vec3) -> Vec3 {
    Vec3::new(position.x, 0.0, position.z)
}
