use glam::{Quat, Vec3};

use super::spring::{SpringConfig, SpringDynamics};
use crate::math;

/// Segments may stretch or compress to these fractions of their rest length.
const MIN_STRETCH: f32 = 0.5;
const MAX_STRETCH: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringChainConfig {
    pub segment_count: usize,
    pub rest_length: f32,
    /// Root-segment stiffness.
    pub stiffness: f32,
    /// Root-segment damping.
    pub damping: f32,
    pub mass: f32,
    /// Fraction of stiffness lost by the tip segment, clamped to `[0, 0.5]`.
    pub stiffness_taper: f32,
    /// Fraction of damping gained by the tip segment, clamped to `[0, 0.3]`.
    pub damping_taper: f32,
    /// Scale of the gravity offset added per segment index.
    pub gravity_bias: f32,
    /// Rest direction in the root's local space.
    pub rest_axis: Vec3,
}

impl Default for SpringChainConfig {
    fn default() -> Self {
        Self {
            segment_count: 4,
            rest_length: 0.25,
            stiffness: 120.0,
            damping: 12.0,
            mass: 1.0,
            stiffness_taper: 0.5,
            damping_taper: 0.3,
            gravity_bias: 0.01,
            rest_axis: Vec3::NEG_Y,
        }
    }
}

impl SpringChainConfig {
    pub fn new(segment_count: usize, rest_length: f32) -> Self {
        Self {
            segment_count,
            rest_length,
            ..Default::default()
        }
    }

    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    pub fn with_taper(mut self, stiffness_taper: f32, damping_taper: f32) -> Self {
        self.stiffness_taper = stiffness_taper;
        self.damping_taper = damping_taper;
        self
    }

    pub fn with_rest_axis(mut self, rest_axis: Vec3) -> Self {
        self.rest_axis = rest_axis;
        self
    }

    pub fn with_gravity_bias(mut self, gravity_bias: f32) -> Self {
        self.gravity_bias = gravity_bias;
        self
    }

    pub fn validated(self) -> Self {
        Self {
            rest_length: self.rest_length.max(0.0),
            stiffness_taper: self.stiffness_taper.clamp(0.0, 0.5),
            damping_taper: self.damping_taper.clamp(0.0, 0.3),
            rest_axis: math::direction(self.rest_axis).unwrap_or(Vec3::NEG_Y),
            ..self
        }
    }

    /// Spring parameters of segment `index`, softer and more damped towards the tip.
    pub fn segment_spring(&self, index: usize) -> SpringConfig {
        let t = if self.segment_count > 1 {
            index as f32 / (self.segment_count - 1) as f32
        } else {
            0.0
        };

        SpringConfig::new(
            self.stiffness * (1.0 - self.stiffness_taper * t),
            self.damping * (1.0 + self.damping_taper * t),
        )
        .with_mass(self.mass)
    }
}

/// Springs linked end to end for tails, ropes and hair.
#[derive(Debug, Clone)]
pub struct SpringChain {
    config: SpringChainConfig,
    springs: Vec<SpringDynamics>,
    positions: Vec<Vec3>,
}

impl SpringChain {
    /// Builds the chain hanging along the rest axis from `root`.
    pub fn new(config: SpringChainConfig, root: Vec3) -> Self {
        let config = config.validated();
        let mut positions = Vec::with_capacity(config.segment_count + 1);
        positions.push(root);

        let springs = (0..config.segment_count)
            .map(|i| {
                let position = root + config.rest_axis * config.rest_length * (i + 1) as f32;
                positions.push(position);
                SpringDynamics::new(config.segment_spring(i), position)
            })
            .collect();

        Self {
            config,
            springs,
            positions,
        }
    }

    pub fn config(&self) -> &SpringChainConfig {
        &self.config
    }

    pub fn springs(&self) -> &[SpringDynamics] {
        &self.springs
    }

    pub fn segment_count(&self) -> usize {
        self.springs.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn update(&mut self, root_position: Vec3, root_rotation: Quat, dt: f32, gravity: Vec3) -> &[Vec3] {
        let rest_length = self.config.rest_length;
        let direction =
            math::direction(root_rotation * self.config.rest_axis).unwrap_or(self.config.rest_axis);
        let min_length = rest_length * MIN_STRETCH;
        let max_length = rest_length * MAX_STRETCH;

        self.positions[0] = root_position;

        for (i, spring) in self.springs.iter_mut().enumerate() {
            let previous = self.positions[i];
            let target = previous
                + direction * rest_length
                + gravity * (self.config.gravity_bias * (i + 1) as f32);

            let position = spring.update(target, dt);

            let offset = position - previous;
            let length = offset.length();
            let constrained = if length > max_length {
                previous + offset / length * max_length
            } else if length < min_length {
                match math::direction(offset) {
                    Some(dir) => previous + dir * min_length,
                    None => previous + direction * min_length,
                }
            } else {
                position
            };

            if constrained != position {
                spring.set_position(constrained);
            }
            self.positions[i + 1] = constrained;
        }

        &self.positions
    }

    /// Re-seeds the springs from `positions`, where `positions[0]` is the root.
    pub fn reset(&mut self, positions: &[Vec3]) {
        if positions.len() != self.positions.len() {
            log::warn!(
                "spring chain reset with {} positions, expected {}",
                positions.len(),
                self.positions.len()
            );
        }

        for (slot, &position) in self.positions.iter_mut().zip(positions) {
            *slot = position;
        }
        for (spring, &position) in self.springs.iter_mut().zip(positions.iter().skip(1)) {
            spring.reset(Some(position));
        }
    }
}
