use glam::Vec3;

const MIN_MASS: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringConfig {
    /// Pull towards the target. Default 100.
    pub stiffness: f32,
    /// Velocity drag. Default 10 (under-damped with the default mass).
    pub damping: f32,
    /// Default 1, floored to a small positive value.
    pub mass: f32,
    /// Distance from the target the spring settles at. Default 0.
    pub rest_length: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
            rest_length: 0.0,
        }
    }
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Self {
            stiffness,
            damping,
            ..Default::default()
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length;
        self
    }

    /// Damping at which the spring stops overshooting.
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    pub fn validated(self) -> Self {
        Self {
            stiffness: self.stiffness.max(0.0),
            damping: self.damping.max(0.0),
            mass: self.mass.max(MIN_MASS),
            rest_length: self.rest_length.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringState {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Damped spring integrated with semi-implicit Euler.
///
/// The integrator is explicit, so `dt` must stay small relative to
/// `sqrt(mass / stiffness)`. It is not clamped here.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringDynamics {
    config: SpringConfig,
    state: SpringState,
}

impl SpringDynamics {
    pub fn new(config: SpringConfig, position: Vec3) -> Self {
        Self {
            config: config.validated(),
            state: SpringState {
                position,
                velocity: Vec3::ZERO,
            },
        }
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config.validated();
    }

    pub fn state(&self) -> &SpringState {
        &self.state
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.state.velocity
    }

    /// Moves the simulated point without touching its velocity.
    pub fn set_position(&mut self, position: Vec3) {
        self.state.position = position;
    }

    /// Stops the spring, optionally teleporting it.
    pub fn reset(&mut self, position: Option<Vec3>) {
        self.state.velocity = Vec3::ZERO;
        if let Some(position) = position {
            self.state.position = position;
        }
    }

    pub fn update(&mut self, target: Vec3, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return self.state.position;
        }

        let SpringConfig {
            stiffness,
            damping,
            mass,
            rest_length,
        } = self.config;

        let mut displacement = self.state.position - target;
        if rest_length > 0.0 {
            let stretch = displacement.length();
            if stretch > f32::EPSILON {
                displacement -= displacement / stretch * rest_length;
            }
        }

        let force = -stiffness * displacement - damping * self.state.velocity;
        self.state.velocity += force / mass * dt;
        self.state.position += self.state.velocity * dt;

        self.state.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn overdamped_spring_settles_monotonically() {
        let config = SpringConfig::new(100.0, 30.0);
        assert!(config.damping > config.critical_damping());

        let target = Vec3::new(0.0, 2.0, 0.0);
        let mut spring = SpringDynamics::new(config, Vec3::new(1.0, 2.0, 0.0));
        let mut previous = (spring.position() - target).length();

        for _ in 0..600 {
            let distance = (spring.update(target, DT) - target).length();
            assert!(distance <= previous + 1e-6);
            previous = distance;
        }
        assert!(previous < 1e-4);
    }

    #[test]
    fn underdamped_spring_overshoots_then_settles() {
        let target = Vec3::ZERO;
        let mut spring = SpringDynamics::new(SpringConfig::new(100.0, 4.0), Vec3::X);

        let mut crossed = false;
        for _ in 0..1200 {
            let p = spring.update(target, DT);
            crossed |= p.x < 0.0;
        }
        assert!(crossed);
        assert!(spring.position().length() < 1e-3);
    }

    #[test]
    fn rest_length_keeps_distance() {
        let target = Vec3::ZERO;
        let config = SpringConfig::new(100.0, 30.0).with_rest_length(0.5);
        let mut spring = SpringDynamics::new(config, Vec3::new(2.0, 0.0, 0.0));

        for _ in 0..900 {
            spring.update(target, DT);
        }
        assert!((spring.position().length() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn reset_zeroes_velocity() {
        let mut spring = SpringDynamics::new(SpringConfig::default(), Vec3::ZERO);
        spring.update(Vec3::X, DT);
        assert!(spring.velocity().length() > 0.0);

        spring.reset(None);
        assert_eq!(spring.velocity(), Vec3::ZERO);

        spring.reset(Some(Vec3::Y));
        assert_eq!(spring.position(), Vec3::Y);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut spring = SpringDynamics::new(SpringConfig::default(), Vec3::ZERO);
        assert_eq!(spring.update(Vec3::X, 0.0), Vec3::ZERO);
        assert_eq!(spring.velocity(), Vec3::ZERO);
    }

    #[test]
    fn mass_is_floored() {
        let spring = SpringDynamics::new(SpringConfig::default().with_mass(0.0), Vec3::ZERO);
        assert!(spring.config().mass > 0.0);
    }
}
