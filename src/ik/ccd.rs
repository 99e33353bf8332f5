use super::chain::BoneChain;
use super::solver::{local_rotations, world_rotations_from_positions, IkSolverResult, SolverConfig};
use crate::math;
use crate::scene::SceneGraph;
use glam::{Quat, Vec3};

/// Rotations smaller than this (radians) are not applied.
const MIN_STEP_ANGLE: f32 = 1e-6;

/// Cyclic Coordinate Descent.
///
/// Each pass walks from the joint nearest the end effector back to the root,
/// turning that joint so the end effector swings towards the target. Segment
/// lengths are never touched, only orientations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CcdSolver {
    config: SolverConfig,
}

impl CcdSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.config = self.config.with_max_iterations(max_iterations);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.config = self.config.with_tolerance(tolerance);
        self
    }

    pub fn with_damping_factor(mut self, damping_factor: f32) -> Self {
        self.config = self.config.with_damping_factor(damping_factor);
        self
    }

    pub fn with_reference_axis(mut self, axis: Vec3) -> Self {
        self.config = self.config.with_reference_axis(axis);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// A bone's `max_angle` constraint caps each individual step, not the
    /// accumulated joint angle.
    pub fn solve<S: SceneGraph + ?Sized>(
        &self,
        scene: &S,
        chain: &BoneChain,
        target: Vec3,
    ) -> IkSolverResult {
        let mut positions = chain.world_positions(scene);
        let n = positions.len();
        if n < 2 {
            return IkSolverResult::single(positions[0], target, self.config.tolerance);
        }

        let root_parent = scene.parent_world_orientation(chain.root());
        let reference_axis = self.config.reference_axis;
        let lengths = chain.lengths();
        let mut world = world_rotations_from_positions(&positions, reference_axis, root_parent);

        let tolerance = self.config.tolerance;
        let mut error = (positions[n - 1] - target).length();
        let mut iterations = 0;

        while iterations < self.config.max_iterations && error > tolerance {
            for i in (0..n - 1).rev() {
                let pivot = positions[i];
                let (Some(to_end), Some(to_target)) = (
                    math::direction_between(pivot, positions[n - 1]),
                    math::direction_between(pivot, target),
                ) else {
                    continue;
                };
                let Some(axis) = math::rotation_axis(to_end, to_target) else {
                    continue;
                };

                let mut angle = to_end.dot(to_target).clamp(-1.0, 1.0).acos() * self.config.damping_factor;
                if let Some(max_angle) = chain.constraint_for(i).and_then(|c| c.max_angle) {
                    angle = angle.min(max_angle.max(0.0));
                }
                if angle < MIN_STEP_ANGLE {
                    continue;
                }

                let delta = Quat::from_axis_angle(axis, angle);
                for rotation in &mut world[i..] {
                    *rotation = (delta * *rotation).normalize();
                }
                Self::forward_kinematics(&mut positions, &world, lengths, reference_axis, i);
            }

            error = (positions[n - 1] - target).length();
            iterations += 1;
            log::trace!("CCD iteration {} error {:.6}", iterations, error);
        }

        if error > tolerance {
            log::debug!("CCD stopped after {} iterations with error {:.4}", iterations, error);
        }

        IkSolverResult {
            rotations: local_rotations(&world, root_parent, n),
            positions,
            reached: error <= tolerance,
            iterations,
            error,
        }
    }

    pub fn apply<S: SceneGraph + ?Sized>(
        &self,
        scene: &mut S,
        chain: &BoneChain,
        result: &IkSolverResult,
    ) {
        result.apply(scene, chain);
    }

    /// Rebuilds every joint after `from` out of the accumulated world rotations.
    fn forward_kinematics(
        positions: &mut [Vec3],
        world: &[Quat],
        lengths: &[f32],
        reference_axis: Vec3,
        from: usize,
    ) {
        for k in from..world.len() {
            positions[k + 1] = positions[k] + world[k] * reference_axis * lengths[k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::BoneConstraint;
    use crate::scene::Skeleton;

    fn vertical_chain(lengths: &[f32]) -> (Skeleton, BoneChain) {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("root", Vec3::ZERO);
        let chain = BoneChain::from_lengths(&mut skeleton, root, lengths, Vec3::Y).unwrap();
        (skeleton, chain)
    }

    #[test]
    fn preserves_segment_lengths() {
        let (skeleton, chain) = vertical_chain(&[1.0, 0.7, 1.3, 0.5]);
        let result = CcdSolver::new().solve(&skeleton, &chain, Vec3::new(1.2, 1.5, -0.8));

        for (i, w) in result.positions.windows(2).enumerate() {
            assert!(((w[1] - w[0]).length() - chain.lengths()[i]).abs() < 1e-4);
        }
        assert_eq!(result.positions[0], Vec3::ZERO);
    }

    #[test]
    fn reaches_a_simple_target() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0]);
        let target = Vec3::new(1.0, 1.0, 0.0);
        let result = CcdSolver::new()
            .with_max_iterations(50)
            .solve(&skeleton, &chain, target);

        assert!(result.reached, "error {}", result.error);
        assert!((result.end_effector().unwrap() - target).length() <= 0.001);
    }

    #[test]
    fn damping_slows_but_still_improves() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0, 1.0]);
        let target = Vec3::new(1.5, 1.5, 0.0);
        let start_error = (Vec3::new(0.0, 3.0, 0.0) - target).length();

        let damped = CcdSolver::new()
            .with_damping_factor(0.5)
            .with_max_iterations(1)
            .solve(&skeleton, &chain, target);
        assert!(damped.error < start_error);
        assert_eq!(damped.iterations, 1);
    }

    #[test]
    fn max_angle_caps_each_step() {
        let (skeleton, chain) = vertical_chain(&[1.0]);
        let chain = chain.with_constraint(BoneConstraint::new(0).with_max_angle(0.1));

        let result = CcdSolver::new()
            .with_max_iterations(1)
            .solve(&skeleton, &chain, Vec3::new(1.0, 0.0, 0.0));

        let swung = result.positions[1].angle_between(Vec3::Y);
        assert!((swung - 0.1).abs() < 1e-4);
        assert!(!result.reached);
    }

    #[test]
    fn applied_rotations_reproduce_solved_positions() {
        let (mut skeleton, chain) = vertical_chain(&[1.0, 1.0, 1.0]);
        let solver = CcdSolver::new();
        let result = solver.solve(&skeleton, &chain, Vec3::new(0.8, 1.9, 0.6));
        solver.apply(&mut skeleton, &chain, &result);

        for (&bone, solved) in chain.bones().iter().zip(&result.positions) {
            assert!((skeleton.world_position(bone) - *solved).length() < 1e-3);
        }
    }

    #[test]
    fn target_on_a_joint_is_skipped_without_nan() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0]);
        let result = CcdSolver::new().solve(&skeleton, &chain, Vec3::ZERO);
        assert!(result.positions.iter().all(|p| p.is_finite()));
        assert!(result.rotations.iter().all(|q| q.is_finite()));
    }
}
