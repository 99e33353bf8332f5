use super::chain::BoneChain;
use super::constraint::{apply_angle_constraints, BoneConstraint};
use super::solver::{local_rotations, world_rotations_from_positions, IkSolverResult, SolverConfig};
use crate::math::{self, DIRECTION_EPSILON};
use crate::scene::SceneGraph;
use glam::{Quat, Vec3};

/// Sideways offset given to the joints of a straight chain, as a fraction of
/// the segment length before each joint.
const UNFOLD_OFFSET: f32 = 0.1;

/// Convergence diagnostics of a position-only solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    pub reached: bool,
    pub iterations: u32,
    pub error: f32,
}

/// Forward And Backward Reaching Inverse Kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FabrikSolver {
    config: SolverConfig,
}

impl FabrikSolver {
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

    pub fn with_reference_axis(mut self, axis: Vec3) -> Self {
        self.config = self.config.with_reference_axis(axis);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves `chain` towards `target`, optionally bending interior joints
    /// towards `pole`. The scene is only read.
    pub fn solve<S: SceneGraph + ?Sized>(
        &self,
        scene: &S,
        chain: &BoneChain,
        target: Vec3,
        pole: Option<Vec3>,
    ) -> IkSolverResult {
        let mut positions = chain.world_positions(scene);
        if positions.len() < 2 {
            return IkSolverResult::single(positions[0], target, self.config.tolerance);
        }

        let stats = self.solve_positions(
            &mut positions,
            chain.lengths(),
            target,
            pole,
            chain.constraints(),
        );

        let root_parent = scene.parent_world_orientation(chain.root());
        let world = world_rotations_from_positions(&positions, self.config.reference_axis, root_parent);
        let rotations = local_rotations(&world, root_parent, positions.len());

        IkSolverResult {
            positions,
            rotations,
            reached: stats.reached,
            iterations: stats.iterations,
            error: stats.error,
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

    /// Runs FABRIK directly on joint positions. `lengths[i]` is the distance
    /// between joints `i` and `i + 1`.
    pub fn solve_positions(
        &self,
        positions: &mut [Vec3],
        lengths: &[f32],
        target: Vec3,
        pole: Option<Vec3>,
        constraints: &[BoneConstraint],
    ) -> SolveStats {
        let n = positions.len();
        if n < 2 || lengths.len() + 1 != n {
            let error = positions.last().map_or(0.0, |p| (target - *p).length());
            return SolveStats {
                reached: error <= self.config.tolerance,
                iterations: 0,
                error,
            };
        }

        let base = positions[0];
        let total_length: f32 = lengths.iter().sum();
        let distance_to_target = (target - base).length();

        if distance_to_target > total_length {
            Self::stretch_towards_target(positions, lengths, base, target);
            log::debug!(
                "FABRIK target out of reach by {:.4}",
                distance_to_target - total_length
            );
            return SolveStats {
                reached: false,
                iterations: 1,
                error: distance_to_target - total_length,
            };
        }

        let tolerance = self.config.tolerance;
        let mut error = (positions[n - 1] - target).length();
        let mut iterations = 0;

        if error > tolerance {
            Self::unfold_straight_chain(positions, lengths, target, pole);
        }

        while iterations < self.config.max_iterations && error > tolerance {
            Self::backward_pass(positions, lengths, target);
            Self::forward_pass(positions, lengths, base);

            error = (positions[n - 1] - target).length();
            iterations += 1;
            log::trace!("FABRIK iteration {} error {:.6}", iterations, error);
        }

        if let Some(pole) = pole {
            if n >= 3 {
                Self::bend_towards_pole(positions, pole);
                Self::forward_pass(positions, lengths, base);
            }
        }

        apply_angle_constraints(positions, constraints);

        let error = (positions[n - 1] - target).length();
        if error > tolerance {
            log::debug!(
                "FABRIK stopped after {} iterations with error {:.4}",
                iterations,
                error
            );
        }

        SolveStats {
            reached: error <= tolerance,
            iterations,
            error,
        }
    }

    /// Tip to root: pin the end effector on the target and drag each joint
    /// after the one already placed.
    fn backward_pass(positions: &mut [Vec3], lengths: &[f32], target: Vec3) {
        let n = positions.len();

        positions[n - 1] = target;

        for i in (0..n - 1).rev() {
            let next_pos = positions[i + 1];
            let direction = math::direction(positions[i] - next_pos).unwrap_or(Vec3::Y);
            positions[i] = next_pos + direction * lengths[i];
        }
    }

    /// Root to tip: re-anchor the root and restore every segment length.
    fn forward_pass(positions: &mut [Vec3], lengths: &[f32], base: Vec3) {
        positions[0] = base;

        for i in 1..positions.len() {
            let prev_pos = positions[i - 1];
            let direction = math::direction(positions[i] - prev_pos).unwrap_or(Vec3::Y);
            positions[i] = prev_pos + direction * lengths[i - 1];
        }
    }

    fn stretch_towards_target(positions: &mut [Vec3], lengths: &[f32], base: Vec3, target: Vec3) {
        let Some(direction) = math::direction_between(base, target) else {
            return;
        };

        positions[0] = base;

        for i in 1..positions.len() {
            positions[i] = positions[i - 1] + direction * lengths[i - 1];
        }
    }

    /// A straight chain with the target on its own axis gives both passes
    /// nothing to bend. Offsets the interior joints sideways, towards the
    /// pole when there is one, so the chain can fold.
    fn unfold_straight_chain(positions: &mut [Vec3], lengths: &[f32], target: Vec3, pole: Option<Vec3>) {
        let n = positions.len();
        if n < 3 {
            return;
        }

        let root = positions[0];
        let Some(axis) = math::direction_between(root, positions[n - 1])
            .or_else(|| math::direction_between(root, target))
        else {
            return;
        };

        let off_axis = |p: Vec3| math::project_on_plane(p - root, axis).length() >= DIRECTION_EPSILON;
        if off_axis(target) || positions[1..n - 1].iter().any(|&p| off_axis(p)) {
            return;
        }

        let side = pole
            .and_then(|pole| math::direction(math::project_on_plane(pole - root, axis)))
            .unwrap_or_else(|| math::perpendicular(axis));
        log::trace!("FABRIK unfolding a straight chain towards {:?}", side);

        for (position, &length) in positions[1..n - 1].iter_mut().zip(lengths) {
            *position += side * (length * UNFOLD_OFFSET);
        }
    }

    /// Swings every interior joint around the current root→tip axis so it
    /// sits on the same side as the pole.
    fn bend_towards_pole(positions: &mut [Vec3], pole: Vec3) {
        let n = positions.len();
        let root = positions[0];
        let Some(axis) = math::direction_between(root, positions[n - 1]) else {
            return;
        };

        let pole_dir = math::project_on_plane(pole - root, axis);
        if pole_dir.length() < DIRECTION_EPSILON {
            return;
        }

        for position in &mut positions[1..n - 1] {
            let offset = *position - root;
            let joint_dir = math::project_on_plane(offset, axis);
            if joint_dir.length() < DIRECTION_EPSILON {
                continue;
            }

            let angle = math::signed_angle(joint_dir, pole_dir, axis);
            *position = root + Quat::from_axis_angle(axis, angle) * offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BoneId, Skeleton};

    fn vertical_chain(lengths: &[f32]) -> (Skeleton, BoneChain) {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("root", Vec3::ZERO);
        let chain = BoneChain::from_lengths(&mut skeleton, root, lengths, Vec3::Y).unwrap();
        (skeleton, chain)
    }

    fn assert_lengths_preserved(positions: &[Vec3], lengths: &[f32]) {
        for (i, w) in positions.windows(2).enumerate() {
            let length = (w[1] - w[0]).length();
            assert!(
                (length - lengths[i]).abs() < 1e-4,
                "segment {} has length {} instead of {}",
                i,
                length,
                lengths[i]
            );
        }
    }

    #[test]
    fn converges_on_reachable_target() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0, 1.0]);
        let solver = FabrikSolver::new();
        let target = Vec3::new(1.0, 2.0, 0.5);

        let result = solver.solve(&skeleton, &chain, target, None);

        assert!(result.reached);
        assert!(result.error <= solver.config().tolerance);
        assert!((result.end_effector().unwrap() - target).length() <= solver.config().tolerance);
        assert!(result.iterations >= 1 && result.iterations <= 20);
        assert_eq!(result.positions[0], Vec3::ZERO);
        assert_lengths_preserved(&result.positions, chain.lengths());
    }

    #[test]
    fn already_on_target_needs_no_iterations() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0]);
        let result = FabrikSolver::new().solve(&skeleton, &chain, Vec3::new(0.0, 2.0, 0.0), None);
        assert!(result.reached);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn unreachable_target_stretches_in_a_line() {
        let (skeleton, chain) = vertical_chain(&[1.0, 0.5, 1.5]);
        let target = Vec3::new(10.0, 0.0, 0.0);

        let result = FabrikSolver::new().solve(&skeleton, &chain, target, None);

        assert!(!result.reached);
        assert_eq!(result.iterations, 1);
        assert!((result.error - 7.0).abs() < 1e-5);

        let expected = [0.0, 1.0, 1.5, 3.0];
        for (p, x) in result.positions.iter().zip(expected) {
            assert!((*p - Vec3::new(x, 0.0, 0.0)).length() < 1e-5);
        }
    }

    #[test]
    fn pole_picks_the_bend_side() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0]);
        let target = Vec3::new(1.0, 1.0, 0.0);

        let result = FabrikSolver::new().solve(&skeleton, &chain, target, Some(Vec3::new(0.0, 1.0, 5.0)));

        assert!(result.positions[1].z > 0.5);
        assert!(result.reached);
        assert_lengths_preserved(&result.positions, chain.lengths());
    }

    #[test]
    fn straight_chain_folds_towards_target_on_its_axis() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0]);
        let target = Vec3::new(0.0, 1.5, 0.0);

        let result = FabrikSolver::new().solve(&skeleton, &chain, target, None);

        assert!(result.reached, "error {}", result.error);
        assert!((result.end_effector().unwrap() - target).length() <= 0.001);
        assert!(math::project_on_plane(result.positions[1], Vec3::Y).length() > 0.5);
        assert_lengths_preserved(&result.positions, chain.lengths());
    }

    #[test]
    fn straight_chain_folds_towards_pole_on_its_axis() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0]);
        let target = Vec3::new(0.0, 1.5, 0.0);

        let result = FabrikSolver::new().solve(&skeleton, &chain, target, Some(Vec3::new(0.0, 1.0, 3.0)));

        assert!(result.reached, "error {}", result.error);
        assert!(result.positions[1].z > 0.5);
        assert!(result.positions[1].x.abs() < 1e-4);
        assert_lengths_preserved(&result.positions, chain.lengths());

        let (skeleton, chain) = vertical_chain(&[1.0, 1.0, 1.0]);
        let target = Vec3::new(0.0, 2.0, 0.0);
        let result = FabrikSolver::new().solve(&skeleton, &chain, target, Some(Vec3::new(0.0, 1.0, -3.0)));

        assert!(result.reached, "error {}", result.error);
        assert!(result.positions[1].z < 0.0 && result.positions[2].z < 0.0);
        assert_lengths_preserved(&result.positions, chain.lengths());
    }

    #[test]
    fn applied_rotations_reproduce_solved_positions() {
        let (mut skeleton, chain) = vertical_chain(&[1.0, 1.0, 1.0]);
        let solver = FabrikSolver::new();
        let target = Vec3::new(-1.2, 1.1, 0.7);

        let result = solver.solve(&skeleton, &chain, target, None);
        solver.apply(&mut skeleton, &chain, &result);

        for (&bone, solved) in chain.bones().iter().zip(&result.positions) {
            assert!((skeleton.world_position(bone) - *solved).length() < 1e-3);
        }
        assert!((skeleton.world_position(chain.end_effector()) - target).length() < 2e-3);
        assert_eq!(result.rotations[3], Quat::IDENTITY);
    }

    #[test]
    fn constraints_are_applied_after_solving() {
        let (skeleton, chain) = vertical_chain(&[1.0, 1.0, 1.0]);
        let chain = chain.with_constraint(BoneConstraint::new(1).with_max_angle(0.1));
        let result = FabrikSolver::new().solve(&skeleton, &chain, Vec3::new(1.5, 1.0, 0.0), None);

        let p = &result.positions;
        let angle = (p[1] - p[0]).angle_between(p[2] - p[0]);
        assert!(angle <= 0.1 + 1e-4);
        assert!(((p[1] - p[0]).length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn single_bone_chain_is_trivial() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("solo", Vec3::ZERO);
        let chain = BoneChain::from_scene(&skeleton, vec![root]).unwrap();

        let result = FabrikSolver::new().solve(&skeleton, &chain, Vec3::X, None);
        assert_eq!(result.positions, vec![Vec3::ZERO]);
        assert_eq!(result.iterations, 0);
        assert!(!result.reached);
        assert_eq!(chain.bones(), &[BoneId(0)]);
    }

    #[test]
    fn coincident_joints_do_not_produce_nan() {
        let mut positions = vec![Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
        let stats = FabrikSolver::new().solve_positions(
            &mut positions,
            &[1.0, 1.0],
            Vec3::new(0.5, 0.5, 0.0),
            Some(Vec3::ZERO),
            &[],
        );
        assert!(positions.iter().all(|p| p.is_finite()));
        assert!(stats.error.is_finite());
    }
}
