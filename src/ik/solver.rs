use super::ccd::CcdSolver;
use super::chain::BoneChain;
use super::fabrik::FabrikSolver;
use crate::math;
use crate::scene::SceneGraph;
use glam::{Quat, Vec3};

/// Tuning shared by the iterative solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Upper bound on solver iterations, at least 1. Default 20.
    pub max_iterations: u32,
    /// End-effector distance counted as reached, > 0. Default 0.001.
    pub tolerance: f32,
    /// Fraction of each CCD step actually applied, in `[0, 1]`. Default 1.0.
    pub damping_factor: f32,
    /// Local axis every bone points along towards its child. Default `+Y`.
    pub reference_axis: Vec3,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 0.001,
            damping_factor: 1.0,
            reference_axis: Vec3::Y,
        }
    }
}

impl SolverConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self.validated()
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self.validated()
    }

    pub fn with_damping_factor(mut self, damping_factor: f32) -> Self {
        self.damping_factor = damping_factor;
        self.validated()
    }

    pub fn with_reference_axis(mut self, reference_axis: Vec3) -> Self {
        self.reference_axis = reference_axis;
        self.validated()
    }

    /// Clamps every field into its documented range.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        Self {
            max_iterations: self.max_iterations.max(1),
            tolerance: if self.tolerance > 0.0 {
                self.tolerance
            } else {
                defaults.tolerance
            },
            damping_factor: if self.damping_factor.is_nan() {
                defaults.damping_factor
            } else {
                self.damping_factor.clamp(0.0, 1.0)
            },
            reference_axis: math::direction(self.reference_axis).unwrap_or(defaults.reference_axis),
        }
    }
}

/// Outcome of one iterative solve. `positions` and `rotations` line up with
/// the chain's bones; rotations are parent-local.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IkSolverResult {
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub reached: bool,
    pub iterations: u32,
    /// Final end-effector distance, or the overshoot when the target is out of reach.
    pub error: f32,
}

impl IkSolverResult {
    pub(crate) fn single(position: Vec3, target: Vec3, tolerance: f32) -> Self {
        let error = (target - position).length();
        Self {
            positions: vec![position],
            rotations: vec![Quat::IDENTITY],
            reached: error <= tolerance,
            iterations: 0,
            error,
        }
    }

    pub fn end_effector(&self) -> Option<Vec3> {
        self.positions.last().copied()
    }

    /// Writes each rotation as the local orientation of the matching bone.
    pub fn apply<S: SceneGraph + ?Sized>(&self, scene: &mut S, chain: &BoneChain) {
        for (&bone, &rotation) in chain.bones().iter().zip(&self.rotations) {
            scene.set_local_orientation(bone, rotation);
        }
    }
}

/// Converts per-bone world rotations into parent-local ones.
///
/// Bone `i > 0` is parented to bone `i - 1`; the root's parent orientation
/// comes from the scene. The end effector keeps an identity rotation.
pub(crate) fn local_rotations(world: &[Quat], root_parent: Quat, bone_count: usize) -> Vec<Quat> {
    let mut rotations = vec![Quat::IDENTITY; bone_count];
    let mut parent = root_parent;
    for (local, &world) in rotations.iter_mut().zip(world) {
        *local = math::to_local(parent, world);
        parent = world;
    }
    rotations
}

/// World rotations that turn `reference_axis` towards each bone's child.
///
/// A coincident pair inherits the previous world rotation, leaving that bone
/// with an identity local rotation.
pub(crate) fn world_rotations_from_positions(
    positions: &[Vec3],
    reference_axis: Vec3,
    root_parent: Quat,
) -> Vec<Quat> {
    let mut parent = root_parent;
    positions
        .windows(2)
        .map(|w| {
            let world = match math::direction_between(w[0], w[1]) {
                Some(dir) => Quat::from_rotation_arc(reference_axis, dir),
                None => parent,
            };
            parent = world;
            world
        })
        .collect()
}

/// Iterative solver strategy for chains of two or more bones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IkSolver {
    Fabrik(FabrikSolver),
    Ccd(CcdSolver),
}

impl Default for IkSolver {
    fn default() -> Self {
        Self::Fabrik(FabrikSolver::default())
    }
}

impl From<FabrikSolver> for IkSolver {
    fn from(solver: FabrikSolver) -> Self {
        Self::Fabrik(solver)
    }
}

impl From<CcdSolver> for IkSolver {
    fn from(solver: CcdSolver) -> Self {
        Self::Ccd(solver)
    }
}

impl IkSolver {
    pub fn config(&self) -> &SolverConfig {
        match self {
            Self::Fabrik(s) => s.config(),
            Self::Ccd(s) => s.config(),
        }
    }

    pub fn solve<S: SceneGraph + ?Sized>(
        &self,
        scene: &S,
        chain: &BoneChain,
        target: Vec3,
    ) -> IkSolverResult {
        self.solve_with_pole(scene, chain, target, None)
    }

    /// Like [`solve`](Self::solve); CCD has no pole support and ignores `pole`.
    pub fn solve_with_pole<S: SceneGraph + ?Sized>(
        &self,
        scene: &S,
        chain: &BoneChain,
        target: Vec3,
        pole: Option<Vec3>,
    ) -> IkSolverResult {
        match self {
            Self::Fabrik(s) => s.solve(scene, chain, target, pole),
            Self::Ccd(s) => {
                if pole.is_some() {
                    log::trace!("CCD ignores the pole target");
                }
                s.solve(scene, chain, target)
            }
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
}
