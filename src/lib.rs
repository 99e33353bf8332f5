//! # procanim
//!
//! Procedural character animation on top of a minimal scene-graph contract.
//!
//! ## Features
//! - FABRIK and CCD chain solvers with pole targets and joint angle limits
//! - Analytical two-bone limb solver
//! - Damped springs and spring chains for secondary motion
//! - Phase-driven procedural gait
//! - Smoothed, angle-limited look-at controller
//!
//! ## Example
//! ```rust,ignore
//! use procanim::ik::{BoneChain, FabrikSolver};
//! use procanim::scene::Skeleton;
//! use glam::Vec3;
//!
//! let mut skeleton = Skeleton::new();
//! let root = skeleton.add_root("arm", Vec3::ZERO);
//! let chain = BoneChain::from_lengths(&mut skeleton, root, &[1.0, 1.0], Vec3::Y)?;
//!
//! let solver = FabrikSolver::new().with_max_iterations(10);
//! let result = solver.solve(&skeleton, &chain, Vec3::new(1.0, 1.0, 0.0), None);
//! result.apply(&mut skeleton, &chain);
//! println!("reached: {}, iterations: {}", result.reached, result.iterations);
//! ```

pub mod dynamics;
pub mod error;
pub mod ik;
pub mod locomotion;
pub mod math;
pub mod scene;

pub use dynamics::{SpringChain, SpringChainConfig, SpringConfig, SpringDynamics, SpringState};
pub use error::ChainError;
pub use ik::{
    BoneChain, BoneConstraint, CcdSolver, FabrikSolver, IkSolver, IkSolverResult, LimitType,
    SolveStats, SolverConfig, TwoBoneResult, TwoBoneSolver,
};
pub use locomotion::{
    GaitConfig, GaitState, LookAtConfig, LookAtController, LookAtState, ProceduralGait,
};
pub use math::Transform;
pub use scene::{BoneId, SceneGraph, Skeleton, SkeletonNode};
