//! Inverse Kinematics module
//!
//! Bone chains, angle constraints, the iterative FABRIK and CCD solvers and
//! the analytical two-bone solver.

pub mod ccd;
pub mod chain;
pub mod constraint;
pub mod fabrik;
pub mod solver;
pub mod two_bone;

pub use ccd::CcdSolver;
pub use chain::BoneChain;
pub use constraint::{apply_angle_constraints, BoneConstraint, LimitType};
pub use fabrik::{FabrikSolver, SolveStats};
pub use solver::{IkSolver, IkSolverResult, SolverConfig};
pub use two_bone::{TwoBoneResult, TwoBoneSolver};
