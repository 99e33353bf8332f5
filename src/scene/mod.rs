//! Scene-graph capability module
//!
//! The animation core never owns scene nodes. It reads and writes them through
//! the [`SceneGraph`] trait, addressed by opaque [`BoneId`] handles.
//! [`Skeleton`] is a small in-memory implementation for tools, tests and the demo.

mod skeleton;

pub use skeleton::{Skeleton, SkeletonNode};

use glam::{Quat, Vec3};

/// Opaque handle to a node owned by the caller's scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneId(pub usize);

impl std::fmt::Display for BoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bone#{}", self.0)
    }
}

/// What the solvers need from a scene graph.
pub trait SceneGraph {
    fn contains(&self, bone: BoneId) -> bool;

    /// Direct parent of `bone`, `None` for a root or an unknown bone.
    fn parent(&self, bone: BoneId) -> Option<BoneId>;

    fn world_position(&self, bone: BoneId) -> Vec3;

    fn world_orientation(&self, bone: BoneId) -> Quat;

    /// World orientation of the bone's parent, identity for a root node.
    fn parent_world_orientation(&self, bone: BoneId) -> Quat;

    fn set_local_orientation(&mut self, bone: BoneId, rotation: Quat);
}
