use thiserror::Error;

use crate::scene::BoneId;

/// Failures when building a [`BoneChain`](crate::ik::BoneChain).
///
/// Per-frame solving never fails; only chain construction validates its input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("a bone chain needs at least one bone")]
    Empty,

    #[error("{0} is not part of the scene graph")]
    UnknownBone(BoneId),

    #[error("chain direction has zero length")]
    DegenerateDirection,

    #[error("segment {index} has invalid length {length}")]
    InvalidLength { index: usize, length: f32 },
}
