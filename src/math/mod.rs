//! Math utilities module
//!
//! Re-exports the glam types used throughout the crate and adds the guarded
//! vector/quaternion helpers the solvers share.

mod transform;

pub use transform::Transform;

// Re-export commonly used glam types
pub use glam::{Mat3, Quat, Vec3};

/// Below this length a direction vector is treated as degenerate.
pub const DIRECTION_EPSILON: f32 = 0.0001;

/// Squared-length threshold for cross products used as rotation axes.
pub const AXIS_EPSILON_SQ: f32 = 1e-8;

/// Normalizes `v`, or returns `None` when it is too short to carry a direction.
pub fn direction(v: Vec3) -> Option<Vec3> {
    let len = v.length();
    if len > DIRECTION_EPSILON && len.is_finite() {
        Some(v / len)
    } else {
        None
    }
}

/// Direction from `from` towards `to`, or `None` for coincident points.
pub fn direction_between(from: Vec3, to: Vec3) -> Option<Vec3> {
    direction(to - from)
}

/// Normalized rotation axis `a × b`, or `None` when the vectors are colinear.
pub fn rotation_axis(a: Vec3, b: Vec3) -> Option<Vec3> {
    let axis = a.cross(b);
    if axis.length_squared() < AXIS_EPSILON_SQ {
        None
    } else {
        Some(axis.normalize())
    }
}

/// Any unit vector perpendicular to `v`. Falls back to `X` for a zero vector.
pub fn perpendicular(v: Vec3) -> Vec3 {
    match direction(v) {
        Some(dir) => dir.any_orthonormal_vector(),
        None => Vec3::X,
    }
}

/// Angle from `from` to `to` measured counter-clockwise around `axis`.
///
/// Both vectors are expected to lie in the plane perpendicular to `axis`.
pub fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let unsigned = from.angle_between(to);
    if from.cross(to).dot(axis) < 0.0 {
        -unsigned
    } else {
        unsigned
    }
}

/// Removes the component of `v` along the unit vector `normal`.
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Expresses a world rotation in the space of a parent world rotation.
pub fn to_local(parent_world: Quat, world: Quat) -> Quat {
    (parent_world.inverse() * world).normalize()
}
