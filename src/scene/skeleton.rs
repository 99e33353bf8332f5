use glam::{Quat, Vec3};

use super::{BoneId, SceneGraph};
use crate::math::Transform;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonNode {
    pub name: String,
    pub parent: Option<BoneId>,
    pub local: Transform,
}

/// Flat node hierarchy where every parent is stored before its children.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skeleton {
    nodes: Vec<SkeletonNode>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a node. An unknown parent is dropped and the node becomes a root.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<BoneId>,
        local: Transform,
    ) -> BoneId {
        let name = name.into();
        let parent = match parent {
            Some(p) if self.contains(p) => Some(p),
            Some(p) => {
                log::warn!("bone '{}' references unknown parent {}, adding as root", name, p);
                None
            }
            None => None,
        };

        let id = BoneId(self.nodes.len());
        self.nodes.push(SkeletonNode {
            name,
            parent,
            local,
        });
        id
    }

    pub fn add_root(&mut self, name: impl Into<String>, position: Vec3) -> BoneId {
        self.add_bone(name, None, Transform::from_position(position))
    }

    pub fn add_child(
        &mut self,
        parent: BoneId,
        name: impl Into<String>,
        local_position: Vec3,
    ) -> BoneId {
        self.add_bone(name, Some(parent), Transform::from_position(local_position))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, bone: BoneId) -> Option<&SkeletonNode> {
        self.nodes.get(bone.0)
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.nodes.iter().position(|n| n.name == name).map(BoneId)
    }

    pub fn local_transform(&self, bone: BoneId) -> Transform {
        self.node(bone).map(|n| n.local).unwrap_or_default()
    }

    pub fn set_local_transform(&mut self, bone: BoneId, local: Transform) {
        if let Some(node) = self.nodes.get_mut(bone.0) {
            node.local = local;
        }
    }

    pub fn set_local_position(&mut self, bone: BoneId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(bone.0) {
            node.local.position = position;
        }
    }

    pub fn world_transform(&self, bone: BoneId) -> Transform {
        let Some(node) = self.node(bone) else {
            return Transform::IDENTITY;
        };

        match node.parent {
            Some(parent) => self.world_transform(parent).mul_transform(&node.local),
            None => node.local,
        }
    }
}

impl SceneGraph for Skeleton {
    fn contains(&self, bone: BoneId) -> bool {
        bone.0 < self.nodes.len()
    }

    fn parent(&self, bone: BoneId) -> Option<BoneId> {
        self.node(bone).and_then(|n| n.parent)
    }

    fn world_position(&self, bone: BoneId) -> Vec3 {
        self.world_transform(bone).position
    }

    fn world_orientation(&self, bone: BoneId) -> Quat {
        self.world_transform(bone).rotation
    }

    fn parent_world_orientation(&self, bone: BoneId) -> Quat {
        match self.parent(bone) {
            Some(parent) => self.world_transform(parent).rotation,
            None => Quat::IDENTITY,
        }
    }

    fn set_local_orientation(&mut self, bone: BoneId, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(bone.0) {
            node.local.rotation = rotation.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn world_transform_walks_parents() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("root", Vec3::new(0.0, 1.0, 0.0));
        let child = skeleton.add_child(root, "child", Vec3::Y);
        let tip = skeleton.add_child(child, "tip", Vec3::Y);

        assert!((skeleton.world_position(tip) - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);

        skeleton.set_local_orientation(root, Quat::from_rotation_z(-FRAC_PI_2));
        assert!((skeleton.world_position(tip) - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-5);
        assert!(skeleton
            .parent_world_orientation(child)
            .abs_diff_eq(Quat::from_rotation_z(-FRAC_PI_2), 1e-5));
    }

    #[test]
    fn unknown_parent_becomes_root() {
        let mut skeleton = Skeleton::new();
        let bone = skeleton.add_child(BoneId(7), "orphan", Vec3::X);
        assert_eq!(skeleton.parent(bone), None);
        assert_eq!(skeleton.find("orphan"), Some(bone));
        assert_eq!(skeleton.parent_world_orientation(bone), Quat::IDENTITY);
    }

    #[test]
    fn missing_bone_reads_as_identity() {
        let skeleton = Skeleton::new();
        assert!(!skeleton.contains(BoneId(0)));
        assert_eq!(skeleton.world_position(BoneId(0)), Vec3::ZERO);
    }
}
