use super::constraint::BoneConstraint;
use crate::error::ChainError;
use crate::scene::{BoneId, SceneGraph, Skeleton};
use glam::Vec3;

/// Ordered bones from root to end effector with the segment lengths sampled
/// when the chain was built.
///
/// Consecutive bones are expected to be parent and child in the scene graph.
/// Lengths never change; rebuild the chain when the rig's topology does.
#[derive(Debug, Clone)]
pub struct BoneChain {
    pub(crate) bones: Vec<BoneId>,
    pub(crate) lengths: Vec<f32>,
    pub(crate) total_length: f32,
    pub(crate) constraints: Vec<BoneConstraint>,
}

impl BoneChain {
    /// Samples the current world positions of `bones` to derive segment lengths.
    pub fn from_scene<S: SceneGraph + ?Sized>(
        scene: &S,
        bones: Vec<BoneId>,
    ) -> Result<Self, ChainError> {
        if bones.is_empty() {
            return Err(ChainError::Empty);
        }
        if let Some(&missing) = bones.iter().find(|&&b| !scene.contains(b)) {
            return Err(ChainError::UnknownBone(missing));
        }

        for i in Self::broken_links(scene, &bones) {
            log::warn!(
                "chain bone {} is not a child of {}; its solved rotations will not line up",
                bones[i + 1],
                bones[i]
            );
        }

        let lengths: Vec<f32> = bones
            .windows(2)
            .map(|w| (scene.world_position(w[1]) - scene.world_position(w[0])).length())
            .collect();

        Ok(Self::from_parts(bones, lengths))
    }

    /// Grows a new hierarchy below `root`, one child per entry of `lengths`,
    /// each offset along `direction` in its parent's space.
    pub fn from_lengths(
        skeleton: &mut Skeleton,
        root: BoneId,
        lengths: &[f32],
        direction: Vec3,
    ) -> Result<Self, ChainError> {
        if !skeleton.contains(root) {
            return Err(ChainError::UnknownBone(root));
        }
        let direction = direction
            .try_normalize()
            .ok_or(ChainError::DegenerateDirection)?;
        if let Some((index, &length)) = lengths
            .iter()
            .enumerate()
            .find(|(_, l)| !l.is_finite() || **l < 0.0)
        {
            return Err(ChainError::InvalidLength { index, length });
        }

        let root_name = skeleton
            .node(root)
            .map(|n| n.name.clone())
            .unwrap_or_default();

        let mut bones = Vec::with_capacity(lengths.len() + 1);
        bones.push(root);

        let mut parent = root;
        for (i, &length) in lengths.iter().enumerate() {
            parent = skeleton.add_child(parent, format!("{root_name}.{}", i + 1), direction * length);
            bones.push(parent);
        }

        Ok(Self::from_parts(bones, lengths.to_vec()))
    }

    /// Indices `i` where `bones[i + 1]` is not a direct child of `bones[i]`.
    fn broken_links<S: SceneGraph + ?Sized>(scene: &S, bones: &[BoneId]) -> Vec<usize> {
        bones
            .windows(2)
            .enumerate()
            .filter(|(_, w)| scene.parent(w[1]) != Some(w[0]))
            .map(|(i, _)| i)
            .collect()
    }

    fn from_parts(bones: Vec<BoneId>, lengths: Vec<f32>) -> Self {
        let total_length = lengths.iter().sum();
        Self {
            bones,
            lengths,
            total_length,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: BoneConstraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    /// Adds or replaces the constraint for `constraint.bone_index`.
    pub fn add_constraint(&mut self, constraint: BoneConstraint) {
        if constraint.bone_index >= self.bones.len() {
            log::warn!(
                "constraint for bone index {} is outside a chain of {} bones and will be ignored",
                constraint.bone_index,
                self.bones.len()
            );
        }
        match self
            .constraints
            .iter_mut()
            .find(|c| c.bone_index == constraint.bone_index)
        {
            Some(existing) => *existing = constraint,
            None => self.constraints.push(constraint),
        }
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn bones(&self) -> &[BoneId] {
        &self.bones
    }

    pub fn lengths(&self) -> &[f32] {
        &self.lengths
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    pub fn constraints(&self) -> &[BoneConstraint] {
        &self.constraints
    }

    pub fn constraint_for(&self, bone_index: usize) -> Option<&BoneConstraint> {
        self.constraints.iter().find(|c| c.bone_index == bone_index)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn root(&self) -> BoneId {
        self.bones[0]
    }

    pub fn end_effector(&self) -> BoneId {
        self.bones[self.bones.len() - 1]
    }

    pub fn world_positions<S: SceneGraph + ?Sized>(&self, scene: &S) -> Vec<Vec3> {
        self.bones.iter().map(|&b| scene.world_position(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_scene_samples_lengths() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("arm", Vec3::ZERO);
        let elbow = skeleton.add_child(root, "elbow", Vec3::new(0.0, 2.0, 0.0));
        let wrist = skeleton.add_child(elbow, "wrist", Vec3::new(0.0, 0.0, 1.5));

        let chain = BoneChain::from_scene(&skeleton, vec![root, elbow, wrist]).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.lengths().len(), 2);
        assert!((chain.lengths()[0] - 2.0).abs() < 1e-6);
        assert!((chain.lengths()[1] - 1.5).abs() < 1e-6);
        assert!((chain.total_length() - 3.5).abs() < 1e-6);
        assert_eq!(chain.end_effector(), wrist);
    }

    #[test]
    fn from_scene_tolerates_skipped_bones() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("leg", Vec3::ZERO);
        let knee = skeleton.add_child(root, "knee", Vec3::new(0.0, -1.0, 0.0));
        let ankle = skeleton.add_child(knee, "ankle", Vec3::new(0.0, -1.0, 0.0));
        let toe = skeleton.add_child(ankle, "toe", Vec3::new(0.0, 0.0, -0.3));

        assert!(BoneChain::broken_links(&skeleton, &[root, knee, ankle, toe]).is_empty());
        assert_eq!(BoneChain::broken_links(&skeleton, &[root, ankle, toe]), vec![0]);

        let chain = BoneChain::from_scene(&skeleton, vec![root, ankle, toe]).unwrap();
        assert!((chain.lengths()[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn from_scene_rejects_bad_input() {
        let skeleton = Skeleton::new();
        assert_eq!(
            BoneChain::from_scene(&skeleton, Vec::new()).unwrap_err(),
            ChainError::Empty
        );
        assert_eq!(
            BoneChain::from_scene(&skeleton, vec![BoneId(3)]).unwrap_err(),
            ChainError::UnknownBone(BoneId(3))
        );
    }

    #[test]
    fn from_lengths_builds_hierarchy() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("tail", Vec3::new(1.0, 0.0, 0.0));
        let chain =
            BoneChain::from_lengths(&mut skeleton, root, &[1.0, 0.5, 0.25], Vec3::new(0.0, 0.0, -2.0))
                .unwrap();

        assert_eq!(chain.len(), 4);
        assert_eq!(skeleton.len(), 4);
        let tip = skeleton.world_position(chain.end_effector());
        assert!((tip - Vec3::new(1.0, 0.0, -1.75)).length() < 1e-5);
        assert_eq!(skeleton.node(chain.bones()[2]).unwrap().name, "tail.2");
    }

    #[test]
    fn from_lengths_validates() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("root", Vec3::ZERO);
        assert_eq!(
            BoneChain::from_lengths(&mut skeleton, root, &[1.0], Vec3::ZERO).unwrap_err(),
            ChainError::DegenerateDirection
        );
        assert_eq!(
            BoneChain::from_lengths(&mut skeleton, root, &[1.0, -2.0], Vec3::Y).unwrap_err(),
            ChainError::InvalidLength {
                index: 1,
                length: -2.0
            }
        );
    }

    #[test]
    fn constraints_are_keyed_by_index() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("root", Vec3::ZERO);
        let chain = BoneChain::from_lengths(&mut skeleton, root, &[1.0, 1.0], Vec3::Y)
            .unwrap()
            .with_constraint(BoneConstraint::hinge(1, 0.1, 0.5))
            .with_constraint(BoneConstraint::hinge(1, 0.2, 0.4));

        assert_eq!(chain.constraints().len(), 1);
        assert_eq!(chain.constraint_for(1).unwrap().min_angle, Some(0.2));
        assert!(chain.constraint_for(0).is_none());
    }
}
