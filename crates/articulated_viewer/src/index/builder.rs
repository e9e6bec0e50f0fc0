//! Single-pass scene index construction

use super::classifier::MeshClassifier;
use super::{JointSpec, ResolvedLimits, SceneIndex};
use crate::config::VisibilityConfig;
use crate::foundation::collections::NodeKey;
use crate::scene::{JointData, NodeFlags, NodeKind, SceneTree};

/// Builds a [`SceneIndex`] from a scene tree
///
/// The builder never fails: missing axes, missing or malformed limits and
/// unresolvable owners are normalized or tolerated so any structurally valid
/// tree yields a usable index.
pub struct SceneIndexBuilder;

impl SceneIndexBuilder {
    /// Walk the tree once in pre-order and produce a fresh index
    pub fn build(tree: &SceneTree, visibility: VisibilityConfig) -> SceneIndex {
        let mut index = SceneIndex {
            visibility,
            ..SceneIndex::default()
        };

        let mut stack = vec![tree.root()];
        while let Some(key) = stack.pop() {
            let Some(node) = tree.get(key) else {
                continue;
            };
            if node.flags.contains(NodeFlags::OVERLAY) {
                index.skipped_overlays += 1;
                continue;
            }

            match &node.kind {
                NodeKind::Group => {}
                NodeKind::Link(link) => {
                    if index.links.contains_key(&node.name) {
                        log::warn!("Duplicate link name '{}'; keeping the first", node.name);
                    } else {
                        index.links.insert(node.name.clone(), key);
                        index.link_names.insert(key, node.name.clone());
                        if let Some(inertial) = &link.inertial {
                            index.inertials.insert(node.name.clone(), inertial.clone());
                        }
                    }
                }
                NodeKind::Joint(joint) => {
                    if index.joints.contains_key(&node.name) {
                        log::warn!("Duplicate joint name '{}'; keeping the first", node.name);
                    } else {
                        index
                            .joints
                            .insert(node.name.clone(), Self::joint_spec(key, joint));
                        index.joint_names.insert(key, node.name.clone());
                    }
                }
                NodeKind::Mesh(mesh) => {
                    Self::register_mesh(tree, &mut index, key);
                    index
                        .original_materials
                        .entry(key)
                        .or_insert_with(|| mesh.material.clone());
                }
            }

            stack.extend(tree.children(key).iter().rev().copied());
        }

        index.refresh_bounds(tree);

        log::debug!(
            "Built scene index: {} links, {} joints, {} meshes ({} kinematic, {} static), {} overlays skipped",
            index.links.len(),
            index.joints.len(),
            index.mesh_is_collision.len(),
            index.kinematic.len(),
            index.static_meshes.len(),
            index.skipped_overlays
        );

        index
    }

    fn register_mesh(tree: &SceneTree, index: &mut SceneIndex, mesh: NodeKey) {
        let class = MeshClassifier::classify(tree, mesh);
        index.mesh_is_collision.insert(mesh, class.is_collision());

        match MeshClassifier::resolve_owner(tree, mesh, &index.links) {
            Some(owner) => {
                let buckets = if class.is_collision() {
                    &mut index.collision_meshes
                } else {
                    &mut index.visual_meshes
                };
                buckets.entry(owner.clone()).or_default().push(mesh);
                index.mesh_owner.insert(mesh, owner);
            }
            None => log::warn!("Mesh {:?} has no owning link", mesh),
        }

        let mut kinematic = false;
        for ancestor in tree.ancestors(mesh) {
            if !tree.get(ancestor).is_some_and(|n| n.is_movable_joint()) {
                continue;
            }
            kinematic = true;
            if let Some(name) = index.joint_names.get(&ancestor) {
                index
                    .joint_affected
                    .entry(name.clone())
                    .or_default()
                    .insert(mesh);
            }
        }

        if kinematic {
            index.kinematic.insert(mesh);
        } else {
            index.static_meshes.insert(mesh);
        }
    }

    /// Normalize a joint's axis and limits
    pub fn joint_spec(key: NodeKey, joint: &JointData) -> JointSpec {
        let limits = match joint.limits {
            Some(limits) if limits.lower.is_finite() && limits.upper.is_finite() => {
                let (lower, upper) = if limits.lower <= limits.upper {
                    (limits.lower, limits.upper)
                } else {
                    (limits.upper, limits.lower)
                };
                ResolvedLimits {
                    lower,
                    upper,
                    explicit: true,
                }
            }
            _ => ResolvedLimits::default(),
        };

        JointSpec {
            key,
            kind: joint.kind,
            axis: joint.unit_axis(),
            limits,
        }
    }
}
