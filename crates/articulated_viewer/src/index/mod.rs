//! Flat scene index
//!
//! A derived, query-optimized view of a [`SceneTree`]: per-link mesh buckets,
//! per-joint affected-mesh sets, the kinematic/static mesh partition and
//! reverse lookups from a mesh to its owner and classification. The index is
//! a pure function of the tree and is rebuilt wholesale on structural change;
//! it never holds geometry or transforms of its own.

pub mod builder;
pub mod classifier;
pub mod freeze;

pub use builder::SceneIndexBuilder;
pub use classifier::{is_collision_name, MeshClassifier};
pub use freeze::{FreezeReport, MatrixFreezeOptimizer};

use std::collections::{HashMap, HashSet};

use crate::config::VisibilityConfig;
use crate::foundation::collections::NodeKey;
use crate::foundation::math::{utils, UnitVec3};
use crate::scene::{Aabb, GeometryClass, Inertial, JointKind, MaterialHandle, SceneTree};

/// Default joint range when none is supplied
pub const DEFAULT_LIMIT: f32 = std::f32::consts::PI;

/// Joint limits after normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLimits {
    /// Lower bound
    pub lower: f32,
    /// Upper bound
    pub upper: f32,
    /// Whether the loader supplied the limits
    pub explicit: bool,
}

impl Default for ResolvedLimits {
    fn default() -> Self {
        Self {
            lower: -DEFAULT_LIMIT,
            upper: DEFAULT_LIMIT,
            explicit: false,
        }
    }
}

/// Normalized description of a joint as used by the interaction code
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    /// Joint node
    pub key: NodeKey,
    /// Joint kind
    pub kind: JointKind,
    /// Unit axis in the joint frame
    pub axis: UnitVec3,
    /// Limits
    pub limits: ResolvedLimits,
}

impl JointSpec {
    /// Apply the clamping policy for this joint kind
    ///
    /// Revolute joints always clamp. Prismatic joints clamp only to limits the
    /// loader supplied. Continuous joints never clamp and fixed joints stay
    /// at zero. Non-finite input is treated as zero.
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value } else { 0.0 };
        match self.kind {
            JointKind::Fixed => 0.0,
            JointKind::Revolute => utils::clamp(value, self.limits.lower, self.limits.upper),
            JointKind::Prismatic if self.limits.explicit => {
                utils::clamp(value, self.limits.lower, self.limits.upper)
            }
            _ => value,
        }
    }
}

/// Flat lookup tables derived from one scene tree
#[derive(Debug, Clone, Default)]
pub struct SceneIndex {
    pub(crate) links: HashMap<String, NodeKey>,
    pub(crate) link_names: HashMap<NodeKey, String>,
    pub(crate) inertials: HashMap<String, Inertial>,
    pub(crate) joints: HashMap<String, JointSpec>,
    pub(crate) joint_names: HashMap<NodeKey, String>,
    pub(crate) visual_meshes: HashMap<String, Vec<NodeKey>>,
    pub(crate) collision_meshes: HashMap<String, Vec<NodeKey>>,
    pub(crate) joint_affected: HashMap<String, HashSet<NodeKey>>,
    pub(crate) mesh_owner: HashMap<NodeKey, String>,
    pub(crate) mesh_is_collision: HashMap<NodeKey, bool>,
    pub(crate) kinematic: HashSet<NodeKey>,
    pub(crate) static_meshes: HashSet<NodeKey>,
    pub(crate) original_materials: HashMap<NodeKey, MaterialHandle>,
    pub(crate) visibility: VisibilityConfig,
    pub(crate) model_bounds: Option<Aabb>,
    pub(crate) skipped_overlays: usize,
}

impl SceneIndex {
    /// Link node by name
    pub fn link(&self, name: &str) -> Option<NodeKey> {
        self.links.get(name).copied()
    }

    /// Link name of a link node
    pub fn link_name(&self, key: NodeKey) -> Option<&str> {
        self.link_names.get(&key).map(String::as_str)
    }

    /// All link names
    pub fn link_names(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// Number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Inertial metadata passed through from the link
    pub fn inertial(&self, link: &str) -> Option<&Inertial> {
        self.inertials.get(link)
    }

    /// Joint description by name
    pub fn joint(&self, name: &str) -> Option<&JointSpec> {
        self.joints.get(name)
    }

    /// Joint name of a joint node
    pub fn joint_name(&self, key: NodeKey) -> Option<&str> {
        self.joint_names.get(&key).map(String::as_str)
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Visual meshes of a link, in tree order
    pub fn visual_meshes(&self, link: &str) -> &[NodeKey] {
        self.visual_meshes.get(link).map_or(&[], Vec::as_slice)
    }

    /// Collision meshes of a link, in tree order
    pub fn collision_meshes(&self, link: &str) -> &[NodeKey] {
        self.collision_meshes.get(link).map_or(&[], Vec::as_slice)
    }

    /// Meshes of a link in the given class
    pub fn meshes_for(&self, link: &str, class: GeometryClass) -> &[NodeKey] {
        match class {
            GeometryClass::Visual => self.visual_meshes(link),
            GeometryClass::Collision => self.collision_meshes(link),
        }
    }

    /// Meshes whose world transform depends on the joint
    pub fn affected_meshes(&self, joint: &str) -> Option<&HashSet<NodeKey>> {
        self.joint_affected.get(joint)
    }

    /// Owning link of a mesh
    pub fn owner_of(&self, mesh: NodeKey) -> Option<&str> {
        self.mesh_owner.get(&mesh).map(String::as_str)
    }

    /// Whether an indexed mesh is collision geometry
    pub fn is_collision(&self, mesh: NodeKey) -> Option<bool> {
        self.mesh_is_collision.get(&mesh).copied()
    }

    /// Classification of an indexed mesh
    pub fn class_of(&self, mesh: NodeKey) -> Option<GeometryClass> {
        self.is_collision(mesh).map(GeometryClass::from_collision)
    }

    /// Whether the mesh is indexed
    pub fn contains_mesh(&self, mesh: NodeKey) -> bool {
        self.mesh_is_collision.contains_key(&mesh)
    }

    /// All indexed meshes
    pub fn meshes(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.mesh_is_collision.keys().copied()
    }

    /// Number of indexed meshes
    pub fn mesh_count(&self) -> usize {
        self.mesh_is_collision.len()
    }

    /// Meshes that depend on at least one movable joint
    pub fn kinematic_meshes(&self) -> &HashSet<NodeKey> {
        &self.kinematic
    }

    /// Meshes that depend on no movable joint
    pub fn static_meshes(&self) -> &HashSet<NodeKey> {
        &self.static_meshes
    }

    /// Whether the mesh moves with some joint
    pub fn is_kinematic(&self, mesh: NodeKey) -> bool {
        self.kinematic.contains(&mesh)
    }

    /// Material the mesh had when the index was built
    pub fn original_material(&self, mesh: NodeKey) -> Option<&MaterialHandle> {
        self.original_materials.get(&mesh)
    }

    /// Visibility toggles the index was built with
    pub fn visibility(&self) -> VisibilityConfig {
        self.visibility
    }

    pub(crate) fn set_visibility(&mut self, visibility: VisibilityConfig) {
        self.visibility = visibility;
    }

    /// Cached world-space bounds of every indexed mesh
    pub fn model_bounds(&self) -> Option<Aabb> {
        self.model_bounds
    }

    /// Number of overlay subtrees skipped during the build
    pub fn skipped_overlays(&self) -> usize {
        self.skipped_overlays
    }

    /// Recompute the cached model bounds from current world transforms
    pub fn refresh_bounds(&mut self, tree: &SceneTree) {
        self.model_bounds = self
            .mesh_is_collision
            .keys()
            .filter_map(|k| {
                let mesh = tree.get(*k)?.as_mesh()?;
                let local = mesh.geometry.bounds()?;
                Some(local.transformed(&tree.compute_world_matrix(*k)))
            })
            .reduce(|a, b| a.union(&b));
    }

    /// Owning link of any node, falling back to a tree walk on an index miss
    ///
    /// Nodes attached after the last rebuild are not indexed yet; for them the
    /// owner is found by walking the tree, which is slower but keeps lookups
    /// correct until the next rebuild.
    pub fn resolve_owner_with_fallback(&self, tree: &SceneTree, node: NodeKey) -> Option<String> {
        if let Some(owner) = self.owner_of(node) {
            return Some(owner.to_string());
        }
        if let Some(name) = self.link_name(node) {
            return Some(name.to_string());
        }
        if !tree.contains(node) {
            return None;
        }
        log::warn!("Scene index miss for {:?}; falling back to tree walk", node);
        if tree.get(node).is_some_and(|n| n.is_link()) {
            return tree.get(node).map(|n| n.name.clone());
        }
        MeshClassifier::resolve_owner(tree, node, &self.links)
    }
}
