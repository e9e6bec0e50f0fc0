//! Arena-backed scene tree
//!
//! The tree is the single source of truth for hierarchy, transforms,
//! materials and joint values. Derived lookup structures (see
//! [`crate::index`]) are rebuilt from it and never written back.

use std::sync::Arc;

use super::geometry::MeshGeometry;
use super::node::{Node, NodeKind};
use super::SceneError;
use crate::foundation::collections::{NodeArena, NodeKey};
use crate::foundation::math::{Mat4, Transform};

/// Hierarchical scene graph of one articulated model
#[derive(Debug, Clone)]
pub struct SceneTree {
    nodes: NodeArena<Node>,
    root: NodeKey,
}

impl SceneTree {
    /// Create a tree containing only a root grouping node
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut nodes = NodeArena::with_key();
        let root = nodes.insert(Node::group(root_name));
        Self { nodes, root }
    }

    /// Root node
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of live nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree only holds its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether `key` refers to a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Borrow a node
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Mutably borrow a node
    ///
    /// Hierarchy and transform fields are not reachable through this borrow;
    /// use [`SceneTree::set_transform`] and friends so cached matrices stay
    /// coherent.
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    fn node(&self, key: NodeKey) -> Result<&Node, SceneError> {
        self.nodes.get(key).ok_or(SceneError::UnknownNode(key))
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(key).ok_or(SceneError::UnknownNode(key))
    }

    /// Attach a new node under `parent`
    pub fn add_child(&mut self, parent: NodeKey, mut node: Node) -> Result<NodeKey, SceneError> {
        if self.node(parent)?.is_mesh() {
            return Err(SceneError::InvalidParent(parent));
        }
        node.parent = Some(parent);
        node.children.clear();
        let key = self.nodes.insert(node);
        self.node_mut(parent)?.children.push(key);
        Ok(key)
    }

    /// Detach and delete `key` and all of its descendants
    ///
    /// Returns the removed keys in pre-order.
    pub fn remove_subtree(&mut self, key: NodeKey) -> Result<Vec<NodeKey>, SceneError> {
        if key == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }
        let parent = self.node(key)?.parent;
        let removed = self.descendants(key);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != key);
        }
        for k in &removed {
            self.nodes.remove(*k);
        }
        Ok(removed)
    }

    /// Parent of `key`
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key)?.parent
    }

    /// Children of `key`
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |n| n.children.as_slice())
    }

    /// Iterate from `key`'s parent up to the root
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(key),
        }
    }

    /// Iterate from `key` itself up to the root
    pub fn ancestors_inclusive(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.contains(key).then_some(key),
        }
    }

    /// `key` and all of its descendants in pre-order
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        if !self.contains(key) {
            return out;
        }
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().rev().copied());
        }
        out
    }

    /// First node with the given name in pre-order (linear walk)
    pub fn find_by_name(&self, name: &str) -> Option<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .find(|k| self.nodes.get(*k).is_some_and(|n| n.name == name))
    }

    /// Replace the local transform of a node
    ///
    /// Frozen descendants are re-baked so their cached world matrix stays
    /// correct.
    pub fn set_transform(&mut self, key: NodeKey, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(key)?.transform = transform;
        self.rebake_frozen_below(key);
        Ok(())
    }

    /// Set a joint's value without any clamping
    pub fn set_joint_value(&mut self, key: NodeKey, value: f32) -> Result<(), SceneError> {
        match &mut self.node_mut(key)?.kind {
            NodeKind::Joint(joint) => {
                joint.value = value;
                Ok(())
            }
            _ => Err(SceneError::WrongKind {
                node: key,
                expected: "joint",
            }),
        }
    }

    /// Replace a mesh's geometry
    pub fn set_mesh_geometry(
        &mut self,
        key: NodeKey,
        geometry: Arc<MeshGeometry>,
    ) -> Result<(), SceneError> {
        let mesh = self.node_mut(key)?.as_mesh_mut().ok_or(SceneError::WrongKind {
            node: key,
            expected: "mesh",
        })?;
        mesh.geometry = geometry;
        Ok(())
    }

    /// World matrix computed by walking the ancestor chain
    pub fn compute_world_matrix(&self, key: NodeKey) -> Mat4 {
        self.ancestors_inclusive(key)
            .fold(Mat4::identity(), |acc, k| match self.nodes.get(k) {
                Some(node) => node.local_matrix() * acc,
                None => acc,
            })
    }

    /// World matrix of the parent frame
    pub fn compute_parent_world_matrix(&self, key: NodeKey) -> Mat4 {
        self.parent(key)
            .map_or_else(Mat4::identity, |p| self.compute_world_matrix(p))
    }

    /// Cached world matrix as of the last [`SceneTree::update_world_matrices`]
    pub fn world_matrix(&self, key: NodeKey) -> Option<Mat4> {
        self.nodes.get(key).map(|n| n.world)
    }

    /// Recompute cached world matrices top-down
    ///
    /// Frozen nodes keep their baked matrix and are not counted. Returns the
    /// number of matrices recomputed.
    pub fn update_world_matrices(&mut self) -> usize {
        let mut recomputed = 0;
        let mut stack = vec![(self.root, Mat4::identity())];
        while let Some((key, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if node.matrix_auto_update {
                node.world = parent_world * node.local_matrix();
                recomputed += 1;
            }
            let world = node.world;
            stack.extend(node.children.iter().map(|c| (*c, world)));
        }
        recomputed
    }

    /// Bake the current world matrix and stop per-frame recomputation
    pub fn freeze(&mut self, key: NodeKey) -> Result<(), SceneError> {
        let world = self.compute_world_matrix(key);
        let node = self.node_mut(key)?;
        node.world = world;
        node.matrix_auto_update = false;
        Ok(())
    }

    /// Resume per-frame recomputation
    pub fn thaw(&mut self, key: NodeKey) -> Result<(), SceneError> {
        self.node_mut(key)?.matrix_auto_update = true;
        Ok(())
    }

    /// Whether a node's world matrix is frozen
    pub fn is_frozen(&self, key: NodeKey) -> bool {
        self.nodes.get(key).is_some_and(|n| !n.matrix_auto_update)
    }

    fn rebake_frozen_below(&mut self, key: NodeKey) {
        for k in self.descendants(key) {
            if self.is_frozen(k) {
                let world = self.compute_world_matrix(k);
                if let Some(node) = self.nodes.get_mut(k) {
                    node.world = world;
                }
            }
        }
    }

    /// Iterate all live nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    /// Release every node and its geometry
    ///
    /// Returns how many meshes were released.
    pub fn dispose(self) -> usize {
        let meshes = self.nodes.values().filter(|n| n.is_mesh()).count();
        log::debug!("Disposing scene tree with {} nodes ({} meshes)", self.nodes.len(), meshes);
        drop(self.nodes);
        meshes
    }
}

/// Iterator over a node's ancestor chain
pub struct Ancestors<'a> {
    tree: &'a SceneTree,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{utils, Vec3};
    use crate::scene::material::Material;
    use crate::scene::node::{JointData, JointKind};
    use approx::assert_relative_eq;

    fn cube() -> Node {
        Node::mesh(
            "cube",
            Arc::new(MeshGeometry::cuboid(Vec3::new(1.0, 1.0, 1.0))),
            Material::default().into_handle(),
        )
    }

    #[test]
    fn test_remove_subtree_invalidates_keys() {
        let mut tree = SceneTree::new("robot");
        let link = tree.add_child(tree.root(), Node::link("base")).unwrap();
        let mesh = tree.add_child(link, cube()).unwrap();

        let removed = tree.remove_subtree(link).unwrap();
        assert_eq!(removed, vec![link, mesh]);
        assert!(!tree.contains(mesh));
        assert!(tree.children(tree.root()).is_empty());
        assert!(matches!(
            tree.remove_subtree(tree.root()),
            Err(SceneError::CannotRemoveRoot)
        ));
    }

    #[test]
    fn test_mesh_cannot_parent() {
        let mut tree = SceneTree::new("robot");
        let mesh = tree.add_child(tree.root(), cube()).unwrap();
        assert!(matches!(
            tree.add_child(mesh, Node::group("g")),
            Err(SceneError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_world_matrix_includes_joint_motion() {
        let mut tree = SceneTree::new("robot");
        let joint = tree
            .add_child(
                tree.root(),
                Node::joint("j", JointData::new(JointKind::Prismatic).with_axis(Vec3::x()))
                    .with_transform(Transform::from_position(Vec3::new(0.0, 0.0, 1.0))),
            )
            .unwrap();
        let mesh = tree.add_child(joint, cube()).unwrap();

        tree.set_joint_value(joint, 0.5).unwrap();
        let world = tree.compute_world_matrix(mesh);
        assert_relative_eq!(utils::translation_of(&world), Vec3::new(0.5, 0.0, 1.0));

        assert_eq!(tree.update_world_matrices(), 3);
        assert_relative_eq!(tree.world_matrix(mesh).unwrap(), world);
    }

    #[test]
    fn test_frozen_nodes_skip_update_but_rebake_on_edit() {
        let mut tree = SceneTree::new("robot");
        let link = tree.add_child(tree.root(), Node::link("base")).unwrap();
        let mesh = tree.add_child(link, cube()).unwrap();

        tree.freeze(mesh).unwrap();
        assert_eq!(tree.update_world_matrices(), 2);

        tree.set_transform(link, Transform::from_position(Vec3::new(2.0, 0.0, 0.0)))
            .unwrap();
        assert_relative_eq!(
            utils::translation_of(&tree.world_matrix(mesh).unwrap()),
            Vec3::new(2.0, 0.0, 0.0)
        );
    }
}
