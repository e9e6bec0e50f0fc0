//! Mesh classification and owner resolution
//!
//! Classification is an ordered list of phases. Each phase is a predicate
//! evaluated against the mesh and then each of its ancestors; the first phase
//! that produces an answer anywhere on the chain decides. A mesh that no
//! phase claims is visual.

use std::collections::HashMap;

use crate::foundation::collections::NodeKey;
use crate::scene::{GeometryClass, Node, NodeFlags, SceneTree};

/// A single classification predicate
pub type ClassificationRule = fn(&Node) -> Option<GeometryClass>;

/// Words that mark a collision subtree when they end a node name
const COLLISION_WORDS: [&str; 5] = ["collision", "collisions", "collider", "colliders", "col"];

/// Classification phases in priority order
const PHASES: [(&str, ClassificationRule); 2] = [
    ("marker", explicit_marker),
    ("name", collision_name),
];

/// Explicit loader marker: authoritative when present
fn explicit_marker(node: &Node) -> Option<GeometryClass> {
    node.flags
        .contains(NodeFlags::COLLISION)
        .then_some(GeometryClass::Collision)
}

/// Naming convention fallback
fn collision_name(node: &Node) -> Option<GeometryClass> {
    is_collision_name(&node.name).then_some(GeometryClass::Collision)
}

/// Whether a node name denotes collision geometry
///
/// The final name segment (split on `_ - . / :` and whitespace) must be one
/// of the collision words, case-insensitively. A trailing all-digit segment
/// such as the `0` in `leg_collision_0` is skipped first. `leg_collision`
/// matches; `collision_detector` does not.
pub fn is_collision_name(name: &str) -> bool {
    let mut segments = name
        .split(|c: char| matches!(c, '_' | '-' | '.' | '/' | ':') || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .rev()
        .peekable();

    if segments
        .peek()
        .is_some_and(|s| s.chars().all(|c| c.is_ascii_digit()))
    {
        segments.next();
    }

    segments.next().is_some_and(|last| {
        COLLISION_WORDS
            .iter()
            .any(|word| last.eq_ignore_ascii_case(word))
    })
}

/// Visual-vs-collision classifier and owning-link resolver
pub struct MeshClassifier;

impl MeshClassifier {
    /// Classify a mesh by walking it and its ancestors once per phase
    pub fn classify(tree: &SceneTree, mesh: NodeKey) -> GeometryClass {
        for (phase, rule) in PHASES {
            let found = tree
                .ancestors_inclusive(mesh)
                .filter_map(|k| tree.get(k))
                .find_map(rule);
            if let Some(class) = found {
                log::trace!("Mesh {:?} classified {:?} by {} phase", mesh, class, phase);
                return class;
            }
        }
        GeometryClass::Visual
    }

    /// Resolve the link that owns a mesh
    ///
    /// Walks from the mesh's parent toward the root; the first ancestor that
    /// is a link node, or whose name is a known link name, owns the mesh.
    /// Grouping nodes in between are skipped.
    pub fn resolve_owner(
        tree: &SceneTree,
        mesh: NodeKey,
        known_links: &HashMap<String, NodeKey>,
    ) -> Option<String> {
        tree.ancestors(mesh)
            .filter_map(|k| tree.get(k))
            .find(|node| node.is_link() || known_links.contains_key(&node.name))
            .map(|node| node.name.clone())
    }
}
