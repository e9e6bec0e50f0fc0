//! Scene module
//!
//! The hierarchical model handed over by the loader: typed nodes in an
//! arena-backed tree, their materials and geometry, plus the ray and box
//! primitives used to pick them.

pub mod geometry;
pub mod material;
pub mod node;
pub mod tree;

pub use geometry::{Aabb, MeshGeometry, Ray, RayHit, Triangle};
pub use material::{AlphaMode, Material, MaterialHandle};
pub use node::{
    GeometryClass, Inertial, JointData, JointKind, JointLimits, LinkData, MeshData, Node,
    NodeFlags, NodeKind,
};
pub use tree::SceneTree;

use crate::foundation::collections::NodeKey;
use thiserror::Error;

/// Errors raised by explicit tree edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The key does not refer to a live node
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeKey),

    /// No node carries this name
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// The node exists but has a different type
    #[error("Node {node:?} is not a {expected}")]
    WrongKind {
        /// Offending node
        node: NodeKey,
        /// Expected node type
        expected: &'static str,
    },

    /// Meshes are leaves and cannot take children
    #[error("Node {0:?} cannot have children")]
    InvalidParent(NodeKey),

    /// The root node is permanent
    #[error("The root node cannot be removed")]
    CannotRemoveRoot,

    /// A link or joint with this name already exists
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
}
