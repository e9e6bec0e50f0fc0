//! # Articulated Viewer
//!
//! Core of an interactive viewer for articulated 3D models: kinematic chains
//! of rigid links connected by 1-DOF joints, each link carrying visual and
//! collision meshes.
//!
//! ## Features
//!
//! - **Scene Index**: Flat lookups (mesh owner, joint-affected meshes,
//!   visual/collision class, original material) rebuilt from the tree
//! - **Mesh Classification**: Marker-then-name phase pipeline
//! - **Matrix Freezing**: Static meshes skip per-frame matrix updates
//! - **Highlighting**: Reversible hover and selection overlays
//! - **Joint Dragging**: Ray-driven revolute and prismatic manipulation
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use articulated_viewer::prelude::*;
//!
//! let mut tree = SceneTree::new("robot");
//! let base = tree.add_child(tree.root(), Node::link("base")).unwrap();
//! tree.add_child(
//!     base,
//!     Node::mesh(
//!         "base_visual",
//!         Arc::new(MeshGeometry::cuboid(Vec3::new(0.4, 0.4, 0.2))),
//!         Material::default().into_handle(),
//!     ),
//! )
//! .unwrap();
//!
//! let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
//! let ticket = session.begin_load();
//! session.finish_load(&ticket, Ok(tree));
//! assert_eq!(session.index().link_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, unused_imports)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod events;
pub mod foundation;
pub mod highlight;
pub mod index;
pub mod interaction;
pub mod scene;
pub mod session;

#[cfg(test)]
mod tests;

pub use highlight::HighlightManager;
pub use index::{MatrixFreezeOptimizer, MeshClassifier, SceneIndex, SceneIndexBuilder};
pub use interaction::PointerInteractionController;
pub use session::{ViewerError, ViewerSession};

/// Common imports for viewer users
pub mod prelude {
    pub use crate::{
        config::{
            Config, InteractionMode, InteractionTool, ViewerConfig, VisibilityConfig,
        },
        events::{EventHandler, EventKind, SelectionKind, ViewerEvent},
        foundation::{
            collections::NodeKey,
            math::{Transform, Vec3},
        },
        index::{JointSpec, SceneIndex},
        interaction::{Camera, PickOutcome, PointerState},
        scene::{
            GeometryClass, JointData, JointKind, Material, MeshGeometry, Node, NodeFlags,
            SceneTree,
        },
        session::{LoadError, LoadOutcome, LoadState, LoadTicket, ViewerError, ViewerSession},
    };
}
