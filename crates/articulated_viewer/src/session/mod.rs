//! Viewer session
//!
//! Owns the active scene tree together with everything derived from it: the
//! scene index, highlight bookkeeping, the pointer controller, the camera
//! and the event queue. All edits go through the session so the index is
//! rebuilt whenever the tree's structure changes.

pub mod loading;

pub use loading::{AbortToken, LoadCoordinator, LoadError, LoadOutcome, LoadState, LoadTicket};

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, InteractionMode, InteractionTool, ViewerConfig, VisibilityConfig};
use crate::events::{EventHandler, EventKind, EventSystem, SelectionKind, ViewerEvent};
use crate::foundation::collections::NodeKey;
use crate::foundation::math::Transform;
use crate::highlight::HighlightManager;
use crate::index::{MatrixFreezeOptimizer, SceneIndex, SceneIndexBuilder};
use crate::interaction::{Camera, InteractionContext, PickOutcome, PointerInteractionController};
use crate::scene::{JointData, MeshGeometry, Node, Ray, SceneError, SceneTree};

/// Session-level errors
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Tree edit error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Load error
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

/// Interactive viewer for one articulated model at a time
#[derive(Debug)]
pub struct ViewerSession {
    config: ViewerConfig,
    tree: SceneTree,
    index: SceneIndex,
    highlight: HighlightManager,
    controller: PointerInteractionController,
    events: EventSystem,
    camera: Camera,
    loads: LoadCoordinator,
}

impl ViewerSession {
    /// Create a session with an empty scene
    pub fn new(config: ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;
        let tree = SceneTree::new("scene");
        let index = SceneIndexBuilder::build(&tree, config.visibility);
        Ok(Self {
            highlight: HighlightManager::new(config.highlight.clone(), config.visibility),
            controller: PointerInteractionController::new(&config.interaction, &config.highlight),
            events: EventSystem::new(),
            camera: Camera::default(),
            loads: LoadCoordinator::new(),
            config,
            tree,
            index,
        })
    }

    /// Configuration the session was created with, with current toggles
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Active scene tree
    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    /// Current scene index
    pub fn index(&self) -> &SceneIndex {
        &self.index
    }

    /// Highlight bookkeeping
    pub fn highlight(&self) -> &HighlightManager {
        &self.highlight
    }

    /// Pointer controller
    pub fn controller(&self) -> &PointerInteractionController {
        &self.controller
    }

    /// Camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Event queue
    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Register a handler for one event kind
    pub fn register_handler(&mut self, kind: EventKind, handler: Box<dyn EventHandler>) {
        self.events.register_handler(kind, handler);
    }

    /// Deliver queued events to handlers
    pub fn dispatch_events(&mut self) -> usize {
        self.events.dispatch()
    }

    /// Remove queued events without delivering them
    pub fn take_events(&mut self) -> Vec<ViewerEvent> {
        self.events.take_pending()
    }

    /// Load lifecycle state
    pub fn load_state(&self) -> &LoadState {
        self.loads.state()
    }

    fn context(&mut self) -> (&mut PointerInteractionController, InteractionContext<'_>) {
        (
            &mut self.controller,
            InteractionContext {
                tree: &mut self.tree,
                index: &self.index,
                highlight: &mut self.highlight,
                events: &mut self.events,
            },
        )
    }

    // Loading

    /// Start a load request, aborting any outstanding one
    pub fn begin_load(&mut self) -> LoadTicket {
        let ticket = self.loads.begin();
        log::info!("Load {} started", ticket.id());
        ticket
    }

    /// Abort the outstanding load request
    pub fn cancel_load(&mut self) -> bool {
        self.loads.cancel()
    }

    /// Hand the loader's result for `ticket` to the session
    ///
    /// Stale results are disposed and ignored. A failure is only surfaced
    /// when it belongs to the latest request. A successful tree is fully
    /// indexed, frozen and styled before it replaces the active model.
    pub fn finish_load(&mut self, ticket: &LoadTicket, result: Result<SceneTree, LoadError>) -> LoadOutcome {
        let tree = match result {
            Ok(tree) => tree,
            Err(err) => {
                if !self.loads.is_current(ticket) {
                    log::debug!("Ignoring failure of stale load {}: {}", ticket.id(), err);
                    return LoadOutcome::Discarded;
                }
                log::warn!("Load {} failed: {}", ticket.id(), err);
                self.loads.fail(ticket, err.to_string());
                self.events.send(ViewerEvent::LoadFailed {
                    reason: err.to_string(),
                });
                return LoadOutcome::Failed(err);
            }
        };

        let (tree, index) = match self.prepare(ticket, tree) {
            Ok(prepared) => prepared,
            Err(stale) => {
                let meshes = stale.dispose();
                log::info!("Discarded stale load {} ({} meshes released)", ticket.id(), meshes);
                return LoadOutcome::Discarded;
            }
        };

        let (controller, mut ctx) = self.context();
        controller.reset(&mut ctx);
        controller.forget_scene();
        let previous = std::mem::replace(&mut self.tree, tree);
        self.index = index;
        self.highlight.retain_live(&self.tree);
        previous.dispose();

        self.loads.complete(ticket);
        let (links, joints, meshes) = (
            self.index.link_count(),
            self.index.joint_count(),
            self.index.mesh_count(),
        );
        log::info!(
            "Load {} attached: {} links, {} joints, {} meshes",
            ticket.id(),
            links,
            joints,
            meshes
        );
        self.events.send(ViewerEvent::ModelLoaded {
            links,
            joints,
            meshes,
        });
        LoadOutcome::Attached {
            links,
            joints,
            meshes,
        }
    }

    /// Index, freeze and style a freshly loaded tree, checking the ticket between steps
    fn prepare(&self, ticket: &LoadTicket, mut tree: SceneTree) -> Result<(SceneTree, SceneIndex), SceneTree> {
        if self.loads.check(ticket).is_err() {
            return Err(tree);
        }
        tree.update_world_matrices();
        let index = SceneIndexBuilder::build(&tree, self.highlight.visibility());

        if self.loads.check(ticket).is_err() {
            return Err(tree);
        }
        MatrixFreezeOptimizer::freeze(&mut tree, &index);

        if self.loads.check(ticket).is_err() {
            return Err(tree);
        }
        self.highlight.style_fresh(&mut tree, &index);
        Ok((tree, index))
    }

    /// Rebuild the index from the current tree
    ///
    /// Reverts highlights, rebuilds, refreezes and restyles. Needed after
    /// [`ViewerSession::add_node_deferred`]; other structural edits call it
    /// themselves.
    pub fn rebuild_index(&mut self) {
        let (controller, mut ctx) = self.context();
        controller.reset(&mut ctx);

        self.index = SceneIndexBuilder::build(&self.tree, self.highlight.visibility());
        self.tree.update_world_matrices();
        MatrixFreezeOptimizer::freeze(&mut self.tree, &self.index);
        self.highlight.retain_live(&self.tree);
        self.highlight.restyle_all(&mut self.tree, &self.index);
    }

    // Frame and pointer

    /// Per-frame update: refresh world matrices and cast the queued hover ray
    pub fn frame(&mut self) -> Option<PickOutcome> {
        self.tree.update_world_matrices();
        let (controller, mut ctx) = self.context();
        controller.frame(&mut ctx)
    }

    /// Resize the viewport
    ///
    /// A collapsed viewport keeps the previous aspect ratio.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.controller.update_window_size(width, height);
        if width > 0 && height > 0 {
            self.camera.set_aspect_ratio(width as f32 / height as f32);
        }
    }

    fn pointer_ray(&self, x: f64, y: f64) -> Option<Ray> {
        let mut mouse = self.controller.mouse().clone();
        mouse.update_position(x, y);
        let (ndc_x, ndc_y) = mouse.screen_to_ndc();
        let ray = self.camera.screen_to_world_ray(ndc_x, ndc_y);
        if ray.is_none() {
            log::warn!("Camera cannot produce a ray at ({}, {})", x, y);
        }
        ray
    }

    /// Pointer moved to window position `(x, y)`
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<f32> {
        let ray = self.pointer_ray(x, y)?;
        let (controller, mut ctx) = self.context();
        controller.pointer_move(&mut ctx, x, y, ray)
    }

    /// Primary button pressed at window position `(x, y)`
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<PickOutcome> {
        let ray = self.pointer_ray(x, y)?;
        self.tree.update_world_matrices();
        let (controller, mut ctx) = self.context();
        Some(controller.pointer_down(&mut ctx, x, y, ray))
    }

    /// Primary button released
    pub fn pointer_up(&mut self) -> Option<(String, f32)> {
        let (controller, mut ctx) = self.context();
        let committed = controller.pointer_up(&mut ctx);
        if committed.is_some() {
            self.index.refresh_bounds(&self.tree);
        }
        committed
    }

    /// Pointer left the viewport
    pub fn pointer_leave(&mut self) {
        let (controller, mut ctx) = self.context();
        controller.pointer_leave(&mut ctx);
        self.index.refresh_bounds(&self.tree);
    }

    // Modes and visibility

    /// Switch the interactive geometry class
    pub fn set_interaction_mode(&mut self, mode: InteractionMode) {
        let (controller, mut ctx) = self.context();
        controller.set_mode(&mut ctx, mode);
        self.config.interaction.mode = mode;
    }

    /// Switch the active tool
    pub fn set_tool(&mut self, tool: InteractionTool) {
        let (controller, mut ctx) = self.context();
        controller.set_tool(&mut ctx, tool);
        self.config.interaction.tool = tool;
    }

    /// Change the visual/collision visibility toggles
    pub fn set_visibility(&mut self, show_visual: bool, show_collision: bool) {
        let visibility = VisibilityConfig::new(show_visual, show_collision);
        self.highlight
            .set_visibility(&mut self.tree, &self.index, visibility);
        self.index.set_visibility(visibility);
        self.config.visibility = visibility;
    }

    /// Select a link by name, as from a UI list
    pub fn highlight_link(&mut self, link: &str) -> bool {
        let (controller, mut ctx) = self.context();
        controller.highlight_link(&mut ctx, link)
    }

    /// Report a joint selection made outside the viewport
    pub fn select_joint(&mut self, joint: &str) -> Result<(), ViewerError> {
        if self.index.joint(joint).is_none() {
            return Err(SceneError::UnknownName(joint.to_string()).into());
        }
        self.events.send(ViewerEvent::Selected {
            kind: SelectionKind::Joint,
            id: joint.to_string(),
            subtype: None,
        });
        Ok(())
    }

    // Edits

    /// Current value of a joint
    pub fn joint_value(&self, joint: &str) -> Option<f32> {
        let spec = self.index.joint(joint)?;
        Some(self.tree.get(spec.key)?.as_joint()?.value)
    }

    /// Position a joint programmatically
    ///
    /// Uses the same clamping policy as dragging and emits a commit. Returns
    /// the applied value.
    pub fn set_joint_value(&mut self, joint: &str, value: f32) -> Result<f32, ViewerError> {
        let spec = self
            .index
            .joint(joint)
            .ok_or_else(|| SceneError::UnknownName(joint.to_string()))?;
        let clamped = spec.clamp(value);
        self.tree.set_joint_value(spec.key, clamped)?;
        self.index.refresh_bounds(&self.tree);
        self.events.send(ViewerEvent::JointCommit {
            joint: joint.to_string(),
            value: clamped,
        });
        Ok(clamped)
    }

    /// Add a link under `parent` and rebuild the index
    pub fn add_link(&mut self, parent: NodeKey, name: &str) -> Result<NodeKey, ViewerError> {
        if self.index.link(name).is_some() {
            return Err(SceneError::DuplicateName(name.to_string()).into());
        }
        self.structural_edit(|tree| tree.add_child(parent, Node::link(name)))
    }

    /// Add a joint under `parent` at `origin` and rebuild the index
    pub fn add_joint(
        &mut self,
        parent: NodeKey,
        name: &str,
        joint: JointData,
        origin: Transform,
    ) -> Result<NodeKey, ViewerError> {
        if self.index.joint(name).is_some() {
            return Err(SceneError::DuplicateName(name.to_string()).into());
        }
        self.structural_edit(|tree| {
            tree.add_child(parent, Node::joint(name, joint).with_transform(origin))
        })
    }

    /// Remove a node and its subtree and rebuild the index
    pub fn remove_subtree(&mut self, key: NodeKey) -> Result<Vec<NodeKey>, ViewerError> {
        self.structural_edit(|tree| tree.remove_subtree(key))
    }

    /// Attach a node without rebuilding the index
    ///
    /// Until [`ViewerSession::rebuild_index`] runs the node is invisible to
    /// index queries; [`ViewerSession::resolve_owning_link`] still finds its
    /// owner through the tree.
    pub fn add_node_deferred(&mut self, parent: NodeKey, node: Node) -> Result<NodeKey, ViewerError> {
        Ok(self.tree.add_child(parent, node)?)
    }

    fn structural_edit<T>(
        &mut self,
        edit: impl FnOnce(&mut SceneTree) -> Result<T, SceneError>,
    ) -> Result<T, ViewerError> {
        let (controller, mut ctx) = self.context();
        controller.reset(&mut ctx);
        let result = edit(&mut self.tree)?;
        self.rebuild_index();
        Ok(result)
    }

    /// Replace a node's local transform in place
    pub fn set_node_transform(&mut self, key: NodeKey, transform: Transform) -> Result<(), ViewerError> {
        self.tree.set_transform(key, transform)?;
        self.index.refresh_bounds(&self.tree);
        Ok(())
    }

    /// Replace a mesh's geometry in place
    pub fn set_mesh_geometry(&mut self, key: NodeKey, geometry: Arc<MeshGeometry>) -> Result<(), ViewerError> {
        self.tree.set_mesh_geometry(key, geometry)?;
        self.index.refresh_bounds(&self.tree);
        Ok(())
    }

    // Lookups

    /// Link owning `node`, falling back to a tree walk for unindexed nodes
    pub fn resolve_owning_link(&self, node: NodeKey) -> Option<String> {
        self.index.resolve_owner_with_fallback(&self.tree, node)
    }

    /// Put every mesh back on the material it had when the index was built
    ///
    /// Returns how many meshes were restored.
    pub fn restore_original_materials(&mut self) -> usize {
        let (controller, mut ctx) = self.context();
        controller.reset(&mut ctx);

        let mut restored = 0;
        for key in self.index.meshes() {
            let Some(original) = self.index.original_material(key) else {
                continue;
            };
            if let Some(mesh) = self.tree.get_mut(key).and_then(|n| n.as_mesh_mut()) {
                mesh.material = Arc::clone(original);
                restored += 1;
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::tests::fixtures::ArmFixture;
    use approx::assert_relative_eq;

    fn loaded() -> (ViewerSession, ArmFixture) {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        let arm = ArmFixture::new();
        let ticket = session.begin_load();
        let outcome = session.finish_load(&ticket, Ok(arm.tree.clone()));
        assert!(matches!(outcome, LoadOutcome::Attached { .. }));
        session.take_events();
        (session, arm)
    }

    #[test]
    fn test_load_attaches_indexed_frozen_tree() {
        let (session, arm) = loaded();
        assert_eq!(session.load_state(), &LoadState::Ready);
        assert_eq!(session.index().link_count(), 5);
        assert_eq!(session.index().joint_count(), 3);
        assert!(session.tree().is_frozen(arm.base_visual));
        assert!(!session.tree().is_frozen(arm.forearm_visual));
        // Collision geometry hidden by default
        assert!(!session.tree().get(arm.base_collision).unwrap().visible);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        let stale = session.begin_load();
        let fresh = session.begin_load();

        let outcome = session.finish_load(&stale, Ok(ArmFixture::new().tree));
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert_eq!(session.index().mesh_count(), 0);
        assert_eq!(session.load_state(), &LoadState::Loading(fresh.id()));

        let outcome = session.finish_load(&stale, Err(LoadError::Loader("late".into())));
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_latest_load_failure_is_surfaced() {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        let ticket = session.begin_load();
        let outcome = session.finish_load(&ticket, Err(LoadError::Loader("missing mesh".into())));

        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(matches!(session.load_state(), LoadState::Failed(_)));
        assert!(matches!(
            session.take_events().as_slice(),
            [ViewerEvent::LoadFailed { .. }]
        ));
    }

    #[test]
    fn test_cancelled_load_is_discarded() {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        let ticket = session.begin_load();
        assert!(session.cancel_load());
        let outcome = session.finish_load(&ticket, Ok(ArmFixture::new().tree));
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert_eq!(session.load_state(), &LoadState::Idle);
    }

    #[test]
    fn test_set_joint_value_clamps_and_commits() {
        let (mut session, _) = loaded();
        assert_relative_eq!(session.set_joint_value("shoulder", 3.0).unwrap(), 1.57);
        assert_relative_eq!(session.joint_value("shoulder").unwrap(), 1.57);
        assert_relative_eq!(session.set_joint_value("elbow", 5.0).unwrap(), std::f32::consts::PI);
        assert_eq!(session.set_joint_value("tool_mount", 1.0).unwrap(), 0.0);
        assert!(session.set_joint_value("nope", 1.0).is_err());

        let commits = session
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, ViewerEvent::JointCommit { .. }))
            .count();
        assert_eq!(commits, 3);
    }

    #[test]
    fn test_add_link_and_joint_rebuild_index() {
        let (mut session, arm) = loaded();
        let joint = session
            .add_joint(
                arm.tool,
                "wrist",
                JointData::new(crate::scene::JointKind::Continuous).with_axis(Vec3::x()),
                Transform::from_position(Vec3::new(0.0, 0.0, 0.05)),
            )
            .unwrap();
        let link = session.add_link(joint, "gripper").unwrap();

        assert_eq!(session.index().link("gripper"), Some(link));
        assert!(session.index().joint("wrist").is_some());
        assert!(matches!(
            session.add_link(joint, "gripper"),
            Err(ViewerError::Scene(SceneError::DuplicateName(_)))
        ));
    }

    #[test]
    fn test_deferred_node_resolves_through_fallback() {
        let (mut session, arm) = loaded();
        let mesh = session
            .add_node_deferred(
                arm.forearm,
                Node::mesh(
                    "camera_mount",
                    Arc::new(MeshGeometry::cuboid(Vec3::new(0.05, 0.05, 0.05))),
                    crate::scene::Material::default().into_handle(),
                ),
            )
            .unwrap();

        assert!(!session.index().contains_mesh(mesh));
        assert_eq!(session.resolve_owning_link(mesh).as_deref(), Some("forearm"));

        session.rebuild_index();
        assert_eq!(session.index().owner_of(mesh), Some("forearm"));
        assert!(session.index().is_kinematic(mesh));
    }

    #[test]
    fn test_visibility_toggle_restyles_meshes() {
        let (mut session, arm) = loaded();
        session.set_visibility(false, true);

        let visual = session.tree().get(arm.base_visual).unwrap();
        let collision = session.tree().get(arm.base_collision).unwrap();
        assert!(!visual.visible);
        assert!(collision.visible);
        assert_eq!(collision.render_order, 1);
        assert_eq!(session.index().visibility(), VisibilityConfig::new(false, true));
    }

    #[test]
    fn test_non_structural_edit_keeps_index() {
        let (mut session, arm) = loaded();
        let mesh_count = session.index().mesh_count();
        session
            .set_node_transform(arm.sensor_link, Transform::from_position(Vec3::new(4.0, 0.0, 0.0)))
            .unwrap();
        session
            .set_mesh_geometry(
                arm.sensor_mesh,
                Arc::new(MeshGeometry::cuboid(Vec3::new(1.0, 1.0, 1.0))),
            )
            .unwrap();

        assert_eq!(session.index().mesh_count(), mesh_count);
        let bounds = session.index().model_bounds().unwrap();
        assert!(bounds.contains_point(Vec3::new(4.4, 0.0, 0.5)));
        let world = session.tree().world_matrix(arm.sensor_mesh).unwrap();
        assert_relative_eq!(
            crate::foundation::math::utils::translation_of(&world),
            Vec3::new(4.0, 0.0, 0.1)
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ViewerConfig::default();
        config.highlight.collision_opacity = 2.0;
        assert!(matches!(
            ViewerSession::new(config),
            Err(ViewerError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_reload_while_highlighted_styles_every_mesh() {
        let (mut session, arm) = loaded();
        session.set_interaction_mode(InteractionMode::Collision);
        assert!(session.highlight_link("base_link"));
        assert!(session.tree().get(arm.base_collision).unwrap().visible);

        let reload = ArmFixture::new();
        let ticket = session.begin_load();
        let outcome = session.finish_load(&ticket, Ok(reload.tree));
        assert!(matches!(outcome, LoadOutcome::Attached { .. }));

        let collision = session.tree().get(reload.base_collision).unwrap();
        assert!(!collision.visible);
        assert_eq!(collision.render_order, 1);
        assert!((collision.opacity - 0.35).abs() < f32::EPSILON);
        assert_eq!(session.highlight().highlighted_count(), 0);
    }

    #[test]
    fn test_collapsed_viewport_does_not_break_picking() {
        let (mut session, _) = loaded();
        let aspect = session.camera().aspect;
        session.set_viewport(0, 600);
        assert_relative_eq!(session.camera().aspect, aspect);

        session.pointer_move(10.0, 10.0);
        session.pointer_down(10.0, 10.0);
        session.pointer_up();

        session.set_viewport(800, 600);
        assert_relative_eq!(session.camera().aspect, 800.0 / 600.0);
    }
}
