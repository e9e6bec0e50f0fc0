//! Pointer interaction
//!
//! Orchestrates the picking pipeline: pointer → camera ray → bounds test →
//! mesh test → index lookup → highlight and joint drag.
//!
//! Hover raycasts are throttled twice: pointer moves shorter than the pixel
//! threshold are dropped, and the remaining ones only queue a ray that
//! [`PointerInteractionController::frame`] casts at most once per frame.
//! Drag updates bypass both throttles.

pub mod camera;
pub mod drag;
pub mod mouse;

pub use camera::Camera;
pub use drag::{joint_delta, prismatic_delta, revolute_delta, DragSession, JointFrame};
pub use mouse::MouseState;

use crate::config::{HighlightConfig, InteractionConfig, InteractionMode, InteractionTool};
use crate::events::{EventSystem, SelectionKind, ViewerEvent};
use crate::foundation::collections::NodeKey;
use crate::highlight::HighlightManager;
use crate::index::SceneIndex;
use crate::scene::{GeometryClass, Material, MaterialHandle, Ray, RayHit, SceneTree};

/// Geometry class that responds to the pointer in a mode
pub fn mode_class(mode: InteractionMode) -> GeometryClass {
    match mode {
        InteractionMode::Visual => GeometryClass::Visual,
        InteractionMode::Collision => GeometryClass::Collision,
    }
}

/// Pointer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerState {
    /// Nothing under the pointer
    Idle,
    /// A link is hovered
    Hovering,
    /// A joint drag is in progress
    Dragging,
}

/// A mesh under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Mesh hit
    pub hit: RayHit,
    /// Owning link, if the mesh has one
    pub link: Option<String>,
    /// Geometry class of the mesh
    pub class: GeometryClass,
}

/// Result of a pick
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// The ray missed the model bounds; no mesh was tested
    OutsideBounds,
    /// The ray entered the bounds but hit no interactive mesh
    Miss,
    /// Nearest interactive mesh
    Hit(PickHit),
}

impl PickOutcome {
    /// The hit, if any
    pub fn hit(&self) -> Option<&PickHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            _ => None,
        }
    }
}

/// Counters for the two picking phases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickStats {
    /// Rays tested against the model bounds
    pub bounds_tests: usize,
    /// Rays tested against individual meshes
    pub precise_tests: usize,
}

/// Everything the controller touches while handling one pointer event
pub struct InteractionContext<'a> {
    /// Scene tree
    pub tree: &'a mut SceneTree,
    /// Current index
    pub index: &'a SceneIndex,
    /// Highlight bookkeeping
    pub highlight: &'a mut HighlightManager,
    /// Event sink
    pub events: &'a mut EventSystem,
}

/// Hover, selection and joint-drag controller for one pointer
#[derive(Debug)]
pub struct PointerInteractionController {
    mouse: MouseState,
    mode: InteractionMode,
    tool: InteractionTool,
    hover_threshold_px: f64,
    bounds_margin: f32,
    hover_material: MaterialHandle,
    selection_material: MaterialHandle,
    pending_ray: Option<Ray>,
    hovered: Option<String>,
    selected: Option<String>,
    drag: Option<DragSession>,
    stats: PickStats,
}

impl PointerInteractionController {
    /// Create a controller
    pub fn new(interaction: &InteractionConfig, style: &HighlightConfig) -> Self {
        Self {
            mouse: MouseState::default(),
            mode: interaction.mode,
            tool: interaction.tool,
            hover_threshold_px: interaction.hover_threshold_px,
            bounds_margin: interaction.bounds_margin,
            hover_material: Material::overlay(style.hover_color)
                .with_name("hover")
                .into_handle(),
            selection_material: Material::overlay(style.selection_color)
                .with_name("selection")
                .into_handle(),
            pending_ray: None,
            hovered: None,
            selected: None,
            drag: None,
            stats: PickStats::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> PointerState {
        if self.drag.is_some() {
            PointerState::Dragging
        } else if self.hovered.is_some() {
            PointerState::Hovering
        } else {
            PointerState::Idle
        }
    }

    /// Pointer state
    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    /// Update the viewport size
    pub fn update_window_size(&mut self, width: u32, height: u32) {
        self.mouse.update_window_size(width, height);
    }

    /// Interactive geometry class
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Active tool
    pub fn tool(&self) -> InteractionTool {
        self.tool
    }

    /// Hovered link
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Selected link
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Drag in progress
    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Picking counters
    pub fn stats(&self) -> PickStats {
        self.stats
    }

    /// Whether a hover ray is waiting for the next frame
    pub fn has_pending_hover(&self) -> bool {
        self.pending_ray.is_some()
    }

    /// Material used for hover overlays
    pub fn hover_material(&self) -> &MaterialHandle {
        &self.hover_material
    }

    /// Material used for selection overlays
    pub fn selection_material(&self) -> &MaterialHandle {
        &self.selection_material
    }

    /// Cast `ray` against the interactive meshes of the model
    ///
    /// Overlay subtrees are never indexed, so gizmo meshes cannot be hit.
    pub fn pick(&mut self, tree: &SceneTree, index: &SceneIndex, ray: &Ray) -> PickOutcome {
        self.stats.bounds_tests += 1;
        let in_bounds = index
            .model_bounds()
            .map(|bounds| bounds.expanded(self.bounds_margin))
            .and_then(|bounds| bounds.intersect_ray(ray))
            .is_some();
        if !in_bounds {
            return PickOutcome::OutsideBounds;
        }

        self.stats.precise_tests += 1;
        let class = mode_class(self.mode);
        let nearest = index
            .meshes()
            .filter(|key| index.class_of(*key) == Some(class))
            .filter_map(|key| {
                let node = tree.get(key)?;
                let mesh = node.as_mesh()?;
                let (distance, point) = mesh.geometry.intersect_world_ray(ray, node.cached_world())?;
                (distance >= 0.0).then_some(RayHit {
                    node: key,
                    distance,
                    point,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        match nearest {
            Some(hit) => PickOutcome::Hit(PickHit {
                link: index.owner_of(hit.node).map(str::to_string),
                hit,
                class,
            }),
            None => PickOutcome::Miss,
        }
    }

    /// Handle pointer motion
    ///
    /// While dragging the joint is updated immediately. Otherwise moves below
    /// the pixel threshold are ignored and the rest queue a hover ray for the
    /// next frame. Returns the live joint value when a drag advanced.
    pub fn pointer_move(&mut self, ctx: &mut InteractionContext<'_>, x: f64, y: f64, ray: Ray) -> Option<f32> {
        self.mouse.update_position(x, y);

        if self.drag.is_some() {
            self.mouse.mark_sampled();
            return self.advance_drag(ctx, ray);
        }

        if !self.mouse.moved_beyond(self.hover_threshold_px) {
            return None;
        }
        self.mouse.mark_sampled();
        self.pending_ray = Some(ray);
        None
    }

    /// Cast the queued hover ray, if any
    ///
    /// Call once per rendered frame. Returns the pick outcome when a raycast
    /// happened.
    pub fn frame(&mut self, ctx: &mut InteractionContext<'_>) -> Option<PickOutcome> {
        if self.drag.is_some() {
            return None;
        }
        let ray = self.pending_ray.take()?;
        let outcome = self.pick(ctx.tree, ctx.index, &ray);
        let link = outcome.hit().and_then(|hit| hit.link.clone());
        self.set_hover(ctx, link);
        Some(outcome)
    }

    /// Handle a primary-button press
    pub fn pointer_down(&mut self, ctx: &mut InteractionContext<'_>, x: f64, y: f64, ray: Ray) -> PickOutcome {
        // The release of the previous drag never arrived
        if self.drag.is_some() {
            log::debug!("Press while dragging, committing the open drag first");
            self.pointer_up(ctx);
        }
        self.mouse.update_position(x, y);
        self.mouse.start_drag();
        self.pending_ray = None;

        let outcome = self.pick(ctx.tree, ctx.index, &ray);
        let Some(hit) = outcome.hit().cloned() else {
            self.select(ctx, None);
            return outcome;
        };

        match &hit.link {
            Some(link) => {
                self.select(ctx, Some(link.clone()));
                ctx.events.send(ViewerEvent::Selected {
                    kind: SelectionKind::Link,
                    id: link.clone(),
                    subtype: Some(hit.class),
                });
            }
            None => log::warn!("Picked mesh {:?} has no owning link", hit.hit.node),
        }

        if self.tool.allows_joint_drag() {
            self.drag = Self::open_drag(ctx, hit.hit.node, ray, hit.hit.distance);
        }
        outcome
    }

    fn open_drag(ctx: &InteractionContext<'_>, mesh: NodeKey, ray: Ray, distance: f32) -> Option<DragSession> {
        let tree = &*ctx.tree;
        let joint_key = tree
            .ancestors(mesh)
            .find(|k| tree.get(*k).is_some_and(|n| n.is_movable_joint()))?;
        let name = ctx.index.joint_name(joint_key)?;
        let spec = ctx.index.joint(name)?;
        let value = tree.get(joint_key)?.as_joint()?.value;
        let frame = JointFrame::of(tree, spec);

        log::debug!("Dragging joint '{}' from {:.4}", name, value);
        Some(DragSession::new(name, spec.clone(), frame, ray, distance, value))
    }

    fn advance_drag(&mut self, ctx: &mut InteractionContext<'_>, ray: Ray) -> Option<f32> {
        let session = self.drag.as_mut()?;
        let value = session.update(ray);
        if let Err(err) = ctx.tree.set_joint_value(session.joint_key(), value) {
            log::warn!("Dropping drag of '{}': {}", session.joint(), err);
            self.drag = None;
            return None;
        }
        ctx.events.send(ViewerEvent::JointLiveUpdate {
            joint: session.joint().to_string(),
            value,
        });
        Some(value)
    }

    /// Handle a primary-button release
    ///
    /// Ends a drag with a commit notification and returns to idle. Returns the
    /// committed joint and value.
    pub fn pointer_up(&mut self, ctx: &mut InteractionContext<'_>) -> Option<(String, f32)> {
        self.mouse.end_drag();
        let session = self.drag.take()?;
        let joint = session.joint().to_string();
        let value = session.value();
        log::debug!("Committing joint '{}' at {:.4}", joint, value);
        ctx.events.send(ViewerEvent::JointCommit {
            joint: joint.clone(),
            value,
        });

        self.set_hover(ctx, None);
        self.mouse.reset_sample();
        Some((joint, value))
    }

    /// Handle the pointer leaving the viewport
    pub fn pointer_leave(&mut self, ctx: &mut InteractionContext<'_>) {
        if self.drag.is_some() {
            self.pointer_up(ctx);
        }
        self.pending_ray = None;
        self.mouse.reset_sample();
        self.set_hover(ctx, None);
    }

    /// Switch the interactive geometry class
    ///
    /// All outstanding highlights are reverted first so visual and collision
    /// overlays never coexist.
    pub fn set_mode(&mut self, ctx: &mut InteractionContext<'_>, mode: InteractionMode) {
        if mode == self.mode {
            return;
        }
        self.reset(ctx);
        self.mode = mode;
    }

    /// Switch the active tool, reverting outstanding highlights first
    pub fn set_tool(&mut self, ctx: &mut InteractionContext<'_>, tool: InteractionTool) {
        if tool == self.tool {
            return;
        }
        self.reset(ctx);
        self.tool = tool;
    }

    /// Select a link by name, as from a UI list
    ///
    /// Returns `false` when the link is not indexed.
    pub fn highlight_link(&mut self, ctx: &mut InteractionContext<'_>, link: &str) -> bool {
        if ctx.index.link(link).is_none() {
            return false;
        }
        self.select(ctx, Some(link.to_string()));
        ctx.events.send(ViewerEvent::Selected {
            kind: SelectionKind::Link,
            id: link.to_string(),
            subtype: Some(mode_class(self.mode)),
        });
        true
    }

    /// Drop every reference into the current scene without touching it
    ///
    /// Used after the tree the references point into was replaced or rebuilt.
    pub fn forget_scene(&mut self) {
        self.pending_ray = None;
        self.hovered = None;
        self.selected = None;
        self.drag = None;
        self.mouse.reset_sample();
    }

    /// End any drag, revert every highlight and clear hover and selection
    pub fn reset(&mut self, ctx: &mut InteractionContext<'_>) {
        if self.drag.is_some() {
            self.pointer_up(ctx);
        }
        ctx.highlight.revert_all(ctx.tree, Some(ctx.index));
        if self.hovered.take().is_some() {
            ctx.events.send(ViewerEvent::HoverChanged { link: None });
        }
        if self.selected.take().is_some() {
            ctx.events.send(ViewerEvent::SelectionCleared);
        }
        self.pending_ray = None;
    }

    fn link_meshes(&self, index: &SceneIndex, link: &str) -> Vec<NodeKey> {
        index.meshes_for(link, mode_class(self.mode)).to_vec()
    }

    /// Move the hover highlight; returns whether anything changed
    fn set_hover(&mut self, ctx: &mut InteractionContext<'_>, link: Option<String>) -> bool {
        if link == self.hovered {
            log::trace!("Hover unchanged ({:?})", link);
            return false;
        }

        if let Some(old) = self.hovered.take() {
            let meshes = self.link_meshes(ctx.index, &old);
            if self.selected.as_deref() == Some(old.as_str()) {
                ctx.highlight
                    .apply(ctx.tree, &meshes, &self.selection_material, self.mode);
            } else {
                ctx.highlight.revert(ctx.tree, Some(ctx.index), &meshes);
            }
        }

        if let Some(new) = &link {
            let meshes = self.link_meshes(ctx.index, new);
            ctx.highlight
                .apply(ctx.tree, &meshes, &self.hover_material, self.mode);
        }

        log::trace!("Hover changed to {:?}", link);
        ctx.events.send(ViewerEvent::HoverChanged { link: link.clone() });
        self.hovered = link;
        true
    }

    /// Move the selection highlight; emits `SelectionCleared` on deselect
    fn select(&mut self, ctx: &mut InteractionContext<'_>, link: Option<String>) {
        if link == self.selected {
            return;
        }

        if let Some(old) = self.selected.take() {
            if self.hovered.as_deref() != Some(old.as_str()) {
                let meshes = self.link_meshes(ctx.index, &old);
                ctx.highlight.revert(ctx.tree, Some(ctx.index), &meshes);
            }
            if link.is_none() {
                ctx.events.send(ViewerEvent::SelectionCleared);
            }
        }

        if let Some(new) = &link {
            let meshes = self.link_meshes(ctx.index, new);
            ctx.highlight
                .apply(ctx.tree, &meshes, &self.selection_material, self.mode);
        }
        self.selected = link;
    }
}
