//! Viewer notifications
//!
//! Outputs toward the UI/editor side:
//! - Typed events instead of positional callback arguments
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration per event kind (only interested handlers are notified)
//! - Events queue during a frame and are delivered by `dispatch`

use std::collections::HashMap;

use crate::scene::GeometryClass;

/// Event kind identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Hovered link changed
    HoverChanged,
    /// Something was selected
    Selected,
    /// Selection was cleared
    SelectionCleared,
    /// Joint value changed during a drag
    JointLiveUpdate,
    /// Joint value settled
    JointCommit,
    /// A model finished loading
    ModelLoaded,
    /// The latest load failed
    LoadFailed,
}

/// What a selection refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    /// A link, optionally narrowed to one geometry class
    Link,
    /// A joint
    Joint,
}

/// Notification emitted by the viewer core
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Pointer now hovers `link`, or nothing
    HoverChanged {
        /// Hovered link name
        link: Option<String>,
    },
    /// A link or joint was selected
    Selected {
        /// Link or joint
        kind: SelectionKind,
        /// Link or joint name
        id: String,
        /// Geometry class of the picked mesh, for link selections
        subtype: Option<GeometryClass>,
    },
    /// Selection was cleared by clicking empty space
    SelectionCleared,
    /// Joint value during a drag
    JointLiveUpdate {
        /// Joint name
        joint: String,
        /// Clamped value
        value: f32,
    },
    /// Final joint value of a drag or programmatic edit
    JointCommit {
        /// Joint name
        joint: String,
        /// Clamped value
        value: f32,
    },
    /// A model was indexed and attached
    ModelLoaded {
        /// Indexed links
        links: usize,
        /// Indexed joints
        joints: usize,
        /// Indexed meshes
        meshes: usize,
    },
    /// The most recent load failed
    LoadFailed {
        /// Human-readable cause
        reason: String,
    },
}

impl ViewerEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::HoverChanged { .. } => EventKind::HoverChanged,
            Self::Selected { .. } => EventKind::Selected,
            Self::SelectionCleared => EventKind::SelectionCleared,
            Self::JointLiveUpdate { .. } => EventKind::JointLiveUpdate,
            Self::JointCommit { .. } => EventKind::JointCommit,
            Self::ModelLoaded { .. } => EventKind::ModelLoaded,
            Self::LoadFailed { .. } => EventKind::LoadFailed,
        }
    }
}

/// Event handler trait
/// Returns true if the event was consumed (stops forwarding)
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &ViewerEvent) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&ViewerEvent) -> bool,
{
    fn on_event(&mut self, event: &ViewerEvent) -> bool {
        self(event)
    }
}

/// Event queue with per-kind handler registration
/// Follows chain of responsibility pattern
#[derive(Default)]
pub struct EventSystem {
    queue: Vec<ViewerEvent>,
    handlers: HashMap<EventKind, Vec<Box<dyn EventHandler>>>,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific event kind
    pub fn register_handler(&mut self, kind: EventKind, handler: Box<dyn EventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Queue an event for delivery on the next dispatch
    pub fn send(&mut self, event: ViewerEvent) {
        log::trace!("Queued {:?}", event);
        self.queue.push(event);
    }

    /// Events queued since the last dispatch
    pub fn pending(&self) -> &[ViewerEvent] {
        &self.queue
    }

    /// Remove queued events without delivering them to handlers
    pub fn take_pending(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.queue)
    }

    /// Deliver all queued events in order
    ///
    /// Returns the number of events delivered.
    pub fn dispatch(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queue);
        for event in &queued {
            self.dispatch_event(event);
        }
        queued.len()
    }

    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &ViewerEvent) {
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Drop all queued events
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("queued", &self.queue.len())
            .field("handler_kinds", &self.handlers.len())
            .finish()
    }
}
