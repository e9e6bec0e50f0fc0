//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node in the scene tree arena
    ///
    /// Keys of removed nodes are invalidated by the slot map, so a key held
    /// across a structural edit can never resolve to a different node.
    pub struct NodeKey;
}

/// Arena storage for scene nodes
pub type NodeArena<T> = SlotMap<NodeKey, T>;
