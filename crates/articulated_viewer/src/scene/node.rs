//! Scene node types
//!
//! A node is a typed element of the articulated model: a grouping node, a
//! link (rigid body), a joint (1-DOF connector) or a mesh (drawable leaf).

use std::sync::Arc;

use bitflags::bitflags;

use super::geometry::MeshGeometry;
use super::material::MaterialHandle;
use crate::foundation::collections::NodeKey;
use crate::foundation::math::{utils, Mat4, Quat, Transform, Unit, Vec3};

bitflags! {
    /// Markers set by the loader on individual nodes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Explicit "this subtree is collision geometry" marker
        const COLLISION = 1 << 0;
        /// Gizmo or overlay helper; never indexed, never picked
        const OVERLAY = 1 << 1;
    }
}

/// Visual-vs-collision classification of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryClass {
    /// Rendered appearance geometry
    Visual,
    /// Simplified collision geometry
    Collision,
}

impl GeometryClass {
    /// Whether this is collision geometry
    pub fn is_collision(self) -> bool {
        matches!(self, Self::Collision)
    }

    /// Classification from a collision flag
    pub fn from_collision(is_collision: bool) -> Self {
        if is_collision {
            Self::Collision
        } else {
            Self::Visual
        }
    }
}

/// Joint kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// Rigid connection; never moves
    Fixed,
    /// Bounded rotation about the axis
    Revolute,
    /// Unbounded rotation about the axis
    Continuous,
    /// Translation along the axis
    Prismatic,
}

impl JointKind {
    /// Whether this joint contributes a degree of freedom
    pub fn is_movable(self) -> bool {
        !matches!(self, Self::Fixed)
    }

    /// Whether the joint value is an angle
    pub fn is_rotational(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous)
    }
}

/// Raw joint limits as supplied by the loader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    /// Lower bound
    pub lower: f32,
    /// Upper bound
    pub upper: f32,
}

impl JointLimits {
    /// Create limits
    pub fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }
}

/// Joint payload
#[derive(Debug, Clone, PartialEq)]
pub struct JointData {
    /// Joint kind
    pub kind: JointKind,
    /// Motion axis in the joint frame, as supplied (may be absent or degenerate)
    pub axis: Option<Vec3>,
    /// Limits, as supplied
    pub limits: Option<JointLimits>,
    /// Current joint value (radians or metres)
    pub value: f32,
}

impl JointData {
    /// Create a joint of the given kind with no axis or limits
    pub fn new(kind: JointKind) -> Self {
        Self {
            kind,
            axis: None,
            limits: None,
            value: 0.0,
        }
    }

    /// Set the motion axis
    pub fn with_axis(mut self, axis: Vec3) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.limits = Some(JointLimits::new(lower, upper));
        self
    }

    /// Set the initial value
    pub fn with_value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    /// Unit motion axis, `(0, 0, 1)` when absent or degenerate
    pub fn unit_axis(&self) -> Unit<Vec3> {
        self.axis
            .as_ref()
            .and_then(utils::try_normalize)
            .map_or_else(Vec3::z_axis, Unit::new_unchecked)
    }

    /// Local motion produced by the current value
    pub fn motion_matrix(&self) -> Mat4 {
        let value = if self.value.is_finite() { self.value } else { 0.0 };
        match self.kind {
            JointKind::Fixed => Mat4::identity(),
            JointKind::Revolute | JointKind::Continuous => {
                Quat::from_axis_angle(&self.unit_axis(), value).to_homogeneous()
            }
            JointKind::Prismatic => Mat4::new_translation(&(self.unit_axis().into_inner() * value)),
        }
    }
}

/// Inertial properties carried by a link
///
/// Passed through to the index untouched; the viewer does not interpret it.
#[derive(Debug, Clone, PartialEq)]
pub struct Inertial {
    /// Mass in kilograms
    pub mass: f32,
    /// Centre of mass frame relative to the link
    pub origin: Transform,
    /// Inertia tensor entries `[ixx, ixy, ixz, iyy, iyz, izz]`
    pub inertia: [f32; 6],
}

/// Link payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkData {
    /// Optional inertial metadata
    pub inertial: Option<Inertial>,
}

/// Mesh payload
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Triangle geometry
    pub geometry: Arc<MeshGeometry>,
    /// Current material
    pub material: MaterialHandle,
}

/// Node payload by type
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Grouping node (visual/collision wrappers, origins, loader scaffolding)
    Group,
    /// Rigid body
    Link(LinkData),
    /// Connector between a parent and a child link
    Joint(JointData),
    /// Drawable leaf
    Mesh(MeshData),
}

/// A node in the scene tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Node name (unique among links and among joints within a model)
    pub name: String,
    /// Typed payload
    pub kind: NodeKind,
    /// Loader markers
    pub flags: NodeFlags,
    /// Whether the node is drawn
    pub visible: bool,
    /// Opacity applied by the renderer
    pub opacity: f32,
    /// Draw order hint; higher draws later
    pub render_order: i32,

    pub(super) transform: Transform,
    pub(super) parent: Option<NodeKey>,
    pub(super) children: Vec<NodeKey>,
    pub(super) world: Mat4,
    pub(super) matrix_auto_update: bool,
}

impl Node {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: NodeFlags::empty(),
            visible: true,
            opacity: 1.0,
            render_order: 0,
            transform: Transform::identity(),
            parent: None,
            children: Vec::new(),
            world: Mat4::identity(),
            matrix_auto_update: true,
        }
    }

    /// Create a grouping node
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Group)
    }

    /// Create a link node
    pub fn link(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Link(LinkData::default()))
    }

    /// Create a link node with inertial metadata
    pub fn link_with_inertial(name: impl Into<String>, inertial: Inertial) -> Self {
        Self::with_kind(
            name,
            NodeKind::Link(LinkData {
                inertial: Some(inertial),
            }),
        )
    }

    /// Create a joint node
    pub fn joint(name: impl Into<String>, joint: JointData) -> Self {
        Self::with_kind(name, NodeKind::Joint(joint))
    }

    /// Create a mesh node
    pub fn mesh(
        name: impl Into<String>,
        geometry: Arc<MeshGeometry>,
        material: MaterialHandle,
    ) -> Self {
        Self::with_kind(name, NodeKind::Mesh(MeshData { geometry, material }))
    }

    /// Set the local transform (joint origin for joints)
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Add loader markers
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Local transform (joint origin for joints)
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Parent node
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child nodes in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Cached world matrix as of the last update or freeze
    pub fn cached_world(&self) -> &Mat4 {
        &self.world
    }

    /// Whether the world matrix is recomputed every frame
    pub fn matrix_auto_update(&self) -> bool {
        self.matrix_auto_update
    }

    /// Local matrix including joint motion
    pub fn local_matrix(&self) -> Mat4 {
        let base = self.transform.to_matrix();
        match &self.kind {
            NodeKind::Joint(joint) => base * joint.motion_matrix(),
            _ => base,
        }
    }

    /// Whether this node is a link
    pub fn is_link(&self) -> bool {
        matches!(self.kind, NodeKind::Link(_))
    }

    /// Whether this node is a mesh
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    /// Joint payload, if this is a joint
    pub fn as_joint(&self) -> Option<&JointData> {
        match &self.kind {
            NodeKind::Joint(joint) => Some(joint),
            _ => None,
        }
    }

    /// Mesh payload, if this is a mesh
    pub fn as_mesh(&self) -> Option<&MeshData> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutable mesh payload, if this is a mesh
    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshData> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Whether this is a joint with a degree of freedom
    pub fn is_movable_joint(&self) -> bool {
        self.as_joint().is_some_and(|j| j.kind.is_movable())
    }
}
