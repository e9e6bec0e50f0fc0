//! Sample articulated arm used across tests
//!
//! ```text
//! robot
//! ├── base_link                      (inertial)
//! │   ├── visual / base_visual
//! │   ├── collision [COLLISION] / base_collision
//! │   └── shoulder (revolute, axis 0 0 2, ±1.57, z = 0.2)
//! │       └── upper_arm
//! │           ├── visual / upper_visual
//! │           ├── leg_collision / upper_collision
//! │           └── elbow (revolute, axis y, no limits, z = 1.0)
//! │               └── forearm
//! │                   ├── visual / forearm_visual
//! │                   └── tool_mount (fixed, z = 0.8)
//! │                       └── tool / visual / tool_visual
//! ├── gizmo [OVERLAY] / gizmo_mesh
//! ├── collision_detector (x = 2) / visual / sensor_mesh
//! └── loose_parts / orphan_mesh  (x = -3)
//! ```

use std::sync::Arc;

use crate::foundation::collections::NodeKey;
use crate::foundation::math::{Transform, Vec3};
use crate::scene::{
    Inertial, JointData, JointKind, Material, MeshGeometry, Node, NodeFlags, SceneTree,
};

pub(crate) struct ArmFixture {
    pub tree: SceneTree,
    pub base_link: NodeKey,
    pub upper_arm: NodeKey,
    pub forearm: NodeKey,
    pub tool: NodeKey,
    pub sensor_link: NodeKey,
    pub shoulder: NodeKey,
    pub elbow: NodeKey,
    pub tool_mount: NodeKey,
    pub base_visual: NodeKey,
    pub base_collision: NodeKey,
    pub upper_visual: NodeKey,
    pub upper_collision: NodeKey,
    pub forearm_visual: NodeKey,
    pub tool_visual: NodeKey,
    pub gizmo_mesh: NodeKey,
    pub sensor_mesh: NodeKey,
    pub orphan_mesh: NodeKey,
}

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_position(Vec3::new(x, y, z))
}

fn cube(name: &str, size: [f32; 3], position: Transform, color: [f32; 4]) -> Node {
    Node::mesh(
        name,
        Arc::new(MeshGeometry::cuboid(Vec3::new(size[0], size[1], size[2]))),
        Material::new(color).with_name(name).into_handle(),
    )
    .with_transform(position)
}

/// Add a wrapper group and a single cube mesh under it
fn wrapped(
    tree: &mut SceneTree,
    parent: NodeKey,
    group: Node,
    mesh: Node,
) -> NodeKey {
    let group = tree.add_child(parent, group).unwrap();
    tree.add_child(group, mesh).unwrap()
}

impl ArmFixture {
    pub fn new() -> Self {
        let grey = [0.7, 0.7, 0.7, 1.0];
        let red = [0.9, 0.2, 0.2, 1.0];
        let mut tree = SceneTree::new("robot");
        let root = tree.root();

        let base_link = tree
            .add_child(
                root,
                Node::link_with_inertial(
                    "base_link",
                    Inertial {
                        mass: 2.5,
                        origin: at(0.0, 0.0, 0.1),
                        inertia: [0.1, 0.0, 0.0, 0.1, 0.0, 0.1],
                    },
                ),
            )
            .unwrap();
        let base_visual = wrapped(
            &mut tree,
            base_link,
            Node::group("visual"),
            cube("base_visual", [0.4, 0.4, 0.2], at(0.0, 0.0, 0.1), grey),
        );
        let base_collision = wrapped(
            &mut tree,
            base_link,
            Node::group("collision").with_flags(NodeFlags::COLLISION),
            cube("base_box", [0.4, 0.4, 0.2], at(0.0, 0.0, 0.1), red),
        );

        let shoulder = tree
            .add_child(
                base_link,
                Node::joint(
                    "shoulder",
                    JointData::new(JointKind::Revolute)
                        .with_axis(Vec3::new(0.0, 0.0, 2.0))
                        .with_limits(-1.57, 1.57),
                )
                .with_transform(at(0.0, 0.0, 0.2)),
            )
            .unwrap();
        let upper_arm = tree.add_child(shoulder, Node::link("upper_arm")).unwrap();
        let upper_visual = wrapped(
            &mut tree,
            upper_arm,
            Node::group("visual"),
            cube("upper_visual", [0.1, 0.1, 1.0], at(0.0, 0.0, 0.5), grey),
        );
        let upper_collision = wrapped(
            &mut tree,
            upper_arm,
            Node::group("leg_collision"),
            cube("upper_box", [0.12, 0.12, 1.0], at(0.0, 0.0, 0.5), red),
        );

        let elbow = tree
            .add_child(
                upper_arm,
                Node::joint(
                    "elbow",
                    JointData::new(JointKind::Revolute).with_axis(Vec3::y()),
                )
                .with_transform(at(0.0, 0.0, 1.0)),
            )
            .unwrap();
        let forearm = tree.add_child(elbow, Node::link("forearm")).unwrap();
        let forearm_visual = wrapped(
            &mut tree,
            forearm,
            Node::group("visual"),
            cube("forearm_visual", [0.1, 0.1, 0.8], at(0.0, 0.0, 0.4), grey),
        );

        let tool_mount = tree
            .add_child(
                forearm,
                Node::joint("tool_mount", JointData::new(JointKind::Fixed))
                    .with_transform(at(0.0, 0.0, 0.8)),
            )
            .unwrap();
        let tool = tree.add_child(tool_mount, Node::link("tool")).unwrap();
        let tool_visual = wrapped(
            &mut tree,
            tool,
            Node::group("visual"),
            cube("tool_visual", [0.05, 0.05, 0.05], at(0.0, 0.0, 0.025), grey),
        );

        let gizmo_mesh = wrapped(
            &mut tree,
            root,
            Node::group("gizmo").with_flags(NodeFlags::OVERLAY),
            cube("gizmo_handle", [20.0, 20.0, 20.0], Transform::identity(), red),
        );

        let sensor_link = tree
            .add_child(
                root,
                Node::link("collision_detector").with_transform(at(2.0, 0.0, 0.0)),
            )
            .unwrap();
        let sensor_mesh = wrapped(
            &mut tree,
            sensor_link,
            Node::group("visual"),
            cube("sensor", [0.2, 0.2, 0.2], at(0.0, 0.0, 0.1), grey),
        );

        let orphan_mesh = wrapped(
            &mut tree,
            root,
            Node::group("loose_parts").with_transform(at(-3.0, 0.0, 0.0)),
            cube("bolt", [0.1, 0.1, 0.1], Transform::identity(), grey),
        );

        tree.update_world_matrices();

        Self {
            tree,
            base_link,
            upper_arm,
            forearm,
            tool,
            sensor_link,
            shoulder,
            elbow,
            tool_mount,
            base_visual,
            base_collision,
            upper_visual,
            upper_collision,
            forearm_visual,
            tool_visual,
            gizmo_mesh,
            sensor_mesh,
            orphan_mesh,
        }
    }

    /// Every mesh outside the overlay subtree
    pub fn indexed_meshes(&self) -> Vec<NodeKey> {
        vec![
            self.base_visual,
            self.base_collision,
            self.upper_visual,
            self.upper_collision,
            self.forearm_visual,
            self.tool_visual,
            self.sensor_mesh,
            self.orphan_mesh,
        ]
    }
}
