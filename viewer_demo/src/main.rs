//! Headless viewer demo
//!
//! Builds a two-joint arm in code, loads it through the session's ticket API
//! and replays a scripted hover / press / drag / release sequence, logging
//! every event the viewer emits.
//!
//! Usage: `viewer_demo [config.toml|config.ron]`

use std::sync::Arc;

use articulated_viewer::foundation::logging;
use articulated_viewer::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Viewer error: {0}")]
    Viewer(#[from] ViewerError),

    #[error("Config error: {0}")]
    Config(#[from] articulated_viewer::config::ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] articulated_viewer::scene::SceneError),

    #[error("Model was not attached: {0:?}")]
    NotAttached(LoadOutcome),
}

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_position(Vec3::new(x, y, z))
}

fn box_mesh(name: &str, size: Vec3, offset: Transform, color: [f32; 4]) -> Node {
    Node::mesh(
        name,
        Arc::new(MeshGeometry::cuboid(size)),
        Material::new(color).with_name(name).into_handle(),
    )
    .with_transform(offset)
}

/// Attach a link with one visual box and one collision box
fn add_link(
    tree: &mut SceneTree,
    parent: NodeKey,
    name: &str,
    size: Vec3,
) -> Result<NodeKey, DemoError> {
    let link = tree.add_child(parent, Node::link(name))?;
    let offset = at(0.0, 0.0, size.z * 0.5);

    let visual = tree.add_child(link, Node::group("visual"))?;
    tree.add_child(
        visual,
        box_mesh(&format!("{name}_visual"), size, offset, [0.7, 0.7, 0.75, 1.0]),
    )?;

    let collision = tree.add_child(link, Node::group("collision").with_flags(NodeFlags::COLLISION))?;
    tree.add_child(
        collision,
        box_mesh(&format!("{name}_box"), size * 1.1, offset, [0.9, 0.3, 0.3, 1.0]),
    )?;
    Ok(link)
}

/// Stand-in for the model loader: base, shoulder, upper arm, elbow, forearm
fn build_arm() -> Result<SceneTree, DemoError> {
    let mut tree = SceneTree::new("demo_arm");
    let root = tree.root();

    let base = add_link(&mut tree, root, "base_link", Vec3::new(0.4, 0.4, 0.2))?;
    let shoulder = tree.add_child(
        base,
        Node::joint(
            "shoulder",
            JointData::new(JointKind::Revolute)
                .with_axis(Vec3::z())
                .with_limits(-1.57, 1.57),
        )
        .with_transform(at(0.0, 0.0, 0.2)),
    )?;
    let upper = add_link(&mut tree, shoulder, "upper_arm", Vec3::new(0.1, 0.1, 1.0))?;
    let elbow = tree.add_child(
        upper,
        Node::joint("elbow", JointData::new(JointKind::Revolute).with_axis(Vec3::y()))
            .with_transform(at(0.0, 0.0, 1.0)),
    )?;
    add_link(&mut tree, elbow, "forearm", Vec3::new(0.1, 0.1, 0.8))?;
    Ok(tree)
}

fn load_config() -> Result<ViewerConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ViewerConfig::load_from_file(&path)?),
        None => Ok(ViewerConfig::default()),
    }
}

fn main() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.logging.level);
    log::info!("Starting articulated viewer demo");

    let mut session = ViewerSession::new(config)?;
    for kind in [
        EventKind::HoverChanged,
        EventKind::Selected,
        EventKind::SelectionCleared,
        EventKind::JointLiveUpdate,
        EventKind::JointCommit,
        EventKind::ModelLoaded,
        EventKind::LoadFailed,
    ] {
        session.register_handler(
            kind,
            Box::new(|event: &ViewerEvent| {
                log::info!("Event: {:?}", event);
                false
            }),
        );
    }

    // A superseded request followed by the real one
    let stale = session.begin_load();
    let ticket = session.begin_load();
    let loader = || build_arm().map_err(|e| LoadError::Loader(e.to_string()));
    let discarded = session.finish_load(&stale, loader());
    log::info!("Stale load: {:?}", discarded);
    match session.finish_load(&ticket, loader()) {
        LoadOutcome::Attached { .. } => {}
        other => return Err(DemoError::NotAttached(other)),
    }
    session.dispatch_events();

    session.set_viewport(800, 800);
    let camera = session.camera_mut();
    camera.position = Vec3::new(5.0, 0.0, 0.7);
    camera.look_at(Vec3::new(0.0, 0.0, 0.7), Vec3::z());

    // Hover, then drag the upper arm around the shoulder
    session.pointer_move(400.0, 400.0);
    let hover = session.frame();
    log::info!("Hover pick: {:?}", hover);
    session.pointer_down(400.0, 400.0);
    for x in [405.0, 410.0, 420.0, 430.0] {
        session.pointer_move(x, 400.0);
    }
    if let Some((joint, value)) = session.pointer_up() {
        log::info!("Released {} at {:.3} rad", joint, value);
    }
    session.dispatch_events();

    // Programmatic edit and a switch to collision geometry
    session.set_joint_value("elbow", 0.6)?;
    session.set_visibility(true, true);
    session.set_interaction_mode(InteractionMode::Collision);
    session.pointer_move(400.0, 380.0);
    session.frame();
    session.pointer_leave();
    session.dispatch_events();

    log::info!(
        "Demo finished: {} links, {} joints, {} meshes ({} static)",
        session.index().link_count(),
        session.index().joint_count(),
        session.index().mesh_count(),
        session.index().static_meshes().len()
    );
    Ok(())
}
