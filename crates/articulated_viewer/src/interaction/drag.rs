//! Joint drag kinematics
//!
//! Converts two successive pointer rays into a scalar joint delta. Both rays
//! are sampled at the distance of the original hit, so no second raycast
//! against moving geometry is needed while dragging.

use crate::foundation::collections::NodeKey;
use crate::foundation::math::{utils, Mat4, Unit, UnitVec3, Vec3, EPSILON};
use crate::index::JointSpec;
use crate::scene::{JointKind, Ray, SceneTree};

/// World-space pivot and axis of a joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointFrame {
    /// Joint origin in world space
    pub pivot: Vec3,
    /// Motion axis in world space
    pub axis: UnitVec3,
}

impl JointFrame {
    /// Frame of a joint as placed by its parent and origin, excluding its own motion
    pub fn of(tree: &SceneTree, spec: &JointSpec) -> Self {
        let origin = tree
            .get(spec.key)
            .map_or_else(Mat4::identity, |node| node.transform().to_matrix());
        let frame = tree.compute_parent_world_matrix(spec.key) * origin;
        let axis = utils::try_normalize(&utils::transform_vector(&frame, &spec.axis))
            .map_or(spec.axis, Unit::new_unchecked);
        Self {
            pivot: utils::translation_of(&frame),
            axis,
        }
    }
}

/// Signed rotation about `axis` that carries `previous` onto `current`
///
/// Both points are projected onto the plane through `pivot` perpendicular to
/// `axis`. Degenerate projections (a point on the axis) yield zero.
pub fn revolute_delta(pivot: &Vec3, axis: &UnitVec3, previous: &Vec3, current: &Vec3) -> f32 {
    let axis = axis.into_inner();
    let project = |p: &Vec3| {
        let v = p - pivot;
        v - axis * axis.dot(&v)
    };
    let a = project(previous);
    let b = project(current);
    if a.norm() < EPSILON || b.norm() < EPSILON {
        return 0.0;
    }

    let cross = a.cross(&b);
    let angle = cross.norm().atan2(a.dot(&b));
    let delta = if cross.dot(&axis) < 0.0 { -angle } else { angle };
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

/// Displacement from `previous` to `current` along `axis`
pub fn prismatic_delta(axis: &UnitVec3, previous: &Vec3, current: &Vec3) -> f32 {
    let delta = (current - previous).dot(&axis.into_inner());
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

/// Joint delta for the given kind; fixed joints never move
pub fn joint_delta(kind: JointKind, frame: &JointFrame, previous: &Vec3, current: &Vec3) -> f32 {
    match kind {
        JointKind::Revolute | JointKind::Continuous => {
            revolute_delta(&frame.pivot, &frame.axis, previous, current)
        }
        JointKind::Prismatic => prismatic_delta(&frame.axis, previous, current),
        JointKind::Fixed => 0.0,
    }
}

/// State of one press-drag-release interaction
#[derive(Debug, Clone)]
pub struct DragSession {
    joint: String,
    spec: JointSpec,
    frame: JointFrame,
    ray: Ray,
    hit_distance: f32,
    start_value: f32,
    value: f32,
}

impl DragSession {
    /// Open a session on `joint` from the press ray and hit distance
    pub fn new(
        joint: impl Into<String>,
        spec: JointSpec,
        frame: JointFrame,
        ray: Ray,
        hit_distance: f32,
        start_value: f32,
    ) -> Self {
        Self {
            joint: joint.into(),
            spec,
            frame,
            ray,
            hit_distance,
            start_value,
            value: start_value,
        }
    }

    /// Dragged joint name
    pub fn joint(&self) -> &str {
        &self.joint
    }

    /// Dragged joint node
    pub fn joint_key(&self) -> NodeKey {
        self.spec.key
    }

    /// Value when the drag began
    pub fn start_value(&self) -> f32 {
        self.start_value
    }

    /// Current clamped value
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Total change since the drag began
    pub fn accumulated_delta(&self) -> f32 {
        self.value - self.start_value
    }

    /// Advance the drag to `ray` and return the new clamped value
    ///
    /// The new ray replaces the session's reference ray, so each update is
    /// relative to the previous one.
    pub fn update(&mut self, ray: Ray) -> f32 {
        let previous = self.ray.point_at(self.hit_distance);
        let current = ray.point_at(self.hit_distance);
        let delta = joint_delta(self.spec.kind, &self.frame, &previous, &current);
        self.value = self.spec.clamp(self.value + delta);
        self.ray = ray;
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ResolvedLimits;
    use crate::tests::fixtures::ArmFixture;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn spec(kind: JointKind, lower: f32, upper: f32, explicit: bool) -> JointSpec {
        JointSpec {
            key: NodeKey::default(),
            kind,
            axis: Vec3::z_axis(),
            limits: ResolvedLimits {
                lower,
                upper,
                explicit,
            },
        }
    }

    fn origin_frame() -> JointFrame {
        JointFrame {
            pivot: Vec3::zeros(),
            axis: Vec3::z_axis(),
        }
    }

    fn down_through(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 5.0), -Vec3::z())
    }

    #[test]
    fn test_revolute_quarter_turn_is_positive() {
        let delta = revolute_delta(&Vec3::zeros(), &Vec3::z_axis(), &Vec3::x(), &Vec3::y());
        assert_relative_eq!(delta, FRAC_PI_2, epsilon = 1e-6);
        let back = revolute_delta(&Vec3::zeros(), &Vec3::z_axis(), &Vec3::y(), &Vec3::x());
        assert_relative_eq!(back, -FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_revolute_ignores_height_along_axis() {
        let delta = revolute_delta(
            &Vec3::zeros(),
            &Vec3::z_axis(),
            &Vec3::new(1.0, 0.0, 3.0),
            &Vec3::new(0.0, 1.0, -2.0),
        );
        assert_relative_eq!(delta, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_point_on_axis_gives_zero_delta() {
        let delta = revolute_delta(
            &Vec3::zeros(),
            &Vec3::z_axis(),
            &Vec3::new(0.0, 0.0, 1.0),
            &Vec3::y(),
        );
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_prismatic_projects_onto_axis() {
        let delta = prismatic_delta(
            &Vec3::z_axis(),
            &Vec3::zeros(),
            &Vec3::new(0.7, -0.3, 0.2),
        );
        assert_relative_eq!(delta, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_revolute_session_saturates_at_limit() {
        let mut session = DragSession::new(
            "shoulder",
            spec(JointKind::Revolute, -1.57, 1.57, true),
            origin_frame(),
            down_through(1.0, 0.0),
            5.0,
            1.4,
        );
        let value = session.update(down_through(0.0, 1.0));
        assert_relative_eq!(value, 1.57);
        assert_relative_eq!(session.accumulated_delta(), 0.17, epsilon = 1e-5);
    }

    #[test]
    fn test_continuous_session_never_clamps() {
        let mut session = DragSession::new(
            "wheel",
            spec(JointKind::Continuous, -1.57, 1.57, true),
            origin_frame(),
            down_through(1.0, 0.0),
            5.0,
            1.4,
        );
        session.update(down_through(0.0, 1.0));
        let value = session.update(down_through(-1.0, 0.0));
        assert_relative_eq!(value, 1.4 + 2.0 * FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn test_prismatic_clamps_only_explicit_limits() {
        let side = |x: f32, z: f32| Ray::new(Vec3::new(x, -5.0, z), Vec3::y());

        let mut bounded = DragSession::new(
            "slider",
            spec(JointKind::Prismatic, -0.1, 0.1, true),
            origin_frame(),
            side(0.0, 0.0),
            5.0,
            0.0,
        );
        assert_relative_eq!(bounded.update(side(0.3, 0.2)), 0.1);

        let mut free = DragSession::new(
            "slider",
            spec(JointKind::Prismatic, -0.1, 0.1, false),
            origin_frame(),
            side(0.0, 0.0),
            5.0,
            0.0,
        );
        assert_relative_eq!(free.update(side(0.3, 0.2)), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_frame_excludes_own_motion() {
        let mut arm = ArmFixture::new();
        arm.tree.set_joint_value(arm.elbow, 0.8).unwrap();
        let index = crate::index::SceneIndexBuilder::build(&arm.tree, Default::default());
        let frame = JointFrame::of(&arm.tree, index.joint("elbow").unwrap());

        assert_relative_eq!(frame.pivot, Vec3::new(0.0, 0.0, 1.2), epsilon = 1e-6);
        assert_relative_eq!(frame.axis.into_inner(), Vec3::y(), epsilon = 1e-6);
    }
}
