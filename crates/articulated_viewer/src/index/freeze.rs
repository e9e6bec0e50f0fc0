//! Static mesh matrix freezing

use super::SceneIndex;
use crate::scene::SceneTree;

/// Outcome of a freeze pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreezeReport {
    /// Static meshes whose world matrix was baked
    pub frozen: usize,
    /// Kinematic meshes returned to per-frame updates
    pub thawed: usize,
}

/// Bakes world matrices of meshes that no movable joint can move
pub struct MatrixFreezeOptimizer;

impl MatrixFreezeOptimizer {
    /// Freeze every static mesh of `index` and thaw every kinematic one
    ///
    /// Must run after every rebuild. Kinematic meshes are explicitly thawed so
    /// a mesh that became kinematic through a structural edit never keeps a
    /// stale baked matrix.
    pub fn freeze(tree: &mut SceneTree, index: &SceneIndex) -> FreezeReport {
        let mut report = FreezeReport::default();

        for mesh in index.kinematic_meshes() {
            if tree.is_frozen(*mesh) && tree.thaw(*mesh).is_ok() {
                report.thawed += 1;
            }
        }

        for mesh in index.static_meshes() {
            match tree.freeze(*mesh) {
                Ok(()) => report.frozen += 1,
                Err(err) => log::warn!("Skipping freeze of {:?}: {}", mesh, err),
            }
        }

        log::debug!(
            "Froze {} static meshes, thawed {} kinematic meshes",
            report.frozen,
            report.thawed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisibilityConfig;
    use crate::foundation::math::{utils, Transform, Vec3};
    use crate::index::SceneIndexBuilder;
    use crate::tests::fixtures::ArmFixture;
    use approx::assert_relative_eq;

    #[test]
    fn test_only_static_meshes_freeze() {
        let mut arm = ArmFixture::new();
        let index = SceneIndexBuilder::build(&arm.tree, VisibilityConfig::default());
        let report = MatrixFreezeOptimizer::freeze(&mut arm.tree, &index);

        assert_eq!(report.frozen, index.static_meshes().len());
        assert!(arm.tree.is_frozen(arm.base_visual));
        assert!(arm.tree.is_frozen(arm.sensor_mesh));
        assert!(!arm.tree.is_frozen(arm.upper_visual));
        assert!(!arm.tree.is_frozen(arm.forearm_visual));
    }

    #[test]
    fn test_frozen_matrix_is_baked_world() {
        let mut arm = ArmFixture::new();
        let index = SceneIndexBuilder::build(&arm.tree, VisibilityConfig::default());
        MatrixFreezeOptimizer::freeze(&mut arm.tree, &index);

        let world = arm.tree.world_matrix(arm.sensor_mesh).unwrap();
        assert_relative_eq!(utils::translation_of(&world), Vec3::new(2.0, 0.0, 0.1));
    }

    #[test]
    fn test_refreeze_thaws_newly_kinematic_meshes() {
        let mut arm = ArmFixture::new();
        arm.tree.freeze(arm.upper_visual).unwrap();
        let index = SceneIndexBuilder::build(&arm.tree, VisibilityConfig::default());
        let report = MatrixFreezeOptimizer::freeze(&mut arm.tree, &index);

        assert_eq!(report.thawed, 1);
        assert!(!arm.tree.is_frozen(arm.upper_visual));

        arm.tree
            .set_transform(arm.sensor_link, Transform::from_position(Vec3::x()))
            .unwrap();
        assert_relative_eq!(
            utils::translation_of(&arm.tree.world_matrix(arm.sensor_mesh).unwrap()),
            Vec3::new(1.0, 0.0, 0.1)
        );
    }
}
