//! Hover and selection material overlays
//!
//! Highlighting swaps a mesh's material for an overlay and remembers the
//! material it replaced. The originals map only holds meshes that are
//! currently highlighted, so reverting touches those meshes and nothing else.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{HighlightConfig, InteractionMode, VisibilityConfig};
use crate::foundation::collections::NodeKey;
use crate::index::SceneIndex;
use crate::scene::{MaterialHandle, SceneTree};

/// Render state of a non-highlighted mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStyle {
    /// Whether the mesh is drawn
    pub visible: bool,
    /// Opacity
    pub opacity: f32,
    /// Draw order hint
    pub render_order: i32,
}

/// Style a mesh of the given class should have under the given toggles
pub fn mesh_style(is_collision: bool, visibility: VisibilityConfig, style: &HighlightConfig) -> MeshStyle {
    if is_collision {
        MeshStyle {
            visible: visibility.show_collision,
            opacity: style.collision_opacity,
            render_order: style.collision_render_order,
        }
    } else {
        MeshStyle {
            visible: visibility.show_visual,
            opacity: 1.0,
            render_order: 0,
        }
    }
}

/// Applies and reverts material overlays
#[derive(Debug)]
pub struct HighlightManager {
    originals: HashMap<NodeKey, MaterialHandle>,
    active_mode: Option<InteractionMode>,
    visibility: VisibilityConfig,
    style: HighlightConfig,
}

impl HighlightManager {
    /// Create a manager with the given styling and visibility toggles
    pub fn new(style: HighlightConfig, visibility: VisibilityConfig) -> Self {
        Self {
            originals: HashMap::new(),
            active_mode: None,
            visibility,
            style,
        }
    }

    /// Current visibility toggles
    pub fn visibility(&self) -> VisibilityConfig {
        self.visibility
    }

    /// Styling in use
    pub fn style(&self) -> &HighlightConfig {
        &self.style
    }

    /// Mode of the outstanding highlights, if any
    pub fn active_mode(&self) -> Option<InteractionMode> {
        self.active_mode
    }

    /// Whether the mesh currently carries an overlay
    pub fn is_highlighted(&self, mesh: NodeKey) -> bool {
        self.originals.contains_key(&mesh)
    }

    /// Number of highlighted meshes
    pub fn highlighted_count(&self) -> usize {
        self.originals.len()
    }

    /// Material a highlighted mesh had before its first overlay
    pub fn original_of(&self, mesh: NodeKey) -> Option<&MaterialHandle> {
        self.originals.get(&mesh)
    }

    /// Put `overlay` on every mesh in `meshes`
    ///
    /// The first overlay on a mesh captures its current material; later
    /// overlays only swap the material, so the true original survives any
    /// number of repeated applies. Highlights of a different mode are
    /// reverted first. Returns how many meshes received the overlay.
    pub fn apply(
        &mut self,
        tree: &mut SceneTree,
        meshes: &[NodeKey],
        overlay: &MaterialHandle,
        mode: InteractionMode,
    ) -> usize {
        if self.active_mode.is_some_and(|active| active != mode) {
            log::debug!("Highlight mode changed to {:?}; reverting outstanding overlays", mode);
            self.revert_all(tree, None);
        }
        self.active_mode = Some(mode);

        let mut applied = 0;
        for &key in meshes {
            let Some(node) = tree.get_mut(key) else {
                continue;
            };
            let Some(mesh) = node.as_mesh_mut() else {
                continue;
            };
            self.originals
                .entry(key)
                .or_insert_with(|| Arc::clone(&mesh.material));
            mesh.material = Arc::clone(overlay);
            node.visible = true;
            node.render_order = self.style.highlight_render_order;
            applied += 1;
        }
        applied
    }

    /// Restore the given meshes if they are highlighted
    ///
    /// Restored meshes are restyled from the current visibility toggles.
    /// `index` supplies each mesh's class; meshes it does not know are styled
    /// as visual.
    pub fn revert(&mut self, tree: &mut SceneTree, index: Option<&SceneIndex>, meshes: &[NodeKey]) -> usize {
        let mut restored = 0;
        for key in meshes {
            if let Some(original) = self.originals.remove(key) {
                self.restore(tree, index, *key, original);
                restored += 1;
            }
        }
        if self.originals.is_empty() {
            self.active_mode = None;
        }
        restored
    }

    /// Restore every highlighted mesh
    pub fn revert_all(&mut self, tree: &mut SceneTree, index: Option<&SceneIndex>) -> usize {
        let drained: Vec<_> = self.originals.drain().collect();
        let restored = drained.len();
        for (key, original) in drained {
            self.restore(tree, index, key, original);
        }
        self.active_mode = None;
        restored
    }

    fn restore(&self, tree: &mut SceneTree, index: Option<&SceneIndex>, key: NodeKey, original: MaterialHandle) {
        let is_collision = index.and_then(|i| i.is_collision(key)).unwrap_or(false);
        let style = mesh_style(is_collision, self.visibility, &self.style);
        let Some(node) = tree.get_mut(key) else {
            return;
        };
        if let Some(mesh) = node.as_mesh_mut() {
            mesh.material = original;
        }
        node.visible = style.visible;
        node.opacity = style.opacity;
        node.render_order = style.render_order;
    }

    /// Change the visibility toggles and restyle every non-highlighted mesh
    ///
    /// Highlighted meshes pick up the new toggles when they are reverted.
    pub fn set_visibility(&mut self, tree: &mut SceneTree, index: &SceneIndex, visibility: VisibilityConfig) {
        self.visibility = visibility;
        self.restyle_all(tree, index);
    }

    /// Style every indexed, non-highlighted mesh from the current toggles
    pub fn restyle_all(&self, tree: &mut SceneTree, index: &SceneIndex) -> usize {
        self.style_meshes(tree, index, |key| self.is_highlighted(key))
    }

    /// Style every indexed mesh of a tree this manager has never highlighted
    ///
    /// Highlight bookkeeping is keyed by the active tree, so a freshly loaded
    /// tree must not be checked against it.
    pub fn style_fresh(&self, tree: &mut SceneTree, index: &SceneIndex) -> usize {
        self.style_meshes(tree, index, |_| false)
    }

    fn style_meshes(
        &self,
        tree: &mut SceneTree,
        index: &SceneIndex,
        skip: impl Fn(NodeKey) -> bool,
    ) -> usize {
        let mut styled = 0;
        for key in index.meshes() {
            if skip(key) {
                continue;
            }
            let Some(is_collision) = index.is_collision(key) else {
                continue;
            };
            let Some(node) = tree.get_mut(key) else {
                continue;
            };
            let style = mesh_style(is_collision, self.visibility, &self.style);
            node.visible = style.visible;
            node.opacity = style.opacity;
            node.render_order = style.render_order;
            styled += 1;
        }
        styled
    }

    /// Forget highlights of meshes that no longer exist
    pub fn retain_live(&mut self, tree: &SceneTree) -> usize {
        let before = self.originals.len();
        self.originals.retain(|key, _| tree.contains(*key));
        if self.originals.is_empty() {
            self.active_mode = None;
        }
        before - self.originals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SceneIndexBuilder;
    use crate::scene::Material;
    use crate::tests::fixtures::ArmFixture;

    fn material(tree: &SceneTree, key: NodeKey) -> MaterialHandle {
        Arc::clone(&tree.get(key).unwrap().as_mesh().unwrap().material)
    }

    fn manager() -> HighlightManager {
        HighlightManager::new(HighlightConfig::default(), VisibilityConfig::default())
    }

    #[test]
    fn test_repeated_apply_keeps_true_original() {
        let mut arm = ArmFixture::new();
        let original = material(&arm.tree, arm.upper_visual);
        let hover = Material::overlay([1.0, 1.0, 0.0, 1.0]).into_handle();
        let select = Material::overlay([0.0, 0.0, 1.0, 1.0]).into_handle();
        let mut highlights = manager();

        highlights.apply(&mut arm.tree, &[arm.upper_visual], &hover, InteractionMode::Visual);
        highlights.apply(&mut arm.tree, &[arm.upper_visual], &select, InteractionMode::Visual);
        assert!(Arc::ptr_eq(&material(&arm.tree, arm.upper_visual), &select));
        assert_eq!(highlights.highlighted_count(), 1);

        highlights.revert_all(&mut arm.tree, None);
        assert!(Arc::ptr_eq(&material(&arm.tree, arm.upper_visual), &original));
        assert_eq!(highlights.highlighted_count(), 0);
        assert_eq!(highlights.active_mode(), None);
    }

    #[test]
    fn test_revert_uses_current_visibility() {
        let mut arm = ArmFixture::new();
        let index = SceneIndexBuilder::build(&arm.tree, VisibilityConfig::default());
        let overlay = Material::overlay([1.0, 0.0, 0.0, 1.0]).into_handle();
        let mut highlights = manager();

        highlights.apply(&mut arm.tree, &[arm.upper_collision], &overlay, InteractionMode::Collision);
        assert!(arm.tree.get(arm.upper_collision).unwrap().visible);

        highlights.set_visibility(&mut arm.tree, &index, VisibilityConfig::new(false, true));
        // Visual meshes restyled right away, the highlighted one left alone
        assert!(!arm.tree.get(arm.upper_visual).unwrap().visible);
        assert_eq!(arm.tree.get(arm.upper_collision).unwrap().render_order, 999);

        highlights.set_visibility(&mut arm.tree, &index, VisibilityConfig::new(true, false));
        highlights.revert(&mut arm.tree, Some(&index), &[arm.upper_collision]);
        let node = arm.tree.get(arm.upper_collision).unwrap();
        assert!(!node.visible);
        assert_eq!(node.render_order, 1);
        assert!((node.opacity - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mode_switch_reverts_previous_highlights() {
        let mut arm = ArmFixture::new();
        let visual_original = material(&arm.tree, arm.upper_visual);
        let overlay = Material::overlay([1.0, 0.0, 0.0, 1.0]).into_handle();
        let mut highlights = manager();

        highlights.apply(&mut arm.tree, &[arm.upper_visual], &overlay, InteractionMode::Visual);
        highlights.apply(&mut arm.tree, &[arm.upper_collision], &overlay, InteractionMode::Collision);

        assert!(!highlights.is_highlighted(arm.upper_visual));
        assert!(highlights.is_highlighted(arm.upper_collision));
        assert!(Arc::ptr_eq(&material(&arm.tree, arm.upper_visual), &visual_original));
        assert_eq!(highlights.active_mode(), Some(InteractionMode::Collision));
    }

    #[test]
    fn test_apply_skips_non_meshes_and_dead_keys() {
        let mut arm = ArmFixture::new();
        let overlay = Material::overlay([1.0, 0.0, 0.0, 1.0]).into_handle();
        let mut highlights = manager();

        let applied = highlights.apply(
            &mut arm.tree,
            &[arm.upper_arm, arm.tool_visual],
            &overlay,
            InteractionMode::Visual,
        );
        assert_eq!(applied, 1);

        arm.tree.remove_subtree(arm.tool).unwrap();
        assert_eq!(highlights.retain_live(&arm.tree), 1);
        assert_eq!(highlights.active_mode(), None);
    }

    #[test]
    fn test_style_fresh_ignores_stale_highlight_keys() {
        let mut arm = ArmFixture::new();
        let index = SceneIndexBuilder::build(&arm.tree, VisibilityConfig::default());
        let overlay = Material::overlay([1.0, 0.0, 0.0, 1.0]).into_handle();
        let mut highlights = manager();
        highlights.apply(&mut arm.tree, &[arm.base_collision], &overlay, InteractionMode::Collision);

        // Same arena layout, so the old highlight key aliases a mesh here
        let mut fresh = ArmFixture::new();
        assert_eq!(highlights.restyle_all(&mut fresh.tree, &index), index.mesh_count() - 1);
        assert!(fresh.tree.get(fresh.base_collision).unwrap().visible);

        assert_eq!(highlights.style_fresh(&mut fresh.tree, &index), index.mesh_count());
        assert!(!fresh.tree.get(fresh.base_collision).unwrap().visible);
    }
}
