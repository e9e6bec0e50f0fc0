//! Material definitions
//!
//! Materials are immutable once created and shared between meshes through
//! [`MaterialHandle`]. Swapping a mesh's material swaps the handle; identity
//! comparisons use [`Arc::ptr_eq`].

use std::sync::Arc;

use crate::foundation::math::Vec4;

/// Shared, reference-counted material
pub type MaterialHandle = Arc<Material>;

/// Alpha blending modes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlphaMode {
    /// No transparency
    #[default]
    Opaque,
    /// Alpha blending
    Blend,
}

/// Surface appearance of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Optional name for debugging
    pub name: Option<String>,
    /// Base colour (RGBA)
    pub color: Vec4,
    /// Alpha blending mode
    pub alpha_mode: AlphaMode,
    /// Whether the material is drawn on top of everything else
    pub depth_test: bool,
}

impl Material {
    /// Create an opaque material with the given RGBA colour
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            name: None,
            color: Vec4::new(color[0], color[1], color[2], color[3]),
            alpha_mode: AlphaMode::Opaque,
            depth_test: true,
        }
    }

    /// Create a highlight overlay material
    ///
    /// Overlays ignore depth so a highlighted link stays visible through the
    /// rest of the model.
    pub fn overlay(color: [f32; 4]) -> Self {
        Self {
            depth_test: false,
            ..Self::new(color)
        }
        .with_name("highlight-overlay")
    }

    /// Set the material name for debugging
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use alpha blending
    pub fn transparent(mut self) -> Self {
        self.alpha_mode = AlphaMode::Blend;
        self
    }

    /// Wrap into a shared handle
    pub fn into_handle(self) -> MaterialHandle {
        Arc::new(self)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([0.8, 0.8, 0.8, 1.0])
    }
}
