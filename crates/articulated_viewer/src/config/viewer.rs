//! # Viewer Configuration
//!
//! Top-level configuration for a viewer session: logging, initial geometry
//! visibility, pointer interaction tuning and highlight styling.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Which geometry class is interactive (hover, select, drag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InteractionMode {
    /// Visual meshes respond to the pointer
    #[default]
    Visual,
    /// Collision meshes respond to the pointer
    Collision,
}

/// Active pointer tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InteractionTool {
    /// Hover and select only; joints are never dragged
    Inspect,
    /// Hover, select and drag joints
    #[default]
    Manipulate,
}

impl InteractionTool {
    /// Whether pressing on a mesh may start a joint drag
    pub fn allows_joint_drag(self) -> bool {
        matches!(self, Self::Manipulate)
    }
}

/// Global visual/collision visibility toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Render visual meshes
    pub show_visual: bool,
    /// Render collision meshes
    pub show_collision: bool,
}

impl VisibilityConfig {
    /// Create a visibility configuration
    pub fn new(show_visual: bool, show_collision: bool) -> Self {
        Self {
            show_visual,
            show_collision,
        }
    }

    /// Whether meshes of the given class are currently shown
    pub fn shows(&self, is_collision: bool) -> bool {
        if is_collision {
            self.show_collision
        } else {
            self.show_visual
        }
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self::new(true, false)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Pointer interaction tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Interactive geometry class
    pub mode: InteractionMode,
    /// Active tool
    pub tool: InteractionTool,
    /// Pointer moves shorter than this (pixels) are ignored while not dragging
    pub hover_threshold_px: f64,
    /// World-space margin added on every side of the cached model bounds
    pub bounds_margin: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            mode: InteractionMode::Visual,
            tool: InteractionTool::Manipulate,
            hover_threshold_px: 2.0,
            bounds_margin: 0.05,
        }
    }
}

/// Highlight and per-class mesh styling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// RGBA colour of the hover overlay
    pub hover_color: [f32; 4],
    /// RGBA colour of the selection overlay
    pub selection_color: [f32; 4],
    /// Opacity of collision meshes when shown
    pub collision_opacity: f32,
    /// Render order of collision meshes when shown
    pub collision_render_order: i32,
    /// Render order of highlighted meshes
    pub highlight_render_order: i32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            hover_color: [1.0, 0.85, 0.2, 1.0],
            selection_color: [0.2, 0.6, 1.0, 1.0],
            collision_opacity: 0.35,
            collision_render_order: 1,
            highlight_render_order: 999,
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Initial visibility toggles
    pub visibility: VisibilityConfig,
    /// Pointer interaction settings
    pub interaction: InteractionConfig,
    /// Highlight styling
    pub highlight: HighlightConfig,
}

impl ViewerConfig {
    /// Set the initial visibility toggles
    pub fn with_visibility(mut self, visibility: VisibilityConfig) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the interactive geometry class
    pub fn with_mode(mut self, mode: InteractionMode) -> Self {
        self.interaction.mode = mode;
        self
    }

    /// Set the active tool
    pub fn with_tool(mut self, tool: InteractionTool) -> Self {
        self.interaction.tool = tool;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.interaction.hover_threshold_px >= 0.0) {
            return Err(ConfigError::Invalid(
                "hover_threshold_px must be non-negative".to_string(),
            ));
        }
        if !(self.interaction.bounds_margin >= 0.0) {
            return Err(ConfigError::Invalid(
                "bounds_margin must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.highlight.collision_opacity) {
            return Err(ConfigError::Invalid(
                "collision_opacity must be within [0, 1]".to_string(),
            ));
        }
        let colors = [self.highlight.hover_color, self.highlight.selection_color];
        if colors.iter().flatten().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid(
                "highlight colours must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config for ViewerConfig {}
