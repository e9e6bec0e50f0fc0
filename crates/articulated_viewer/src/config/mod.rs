//! Configuration system
//!
//! File-backed configuration shared by the library and the demo application.
//! Formats are chosen by extension: `.toml` or `.ron`.

pub mod viewer;

pub use serde::Deserialize;
pub use viewer::{
    HighlightConfig, InteractionConfig, InteractionMode, InteractionTool, LoggingConfig,
    ViewerConfig, VisibilityConfig,
};

/// Configuration trait
pub trait Config: for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text, using `path_hint`'s extension to pick the format
    fn from_str_with_format(contents: &str, path_hint: &str) -> Result<Self, ConfigError> {
        if path_hint.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path_hint.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path_hint.to_string()))
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Semantically invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
