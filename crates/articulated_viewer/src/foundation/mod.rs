//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the viewer:
//! - Math types and operations
//! - Arena keys for scene nodes
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
