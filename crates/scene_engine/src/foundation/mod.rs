//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Arena keys for entities, components, managers and plugins
//! - Frame clock
//! - Logging utilities

pub mod collections;
pub mod time;
pub mod logging;
