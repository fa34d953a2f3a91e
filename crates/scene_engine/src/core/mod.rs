//! # Core Module
//!
//! Shared configuration types for the scene and its clock, plus re-exports
//! of the subsystems most users reach for first.
//!
//! ## Organization
//!
//! - **Config**: Scene and clock configuration
//! - **Foundation**: Clock, logging, arena keys
//! - **ECS**: Entities, components, managers, plugins and the scene

pub mod config;

pub use crate::foundation;
pub use crate::ecs;

pub use config::{
    Config,
    ConfigError,
    SceneConfig,
    TimeConfig,
};
