//! Entity-Component scene graph
//!
//! Entities form a hierarchy and carry typed components. Components of one
//! concrete type are batched by a component manager; plugins add
//! cross-cutting behaviour. The [`Scene`] owns all of it.

pub mod component;
pub mod component_manager;
pub mod entity;
pub mod plugin;
pub mod scene;

#[cfg(test)]
mod tests;

pub use component::Component;
pub use component_manager::{ComponentManager, DefaultManager, ManagerEntry};
pub use entity::Entity;
pub use plugin::{Plugin, PluginState};
pub use scene::{Scene, SceneError};
