//! # Scene Engine
//!
//! An in-process entity-component scene graph for real-time simulations.
//!
//! ## Features
//!
//! - **Hierarchy**: Entities with parent/child links, depth and root tracking
//! - **Component Managers**: Per-type batches created on demand, run in order
//! - **Plugins**: Ordered scene-wide extensions that run before managers
//! - **Deferred Registration**: Structural changes applied between frames
//! - **Events**: Publish/subscribe on the scene, entities and plugins
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_engine::prelude::*;
//!
//! struct Spin(f64);
//!
//! impl Component for Spin {
//!     type Manager = DefaultManager<Self>;
//!
//!     fn update(&mut self, scene: &mut Scene, _owner: EntityId) {
//!         self.0 += scene.time().delta();
//!     }
//! }
//!
//! let mut scene = Scene::new("demo");
//! let parent = scene.spawn_named("parent");
//! let child = scene.spawn();
//! scene.add_child(parent, child).unwrap();
//! scene.add_component(child, Spin(0.0));
//! scene.add_entity(parent);
//!
//! scene.init();
//! scene.update();
//!
//! assert!(scene.has_entity(child));
//! assert_eq!(scene.time().frame(), 1);
//! assert!(scene.component::<Spin>(child).is_some_and(|spin| spin.0 > 0.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod config;
pub mod foundation;
pub mod ecs;
pub mod events;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        foundation::{
            collections::{ComponentId, EntityId, SceneId},
            time::Time,
        },
        ecs::{
            Component, ComponentManager, DefaultManager, Entity, Plugin, PluginState, Scene,
            SceneError,
        },
        events::{Event, EventArg, EventSource, SubscriptionId},
        core::config::{SceneConfig, TimeConfig},
    };
}
