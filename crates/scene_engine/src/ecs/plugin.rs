//! Plugins: scene-scoped extensions
//!
//! A plugin is the cross-cutting counterpart of a component manager. A scene
//! holds at most one plugin of each concrete type, runs plugin hooks in
//! ascending [`Plugin::order`], and always runs them before any manager.

use std::any::{Any, TypeId};

use super::Scene;
use crate::events::EventEmitter;

/// Ordered extension point with its own lifecycle
pub trait Plugin: Any {
    /// Execution priority relative to other plugins, lower runs first
    ///
    /// Read again every time the scene sorts its plugins.
    fn order(&self) -> i32 {
        0
    }

    /// Called once, on scene init or when added to an initialized scene
    fn init(&mut self, _scene: &mut Scene) {}

    /// Called once per frame, before any component manager
    fn update(&mut self, _scene: &mut Scene) {}

    /// Release whatever the plugin holds; called on destroy
    fn clear(&mut self) {}
}

/// Where a registered plugin is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Bound to a scene, init hook not run yet
    Attached,
    /// Init hook has run
    Initialized,
}

/// Object-safe view of a [`Plugin`]
pub(crate) trait AnyPlugin {
    fn run_order(&self) -> i32;
    fn run_init(&mut self, scene: &mut Scene);
    fn run_update(&mut self, scene: &mut Scene);
    fn run_clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<P: Plugin> AnyPlugin for P {
    fn run_order(&self) -> i32 {
        Plugin::order(self)
    }

    fn run_init(&mut self, scene: &mut Scene) {
        Plugin::init(self, scene);
    }

    fn run_update(&mut self, scene: &mut Scene) {
        Plugin::update(self, scene);
    }

    fn run_clear(&mut self) {
        Plugin::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Registry entry for one plugin
pub(crate) struct PluginEntry {
    /// Taken out while one of its hooks runs
    pub(crate) plugin: Option<Box<dyn AnyPlugin>>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) order: i32,
    pub(crate) state: PluginState,
    pub(crate) events: EventEmitter,
}

impl PluginEntry {
    pub(crate) fn new<P: Plugin>(plugin: P) -> Self {
        Self {
            order: plugin.order(),
            plugin: Some(Box::new(plugin)),
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            state: PluginState::Attached,
            events: EventEmitter::new(),
        }
    }

    /// Re-read the order from the plugin; kept as is while it is running
    pub(crate) fn refresh_order(&mut self) {
        if let Some(plugin) = self.plugin.as_deref() {
            self.order = plugin.run_order();
        }
    }

    pub(crate) fn get<P: Plugin>(&self) -> Option<&P> {
        self.plugin.as_deref()?.as_any().downcast_ref::<P>()
    }

    pub(crate) fn get_mut<P: Plugin>(&mut self) -> Option<&mut P> {
        self.plugin.as_deref_mut()?.as_any_mut().downcast_mut::<P>()
    }
}
