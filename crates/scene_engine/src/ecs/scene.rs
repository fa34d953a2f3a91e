//! Scene: the top-level registry
//!
//! The scene owns every entity, component, component manager and plugin in
//! arenas, keeps the id/name/type indices consistent and drives the
//! `init`/`update` protocol:
//!
//! 1. `init()` runs once: plugins in ascending order, then managers in
//!    ascending order.
//! 2. `update()` advances the clock, applies queued registrations (adds
//!    first, then removals), then updates plugins and managers in the same
//!    order.
//!
//! Before `init()` registration is immediate. After it, `add_entity` and
//! `remove_entity` are queued until the next `update()` so a running update
//! pass never sees the registry change underneath it.
//!
//! Hooks get `&mut Scene`. While a hook runs its instance is taken out of
//! its slot and put back afterwards; see `run_component`, `run_manager` and
//! `run_plugin`.

use std::any::TypeId;
use std::collections::{HashMap, HashSet, VecDeque};

use super::component::{AnyComponent, ComponentSlot};
use super::component_manager::{ComponentManager, ManagerEntry};
use super::entity::Entity;
use super::plugin::{Plugin, PluginEntry, PluginState};
use crate::core::config::{ConfigError, SceneConfig};
use crate::events::{Event, EventEmitter, EventSource, SubscriptionId};
use crate::foundation::collections::{
    ComponentId, EntityId, ManagerId, PluginId, SceneId, SlotMap,
};
use crate::foundation::time::Time;

/// Scene errors
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The child is the parent itself or one of its ancestors
    #[error("Cyclic hierarchy: {child:?} cannot be parented under {parent:?}")]
    CyclicHierarchy {
        /// Requested parent
        parent: EntityId,
        /// Requested child
        child: EntityId,
    },
}

/// Lifecycle hook selector for the hook runners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Init,
    Update,
}

/// Emitter lookup used while dispatching
#[derive(Debug, Clone, Copy)]
enum Emitter {
    Scene,
    Entity(EntityId),
    Plugin(PluginId),
}

/// Entity/component scene graph with ordered managers and plugins
pub struct Scene {
    id: SceneId,
    name: String,
    time: Time,
    events: EventEmitter,

    pub(crate) entities: SlotMap<EntityId, Entity>,
    /// Registered entities in registration order
    registered: Vec<EntityId>,
    entity_index: HashSet<EntityId>,
    names: HashMap<String, EntityId>,

    pub(crate) components: SlotMap<ComponentId, ComponentSlot>,
    /// Components detached while their hook was running; `true` if destroyed
    pub(crate) retired_components: HashMap<ComponentId, bool>,

    managers: SlotMap<ManagerId, ManagerEntry>,
    manager_index: HashMap<TypeId, ManagerId>,
    manager_order: Vec<ManagerId>,

    plugins: SlotMap<PluginId, PluginEntry>,
    plugin_index: HashMap<TypeId, PluginId>,
    plugin_order: Vec<PluginId>,
    /// Plugins removed while their hook was running; `true` if destroyed
    retired_plugins: HashMap<PluginId, bool>,

    initialized: bool,
    pub(crate) pending_add: Vec<EntityId>,
    pub(crate) pending_remove: Vec<EntityId>,

    /// Publishes of an event that was already being dispatched
    queued_events: VecDeque<(Emitter, Event)>,
    dispatch_depth: usize,
}

impl Scene {
    /// Create an empty, uninitialized scene
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_time(name.into(), Time::new())
    }

    /// Create a scene from configuration
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the configuration does not validate.
    pub fn with_config(config: &SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_time(config.name.clone(), Time::with_config(&config.time)))
    }

    fn with_time(name: String, time: Time) -> Self {
        let id = SceneId::next();
        log::debug!("Created scene {:?} '{}'", id, name);
        Self {
            id,
            name,
            time,
            events: EventEmitter::new(),
            entities: SlotMap::with_key(),
            registered: Vec::new(),
            entity_index: HashSet::new(),
            names: HashMap::new(),
            components: SlotMap::with_key(),
            retired_components: HashMap::new(),
            managers: SlotMap::with_key(),
            manager_index: HashMap::new(),
            manager_order: Vec::new(),
            plugins: SlotMap::with_key(),
            plugin_index: HashMap::new(),
            plugin_order: Vec::new(),
            retired_plugins: HashMap::new(),
            initialized: false,
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            queued_events: VecDeque::new(),
            dispatch_depth: 0,
        }
    }

    /// Get the scene ID
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Scene name, empty when unnamed
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the scene has a non-empty name
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    /// The scene clock
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Mutable access to the scene clock
    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }

    /// Whether `init()` has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize plugins, then component managers
    ///
    /// Runs once; later calls do nothing. A manager created while this runs
    /// is initialized on creation. A component that joins a manager whose
    /// init has not run yet is initialized by that init, so no init hook runs
    /// twice.
    pub fn init(&mut self) {
        if self.initialized {
            log::trace!("Scene '{}' already initialized", self.name);
            return;
        }
        self.initialized = true;
        log::debug!(
            "Initializing scene '{}': {} plugins, {} managers",
            self.name,
            self.plugin_order.len(),
            self.manager_order.len()
        );

        self.sort_plugins();
        for id in self.plugin_order.clone() {
            let attached = self
                .plugins
                .get(id)
                .is_some_and(|entry| entry.state == PluginState::Attached);
            if attached {
                self.run_plugin(id, Hook::Init);
            }
        }

        // Managers created by the plugin hooks above already ran their init
        self.sort_managers();
        for id in self.manager_order.clone() {
            if self.managers.get(id).is_some_and(|entry| !entry.is_initialized()) {
                self.run_manager(id, Hook::Init);
            }
        }
    }

    /// Advance one frame
    ///
    /// Ticks the clock, applies queued registrations (adds, then removals)
    /// and runs every plugin update followed by every manager update.
    pub fn update(&mut self) {
        self.time.update();
        log::trace!("Scene '{}' frame {}", self.name, self.time.frame());

        if self.initialized {
            self.flush_pending();
        }

        for id in self.plugin_order.clone() {
            self.run_plugin(id, Hook::Update);
        }
        for id in self.manager_order.clone() {
            self.run_manager(id, Hook::Update);
        }
    }

    fn flush_pending(&mut self) {
        if !self.has_pending_changes() {
            return;
        }
        log::trace!(
            "Applying {} queued adds and {} queued removals",
            self.pending_add.len(),
            self.pending_remove.len()
        );
        for id in std::mem::take(&mut self.pending_add) {
            self.add_entity_now(id);
        }
        for id in std::mem::take(&mut self.pending_remove) {
            self.remove_entity_now(id);
        }
    }

    /// Whether registrations are queued for the next update
    pub fn has_pending_changes(&self) -> bool {
        !self.pending_add.is_empty() || !self.pending_remove.is_empty()
    }

    /// Drop queued changes, destroy every registered entity and every plugin
    ///
    /// Entities go in reverse registration order, plugins in reverse
    /// execution order. Detached entities spawned from this scene are left
    /// alone.
    pub fn clear(&mut self) {
        log::debug!("Clearing scene '{}'", self.name);
        self.pending_add.clear();
        self.pending_remove.clear();

        for id in self.registered.clone().into_iter().rev() {
            self.destroy_entity(id);
        }
        for id in self.plugin_order.clone().into_iter().rev() {
            self.destroy_plugin_by_id(id);
        }
    }

    /// Same as [`clear`](Self::clear)
    pub fn destroy(&mut self) {
        self.clear();
    }

    // Entity registry

    /// Register an entity and its subtree
    ///
    /// Immediate before `init()`, queued until the next `update()` after.
    /// Re-adding an entity that is queued for removal cancels the removal.
    pub fn add_entity(&mut self, id: EntityId) {
        if !self.entities.contains_key(id) {
            return;
        }
        if self.initialized {
            self.pending_remove.retain(|&e| e != id);
            if !self.pending_add.contains(&id) {
                self.pending_add.push(id);
            }
        } else {
            self.add_entity_now(id);
        }
    }

    /// Unregister an entity and its subtree
    ///
    /// Immediate before `init()`, queued until the next `update()` after.
    /// Queued removals apply after queued adds, so adding and removing in
    /// the same frame leaves the entity unregistered.
    pub fn remove_entity(&mut self, id: EntityId) {
        if self.initialized {
            if !self.pending_remove.contains(&id) {
                self.pending_remove.push(id);
            }
        } else {
            self.remove_entity_now(id);
        }
    }

    /// Register an entity and its subtree in preorder
    pub(crate) fn add_entity_now(&mut self, id: EntityId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.register_entity(id) {
                stack.extend(children.into_iter().rev());
            }
        }
    }

    /// Register one entity and its components; returns its children
    fn register_entity(&mut self, id: EntityId) -> Option<Vec<EntityId>> {
        if self.entity_index.contains(&id) {
            return None;
        }
        let scene = self.id;
        let entity = self.entities.get_mut(id)?;
        entity.scene = Some(scene);
        let name = entity.name().to_string();
        let components = entity.components().to_vec();
        let children = entity.children().to_vec();

        self.registered.push(id);
        self.entity_index.insert(id);
        if !name.is_empty() {
            if let Some(previous) = self.names.insert(name.clone(), id) {
                if previous != id {
                    log::warn!(
                        "Entity name '{}' already used by {:?}; now resolves to {:?}",
                        name,
                        previous,
                        id
                    );
                }
            }
        }
        log::debug!("Registered entity {:?} '{}'", id, name);

        for component in components {
            if self.components.get(component).is_some_and(|slot| slot.owner == id) {
                self.register_component(component);
            }
        }
        Some(children)
    }

    /// Unregister an entity and its subtree in preorder
    pub(crate) fn remove_entity_now(&mut self, id: EntityId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.unregister_entity(id) {
                stack.extend(children.into_iter().rev());
            }
        }
    }

    fn unregister_entity(&mut self, id: EntityId) -> Option<Vec<EntityId>> {
        if !self.entity_index.remove(&id) {
            return None;
        }
        self.registered.retain(|&e| e != id);
        let entity = self.entities.get_mut(id)?;
        entity.scene = None;
        let components = entity.components().to_vec();
        let children = entity.children().to_vec();
        if entity.has_name() && self.names.get(entity.name()) == Some(&id) {
            self.names.remove(entity.name());
        }
        log::debug!("Unregistered entity {:?} '{}'", id, entity.name());

        for component in components {
            self.unregister_component(component);
        }
        Some(children)
    }

    /// Whether the entity is registered in this scene
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entity_index.contains(&id)
    }

    /// A registered entity
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        if self.has_entity(id) {
            self.entities.get(id)
        } else {
            None
        }
    }

    /// A registered entity by name
    pub fn get_entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.names.get(name).and_then(|&id| self.get_entity(id))
    }

    /// Number of registered entities
    pub fn entity_count(&self) -> usize {
        self.registered.len()
    }

    /// Registered entities in registration order
    pub fn entities(&self) -> &[EntityId] {
        &self.registered
    }

    // Component managers

    /// Put a component under its manager, creating the manager on demand
    pub(crate) fn register_component(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get(id) else {
            return;
        };
        if slot.manager.is_some() {
            return;
        }
        let (manager_type, make_manager, type_name) =
            (slot.manager_type, slot.make_manager, slot.type_name);

        let manager_id = if let Some(&existing) = self.manager_index.get(&manager_type) {
            existing
        } else {
            let scene = self.id;
            let created = self
                .managers
                .insert_with_key(|key| ManagerEntry::new(key, scene, manager_type, make_manager()));
            self.manager_index.insert(manager_type, created);
            self.manager_order.push(created);
            log::debug!("Created manager {:?} for {}", created, type_name);
            if self.initialized {
                self.run_manager(created, Hook::Init);
            }
            created
        };

        // The manager's init hook may have detached the component
        let Some(slot) = self.components.get_mut(id) else {
            self.drop_manager_if_empty(manager_id);
            return;
        };
        let Some(entry) = self.managers.get_mut(manager_id) else {
            return;
        };
        entry.add_component(id);
        slot.manager = Some(manager_id);

        if self.initialized {
            self.sort_managers();
            let Some(entry) = self.managers.get_mut(manager_id) else {
                return;
            };
            entry.sort(&self.components);
            // Otherwise the manager's own init reaches the new member
            if entry.is_initialized() {
                self.init_component(id);
            }
        }
    }

    /// Take a component away from its manager, dropping the manager once
    /// it is empty
    pub(crate) fn unregister_component(&mut self, id: ComponentId) {
        let Some(manager_id) = self.components.get_mut(id).and_then(|slot| slot.manager.take())
        else {
            return;
        };
        if let Some(entry) = self.managers.get_mut(manager_id) {
            entry.remove_component(id);
        }
        self.drop_manager_if_empty(manager_id);
    }

    fn drop_manager_if_empty(&mut self, id: ManagerId) {
        if !self.managers.get(id).is_some_and(ManagerEntry::is_empty) {
            return;
        }
        if let Some(entry) = self.managers.remove(id) {
            self.manager_index.remove(&entry.manager_type());
            self.manager_order.retain(|&m| m != id);
            log::debug!("Dropped empty manager {:?}", id);
        }
    }

    /// Stable sort of the manager registry by manager order
    ///
    /// Each manager's order is read again first; a running manager keeps the
    /// order it had.
    pub fn sort_managers(&mut self) {
        for entry in self.managers.values_mut() {
            entry.refresh_order();
        }
        let managers = &self.managers;
        self.manager_order
            .sort_by_key(|id| managers.get(*id).map_or(0, ManagerEntry::order));
    }

    /// Re-sort the members of manager `M`
    pub fn sort_component_manager<M: ComponentManager>(&mut self) {
        let Some(&id) = self.manager_index.get(&TypeId::of::<M>()) else {
            return;
        };
        if let Some(entry) = self.managers.get_mut(id) {
            entry.sort(&self.components);
        }
    }

    fn run_manager(&mut self, id: ManagerId, hook: Hook) {
        let Some(entry) = self.managers.get_mut(id) else {
            return;
        };
        let Some(mut manager) = entry.manager.take() else {
            log::trace!("Manager {:?} is already running", id);
            return;
        };
        if hook == Hook::Init {
            entry.mark_initialized();
        }
        let members = entry.components().to_vec();

        match hook {
            Hook::Init => manager.run_init(self, &members),
            Hook::Update => manager.run_update(self, &members),
        }

        // Gone means it emptied out while running
        if let Some(entry) = self.managers.get_mut(id) {
            entry.manager = Some(manager);
        }
    }

    /// Run a component's init hook
    ///
    /// Called by managers; skips components that are gone or whose own hook
    /// is already running.
    pub fn init_component(&mut self, id: ComponentId) {
        self.run_component(id, Hook::Init);
    }

    /// Run a component's update hook
    pub fn update_component(&mut self, id: ComponentId) {
        self.run_component(id, Hook::Update);
    }

    fn run_component(&mut self, id: ComponentId, hook: Hook) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        let owner = slot.owner;
        let Some(mut instance) = slot.instance.take() else {
            log::trace!("Component {} is already running", slot.type_name);
            return;
        };

        match hook {
            Hook::Init => instance.run_init(self, owner),
            Hook::Update => instance.run_update(self, owner),
        }

        self.restore_component(id, instance);
    }

    fn restore_component(&mut self, id: ComponentId, mut instance: Box<dyn AnyComponent>) {
        if let Some(slot) = self.components.get_mut(id) {
            slot.instance = Some(instance);
        } else if self.retired_components.remove(&id) == Some(true) {
            instance.run_clear();
        }
    }

    /// Whether a manager of type `M` exists
    pub fn has_component_manager<M: ComponentManager>(&self) -> bool {
        self.manager_index.contains_key(&TypeId::of::<M>())
    }

    /// The manager of type `M`
    ///
    /// `None` if absent or while one of its hooks is running.
    pub fn component_manager<M: ComponentManager>(&self) -> Option<&M> {
        self.manager_entry::<M>()?
            .manager
            .as_deref()?
            .as_any()
            .downcast_ref::<M>()
    }

    /// Mutable access to the manager of type `M`
    pub fn component_manager_mut<M: ComponentManager>(&mut self) -> Option<&mut M> {
        let id = *self.manager_index.get(&TypeId::of::<M>())?;
        self.managers
            .get_mut(id)?
            .manager
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<M>()
    }

    /// Registry entry (members, order) of the manager of type `M`
    ///
    /// Available even while the manager is running.
    pub fn manager_entry<M: ComponentManager>(&self) -> Option<&ManagerEntry> {
        let id = self.manager_index.get(&TypeId::of::<M>())?;
        self.managers.get(*id)
    }

    /// Manager entries in execution order
    pub fn manager_entries(&self) -> impl Iterator<Item = &ManagerEntry> + '_ {
        self.manager_order.iter().filter_map(|&id| self.managers.get(id))
    }

    /// Number of live managers
    pub fn manager_count(&self) -> usize {
        self.manager_order.len()
    }

    // Plugins

    /// Add a plugin; returns false if one of the same type is present
    ///
    /// In an initialized scene the plugin registry is re-sorted and the
    /// plugin's init hook runs right away.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> bool {
        let type_id = TypeId::of::<P>();
        if self.plugin_index.contains_key(&type_id) {
            log::trace!("Plugin {} already added", std::any::type_name::<P>());
            return false;
        }

        let id = self.plugins.insert(PluginEntry::new(plugin));
        self.plugin_index.insert(type_id, id);
        self.plugin_order.push(id);
        log::debug!("Added plugin {}", std::any::type_name::<P>());

        if self.initialized {
            self.sort_plugins();
            self.run_plugin(id, Hook::Init);
        }
        true
    }

    /// Remove the plugin of type `P` and hand it back, without clearing it
    ///
    /// Returns `None` if absent. A plugin removed from inside its own hook
    /// is dropped when the hook returns.
    pub fn remove_plugin<P: Plugin>(&mut self) -> Option<P> {
        let id = *self.plugin_index.get(&TypeId::of::<P>())?;
        let entry = self.take_plugin(id)?;
        match entry.plugin {
            Some(plugin) => plugin.into_any().downcast::<P>().ok().map(|boxed| *boxed),
            None => {
                self.retired_plugins.insert(id, false);
                None
            }
        }
    }

    /// Remove the plugin of type `P` and run its clear hook
    ///
    /// Returns false if absent.
    pub fn destroy_plugin<P: Plugin>(&mut self) -> bool {
        match self.plugin_index.get(&TypeId::of::<P>()) {
            Some(&id) => self.destroy_plugin_by_id(id),
            None => false,
        }
    }

    fn destroy_plugin_by_id(&mut self, id: PluginId) -> bool {
        let Some(entry) = self.take_plugin(id) else {
            return false;
        };
        match entry.plugin {
            Some(mut plugin) => plugin.run_clear(),
            None => {
                self.retired_plugins.insert(id, true);
            }
        }
        true
    }

    fn take_plugin(&mut self, id: PluginId) -> Option<PluginEntry> {
        let entry = self.plugins.remove(id)?;
        self.plugin_index.remove(&entry.type_id);
        self.plugin_order.retain(|&p| p != id);
        log::debug!("Removed plugin {}", entry.type_name);
        Some(entry)
    }

    /// Whether a plugin of type `P` is present
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugin_index.contains_key(&TypeId::of::<P>())
    }

    /// The plugin of type `P`
    ///
    /// `None` if absent or while one of its hooks is running.
    pub fn plugin<P: Plugin>(&self) -> Option<&P> {
        let id = self.plugin_index.get(&TypeId::of::<P>())?;
        self.plugins.get(*id)?.get::<P>()
    }

    /// Mutable access to the plugin of type `P`
    pub fn plugin_mut<P: Plugin>(&mut self) -> Option<&mut P> {
        let id = *self.plugin_index.get(&TypeId::of::<P>())?;
        self.plugins.get_mut(id)?.get_mut::<P>()
    }

    /// Lifecycle state of the plugin of type `P`
    pub fn plugin_state<P: Plugin>(&self) -> Option<PluginState> {
        let id = self.plugin_index.get(&TypeId::of::<P>())?;
        self.plugins.get(*id).map(|entry| entry.state)
    }

    /// Number of plugins
    pub fn plugin_count(&self) -> usize {
        self.plugin_order.len()
    }

    /// Stable sort of the plugin registry by plugin order
    ///
    /// Each plugin's order is read again first.
    pub fn sort_plugins(&mut self) {
        for entry in self.plugins.values_mut() {
            entry.refresh_order();
        }
        let plugins = &self.plugins;
        self.plugin_order
            .sort_by_key(|id| plugins.get(*id).map_or(0, |entry| entry.order));
    }

    fn run_plugin(&mut self, id: PluginId, hook: Hook) {
        let Some(entry) = self.plugins.get_mut(id) else {
            return;
        };
        let Some(mut plugin) = entry.plugin.take() else {
            log::trace!("Plugin {} is already running", entry.type_name);
            return;
        };

        match hook {
            Hook::Init => plugin.run_init(self),
            Hook::Update => plugin.run_update(self),
        }

        if let Some(entry) = self.plugins.get_mut(id) {
            entry.plugin = Some(plugin);
            if hook == Hook::Init {
                entry.state = PluginState::Initialized;
            }
        } else if self.retired_plugins.remove(&id) == Some(true) {
            plugin.run_clear();
        }
    }

    // Events

    /// The scene's own event emitter
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Subscribe to an event published on the scene
    pub fn subscribe<F>(&mut self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut Scene, &Event) + 'static,
    {
        self.events.subscribe(event, handler)
    }

    /// Unsubscribe from the scene's emitter
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Publish an event on the scene's emitter
    ///
    /// Handlers run before this returns. Publishing an event from inside one
    /// of its own handlers, on the same emitter, queues it; it is delivered
    /// after the outermost publish has run its handlers.
    pub fn publish(&mut self, event: Event) {
        self.dispatch(Emitter::Scene, event);
    }

    /// Subscribe to an event published on an entity
    ///
    /// `None` if the entity does not exist.
    pub fn subscribe_entity<F>(
        &mut self,
        entity: EntityId,
        event: impl Into<String>,
        handler: F,
    ) -> Option<SubscriptionId>
    where
        F: FnMut(&mut Scene, &Event) + 'static,
    {
        Some(self.entities.get_mut(entity)?.events.subscribe(event, handler))
    }

    /// Unsubscribe from an entity's emitter
    pub fn unsubscribe_entity(&mut self, entity: EntityId, id: SubscriptionId) -> bool {
        self.entities
            .get_mut(entity)
            .is_some_and(|entity| entity.events.unsubscribe(id))
    }

    /// Publish an event on an entity's emitter
    pub fn publish_entity(&mut self, entity: EntityId, event: Event) {
        self.dispatch(Emitter::Entity(entity), event);
    }

    /// Subscribe to an event published on the plugin of type `P`
    ///
    /// `None` if no such plugin is present.
    pub fn subscribe_plugin<P: Plugin, F>(
        &mut self,
        event: impl Into<String>,
        handler: F,
    ) -> Option<SubscriptionId>
    where
        F: FnMut(&mut Scene, &Event) + 'static,
    {
        let id = *self.plugin_index.get(&TypeId::of::<P>())?;
        Some(self.plugins.get_mut(id)?.events.subscribe(event, handler))
    }

    /// Unsubscribe from a plugin's emitter
    pub fn unsubscribe_plugin<P: Plugin>(&mut self, id: SubscriptionId) -> bool {
        let Some(&plugin) = self.plugin_index.get(&TypeId::of::<P>()) else {
            return false;
        };
        self.plugins
            .get_mut(plugin)
            .is_some_and(|entry| entry.events.unsubscribe(id))
    }

    /// Publish an event on the emitter of the plugin of type `P`
    pub fn publish_plugin<P: Plugin>(&mut self, event: Event) {
        if let Some(&id) = self.plugin_index.get(&TypeId::of::<P>()) {
            self.dispatch(Emitter::Plugin(id), event);
        }
    }

    fn emitter_mut(&mut self, emitter: Emitter) -> Option<&mut EventEmitter> {
        match emitter {
            Emitter::Scene => Some(&mut self.events),
            Emitter::Entity(id) => self.entities.get_mut(id).map(|entity| &mut entity.events),
            Emitter::Plugin(id) => self.plugins.get_mut(id).map(|entry| &mut entry.events),
        }
    }

    /// Deliver an event, then anything queued while it was delivered
    fn dispatch(&mut self, emitter: Emitter, event: Event) {
        self.dispatch_one(emitter, event);
        if self.dispatch_depth > 0 {
            return;
        }
        while let Some((emitter, event)) = self.queued_events.pop_front() {
            self.dispatch_one(emitter, event);
        }
    }

    fn dispatch_one(&mut self, emitter: Emitter, mut event: Event) {
        event.source = Some(match emitter {
            Emitter::Scene => EventSource::Scene(self.id),
            Emitter::Entity(id) => EventSource::Entity(id),
            Emitter::Plugin(id) => match self.plugins.get(id) {
                Some(entry) => EventSource::Plugin(entry.type_name),
                None => return,
            },
        });

        if self
            .emitter_mut(emitter)
            .is_some_and(|events| events.is_dispatching(&event.name))
        {
            log::trace!("'{}' is already being published; queued", event.name);
            self.queued_events.push_back((emitter, event));
            return;
        }

        let Some(mut handlers) = self
            .emitter_mut(emitter)
            .and_then(|events| events.take(&event.name))
        else {
            return;
        };
        log::trace!("Publishing '{}' to {} handlers", event.name, handlers.len());
        self.dispatch_depth += 1;

        for (id, handler) in &mut handlers {
            // Emitter gone or handler unsubscribed mid-dispatch
            if self.emitter_mut(emitter).map_or(true, |events| events.is_cancelled(*id)) {
                continue;
            }
            handler(self, &event);
        }

        if let Some(events) = self.emitter_mut(emitter) {
            events.restore(&event.name, handlers);
        }
        self.dispatch_depth -= 1;
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("initialized", &self.initialized)
            .field("entities", &self.registered.len())
            .field("managers", &self.manager_order.len())
            .field("plugins", &self.plugin_order.len())
            .field("pending_add", &self.pending_add.len())
            .field("pending_remove", &self.pending_remove.len())
            .finish()
    }
}
