//! Component managers
//!
//! A manager batches every component of one type within a scene. The scene
//! owns the container side ([`ManagerEntry`]: membership, order, sorting);
//! the [`ComponentManager`] trait is the behaviour side that decides how the
//! batch is initialized and updated.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use slotmap::SlotMap;

use super::component::ComponentSlot;
use super::Scene;
use crate::foundation::collections::{ComponentId, ManagerId, SceneId};

/// Batch behaviour for one component type
///
/// The default hooks run the matching component hook for every member in
/// the manager's current order. Override them to add per-batch work, or to
/// replace per-component dispatch entirely.
pub trait ComponentManager: Any {
    /// Execution priority relative to other managers, lower runs first
    ///
    /// Read again every time the scene sorts its managers.
    fn order(&self) -> i32 {
        0
    }

    /// Initialize the batch; `components` is a snapshot of the members
    fn init(&mut self, scene: &mut Scene, components: &[ComponentId]) {
        for &id in components {
            scene.init_component(id);
        }
    }

    /// Update the batch; `components` is a snapshot of the members
    fn update(&mut self, scene: &mut Scene, components: &[ComponentId]) {
        for &id in components {
            scene.update_component(id);
        }
    }
}

/// Stock manager, one instance per component type `C`
pub struct DefaultManager<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C> Default for DefaultManager<C> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<C: 'static> ComponentManager for DefaultManager<C> {}

/// Object-safe view of a [`ComponentManager`]
pub(crate) trait AnyManager {
    fn run_order(&self) -> i32;
    fn run_init(&mut self, scene: &mut Scene, components: &[ComponentId]);
    fn run_update(&mut self, scene: &mut Scene, components: &[ComponentId]);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: ComponentManager> AnyManager for M {
    fn run_order(&self) -> i32 {
        ComponentManager::order(self)
    }

    fn run_init(&mut self, scene: &mut Scene, components: &[ComponentId]) {
        ComponentManager::init(self, scene, components);
    }

    fn run_update(&mut self, scene: &mut Scene, components: &[ComponentId]) {
        ComponentManager::update(self, scene, components);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry entry for one manager: the ordered member list plus the boxed
/// behaviour
pub struct ManagerEntry {
    id: ManagerId,
    scene: SceneId,
    manager_type: TypeId,
    order: i32,
    initialized: bool,
    components: Vec<ComponentId>,
    /// Taken out while one of its hooks runs
    pub(crate) manager: Option<Box<dyn AnyManager>>,
}

impl ManagerEntry {
    pub(crate) fn new(
        id: ManagerId,
        scene: SceneId,
        manager_type: TypeId,
        manager: Box<dyn AnyManager>,
    ) -> Self {
        Self {
            id,
            scene,
            manager_type,
            order: manager.run_order(),
            initialized: false,
            components: Vec::new(),
            manager: Some(manager),
        }
    }

    /// Arena id of this manager
    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// Scene the manager is bound to
    ///
    /// A manager leaves the registry as soon as it is empty, so a live entry
    /// is always bound.
    pub fn scene(&self) -> SceneId {
        self.scene
    }

    /// Execution priority as of the last registry sort
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Whether the manager's init hook has started
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `TypeId` of the concrete manager type
    pub fn manager_type(&self) -> TypeId {
        self.manager_type
    }

    /// Members in current order
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True once the last member has left; the scene then drops the manager
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Membership test by component id
    pub fn has_component(&self, id: ComponentId) -> bool {
        self.components.contains(&id)
    }

    /// Whether one of the manager's hooks is currently executing
    pub fn is_running(&self) -> bool {
        self.manager.is_none()
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Re-read the order from the manager; kept as is while it is running
    pub(crate) fn refresh_order(&mut self) {
        if let Some(manager) = self.manager.as_deref() {
            self.order = manager.run_order();
        }
    }

    pub(crate) fn add_component(&mut self, id: ComponentId) -> bool {
        if self.has_component(id) {
            return false;
        }
        self.components.push(id);
        true
    }

    pub(crate) fn remove_component(&mut self, id: ComponentId) -> bool {
        let before = self.components.len();
        self.components.retain(|&c| c != id);
        self.components.len() != before
    }

    /// Stable sort of the members by their declared relative order
    ///
    /// Members whose hook is running cannot be compared; they keep their
    /// position and the rest are sorted around them.
    pub(crate) fn sort(&mut self, arena: &SlotMap<ComponentId, ComponentSlot>) {
        let positions: Vec<usize> = self
            .components
            .iter()
            .enumerate()
            .filter(|(_, id)| arena.get(**id).is_some_and(|slot| slot.instance.is_some()))
            .map(|(index, _)| index)
            .collect();

        let mut sortable: Vec<ComponentId> = positions.iter().map(|&i| self.components[i]).collect();
        sortable.sort_by(|a, b| {
            match (
                arena.get(*a).and_then(|slot| slot.instance.as_deref()),
                arena.get(*b).and_then(|slot| slot.instance.as_deref()),
            ) {
                (Some(a), Some(b)) => a.compare(b),
                _ => std::cmp::Ordering::Equal,
            }
        });

        for (position, id) in positions.into_iter().zip(sortable) {
            self.components[position] = id;
        }
    }
}

impl std::fmt::Debug for ManagerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerEntry")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("initialized", &self.initialized)
            .field("components", &self.components.len())
            .field("running", &self.is_running())
            .finish()
    }
}
