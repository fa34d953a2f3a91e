//! Component trait and implementations

use std::any::{Any, TypeId};
use std::cmp::Ordering;

use super::component_manager::{AnyManager, ComponentManager};
use super::Scene;
use crate::foundation::collections::{EntityId, ManagerId};

/// A typed unit of data and behaviour attached to at most one entity
///
/// Every component names the manager type that batches it. Components of
/// the same concrete type share one manager per scene, created the first
/// time such a component joins the scene.
///
/// ```
/// use scene_engine::prelude::*;
///
/// struct Health(u32);
///
/// impl Component for Health {
///     type Manager = DefaultManager<Self>;
///
///     fn update(&mut self, _scene: &mut Scene, _owner: EntityId) {
///         self.0 = self.0.saturating_sub(1);
///     }
/// }
/// ```
pub trait Component: Any {
    /// Manager that batches every component of this type within a scene
    type Manager: ComponentManager + Default;

    /// Called once, when the scene initializes or when the component joins
    /// an initialized scene
    fn init(&mut self, _scene: &mut Scene, _owner: EntityId) {}

    /// Called once per frame by the component's manager
    fn update(&mut self, _scene: &mut Scene, _owner: EntityId) {}

    /// Release whatever the component holds; called on destroy
    fn clear(&mut self) {}

    /// Relative order inside the manager; equal components keep their
    /// registration order
    fn cmp_order(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// Object-safe view of a [`Component`] used by the scene's arena
pub(crate) trait AnyComponent {
    fn run_init(&mut self, scene: &mut Scene, owner: EntityId);
    fn run_update(&mut self, scene: &mut Scene, owner: EntityId);
    fn run_clear(&mut self);
    fn compare(&self, other: &dyn AnyComponent) -> Ordering;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<C: Component> AnyComponent for C {
    fn run_init(&mut self, scene: &mut Scene, owner: EntityId) {
        Component::init(self, scene, owner);
    }

    fn run_update(&mut self, scene: &mut Scene, owner: EntityId) {
        Component::update(self, scene, owner);
    }

    fn run_clear(&mut self) {
        Component::clear(self);
    }

    fn compare(&self, other: &dyn AnyComponent) -> Ordering {
        other
            .as_any()
            .downcast_ref::<C>()
            .map_or(Ordering::Equal, |other| self.cmp_order(other))
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

fn make_manager<C: Component>() -> Box<dyn AnyManager> {
    Box::new(C::Manager::default())
}

/// Arena slot for one attached component
///
/// `instance` is `None` only while the component's own hook is running.
pub(crate) struct ComponentSlot {
    pub(crate) owner: EntityId,
    pub(crate) manager: Option<ManagerId>,
    pub(crate) instance: Option<Box<dyn AnyComponent>>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) manager_type: TypeId,
    pub(crate) make_manager: fn() -> Box<dyn AnyManager>,
}

impl ComponentSlot {
    pub(crate) fn new<C: Component>(owner: EntityId, component: C) -> Self {
        Self {
            owner,
            manager: None,
            instance: Some(Box::new(component)),
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            manager_type: TypeId::of::<C::Manager>(),
            make_manager: make_manager::<C>,
        }
    }

    pub(crate) fn get<C: Component>(&self) -> Option<&C> {
        self.instance.as_deref()?.as_any().downcast_ref::<C>()
    }

    pub(crate) fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.instance.as_deref_mut()?.as_any_mut().downcast_mut::<C>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component_manager::DefaultManager;

    struct Rank(i32);

    impl Component for Rank {
        type Manager = DefaultManager<Self>;

        fn cmp_order(&self, other: &Self) -> Ordering {
            self.0.cmp(&other.0)
        }
    }

    struct Plain;

    impl Component for Plain {
        type Manager = DefaultManager<Self>;
    }

    #[test]
    fn test_compare_uses_declared_order() {
        let low: Box<dyn AnyComponent> = Box::new(Rank(1));
        let high: Box<dyn AnyComponent> = Box::new(Rank(5));

        assert_eq!(low.compare(high.as_ref()), Ordering::Less);
        assert_eq!(high.compare(low.as_ref()), Ordering::Greater);
    }

    #[test]
    fn test_compare_defaults_to_equal() {
        let a: Box<dyn AnyComponent> = Box::new(Plain);
        let b: Box<dyn AnyComponent> = Box::new(Plain);
        let rank: Box<dyn AnyComponent> = Box::new(Rank(3));

        assert_eq!(a.compare(b.as_ref()), Ordering::Equal);
        // Different concrete types never order against each other
        assert_eq!(rank.compare(a.as_ref()), Ordering::Equal);
    }

    #[test]
    fn test_slot_records_manager_type() {
        let slot = ComponentSlot::new(EntityId::default(), Rank(2));

        assert_eq!(slot.type_id, TypeId::of::<Rank>());
        assert_eq!(slot.manager_type, TypeId::of::<DefaultManager<Rank>>());
        assert_ne!(slot.manager_type, TypeId::of::<DefaultManager<Plain>>());
        assert_eq!(slot.get::<Rank>().map(|r| r.0), Some(2));
        assert!(slot.get::<Plain>().is_none());
    }
}
