//! Entity implementation
//!
//! An [`Entity`] is a node in the scene hierarchy. Nodes live in the scene's
//! arena whether or not they are registered; registration is what makes
//! [`Entity::scene`] present and puts the entity's components under their
//! managers. Structural operations live on [`Scene`] because every one of
//! them can cascade into the scene's indices.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::{AnyComponent, ComponentSlot};
use super::{Component, Scene, SceneError};
use crate::events::EventEmitter;
use crate::foundation::collections::{ComponentId, EntityId, ManagerId, SceneId};

/// Hierarchy node carrying components
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    tag: String,
    depth: usize,
    pub(crate) scene: Option<SceneId>,
    root: EntityId,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    components: Vec<ComponentId>,
    component_index: HashMap<TypeId, ComponentId>,
    pub(crate) events: EventEmitter,
}

impl Entity {
    fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            tag: String::new(),
            depth: 0,
            scene: None,
            root: id,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            component_index: HashMap::new(),
            events: EventEmitter::new(),
        }
    }

    /// Get the entity ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Entity name, empty when unnamed
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the entity has a non-empty name
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    /// Free-form tag, empty when untagged
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether a tag is set
    pub fn has_tag(&self) -> bool {
        !self.tag.is_empty()
    }

    /// Exact tag match
    pub fn compare_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Distance from the root of the entity's subtree
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Scene the entity is registered in
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Whether the entity is registered in a scene
    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    /// Topmost ancestor, or the entity itself
    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Parent entity
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Whether the entity has a parent
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Children in insertion order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Whether `child` is a direct child
    pub fn has_child(&self, child: EntityId) -> bool {
        self.children.contains(&child)
    }

    /// Attached components in attach order
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Whether a component of type `C` is attached
    pub fn has_component<C: Component>(&self) -> bool {
        self.component_index.contains_key(&TypeId::of::<C>())
    }

    /// Id of the attached component of type `C`
    pub fn component_id<C: Component>(&self) -> Option<ComponentId> {
        self.component_index.get(&TypeId::of::<C>()).copied()
    }

    /// The entity's event emitter
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }
}

impl Scene {
    /// Create an unnamed, detached entity
    pub fn spawn(&mut self) -> EntityId {
        self.spawn_named("")
    }

    /// Create a named, detached entity
    ///
    /// The entity lives in this scene's arena but is not registered until it
    /// is passed to [`add_entity`](Self::add_entity) or parented under a
    /// registered entity.
    pub fn spawn_named(&mut self, name: impl Into<String>) -> EntityId {
        let name = name.into();
        self.entities.insert_with_key(|id| Entity::new(id, name))
    }

    /// Any entity in the arena, registered or not
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Whether the id refers to a live (not destroyed) entity
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Set or clear (with an empty string) an entity's tag
    pub fn set_tag(&mut self, id: EntityId, tag: impl Into<String>) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.tag = tag.into();
        }
    }

    /// Make `child` the last child of `parent`
    ///
    /// Detaches `child` from its previous parent first. Depth and root are
    /// recomputed for the whole moved subtree. If `parent` is registered,
    /// the subtree is registered too (deferred once the scene is
    /// initialized). Adding an existing child is a no-op.
    ///
    /// # Errors
    ///
    /// [`SceneError::CyclicHierarchy`] if `child` is `parent` or one of its
    /// ancestors.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), SceneError> {
        if parent == child || self.is_ancestor(child, parent) {
            log::warn!("Rejected parenting {:?} under {:?}: would create a cycle", child, parent);
            return Err(SceneError::CyclicHierarchy { parent, child });
        }
        let Some(node) = self.entities.get(parent) else {
            log::trace!("add_child on missing parent {:?}", parent);
            return Ok(());
        };
        if node.has_child(child) || !self.entities.contains_key(child) {
            return Ok(());
        }

        self.detach(child);

        let Some(node) = self.entities.get_mut(parent) else {
            return Ok(());
        };
        node.children.push(child);
        let (root, depth, registered) = (node.root, node.depth + 1, node.scene.is_some());

        if let Some(child_node) = self.entities.get_mut(child) {
            child_node.parent = Some(parent);
        }
        self.reroot(child, depth, root);

        if registered {
            self.add_entity(child);
        }
        Ok(())
    }

    /// Remove `child` from `parent`'s children
    ///
    /// The child becomes the root of its own subtree at depth 0. If `parent`
    /// is registered, the child's subtree is unregistered (deferred once the
    /// scene is initialized). No-op if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) {
        let Some(node) = self.entities.get_mut(parent) else {
            return;
        };
        let Some(index) = node.children.iter().position(|&c| c == child) else {
            return;
        };
        node.children.remove(index);
        let registered = node.scene.is_some();

        if let Some(child_node) = self.entities.get_mut(child) {
            child_node.parent = None;
        }
        self.reroot(child, 0, child);

        if registered {
            self.remove_entity(child);
        }
    }

    /// Remove an entity from its parent, if it has one
    pub fn detach(&mut self, id: EntityId) {
        if let Some(parent) = self.entities.get(id).and_then(Entity::parent) {
            self.remove_child(parent, id);
        }
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = self.entities.get(id).and_then(Entity::parent);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.entities.get(node).and_then(Entity::parent);
        }
        false
    }

    /// Set depth and root for `id` and everything below it
    fn reroot(&mut self, id: EntityId, depth: usize, root: EntityId) {
        let mut stack = vec![(id, depth)];
        while let Some((id, depth)) = stack.pop() {
            if let Some(node) = self.entities.get_mut(id) {
                node.depth = depth;
                node.root = root;
                stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
    }

    /// Attach a component to an entity
    ///
    /// Returns `None`, dropping `component`, if the entity already has a
    /// component of type `C` or does not exist. If the entity is registered
    /// the component goes straight to its manager.
    pub fn add_component<C: Component>(&mut self, id: EntityId, component: C) -> Option<ComponentId> {
        let entity = self.entities.get(id)?;
        if entity.has_component::<C>() {
            log::trace!(
                "Entity {:?} already has a {}",
                id,
                std::any::type_name::<C>()
            );
            return None;
        }

        let component_id = self.components.insert(ComponentSlot::new(id, component));
        let registered = if let Some(entity) = self.entities.get_mut(id) {
            entity.components.push(component_id);
            entity.component_index.insert(TypeId::of::<C>(), component_id);
            entity.scene.is_some()
        } else {
            false
        };

        if registered {
            self.register_component(component_id);
        }
        Some(component_id)
    }

    /// Detach the component of type `C` and hand it back
    ///
    /// The component leaves its manager first. Returns `None` if no such
    /// component is attached, or if it is detached from inside its own hook
    /// (it is dropped once the hook returns).
    pub fn remove_component<C: Component>(&mut self, id: EntityId) -> Option<C> {
        let component_id = self.entities.get(id)?.component_id::<C>()?;
        let instance = self.detach_component(component_id, false)?;
        instance.into_any().downcast::<C>().ok().map(|boxed| *boxed)
    }

    /// Detach the component of type `C`, run its clear hook and drop it
    ///
    /// Returns false if no such component was attached.
    pub fn destroy_component<C: Component>(&mut self, id: EntityId) -> bool {
        let Some(component_id) = self.entities.get(id).and_then(Entity::component_id::<C>) else {
            return false;
        };
        self.detach_component(component_id, true);
        true
    }

    /// Whether the entity has a component of type `C`
    pub fn has_component<C: Component>(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(Entity::has_component::<C>)
    }

    /// Borrow the entity's component of type `C`
    ///
    /// `None` while that component's own hook is running.
    pub fn component<C: Component>(&self, id: EntityId) -> Option<&C> {
        let component_id = self.entities.get(id)?.component_id::<C>()?;
        self.components.get(component_id)?.get::<C>()
    }

    /// Mutably borrow the entity's component of type `C`
    pub fn component_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        let component_id = self.entities.get(id)?.component_id::<C>()?;
        self.components.get_mut(component_id)?.get_mut::<C>()
    }

    /// Borrow a component by id
    pub fn component_by_id<C: Component>(&self, id: ComponentId) -> Option<&C> {
        self.components.get(id)?.get::<C>()
    }

    /// Mutably borrow a component by id
    pub fn component_by_id_mut<C: Component>(&mut self, id: ComponentId) -> Option<&mut C> {
        self.components.get_mut(id)?.get_mut::<C>()
    }

    /// Entity a component is attached to; `None` once detached
    pub fn component_owner(&self, id: ComponentId) -> Option<EntityId> {
        self.components.get(id).map(|slot| slot.owner)
    }

    /// Manager a component is registered with
    pub fn component_manager_of(&self, id: ComponentId) -> Option<ManagerId> {
        self.components.get(id)?.manager
    }

    /// Take a component out of the arena
    ///
    /// Unregisters it, unlinks it from its owner and frees the slot. When
    /// `destroy` is set the clear hook runs. If the component is mid-hook
    /// the instance is not here; it is retired and dealt with when the hook
    /// returns.
    pub(crate) fn detach_component(
        &mut self,
        id: ComponentId,
        destroy: bool,
    ) -> Option<Box<dyn AnyComponent>> {
        let slot = self.components.get(id)?;
        let (owner, type_id, registered) = (slot.owner, slot.type_id, slot.manager.is_some());

        if registered {
            self.unregister_component(id);
        }
        if let Some(entity) = self.entities.get_mut(owner) {
            entity.components.retain(|&c| c != id);
            entity.component_index.remove(&type_id);
        }

        let slot = self.components.remove(id)?;
        log::trace!("Detached {} from {:?}", slot.type_name, owner);
        if let Some(mut instance) = slot.instance {
            if destroy {
                instance.run_clear();
            }
            Some(instance)
        } else {
            self.retired_components.insert(id, destroy);
            None
        }
    }

    /// Destroy an entity, its components and its whole subtree
    ///
    /// Detaches from the parent, then for every node of the subtree destroys
    /// its components (last first) before its children (last first, over a
    /// snapshot). Each node is unregistered and its arena slot freed after
    /// its children. The id is stale afterwards.
    pub fn destroy_entity(&mut self, id: EntityId) {
        if !self.entities.contains_key(id) {
            return;
        }
        self.detach(id);

        // (entity, children already pushed)
        let mut stack = vec![(id, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                self.remove_entity_now(id);
                self.pending_add.retain(|&e| e != id);
                self.pending_remove.retain(|&e| e != id);
                if let Some(entity) = self.entities.remove(id) {
                    log::debug!("Destroyed entity {:?} '{}'", id, entity.name);
                }
                continue;
            }

            let Some((components, children)) = self
                .entities
                .get(id)
                .map(|entity| (entity.components.clone(), entity.children.clone()))
            else {
                continue;
            };
            for &component in components.iter().rev() {
                self.detach_component(component, true);
            }
            stack.push((id, true));
            stack.extend(children.into_iter().map(|child| (child, false)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::DefaultManager;

    struct Marker(u32);

    impl Component for Marker {
        type Manager = DefaultManager<Self>;
    }

    struct Other;

    impl Component for Other {
        type Manager = DefaultManager<Self>;
    }

    #[test]
    fn test_spawned_entity_is_its_own_root() {
        let mut scene = Scene::new("test");
        let e = scene.spawn_named("player");
        let entity = scene.entity(e).unwrap();

        assert_eq!(entity.id(), e);
        assert_eq!(entity.root(), e);
        assert_eq!(entity.depth(), 0);
        assert!(entity.has_name());
        assert!(!entity.has_parent());
        assert!(!entity.has_scene());
    }

    #[test]
    fn test_tags() {
        let mut scene = Scene::new("test");
        let e = scene.spawn();
        assert!(!scene.entity(e).unwrap().has_tag());

        scene.set_tag(e, "enemy");
        let entity = scene.entity(e).unwrap();
        assert!(entity.has_tag());
        assert!(entity.compare_tag("enemy"));
        assert!(!entity.compare_tag("Enemy"));
        assert_eq!(entity.tag(), "enemy");
    }

    #[test]
    fn test_add_child_propagates_depth_and_root() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        let c = scene.spawn();
        let d = scene.spawn();

        // Build b -> c -> d first, then hang it under a
        scene.add_child(b, c).unwrap();
        scene.add_child(c, d).unwrap();
        assert_eq!(scene.entity(d).unwrap().depth(), 2);
        assert_eq!(scene.entity(d).unwrap().root(), b);

        scene.add_child(a, b).unwrap();
        for (id, depth) in [(a, 0), (b, 1), (c, 2), (d, 3)] {
            let node = scene.entity(id).unwrap();
            assert_eq!(node.depth(), depth);
            assert_eq!(node.root(), a);
        }
        assert_eq!(scene.entity(b).unwrap().parent(), Some(a));
    }

    #[test]
    fn test_remove_child_resets_subtree() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        let c = scene.spawn();
        scene.add_child(a, b).unwrap();
        scene.add_child(b, c).unwrap();

        scene.remove_child(a, b);
        assert!(!scene.entity(a).unwrap().has_child(b));
        let b_node = scene.entity(b).unwrap();
        assert_eq!(b_node.depth(), 0);
        assert_eq!(b_node.root(), b);
        assert_eq!(b_node.parent(), None);
        let c_node = scene.entity(c).unwrap();
        assert_eq!(c_node.depth(), 1);
        assert_eq!(c_node.root(), b);

        // Not a child any more: no-op
        scene.remove_child(a, b);
        assert_eq!(scene.entity(b).unwrap().depth(), 0);
    }

    #[test]
    fn test_add_child_twice_keeps_one_entry() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        scene.add_child(a, b).unwrap();
        scene.add_child(a, b).unwrap();
        assert_eq!(scene.entity(a).unwrap().children(), &[b]);
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        let c = scene.spawn();
        scene.add_child(a, c).unwrap();
        scene.add_child(b, c).unwrap();

        assert!(scene.entity(a).unwrap().children().is_empty());
        assert_eq!(scene.entity(c).unwrap().parent(), Some(b));
        assert_eq!(scene.entity(c).unwrap().root(), b);
    }

    #[test]
    fn test_detach() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        scene.add_child(a, b).unwrap();

        scene.detach(b);
        assert!(!scene.entity(b).unwrap().has_parent());
        // Detaching a top-level entity does nothing
        scene.detach(a);
        assert_eq!(scene.entity(a).unwrap().depth(), 0);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        let c = scene.spawn();
        scene.add_child(a, b).unwrap();
        scene.add_child(b, c).unwrap();

        assert!(matches!(
            scene.add_child(c, a),
            Err(SceneError::CyclicHierarchy { .. })
        ));
        assert!(scene.add_child(a, a).is_err());
        // Hierarchy untouched
        assert_eq!(scene.entity(a).unwrap().parent(), None);
        assert_eq!(scene.entity(c).unwrap().depth(), 2);
    }

    #[test]
    fn test_component_type_is_unique_per_entity() {
        let mut scene = Scene::new("test");
        let e = scene.spawn();

        assert!(scene.add_component(e, Marker(1)).is_some());
        assert!(scene.add_component(e, Marker(2)).is_none());
        assert!(scene.add_component(e, Other).is_some());

        let entity = scene.entity(e).unwrap();
        assert_eq!(entity.components().len(), 2);
        assert_eq!(scene.component::<Marker>(e).map(|m| m.0), Some(1));
    }

    #[test]
    fn test_remove_component_hands_it_back() {
        let mut scene = Scene::new("test");
        let e = scene.spawn();
        let id = scene.add_component(e, Marker(9)).unwrap();
        assert_eq!(scene.component_owner(id), Some(e));

        let removed = scene.remove_component::<Marker>(e);
        assert_eq!(removed.map(|m| m.0), Some(9));
        assert!(!scene.has_component::<Marker>(e));
        assert_eq!(scene.component_owner(id), None);

        // Absent: no-op
        assert!(scene.remove_component::<Marker>(e).is_none());
        assert!(!scene.destroy_component::<Marker>(e));
    }

    #[test]
    fn test_component_mut() {
        let mut scene = Scene::new("test");
        let e = scene.spawn();
        scene.add_component(e, Marker(1));

        if let Some(marker) = scene.component_mut::<Marker>(e) {
            marker.0 = 42;
        }
        assert_eq!(scene.component::<Marker>(e).map(|m| m.0), Some(42));
        assert!(scene.component::<Other>(e).is_none());
    }

    #[test]
    fn test_destroy_entity_frees_subtree() {
        let mut scene = Scene::new("test");
        let a = scene.spawn();
        let b = scene.spawn();
        let c = scene.spawn();
        let parent = scene.spawn();
        scene.add_child(parent, a).unwrap();
        scene.add_child(a, b).unwrap();
        scene.add_child(a, c).unwrap();
        let component = scene.add_component(b, Marker(0)).unwrap();

        scene.destroy_entity(a);

        for id in [a, b, c] {
            assert!(!scene.contains_entity(id));
        }
        assert!(scene.component_owner(component).is_none());
        assert!(scene.entity(parent).unwrap().children().is_empty());

        // Stale id: no-op
        scene.destroy_entity(a);
    }
}
