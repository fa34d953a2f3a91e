//! Registration through the entity hierarchy

use super::{Journal, Tracer, TracerManager};
use crate::ecs::{Scene, SceneError};

#[test]
fn test_children_follow_parent_in_and_out_of_scene() {
    let mut scene = Scene::new("test");
    let parent = scene.spawn();
    let child = scene.spawn();

    scene.add_child(parent, child).unwrap();
    assert!(scene.entity(parent).unwrap().has_child(child));

    scene.add_entity(parent);
    assert!(scene.has_entity(parent));
    assert!(scene.has_entity(child));

    let node = scene.entity(child).unwrap();
    assert_eq!(scene.entity(parent).unwrap().depth(), 0);
    assert_eq!(node.depth(), 1);
    assert_eq!(node.root(), parent);
    assert_eq!(node.parent(), Some(parent));

    scene.remove_child(parent, child);
    assert!(scene.has_entity(parent));
    assert!(!scene.has_entity(child));
}

#[test]
fn test_child_added_to_registered_parent_is_registered() {
    let journal = Journal::default();
    let mut scene = Scene::new("test");
    let parent = scene.spawn();
    scene.add_entity(parent);

    let child = scene.spawn();
    let grandchild = scene.spawn_named("leaf");
    scene.add_child(child, grandchild).unwrap();
    scene.add_component(grandchild, Tracer::new("leaf", &journal));

    scene.add_child(parent, child).unwrap();
    assert!(scene.has_entity(child));
    assert!(scene.has_entity(grandchild));
    assert_eq!(scene.get_entity_by_name("leaf").map(|e| e.depth()), Some(2));
    assert_eq!(scene.manager_entry::<TracerManager>().map(|m| m.len()), Some(1));
}

#[test]
fn test_subtree_depth_and_root_propagate() {
    let mut scene = Scene::new("test");
    let chain: Vec<_> = (0..4).map(|_| scene.spawn()).collect();
    for pair in chain.windows(2) {
        scene.add_child(pair[0], pair[1]).unwrap();
    }
    let top = scene.spawn();
    scene.add_child(top, chain[0]).unwrap();

    for (depth, &id) in chain.iter().enumerate() {
        let node = scene.entity(id).unwrap();
        assert_eq!(node.depth(), depth + 1);
        assert_eq!(node.root(), top);
    }

    scene.remove_child(chain[1], chain[2]);
    assert_eq!(scene.entity(chain[2]).unwrap().root(), chain[2]);
    assert_eq!(scene.entity(chain[3]).unwrap().root(), chain[2]);
    assert_eq!(scene.entity(chain[3]).unwrap().depth(), 1);
}

#[test]
fn test_removing_last_component_drops_manager() {
    let journal = Journal::default();
    let mut scene = Scene::new("test");
    let e = scene.spawn();
    scene.add_component(e, Tracer::new("e", &journal));
    scene.add_entity(e);
    assert!(scene.has_component_manager::<TracerManager>());

    let tracer = scene.remove_component::<Tracer>(e);
    assert_eq!(tracer.map(|p| p.label), Some("e"));
    assert!(!scene.has_component_manager::<TracerManager>());
    assert!(scene.manager_entry::<TracerManager>().is_none());
    // Removal hands the component back without clearing it
    assert_eq!(journal.count("clear e"), 0);
}

#[test]
fn test_component_added_to_initialized_entity_is_initialized() {
    let journal = Journal::default();
    let mut scene = Scene::new("test");
    let e = scene.spawn();
    scene.add_entity(e);
    scene.init();

    scene.add_component(e, Tracer::new("late", &journal));
    assert_eq!(journal.entries(), vec!["init late"]);
    assert_eq!(scene.component_manager::<TracerManager>().unwrap().init_calls, 1);
}

#[test]
fn test_reparenting_after_init_survives_the_frame() {
    let mut scene = Scene::new("test");
    let a = scene.spawn();
    let b = scene.spawn();
    let c = scene.spawn();
    scene.add_entity(a);
    scene.add_entity(b);
    scene.add_child(a, c).unwrap();
    scene.init();

    scene.add_child(b, c).unwrap();
    scene.update();

    assert!(scene.has_entity(c));
    assert_eq!(scene.entity(c).unwrap().parent(), Some(b));
    assert!(scene.entity(a).unwrap().children().is_empty());
}

#[test]
fn test_cycles_leave_hierarchy_untouched() {
    let mut scene = Scene::new("test");
    let a = scene.spawn();
    let b = scene.spawn();
    scene.add_child(a, b).unwrap();
    scene.add_entity(a);

    let result = scene.add_child(b, a);
    assert_eq!(result, Err(SceneError::CyclicHierarchy { parent: b, child: a }));
    assert_eq!(scene.entity(a).unwrap().parent(), None);
    assert_eq!(scene.entity(b).unwrap().root(), a);
    assert_eq!(scene.entity_count(), 2);
}

#[test]
fn test_destroy_cascades_last_first() {
    let journal = Journal::default();
    let mut scene = Scene::new("test");
    let top = scene.spawn();
    let first = scene.spawn();
    let second = scene.spawn();
    scene.add_component(top, Tracer::new("top", &journal));
    scene.add_component(first, Tracer::new("first", &journal));
    scene.add_component(second, Tracer::new("second", &journal));
    scene.add_child(top, first).unwrap();
    scene.add_child(top, second).unwrap();
    scene.add_entity(top);
    scene.init();
    journal.clear();

    scene.destroy_entity(top);

    assert_eq!(journal.entries(), vec!["clear top", "clear second", "clear first"]);
    assert_eq!(scene.entity_count(), 0);
    assert!(!scene.has_component_manager::<TracerManager>());
    for id in [top, first, second] {
        assert!(!scene.contains_entity(id));
    }
}

#[test]
fn test_destroyed_entity_is_dropped_from_pending() {
    let mut scene = Scene::new("test");
    scene.init();
    let e = scene.spawn();
    scene.add_entity(e);
    assert!(scene.has_pending_changes());

    scene.destroy_entity(e);
    assert!(!scene.has_pending_changes());
    scene.update();
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn test_deep_chain_registers_and_destroys() {
    const DEPTH: usize = 10_000;
    let mut scene = Scene::new("test");
    let top = scene.spawn();
    let mut leaf = top;
    for _ in 1..DEPTH {
        let next = scene.spawn();
        scene.add_child(leaf, next).unwrap();
        leaf = next;
    }
    assert_eq!(scene.entity(leaf).map(|e| e.depth()), Some(DEPTH - 1));
    assert_eq!(scene.entity(leaf).map(|e| e.root()), Some(top));

    scene.add_entity(top);
    assert_eq!(scene.entity_count(), DEPTH);
    assert!(scene.has_entity(leaf));
    assert_eq!(scene.entities().first(), Some(&top));
    assert_eq!(scene.entities().last(), Some(&leaf));

    scene.remove_entity(top);
    assert_eq!(scene.entity_count(), 0);
    assert!(!scene.has_entity(leaf));

    scene.destroy_entity(top);
    assert!(!scene.contains_entity(top));
    assert!(!scene.contains_entity(leaf));
}

#[test]
fn test_destroy_finishes_each_subtree_before_its_sibling() {
    let journal = Journal::default();
    let mut scene = Scene::new("test");
    let top = scene.spawn();
    let first = scene.spawn();
    let second = scene.spawn();
    let nested = scene.spawn();
    scene.add_child(top, first).unwrap();
    scene.add_child(top, second).unwrap();
    scene.add_child(first, nested).unwrap();
    scene.add_component(top, Tracer::new("top", &journal));
    scene.add_component(first, Tracer::new("first", &journal));
    scene.add_component(second, Tracer::new("second", &journal));
    scene.add_component(nested, Tracer::new("nested", &journal));
    scene.add_entity(top);

    scene.destroy_entity(top);

    assert_eq!(
        journal.entries(),
        vec!["clear top", "clear second", "clear first", "clear nested"]
    );
    assert_eq!(scene.entity_count(), 0);
    assert!(!scene.has_component_manager::<TracerManager>());
}
