//! Scene-level tests
//!
//! Scenarios that exercise several parts of the scene at once: registration
//! through the hierarchy, the init/update protocol, deferred mutation and
//! hooks that mutate the scene while they run.

mod hierarchy;

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::{Component, ComponentManager, Scene};
use crate::foundation::collections::{ComponentId, EntityId};

/// Shared, ordered record of hook calls
#[derive(Clone, Default)]
pub(super) struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub(super) fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub(super) fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub(super) fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }

    pub(super) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Component that records its hooks, batched by [`TracerManager`]
pub(super) struct Tracer {
    pub(super) label: &'static str,
    pub(super) journal: Journal,
}

impl Tracer {
    pub(super) fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: journal.clone(),
        }
    }
}

impl Component for Tracer {
    type Manager = TracerManager;

    fn init(&mut self, _scene: &mut Scene, _owner: EntityId) {
        self.journal.push(format!("init {}", self.label));
    }

    fn update(&mut self, _scene: &mut Scene, _owner: EntityId) {
        self.journal.push(format!("update {}", self.label));
    }

    fn clear(&mut self) {
        self.journal.push(format!("clear {}", self.label));
    }
}

/// Manager for [`Tracer`] that remembers whether its hooks ran
#[derive(Default)]
pub(super) struct TracerManager {
    pub(super) init_calls: usize,
    pub(super) update_calls: usize,
}

impl ComponentManager for TracerManager {
    fn order(&self) -> i32 {
        1
    }

    fn init(&mut self, scene: &mut Scene, components: &[ComponentId]) {
        self.init_calls += 1;
        for &id in components {
            scene.init_component(id);
        }
    }

    fn update(&mut self, scene: &mut Scene, components: &[ComponentId]) {
        self.update_calls += 1;
        for &id in components {
            scene.update_component(id);
        }
    }
}
