//! Arena key types
//!
//! The scene stores entities, components, component managers and plugins in
//! [`SlotMap`] arenas. Relations between them (parent, children, owner,
//! manager) are stored as these keys, never as references.

pub use slotmap::{SlotMap, Key};

slotmap::new_key_type! {
    /// Stable identifier of an entity
    pub struct EntityId;

    /// Stable identifier of a component instance
    pub struct ComponentId;

    /// Stable identifier of a component manager
    pub struct ManagerId;

    /// Stable identifier of a registered plugin
    pub struct PluginId;
}

/// Stable identifier of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u64);

impl SceneId {
    /// Allocate a process-unique scene id
    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}
