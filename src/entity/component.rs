//! Component contracts for entities and the world

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::math::{Aabb3, Transform};

/// Global counter for generating unique entity IDs
static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Non-owning identity of an entity.
///
/// Components keep this instead of a reference to their owner, so a released
/// entity can never be dereferenced through a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate the next unique ID.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Entity state flags broadcast to components and used by gather filters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityState: u32 {
        /// Entity participates in rendering
        const VISIBLE = 1 << 0;
        /// Entity may move at runtime
        const DYNAMIC = 1 << 1;
        /// Entity is locked against editing
        const LOCKED = 1 << 2;
    }
}

impl Default for EntityState {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// Per-tick timing passed to component updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateParams {
    /// Total time since world creation, in seconds
    pub total_time: f32,
    /// Time since the previous update, in seconds
    pub delta_time: f32,
}

/// Behavior attached to a single entity.
///
/// Lifecycle contract:
/// - `set_owner` is called exactly once when the owning entity takes the
///   component.
/// - `set_transform` and `update` are invoked once per tick in ordinal order;
///   the previous owner transform is passed alongside the new one so
///   components deriving relative state never observe a half-updated owner.
/// - `destroy` releases owned resources exactly once.
pub trait EntityComponent: Any {
    /// Called once when the owning entity takes ownership.
    fn set_owner(&mut self, owner: EntityId) {
        let _ = owner;
    }

    /// Release owned resources. Called exactly once by the owning entity.
    fn destroy(&mut self) {}

    /// Explicit processing-order priority within the entity; lower runs
    /// first. Not creation order.
    fn ordinal(&self) -> i32 {
        0
    }

    /// The owner's transform changed from `old` to `new`.
    fn set_transform(&mut self, old: &Transform, new: &Transform) {
        let _ = (old, new);
    }

    /// The owner's state flags changed.
    fn set_state(&mut self, state: EntityState) {
        let _ = state;
    }

    /// Per-tick update, invoked in ordinal order.
    fn update(&mut self, update: &UpdateParams) {
        let _ = update;
    }

    /// Component bounds in entity-local space; [`Aabb3::EMPTY`] if unbounded
    /// or not spatial.
    fn bounding_box(&self) -> Aabb3 {
        Aabb3::EMPTY
    }

    /// Downcast support for renderer dispatch.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl std::fmt::Debug for dyn EntityComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn EntityComponent")
    }
}

/// Behavior scoped to the whole world rather than one entity.
pub trait WorldComponent: Any {
    /// Release owned resources. Called exactly once by the world.
    fn destroy(&mut self) {}

    /// Per-tick update.
    fn update(&mut self, update: &UpdateParams) {
        let _ = update;
    }

    /// Downcast support for renderer dispatch and gather side channels.
    fn as_any(&self) -> &dyn Any;
}
