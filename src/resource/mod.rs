//! Resource binding interface
//!
//! The core consumes external resources through [`Proxy`] handles bound by a
//! [`ResourceManager`]. Proxies are indirect: republishing a resource swaps
//! the value behind every live proxy and raises its changed flag, which
//! consumers poll with `changed()`/`consume()` for hot reload. Asset I/O and
//! file formats are outside this crate; the manager is an in-memory registry.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of an external resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

/// Failure to bind a resource proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The resource has not been published.
    #[error("resource {0:?} is not published")]
    Unresolved(ResourceId),
    /// The resource is published under a different type.
    #[error("resource {0:?} is published as a different type")]
    WrongType(ResourceId),
}

/// Shared slot behind every proxy of one resource.
struct Slot<T> {
    value: RefCell<Rc<T>>,
    changed: Cell<bool>,
}

/// An indirect handle to an external resource of type `T`.
///
/// All proxies bound to the same [`ResourceId`] share one slot; republishing
/// the resource updates them all.
pub struct Proxy<T> {
    slot: Rc<Slot<T>>,
}

impl<T> Proxy<T> {
    /// The current resource value.
    #[must_use]
    pub fn get(&self) -> Rc<T> {
        Rc::clone(&self.slot.value.borrow())
    }

    /// Whether the resource has been republished since the last `consume`.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.slot.changed.get()
    }

    /// Acknowledge a pending change.
    pub fn consume(&self) {
        self.slot.changed.set(false);
    }
}

impl<T> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("value", &self.slot.value.borrow())
            .field("changed", &self.slot.changed.get())
            .finish()
    }
}

/// In-memory resource registry handing out [`Proxy`] bindings.
#[derive(Default)]
pub struct ResourceManager {
    entries: RefCell<FxHashMap<ResourceId, Rc<dyn Any>>>,
}

impl ResourceManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a resource value, resolving future binds and hot-reloading
    /// every live proxy of `id`.
    pub fn publish<T: 'static>(&self, id: ResourceId, value: T) {
        let mut entries = self.entries.borrow_mut();
        if let Some(existing) = entries.get(&id) {
            if let Ok(slot) = Rc::clone(existing).downcast::<Slot<T>>() {
                *slot.value.borrow_mut() = Rc::new(value);
                slot.changed.set(true);
                return;
            }
            warn!("resource {id:?} republished under a different type; rebinding");
        }
        entries.insert(
            id,
            Rc::new(Slot {
                value: RefCell::new(Rc::new(value)),
                changed: Cell::new(false),
            }),
        );
    }

    /// Remove a published resource. Live proxies keep their last value.
    pub fn revoke(&self, id: ResourceId) -> bool {
        self.entries.borrow_mut().remove(&id).is_some()
    }

    /// Bind a proxy to a published resource.
    ///
    /// # Errors
    ///
    /// [`BindError::Unresolved`] if `id` has never been published,
    /// [`BindError::WrongType`] if it is published under another type.
    pub fn bind<T: 'static>(&self, id: ResourceId) -> Result<Proxy<T>, BindError> {
        let entries = self.entries.borrow();
        let entry = entries.get(&id).ok_or(BindError::Unresolved(id))?;
        let slot = Rc::clone(entry)
            .downcast::<Slot<T>>()
            .map_err(|_| BindError::WrongType(id))?;
        Ok(Proxy { slot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_unpublished_fails() {
        let resources = ResourceManager::new();
        let result = resources.bind::<String>(ResourceId(1));
        assert_eq!(result.unwrap_err(), BindError::Unresolved(ResourceId(1)));
    }

    #[test]
    fn test_bind_wrong_type_fails() {
        let resources = ResourceManager::new();
        resources.publish(ResourceId(2), 42_u32);
        let result = resources.bind::<String>(ResourceId(2));
        assert_eq!(result.unwrap_err(), BindError::WrongType(ResourceId(2)));
    }

    #[test]
    fn test_publish_and_bind() {
        let resources = ResourceManager::new();
        resources.publish(ResourceId(3), "hello".to_string());
        let proxy = resources.bind::<String>(ResourceId(3)).unwrap();
        assert_eq!(*proxy.get(), "hello");
        assert!(!proxy.changed());
    }

    #[test]
    fn test_hot_reload_flags_all_proxies() {
        let resources = ResourceManager::new();
        resources.publish(ResourceId(4), 1_i32);
        let first = resources.bind::<i32>(ResourceId(4)).unwrap();
        let second = resources.bind::<i32>(ResourceId(4)).unwrap();

        resources.publish(ResourceId(4), 2_i32);
        assert!(first.changed());
        assert!(second.changed());
        assert_eq!(*first.get(), 2);

        first.consume();
        assert!(!first.changed());
        // Shared slot: consuming on one proxy acknowledges for the binding
        assert!(!second.changed());
    }

    #[test]
    fn test_revoke_keeps_live_proxies() {
        let resources = ResourceManager::new();
        resources.publish(ResourceId(5), "kept".to_string());
        let proxy = resources.bind::<String>(ResourceId(5)).unwrap();

        assert!(resources.revoke(ResourceId(5)));
        assert!(!resources.revoke(ResourceId(5)));
        assert_eq!(*proxy.get(), "kept");
        assert!(resources.bind::<String>(ResourceId(5)).is_err());
    }
}
