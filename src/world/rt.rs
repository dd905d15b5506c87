//! Ray-tracing world component
//!
//! Maintains the top-level acceleration structure over instances registered
//! by geometry owners. The component never owns bottom-level structures; it
//! holds weak references and drops instances whose geometry has gone away.
//! Rebuilds are deferred to the world update and only happen when the
//! instance set or a transform changed.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::warn;
use slotmap::SlotMap;

use crate::entity::{UpdateParams, WorldComponent};
use crate::math::Transform;
use crate::render::{BottomLevel, RenderError, RenderSystem, TlasInstance, TopLevel};

slotmap::new_key_type! {
    struct RtKey;
}

/// Instance capacity of a freshly created top level.
const INITIAL_CAPACITY: usize = 16;

struct RtRecord {
    blas: Weak<dyn BottomLevel>,
    transform: Transform,
}

struct RtState {
    records: SlotMap<RtKey, RtRecord>,
    top_level: Option<Rc<dyn TopLevel>>,
    dirty: bool,
}

/// Handle to one ray-traced instance. Dropping it removes the instance from
/// the top level at the next rebuild.
pub struct RtInstance {
    state: Rc<RefCell<RtState>>,
    key: RtKey,
}

impl RtInstance {
    /// Move the instance.
    pub fn set_transform(&self, transform: Transform) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.records.get_mut(self.key) {
            record.transform = transform;
            state.dirty = true;
        }
    }
}

impl Drop for RtInstance {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.records.remove(self.key).is_some() {
            state.dirty = true;
        }
    }
}

/// World component owning the ray-tracing top-level structure.
pub struct RtWorldComponent {
    render_system: Rc<dyn RenderSystem>,
    state: Rc<RefCell<RtState>>,
}

impl RtWorldComponent {
    /// Create with an empty instance set.
    #[must_use]
    pub fn new(render_system: Rc<dyn RenderSystem>) -> Self {
        Self {
            render_system,
            state: Rc::new(RefCell::new(RtState {
                records: SlotMap::with_key(),
                top_level: None,
                dirty: true,
            })),
        }
    }

    /// Register an instance of `blas`. The component keeps only a weak
    /// reference; the caller's ownership of the bottom level decides its
    /// lifetime.
    #[must_use]
    pub fn allocate_instance(&self, blas: &Rc<dyn BottomLevel>, transform: Transform) -> RtInstance {
        let mut state = self.state.borrow_mut();
        let key = state.records.insert(RtRecord {
            blas: Rc::downgrade(blas),
            transform,
        });
        state.dirty = true;
        RtInstance {
            state: Rc::clone(&self.state),
            key,
        }
    }

    /// Number of registered instances, live or not.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.state.borrow().records.len()
    }

    /// The top-level structure as of the last rebuild, for trace dispatches.
    #[must_use]
    pub fn top_level(&self) -> Option<Rc<dyn TopLevel>> {
        self.state.borrow().top_level.clone()
    }

    fn rebuild(&self) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();

        let mut instances = Vec::with_capacity(state.records.len());
        let mut dead = Vec::new();
        for (key, record) in &state.records {
            match record.blas.upgrade() {
                Some(blas) => instances.push(TlasInstance {
                    transform: record.transform.matrix().to_cols_array_2d(),
                    blas: blas.native_handle(),
                }),
                None => dead.push(key),
            }
        }
        for key in dead {
            warn!("dropping ray-traced instance whose bottom level was released");
            state.records.remove(key);
        }

        let needs_capacity = instances.len();
        let has_capacity = state
            .top_level
            .as_ref()
            .is_some_and(|top| top.capacity() >= needs_capacity);
        if !has_capacity {
            let capacity = needs_capacity.next_power_of_two().max(INITIAL_CAPACITY);
            state.top_level = Some(self.render_system.create_top_level(capacity)?);
        }

        if let Some(top) = &state.top_level {
            top.write_instances(&instances);
        }
        state.dirty = false;
        Ok(())
    }
}

impl WorldComponent for RtWorldComponent {
    fn update(&mut self, _update: &UpdateParams) {
        if self.state.borrow().dirty {
            if let Err(error) = self.rebuild() {
                // Keep the dirty flag; the rebuild is retried next update.
                warn!("top level rebuild failed, retrying next frame: {error}");
            }
        }
    }

    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.records.is_empty() {
            warn!(
                "ray-tracing component destroyed with {} live instances",
                state.records.len()
            );
        }
        state.top_level = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
