//! GPU-driven instance culling
//!
//! Owners register cullable geometry and receive [`CullingInstance`]
//! handles; dropping a handle releases its slot. The component keeps only a
//! weak reference to the geometry, so records whose [`Cullable`] was
//! released are dropped at the next build, the same way the ray-tracing
//! component sheds dead bottom levels. Every instance is mirrored on the
//! CPU and only dirty records are uploaded each frame, then the culling
//! compute pass is dispatched into one of two visibility buffers. The
//! buffers alternate every built frame so a frame can be consumed while the
//! next is being produced.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bytemuck::{Pod, Zeroable};
use log::warn;
use slotmap::SlotMap;

use crate::entity::WorldComponent;
use crate::math::{Aabb3, Transform};
use crate::render::{BufferUsage, CommandRecorder, GpuBuffer, RenderError, RenderSystem};

slotmap::new_key_type! {
    struct CullKey;
}

/// Culling threads per workgroup.
const GROUP_SIZE: u32 = 64;
/// Slot capacity of a freshly created component.
const INITIAL_CAPACITY: usize = 64;

/// Geometry registered for culling. The component holds only a weak
/// reference; the caller's ownership decides the geometry's lifetime, and
/// local bounds are sampled at upload time.
pub trait Cullable {
    /// Bounds of the geometry in its local space.
    fn local_bounds(&self) -> Aabb3;
}

/// GPU-side layout of one instance record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CullInstanceRecord {
    /// World transform, column-major
    pub transform: [[f32; 4]; 4],
    /// Minimum corner of the world-space bounds
    pub bounds_min: [f32; 3],
    /// Draw ordering key
    pub ordinal: u32,
    /// Maximum corner of the world-space bounds
    pub bounds_max: [f32; 3],
    /// Non-zero while the slot holds a live instance
    pub active: u32,
}

struct Record {
    cullable: Weak<dyn Cullable>,
    transform: Transform,
    ordinal: u32,
    dirty: bool,
}

impl Record {
    fn gpu(&self, local_bounds: Aabb3) -> CullInstanceRecord {
        let world_bounds = local_bounds.transformed(&self.transform);
        CullInstanceRecord {
            transform: self.transform.matrix().to_cols_array_2d(),
            bounds_min: world_bounds.min.to_array(),
            ordinal: self.ordinal,
            bounds_max: world_bounds.max.to_array(),
            active: 1,
        }
    }
}

struct CullingState {
    records: SlotMap<CullKey, Record>,
    /// Slots vacated since the last build; their GPU records must be zeroed
    retired: Vec<u32>,
    instances: Option<Rc<dyn GpuBuffer>>,
    visibility: [Option<Rc<dyn GpuBuffer>>; 2],
    capacity: usize,
    parity: usize,
    all_dirty: bool,
}

impl CullingState {
    fn slot(key: CullKey) -> u32 {
        // Low 32 bits of the slotmap key are the slot index.
        (slotmap::Key::data(&key).as_ffi() & 0xffff_ffff) as u32
    }

    fn slot_limit(&self) -> usize {
        self.records
            .keys()
            .map(|key| Self::slot(key) as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Drop records whose cullable was released, retiring their slots.
    fn shed_dead(&mut self) {
        let dead: Vec<CullKey> = self
            .records
            .iter()
            .filter(|(_, record)| record.cullable.strong_count() == 0)
            .map(|(key, _)| key)
            .collect();
        for key in dead {
            warn!("dropping culling instance whose geometry was released");
            self.records.remove(key);
            self.retired.push(Self::slot(key));
        }
    }
}

/// Handle to one registered instance. Dropping it releases the slot; the
/// owner never touches the component again for cleanup.
pub struct CullingInstance {
    state: Rc<RefCell<CullingState>>,
    key: CullKey,
}

impl CullingInstance {
    /// Move the instance. World bounds are re-derived from the cullable's
    /// local bounds at the next upload.
    pub fn set_transform(&self, transform: Transform) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.records.get_mut(self.key) {
            record.transform = transform;
            record.dirty = true;
        }
    }
}

impl Drop for CullingInstance {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.records.remove(self.key).is_some() {
            let slot = CullingState::slot(self.key);
            state.retired.push(slot);
        }
    }
}

/// World component performing GPU-driven culling of registered instances.
pub struct CullingComponent {
    render_system: Rc<dyn RenderSystem>,
    state: Rc<RefCell<CullingState>>,
}

impl CullingComponent {
    /// Create with no registered instances.
    #[must_use]
    pub fn new(render_system: Rc<dyn RenderSystem>) -> Self {
        Self {
            render_system,
            state: Rc::new(RefCell::new(CullingState {
                records: SlotMap::with_key(),
                retired: Vec::new(),
                instances: None,
                visibility: [None, None],
                capacity: 0,
                parity: 0,
                all_dirty: true,
            })),
        }
    }

    /// Register an instance of `cullable`. The returned handle keeps the
    /// slot alive; the component holds the geometry only weakly.
    #[must_use]
    pub fn allocate_instance(
        &self,
        cullable: &Rc<dyn Cullable>,
        transform: Transform,
        ordinal: u32,
    ) -> CullingInstance {
        let key = self.state.borrow_mut().records.insert(Record {
            cullable: Rc::downgrade(cullable),
            transform,
            ordinal,
            dirty: true,
        });
        CullingInstance {
            state: Rc::clone(&self.state),
            key,
        }
    }

    /// Number of live instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.state.borrow().records.len()
    }

    /// The GPU instance buffer as of the last build. Must be re-fetched
    /// every frame; growth replaces the buffer.
    #[must_use]
    pub fn instance_buffer(&self) -> Option<Rc<dyn GpuBuffer>> {
        self.state.borrow().instances.clone()
    }

    /// Visibility buffer for draw submission: the one written by the
    /// *previous* build, decoupling culling latency from submission. Must be
    /// re-fetched every frame.
    #[must_use]
    pub fn visibility_buffer(&self) -> Option<Rc<dyn GpuBuffer>> {
        let state = self.state.borrow();
        state.visibility[state.parity ^ 1].clone()
    }

    /// Upload dirty records and dispatch the culling pass into this frame's
    /// visibility buffer, leaving the previous frame's buffer readable for
    /// draw submission.
    ///
    /// # Errors
    ///
    /// [`RenderError`] when buffer growth fails; the frame's culling is
    /// skipped and retried on the next build, with CPU state intact.
    pub fn build(&self, recorder: &mut dyn CommandRecorder) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        state.shed_dead();
        let slot_limit = state.slot_limit();

        if slot_limit > state.capacity || state.instances.is_none() {
            let capacity = slot_limit.next_power_of_two().max(INITIAL_CAPACITY);
            self.grow(&mut state, capacity)?;
        }

        let record_size = std::mem::size_of::<CullInstanceRecord>();
        let instances = match &state.instances {
            Some(buffer) => Rc::clone(buffer),
            None => return Ok(()),
        };

        if state.all_dirty {
            let mut upload = vec![CullInstanceRecord::zeroed(); state.capacity];
            for (key, record) in &state.records {
                let Some(cullable) = record.cullable.upgrade() else {
                    continue;
                };
                upload[CullingState::slot(key) as usize] = record.gpu(cullable.local_bounds());
            }
            instances.write(0, bytemuck::cast_slice(&upload));
            state.all_dirty = false;
            for record in state.records.values_mut() {
                record.dirty = false;
            }
            state.retired.clear();
        } else {
            let retired = std::mem::take(&mut state.retired);
            for slot in retired {
                let zero = CullInstanceRecord::zeroed();
                instances.write(slot as usize * record_size, bytemuck::bytes_of(&zero));
            }
            let mut uploads = Vec::new();
            for (key, record) in &mut state.records {
                if record.dirty {
                    let Some(cullable) = record.cullable.upgrade() else {
                        continue;
                    };
                    record.dirty = false;
                    uploads.push((CullingState::slot(key), record.gpu(cullable.local_bounds())));
                }
            }
            for (slot, gpu) in uploads {
                instances.write(slot as usize * record_size, bytemuck::bytes_of(&gpu));
            }
        }

        state.parity ^= 1;
        let visibility = match &state.visibility[state.parity] {
            Some(buffer) => Rc::clone(buffer),
            None => return Ok(()),
        };

        let groups = (slot_limit as u32).div_ceil(GROUP_SIZE).max(1);
        recorder.dispatch(
            "instance cull",
            &[instances.as_ref(), visibility.as_ref()],
            [groups, 1, 1],
        );
        Ok(())
    }

    fn grow(&self, state: &mut CullingState, capacity: usize) -> Result<(), RenderError> {
        let record_size = std::mem::size_of::<CullInstanceRecord>();
        let instances = self
            .render_system
            .create_buffer(capacity * record_size, BufferUsage::STORAGE)?;
        let visibility_a = self
            .render_system
            .create_buffer(capacity * 4, BufferUsage::STORAGE | BufferUsage::INDIRECT)?;
        let visibility_b = self
            .render_system
            .create_buffer(capacity * 4, BufferUsage::STORAGE | BufferUsage::INDIRECT)?;

        // Old buffers are replaced only once every allocation succeeded; a
        // failed grow leaves the previous frame's state usable.
        state.instances = Some(instances);
        state.visibility = [Some(visibility_a), Some(visibility_b)];
        state.capacity = capacity;
        state.all_dirty = true;
        Ok(())
    }
}

impl WorldComponent for CullingComponent {
    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.records.is_empty() {
            warn!(
                "culling component destroyed with {} live instances",
                state.records.len()
            );
        }
        state.instances = None;
        state.visibility = [None, None];
        state.capacity = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
