//! Headless null render backend
//!
//! Implements the full GPU interface without a device: buffers are in-memory
//! byte vectors and recorded commands are kept for inspection. Used by tests
//! and by tooling that needs to drive a frame without presenting it. An
//! optional allocation budget makes GPU out-of-memory paths reproducible.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{
    BottomLevel, BufferUsage, CommandRecorder, GpuBuffer, RenderError, RenderSystem, TlasInstance,
    TopLevel,
};
use crate::math::Aabb3;

/// In-memory buffer handed out by [`NullRenderSystem`].
pub struct NullBuffer {
    id: u64,
    data: RefCell<Vec<u8>>,
}

impl NullBuffer {
    /// Snapshot of the buffer contents.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

impl GpuBuffer for NullBuffer {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> usize {
        self.data.borrow().len()
    }

    fn write(&self, offset: usize, data: &[u8]) {
        let mut storage = self.data.borrow_mut();
        let end = offset + data.len();
        debug_assert!(end <= storage.len(), "write past end of buffer");
        storage[offset..end].copy_from_slice(data);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// In-memory bottom-level structure for tests and tooling.
pub struct NullBottomLevel {
    handle: u64,
    bounds: Aabb3,
}

impl NullBottomLevel {
    /// Create with an explicit handle and geometry bounds.
    #[must_use]
    pub const fn new(handle: u64, bounds: Aabb3) -> Self {
        Self { handle, bounds }
    }
}

impl BottomLevel for NullBottomLevel {
    fn native_handle(&self) -> u64 {
        self.handle
    }

    fn local_bounds(&self) -> Aabb3 {
        self.bounds
    }
}

/// In-memory top-level structure capturing written instances.
pub struct NullTopLevel {
    capacity: usize,
    instances: RefCell<Vec<TlasInstance>>,
}

impl NullTopLevel {
    /// Snapshot of the last written instance set.
    #[must_use]
    pub fn instances(&self) -> Vec<TlasInstance> {
        self.instances.borrow().clone()
    }
}

impl TopLevel for NullTopLevel {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn write_instances(&self, instances: &[TlasInstance]) {
        debug_assert!(instances.len() <= self.capacity);
        *self.instances.borrow_mut() = instances.to_vec();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Render system with no device behind it.
pub struct NullRenderSystem {
    next_id: Cell<u64>,
    remaining_budget: Cell<Option<usize>>,
}

impl NullRenderSystem {
    /// Create with unlimited allocation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            remaining_budget: Cell::new(None),
        }
    }

    /// Create with a total allocation budget in bytes; requests past the
    /// budget fail with [`RenderError::Allocation`].
    #[must_use]
    pub fn with_allocation_limit(bytes: usize) -> Self {
        Self {
            next_id: Cell::new(1),
            remaining_budget: Cell::new(Some(bytes)),
        }
    }

    fn charge(&self, size: usize) -> Result<(), RenderError> {
        match self.remaining_budget.get() {
            Some(remaining) if remaining < size => Err(RenderError::Allocation {
                size,
                reason: format!("allocation budget exhausted ({remaining} bytes left)"),
            }),
            Some(remaining) => {
                self.remaining_budget.set(Some(remaining - size));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Default for NullRenderSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSystem for NullRenderSystem {
    fn create_buffer(
        &self,
        size: usize,
        _usage: BufferUsage,
    ) -> Result<Rc<dyn GpuBuffer>, RenderError> {
        self.charge(size)?;
        Ok(Rc::new(NullBuffer {
            id: self.next_id(),
            data: RefCell::new(vec![0; size]),
        }))
    }

    fn create_top_level(&self, capacity: usize) -> Result<Rc<dyn TopLevel>, RenderError> {
        self.charge(capacity * std::mem::size_of::<TlasInstance>())?;
        Ok(Rc::new(NullTopLevel {
            capacity,
            instances: RefCell::new(Vec::new()),
        }))
    }
}

/// One command captured by [`NullCommandRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    /// A compute dispatch
    Dispatch {
        /// Dispatch label
        label: String,
        /// IDs of the bound buffers
        buffers: Vec<u64>,
        /// Workgroup counts
        groups: [u32; 3],
    },
    /// An instanced draw submission
    Draw {
        /// Draw label
        label: String,
        /// ID of the visibility buffer read by submission
        visibility: u64,
        /// Number of instances submitted
        instance_count: u32,
    },
}

/// Recorder capturing commands for replay and assertions.
#[derive(Debug, Default)]
pub struct NullCommandRecorder {
    /// Captured commands, in recording order
    pub commands: Vec<RecordedCommand>,
}

impl NullCommandRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandRecorder for NullCommandRecorder {
    fn dispatch(&mut self, label: &str, buffers: &[&dyn GpuBuffer], groups: [u32; 3]) {
        self.commands.push(RecordedCommand::Dispatch {
            label: label.to_string(),
            buffers: buffers.iter().map(|buffer| buffer.id()).collect(),
            groups,
        });
    }

    fn draw_instanced(&mut self, label: &str, visibility: &dyn GpuBuffer, instance_count: u32) {
        self.commands.push(RecordedCommand::Draw {
            label: label.to_string(),
            visibility: visibility.id(),
            instance_count,
        });
    }
}
