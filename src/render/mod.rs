//! GPU interface consumed by the world core
//!
//! The core never talks to a concrete GPU API; it creates buffers and
//! acceleration structures through [`RenderSystem`] and records commands
//! through [`CommandRecorder`]. A headless [`null`] backend implements the
//! whole surface for tests and tooling.

pub mod null;

mod graph;

pub use graph::{PassId, RenderGraph, TargetDesc, TargetFormat, TargetHandle};

use std::any::Any;
use std::rc::Rc;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// GPU-side failure surfaced to the core.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Allocation failed, typically while growing an instance or
    /// acceleration-structure buffer. Fatal to the owning component's
    /// current-frame build only; the component retries next frame.
    #[error("gpu allocation of {size} bytes failed: {reason}")]
    Allocation {
        /// Requested size in bytes
        size: usize,
        /// Backend-specific reason
        reason: String,
    },
}

bitflags! {
    /// Intended use of a GPU buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        /// Read/written by compute dispatches
        const STORAGE = 1 << 0;
        /// Consumed by indirect draw submission
        const INDIRECT = 1 << 1;
    }
}

/// A GPU buffer created by a [`RenderSystem`].
///
/// Buffer identity may change when the owner grows capacity; consumers must
/// re-fetch buffers from their owner every frame instead of caching them.
pub trait GpuBuffer {
    /// Backend-unique identity, for command recording and diagnostics.
    fn id(&self) -> u64;

    /// Size in bytes.
    fn size(&self) -> usize;

    /// Upload bytes at `offset`. Ordering against dependent dispatches is
    /// enforced by submission order within one frame's build.
    fn write(&self, offset: usize, data: &[u8]);

    /// Backend downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// One instance record in a top-level acceleration structure.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TlasInstance {
    /// World transform of the instance, column-major
    pub transform: [[f32; 4]; 4],
    /// Backend handle of the referenced bottom-level structure
    pub blas: u64,
}

/// A bottom-level acceleration structure, owned by the caller that allocates
/// RT instances against it.
pub trait BottomLevel {
    /// Backend-unique handle written into [`TlasInstance`] records.
    fn native_handle(&self) -> u64;

    /// Bounds of the geometry in structure-local space.
    fn local_bounds(&self) -> crate::math::Aabb3;
}

/// A top-level acceleration structure aggregating [`TlasInstance`] records.
///
/// Whether a write is a full rebuild or an incremental refit is the
/// provider's choice; the structure must reflect the latest write when
/// queried.
pub trait TopLevel {
    /// Maximum number of instances the structure can hold.
    fn capacity(&self) -> usize;

    /// Replace the instance set.
    fn write_instances(&self, instances: &[TlasInstance]);

    /// Backend downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// Factory for GPU resources.
pub trait RenderSystem {
    /// Create a buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// [`RenderError::Allocation`] when the backend cannot satisfy the
    /// request.
    fn create_buffer(&self, size: usize, usage: BufferUsage)
        -> Result<Rc<dyn GpuBuffer>, RenderError>;

    /// Create a top-level acceleration structure for up to `capacity`
    /// instances.
    ///
    /// # Errors
    ///
    /// [`RenderError::Allocation`] when the backend cannot satisfy the
    /// request.
    fn create_top_level(&self, capacity: usize) -> Result<Rc<dyn TopLevel>, RenderError>;
}

/// Opaque command recorder the build phase emits into.
pub trait CommandRecorder {
    /// Record a compute dispatch reading/writing `buffers`.
    fn dispatch(&mut self, label: &str, buffers: &[&dyn GpuBuffer], groups: [u32; 3]);

    /// Record instanced draw submission driven by a visibility buffer.
    fn draw_instanced(&mut self, label: &str, visibility: &dyn GpuBuffer, instance_count: u32);
}
