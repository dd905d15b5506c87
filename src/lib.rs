//! A real-time world rendering core
//!
//! This crate provides:
//! - Entities as typed component containers with ordinal-ordered broadcasts
//! - Declarative instantiation through an aggregating factory dispatcher
//! - A renderer registry driving the gather / setup / build frame traversal
//! - GPU-driven instance culling and a ray-tracing top level as world
//!   components, over a backend-agnostic GPU interface

pub mod entity;
pub mod factory;
pub mod math;
pub mod render;
pub mod resource;
pub mod types;
pub mod world;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::entity::{
        Entity, EntityComponent, EntityId, EntityState, GroupComponent, LightComponent, LightKind,
        UpdateParams, WorldComponent,
    };
    pub use crate::factory::{
        EntityBuilder, EntityFactory, EntityFactorySet, FactoryError, StandardEntityData,
        WorldEntityFactory,
    };
    pub use crate::math::{Aabb3, Transform};
    pub use crate::render::{CommandRecorder, RenderGraph, RenderSystem};
    pub use crate::resource::{Proxy, ResourceId, ResourceManager};
    pub use crate::world::{
        CullingComponent, EntityRenderer, RtWorldComponent, World, WorldEntityRenderers,
        WorldRenderView, WorldRenderer,
    };
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
