//! Entities and their components
//!
//! An [`Entity`] is a named, transformable container that exclusively owns an
//! ordinal-sorted list of [`EntityComponent`]s and broadcasts transform and
//! state changes to them. World-scoped behaviors implement
//! [`WorldComponent`] instead and live on the world, not on an entity.

mod component;
mod components;
mod entity;
mod event;
mod group;

pub use component::{EntityComponent, EntityId, EntityState, UpdateParams, WorldComponent};
pub use components::{
    CameraComponent, CameraProjection, DecalComponent, DecalMaterial, EventSetComponent,
    FacadeComponent, FogComponent, IrradianceGridComponent, LightComponent, LightKind,
    OccluderComponent, PathComponent, PathKey, PersistentIdComponent, ProbeComponent,
    ScriptComponent, VolumeComponent,
};
pub use entity::Entity;
pub use event::{EntityEvent, SignalEvent};
pub use group::GroupComponent;
