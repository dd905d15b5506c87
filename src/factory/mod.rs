//! Entity instantiation from declarative data
//!
//! Blueprints ([`EntityData`], [`ComponentData`], [`EventData`],
//! [`WorldComponentData`]) are immutable descriptions of runtime objects.
//! An [`EntityFactorySet`] aggregates sub-factories and resolves, for any
//! blueprint's concrete data type, the one registered sub-factory able to
//! build it — the factory advertising the exact type or its nearest
//! ancestor. Sub-factories recurse through the opaque [`EntityBuilder`]
//! capability, so none needs static knowledge of child types.

mod data;
mod set;
mod world_factory;

pub use data::{
    CameraData, ComponentData, CullingData, DecalData, EntityData, EventData, EventSetData,
    FacadeData, FogData, GroupData, IrradianceGridData, LightData, OccluderData, PathData,
    PersistentIdData, ProbeData, RtWorldData, ScriptData, SignalEventData, StandardEntityData,
    VolumeData, WorldComponentData, CAMERA_DATA, COMPONENT_DATA, CULLING_DATA, DECAL_DATA,
    ENTITY_DATA, EVENT_DATA, EVENT_SET_DATA, FACADE_DATA, FOG_DATA, GROUP_DATA,
    IRRADIANCE_GRID_DATA, LIGHT_DATA, OCCLUDER_DATA, PATH_DATA, PERSISTENT_ID_DATA, PROBE_DATA,
    RT_WORLD_DATA, SCRIPT_DATA, SIGNAL_EVENT_DATA, STANDARD_ENTITY_DATA, VOLUME_DATA,
    WORLD_COMPONENT_DATA,
};
pub use set::{EntityBuilder, EntityFactory, EntityFactorySet};
pub use world_factory::WorldEntityFactory;

use thiserror::Error;

use crate::resource::BindError;

/// Failure to construct a runtime object from its blueprint.
#[derive(Debug, Clone, Error)]
pub enum FactoryError {
    /// No registered sub-factory claims the blueprint's data type.
    ///
    /// Non-fatal in tooling contexts (skip and warn); fatal in strict
    /// runtime contexts. The [`EntityBuilder::strict`] flag threaded from
    /// the top-level factory set decides which.
    #[error("no factory claims data type '{0}'")]
    NoFactory(&'static str),

    /// A required resource proxy failed to resolve; treated like
    /// [`FactoryError::NoFactory`] by callers.
    #[error(transparent)]
    ResourceBind(#[from] BindError),
}
