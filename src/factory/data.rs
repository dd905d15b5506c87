//! Blueprint data types
//!
//! Immutable descriptions of entities, components, events and world
//! components. Each blueprint names its [`DataType`] so factory resolution
//! can walk the derivation chain; plain-value blueprints also derive serde
//! so tooling can author them declaratively.

use std::any::Any;
use std::fmt::Debug;

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::entity::{CameraProjection, EntityState, LightKind, PathKey};
use crate::math::{Aabb3, Transform};
use crate::resource::ResourceId;
use crate::types::DataType;

/// Root of the entity blueprint chain.
pub static ENTITY_DATA: DataType = DataType::base("EntityData");
/// Root of the component blueprint chain.
pub static COMPONENT_DATA: DataType = DataType::base("ComponentData");
/// Root of the event blueprint chain.
pub static EVENT_DATA: DataType = DataType::base("EventData");
/// Root of the world-component blueprint chain.
pub static WORLD_COMPONENT_DATA: DataType = DataType::base("WorldComponentData");

/// Blueprint for an entity. Produces exactly one runtime [`crate::entity::Entity`]
/// through exactly one resolved sub-factory.
pub trait EntityData: Any + Debug {
    /// The blueprint's position in the data-type chain.
    fn data_type(&self) -> &'static DataType;
    /// Downcast support for sub-factories.
    fn as_any(&self) -> &dyn Any;
}

/// Blueprint for an entity component.
pub trait ComponentData: Any + Debug {
    /// The blueprint's position in the data-type chain.
    fn data_type(&self) -> &'static DataType;
    /// Downcast support for sub-factories.
    fn as_any(&self) -> &dyn Any;
}

/// Blueprint for an entity event.
pub trait EventData: Any + Debug {
    /// The blueprint's position in the data-type chain.
    fn data_type(&self) -> &'static DataType;
    /// Downcast support for sub-factories.
    fn as_any(&self) -> &dyn Any;
}

/// Blueprint for a world-scoped component.
pub trait WorldComponentData: Any + Debug {
    /// The blueprint's position in the data-type chain.
    fn data_type(&self) -> &'static DataType;
    /// Downcast support for sub-factories.
    fn as_any(&self) -> &dyn Any;
}

macro_rules! impl_data {
    ($trait:ident, $type:ty, $descriptor:path) => {
        impl $trait for $type {
            fn data_type(&self) -> &'static DataType {
                &$descriptor
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

// ============================================================================
// Entity blueprints
// ============================================================================

/// Data type of [`StandardEntityData`].
pub static STANDARD_ENTITY_DATA: DataType = DataType::derived("StandardEntityData", &ENTITY_DATA);

/// The standard entity blueprint: a name, an initial pose and state, and the
/// component blueprints to instantiate in order.
#[derive(Debug, Default)]
pub struct StandardEntityData {
    /// Entity name
    pub name: String,
    /// Initial world transform
    pub transform: Transform,
    /// Initial state flags
    pub state: EntityState,
    /// Component blueprints
    pub components: Vec<Box<dyn ComponentData>>,
}

impl_data!(EntityData, StandardEntityData, STANDARD_ENTITY_DATA);

// ============================================================================
// Component blueprints
// ============================================================================

/// Data type of [`CameraData`].
pub static CAMERA_DATA: DataType = DataType::derived("CameraData", &COMPONENT_DATA);

/// Camera component blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraData {
    /// Projection parameters
    pub projection: CameraProjection,
}

impl_data!(ComponentData, CameraData, CAMERA_DATA);

/// Data type of [`LightData`].
pub static LIGHT_DATA: DataType = DataType::derived("LightData", &COMPONENT_DATA);

/// Light component blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightData {
    /// Light shape and falloff
    pub kind: LightKind,
    /// Linear RGB color
    pub color: Vec3,
    /// Scalar intensity multiplier
    pub intensity: f32,
}

impl_data!(ComponentData, LightData, LIGHT_DATA);

/// Data type of [`ProbeData`].
pub static PROBE_DATA: DataType = DataType::derived("ProbeData", &COMPONENT_DATA);

/// Reflection probe blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeData {
    /// Capture volume in entity-local space
    pub volume: Aabb3,
    /// Whether the probe captures dynamic geometry
    pub include_dynamic: bool,
}

impl_data!(ComponentData, ProbeData, PROBE_DATA);

/// Data type of [`FogData`].
pub static FOG_DATA: DataType = DataType::derived("FogData", &COMPONENT_DATA);

/// Volumetric fog blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FogData {
    /// Maximum fogged distance
    pub max_distance: f32,
    /// Medium density
    pub density: f32,
    /// Scattering color
    pub color: Vec3,
}

impl_data!(ComponentData, FogData, FOG_DATA);

/// Data type of [`IrradianceGridData`].
pub static IRRADIANCE_GRID_DATA: DataType =
    DataType::derived("IrradianceGridData", &COMPONENT_DATA);

/// Irradiance grid blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrradianceGridData {
    /// Grid bounds in world space
    pub bounds: Aabb3,
    /// Probe counts along each axis
    pub resolution: [u32; 3],
}

impl_data!(ComponentData, IrradianceGridData, IRRADIANCE_GRID_DATA);

/// Data type of [`DecalData`].
pub static DECAL_DATA: DataType = DataType::derived("DecalData", &COMPONENT_DATA);

/// Decal component blueprint. References its material through the resource
/// manager; a failed bind fails construction of this component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecalData {
    /// Projection footprint
    pub size: Vec2,
    /// Projection depth
    pub thickness: f32,
    /// Opacity multiplier
    pub alpha: f32,
    /// Material resource to bind
    pub material: ResourceId,
}

impl_data!(ComponentData, DecalData, DECAL_DATA);

/// Data type of [`OccluderData`].
pub static OCCLUDER_DATA: DataType = DataType::derived("OccluderData", &COMPONENT_DATA);

/// Occluder blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccluderData {
    /// Occluding box in entity-local space
    pub bounds: Aabb3,
}

impl_data!(ComponentData, OccluderData, OCCLUDER_DATA);

/// Data type of [`VolumeData`].
pub static VOLUME_DATA: DataType = DataType::derived("VolumeData", &COMPONENT_DATA);

/// Trigger volume blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeData {
    /// Volumes in entity-local space
    pub volumes: Vec<Aabb3>,
}

impl_data!(ComponentData, VolumeData, VOLUME_DATA);

/// Data type of [`PathData`].
pub static PATH_DATA: DataType = DataType::derived("PathData", &COMPONENT_DATA);

/// Path blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathData {
    /// Time-sorted keyframes
    pub keys: Vec<PathKey>,
}

impl_data!(ComponentData, PathData, PATH_DATA);

/// Data type of [`PersistentIdData`].
pub static PERSISTENT_ID_DATA: DataType = DataType::derived("PersistentIdData", &COMPONENT_DATA);

/// Persistent ID blueprint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersistentIdData {
    /// The stable 128-bit identifier
    pub id: u128,
}

impl_data!(ComponentData, PersistentIdData, PERSISTENT_ID_DATA);

/// Data type of [`ScriptData`].
pub static SCRIPT_DATA: DataType = DataType::derived("ScriptData", &COMPONENT_DATA);

/// Script binding blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptData {
    /// Name of the script class to bind
    pub class_name: String,
}

impl_data!(ComponentData, ScriptData, SCRIPT_DATA);

/// Data type of [`GroupData`].
pub static GROUP_DATA: DataType = DataType::derived("GroupData", &COMPONENT_DATA);

/// Group component blueprint: child entity blueprints built recursively
/// through the builder capability.
#[derive(Debug, Default)]
pub struct GroupData {
    /// Child entity blueprints
    pub entities: Vec<Box<dyn EntityData>>,
}

impl_data!(ComponentData, GroupData, GROUP_DATA);

/// Data type of [`FacadeData`].
pub static FACADE_DATA: DataType = DataType::derived("FacadeData", &COMPONENT_DATA);

/// Facade component blueprint.
#[derive(Debug, Default)]
pub struct FacadeData {
    /// Alternative entity blueprints
    pub entities: Vec<Box<dyn EntityData>>,
    /// Name of the alternative visible initially
    pub show: Option<String>,
}

impl_data!(ComponentData, FacadeData, FACADE_DATA);

/// Data type of [`EventSetData`].
pub static EVENT_SET_DATA: DataType = DataType::derived("EventSetData", &COMPONENT_DATA);

/// Event set blueprint: named event blueprints built through the builder.
#[derive(Debug, Default)]
pub struct EventSetData {
    /// Event blueprints by name
    pub events: FxHashMap<String, Box<dyn EventData>>,
}

impl_data!(ComponentData, EventSetData, EVENT_SET_DATA);

// ============================================================================
// Event blueprints
// ============================================================================

/// Data type of [`SignalEventData`].
pub static SIGNAL_EVENT_DATA: DataType = DataType::derived("SignalEventData", &EVENT_DATA);

/// Signal event blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEventData {
    /// Signal name raised when the event triggers
    pub signal: String,
}

impl_data!(EventData, SignalEventData, SIGNAL_EVENT_DATA);

// ============================================================================
// World component blueprints
// ============================================================================

/// Data type of [`CullingData`].
pub static CULLING_DATA: DataType = DataType::derived("CullingData", &WORLD_COMPONENT_DATA);

/// GPU instance culling world component blueprint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CullingData;

impl_data!(WorldComponentData, CullingData, CULLING_DATA);

/// Data type of [`RtWorldData`].
pub static RT_WORLD_DATA: DataType = DataType::derived("RtWorldData", &WORLD_COMPONENT_DATA);

/// Ray-tracing world component blueprint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RtWorldData;

impl_data!(WorldComponentData, RtWorldData, RT_WORLD_DATA);
