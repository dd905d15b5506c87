//! Standard entity component variants
//!
//! The lightweight members of the component set: cameras, lights, probes,
//! fog, decals, volumes, paths and the bookkeeping components. The heavy
//! world-scoped components (culling, ray tracing) live in [`crate::world`].

use std::any::Any;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::math::{Aabb3, Transform};
use crate::resource::Proxy;

use super::component::{EntityComponent, EntityState, UpdateParams};
use super::entity::Entity;
use super::event::EntityEvent;

// ============================================================================
// Camera
// ============================================================================

/// Camera projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraProjection {
    /// Perspective projection
    Perspective {
        /// Vertical field of view, radians
        fov: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
    /// Orthographic projection
    Orthographic {
        /// View width in world units
        width: f32,
        /// View height in world units
        height: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
}

/// Camera component.
#[derive(Debug, Clone)]
pub struct CameraComponent {
    /// Projection parameters
    pub projection: CameraProjection,
}

impl CameraComponent {
    /// Create a camera with the given projection.
    #[must_use]
    pub const fn new(projection: CameraProjection) -> Self {
        Self { projection }
    }
}

impl EntityComponent for CameraComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Light
// ============================================================================

/// Light source shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    /// Directional light; at most one cascading directional light is honored
    /// per gathered view.
    Directional {
        /// Whether this light drives cascaded shadow maps
        cascading: bool,
    },
    /// Point light
    Point {
        /// Influence radius
        range: f32,
    },
    /// Spot light
    Spot {
        /// Influence radius
        range: f32,
        /// Half cone angle, radians
        angle: f32,
    },
}

/// Light source component. Tracks its owner's world transform so renderers
/// can read the light pose during setup and build.
#[derive(Debug, Clone)]
pub struct LightComponent {
    /// Light shape and falloff
    pub kind: LightKind,
    /// Linear RGB color
    pub color: Vec3,
    /// Scalar intensity multiplier
    pub intensity: f32,
    transform: Transform,
}

impl LightComponent {
    /// Create a light.
    #[must_use]
    pub fn new(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self {
            kind,
            color,
            intensity,
            transform: Transform::IDENTITY,
        }
    }

    /// World transform of the owning entity, as of the last broadcast.
    #[must_use]
    pub const fn transform(&self) -> Transform {
        self.transform
    }

    /// Whether this light feeds the cascaded shadow map slot.
    #[must_use]
    pub const fn is_cascading_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional { cascading: true })
    }
}

impl EntityComponent for LightComponent {
    fn set_transform(&mut self, _old: &Transform, new: &Transform) {
        self.transform = *new;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Reflection probe component.
#[derive(Debug, Clone)]
pub struct ProbeComponent {
    /// Capture volume in entity-local space
    pub volume: Aabb3,
    /// Whether the probe captures the whole scene or only static geometry
    pub include_dynamic: bool,
    transform: Transform,
}

impl ProbeComponent {
    /// Create a probe with the given local capture volume.
    #[must_use]
    pub fn new(volume: Aabb3, include_dynamic: bool) -> Self {
        Self {
            volume,
            include_dynamic,
            transform: Transform::IDENTITY,
        }
    }

    /// World transform of the owning entity, as of the last broadcast.
    #[must_use]
    pub const fn transform(&self) -> Transform {
        self.transform
    }
}

impl EntityComponent for ProbeComponent {
    fn set_transform(&mut self, _old: &Transform, new: &Transform) {
        self.transform = *new;
    }

    fn bounding_box(&self) -> Aabb3 {
        self.volume
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Volumetric fog
// ============================================================================

/// Volumetric fog component. A gathered view honors at most one.
#[derive(Debug, Clone)]
pub struct FogComponent {
    /// Maximum fogged distance from the viewer
    pub max_distance: f32,
    /// Medium density
    pub density: f32,
    /// Scattering color
    pub color: Vec3,
}

impl FogComponent {
    /// Create a fog volume.
    #[must_use]
    pub const fn new(max_distance: f32, density: f32, color: Vec3) -> Self {
        Self {
            max_distance,
            density,
            color,
        }
    }
}

impl EntityComponent for FogComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Irradiance grid
// ============================================================================

/// Baked irradiance grid component. A gathered view honors at most one.
#[derive(Debug, Clone)]
pub struct IrradianceGridComponent {
    /// Grid bounds in world space
    pub bounds: Aabb3,
    /// Probe counts along each axis
    pub resolution: [u32; 3],
}

impl IrradianceGridComponent {
    /// Create an irradiance grid descriptor.
    #[must_use]
    pub const fn new(bounds: Aabb3, resolution: [u32; 3]) -> Self {
        Self { bounds, resolution }
    }
}

impl EntityComponent for IrradianceGridComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Decal
// ============================================================================

/// Material payload referenced by decals, resolved through the resource
/// manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecalMaterial {
    /// Material name, for diagnostics
    pub name: String,
}

/// Projected decal component.
pub struct DecalComponent {
    /// Projection footprint, world units
    pub size: Vec2,
    /// Projection depth
    pub thickness: f32,
    /// Opacity multiplier
    pub alpha: f32,
    material: Proxy<DecalMaterial>,
}

impl DecalComponent {
    /// Create a decal from a bound material proxy.
    #[must_use]
    pub fn new(size: Vec2, thickness: f32, alpha: f32, material: Proxy<DecalMaterial>) -> Self {
        Self {
            size,
            thickness,
            alpha,
            material,
        }
    }

    /// The decal's material.
    #[must_use]
    pub fn material(&self) -> &Proxy<DecalMaterial> {
        &self.material
    }
}

impl EntityComponent for DecalComponent {
    fn update(&mut self, _update: &UpdateParams) {
        if self.material.changed() {
            self.material.consume();
            debug!("decal material '{}' hot-reloaded", self.material.get().name);
        }
    }

    fn bounding_box(&self) -> Aabb3 {
        let extent = Vec3::new(self.size.x * 0.5, self.thickness * 0.5, self.size.y * 0.5);
        Aabb3::from_center_extent(Vec3::ZERO, extent)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Occluder
// ============================================================================

/// Occluder component; feeds occlusion culling with a conservative box.
#[derive(Debug, Clone)]
pub struct OccluderComponent {
    /// Occluding box in entity-local space
    pub bounds: Aabb3,
}

impl OccluderComponent {
    /// Create an occluder.
    #[must_use]
    pub const fn new(bounds: Aabb3) -> Self {
        Self { bounds }
    }
}

impl EntityComponent for OccluderComponent {
    fn bounding_box(&self) -> Aabb3 {
        self.bounds
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Volume
// ============================================================================

/// Trigger volume component: a set of entity-local boxes with a containment
/// query.
#[derive(Debug, Clone, Default)]
pub struct VolumeComponent {
    volumes: smallvec::SmallVec<[Aabb3; 4]>,
}

impl VolumeComponent {
    /// Create from a set of local boxes.
    #[must_use]
    pub fn new(volumes: impl IntoIterator<Item = Aabb3>) -> Self {
        Self {
            volumes: volumes.into_iter().collect(),
        }
    }

    /// Check whether an entity-local point is inside any volume.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        self.volumes.iter().any(|volume| {
            !volume.is_empty()
                && point.cmpge(volume.min).all()
                && point.cmple(volume.max).all()
        })
    }
}

impl EntityComponent for VolumeComponent {
    fn bounding_box(&self) -> Aabb3 {
        self.volumes
            .iter()
            .fold(Aabb3::EMPTY, |acc, volume| acc.union(volume))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Path
// ============================================================================

/// A keyframe on a path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PathKey {
    /// Key time, seconds
    pub at: f32,
    /// Pose at the key
    pub transform: Transform,
}

/// Path component: a piecewise transform curve entities can follow.
#[derive(Debug, Clone, Default)]
pub struct PathComponent {
    keys: Vec<PathKey>,
}

impl PathComponent {
    /// Create from time-sorted keys.
    #[must_use]
    pub fn new(keys: Vec<PathKey>) -> Self {
        Self { keys }
    }

    /// The path keys.
    #[must_use]
    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    /// Evaluate the pose at time `at`, clamping to the first and last keys.
    /// Returns `None` for an empty path.
    #[must_use]
    pub fn evaluate(&self, at: f32) -> Option<Transform> {
        let first = self.keys.first()?;
        if at <= first.at {
            return Some(first.transform);
        }
        let last = self.keys.last()?;
        if at >= last.at {
            return Some(last.transform);
        }
        let next_index = self.keys.iter().position(|key| key.at > at)?;
        let previous = &self.keys[next_index - 1];
        let next = &self.keys[next_index];
        let fraction = (at - previous.at) / (next.at - previous.at);
        Some(Transform::new(
            previous
                .transform
                .position
                .lerp(next.transform.position, fraction),
            previous
                .transform
                .rotation
                .slerp(next.transform.rotation, fraction),
        ))
    }
}

impl EntityComponent for PathComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Persistent ID
// ============================================================================

/// Stable identity surviving serialization, used by tooling to track entities
/// across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistentIdComponent {
    /// The stable 128-bit identifier
    pub id: u128,
}

impl PersistentIdComponent {
    /// Create from an explicit identifier.
    #[must_use]
    pub const fn new(id: u128) -> Self {
        Self { id }
    }
}

impl EntityComponent for PersistentIdComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Script
// ============================================================================

/// Script binding component. Runs after spatial components each tick, hence
/// the high ordinal.
#[derive(Debug, Clone)]
pub struct ScriptComponent {
    /// Name of the bound script class
    pub class_name: String,
    time: f32,
}

impl ScriptComponent {
    /// Bind a script class by name.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            time: 0.0,
        }
    }

    /// Accumulated script time, seconds.
    #[must_use]
    pub const fn time(&self) -> f32 {
        self.time
    }
}

impl EntityComponent for ScriptComponent {
    fn ordinal(&self) -> i32 {
        1000
    }

    fn update(&mut self, update: &UpdateParams) {
        self.time += update.delta_time;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Event set
// ============================================================================

/// Named events attached to an entity.
#[derive(Default)]
pub struct EventSetComponent {
    events: FxHashMap<String, Rc<dyn EntityEvent>>,
}

impl EventSetComponent {
    /// Create from a name → event map.
    #[must_use]
    pub fn new(events: FxHashMap<String, Rc<dyn EntityEvent>>) -> Self {
        Self { events }
    }

    /// Look up an event by name.
    #[must_use]
    pub fn event(&self, name: &str) -> Option<&Rc<dyn EntityEvent>> {
        self.events.get(name)
    }

    /// Number of events in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EntityComponent for EventSetComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Facade
// ============================================================================

/// Facade component: owns alternative child entities and shows at most one.
#[derive(Default)]
pub struct FacadeComponent {
    entities: Vec<Entity>,
    visible: Option<usize>,
}

impl FacadeComponent {
    /// Create a facade taking ownership of the alternatives.
    #[must_use]
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            visible: None,
        }
    }

    /// Show the alternative named `name`; hides the rest. Returns false if no
    /// alternative has that name.
    pub fn show(&mut self, name: &str) -> bool {
        match self.entities.iter().position(|entity| entity.name() == name) {
            Some(index) => {
                self.visible = Some(index);
                true
            }
            None => false,
        }
    }

    /// Hide all alternatives.
    pub fn hide_all(&mut self) {
        self.visible = None;
    }

    /// The currently visible alternative, if any.
    #[must_use]
    pub fn visible_entity(&self) -> Option<&Entity> {
        self.visible.map(|index| &self.entities[index])
    }

    /// All alternatives.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

impl EntityComponent for FacadeComponent {
    fn destroy(&mut self) {
        for entity in &mut self.entities {
            entity.destroy();
        }
        self.entities.clear();
        self.visible = None;
    }

    fn set_transform(&mut self, old: &Transform, new: &Transform) {
        let old_inverse = old.inverse();
        for entity in &mut self.entities {
            let local = old_inverse * entity.transform();
            entity.set_transform(*new * local);
        }
    }

    fn update(&mut self, update: &UpdateParams) {
        if let Some(index) = self.visible {
            self.entities[index].update(update);
        }
    }

    fn set_state(&mut self, state: EntityState) {
        let _ = state;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use crate::resource::{ResourceId, ResourceManager};

    use super::*;

    #[test]
    fn test_light_cascading_flag() {
        let cascading = LightComponent::new(
            LightKind::Directional { cascading: true },
            Vec3::ONE,
            1.0,
        );
        let point = LightComponent::new(LightKind::Point { range: 5.0 }, Vec3::ONE, 1.0);
        assert!(cascading.is_cascading_directional());
        assert!(!point.is_cascading_directional());
    }

    #[test]
    fn test_light_tracks_owner_transform() {
        let mut light = LightComponent::new(LightKind::Point { range: 2.0 }, Vec3::ONE, 1.0);
        let new = Transform::from_position(Vec3::new(0.0, 4.0, 0.0));
        light.set_transform(&Transform::IDENTITY, &new);
        assert_eq!(light.transform().position, new.position);
    }

    #[test]
    fn test_volume_contains() {
        let volume = VolumeComponent::new([
            Aabb3::new(Vec3::ZERO, Vec3::ONE),
            Aabb3::new(Vec3::splat(5.0), Vec3::splat(6.0)),
        ]);
        assert!(volume.contains(Vec3::splat(0.5)));
        assert!(volume.contains(Vec3::splat(5.5)));
        assert!(!volume.contains(Vec3::splat(3.0)));
    }

    #[test]
    fn test_path_evaluate_clamps_and_interpolates() {
        let path = PathComponent::new(vec![
            PathKey {
                at: 0.0,
                transform: Transform::from_position(Vec3::ZERO),
            },
            PathKey {
                at: 2.0,
                transform: Transform::new(Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY),
            },
        ]);

        assert_eq!(path.evaluate(-1.0).unwrap().position, Vec3::ZERO);
        assert_eq!(path.evaluate(5.0).unwrap().position, Vec3::new(4.0, 0.0, 0.0));
        let mid = path.evaluate(1.0).unwrap();
        assert!((mid.position.x - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_decal_hot_reload() {
        let resources = ResourceManager::new();
        let id = ResourceId(7);
        resources.publish(
            id,
            DecalMaterial {
                name: "scorch".into(),
            },
        );
        let proxy = resources.bind::<DecalMaterial>(id).unwrap();
        let mut decal = DecalComponent::new(Vec2::splat(2.0), 0.5, 1.0, proxy);

        assert!(!decal.material().changed());
        resources.publish(
            id,
            DecalMaterial {
                name: "scorch_v2".into(),
            },
        );
        assert!(decal.material().changed());

        decal.update(&UpdateParams::default());
        assert!(!decal.material().changed());
        assert_eq!(decal.material().get().name, "scorch_v2");
    }

    #[test]
    fn test_facade_shows_one_alternative() {
        let low = Entity::new("low", Transform::IDENTITY, EntityState::default(), vec![]);
        let high = Entity::new("high", Transform::IDENTITY, EntityState::default(), vec![]);
        let mut facade = FacadeComponent::new(vec![low, high]);

        assert!(facade.visible_entity().is_none());
        assert!(facade.show("high"));
        assert_eq!(facade.visible_entity().unwrap().name(), "high");
        assert!(!facade.show("missing"));
        assert_eq!(facade.visible_entity().unwrap().name(), "high");
    }

    #[test]
    fn test_script_accumulates_time() {
        let mut script = ScriptComponent::new("Door");
        script.update(&UpdateParams {
            total_time: 0.016,
            delta_time: 0.016,
        });
        script.update(&UpdateParams {
            total_time: 0.032,
            delta_time: 0.016,
        });
        assert!((script.time() - 0.032).abs() < 0.0001);
    }
}
