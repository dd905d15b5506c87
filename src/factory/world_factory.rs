//! Standard sub-factory for the built-in blueprint set

use std::rc::Rc;

use log::warn;
use rustc_hash::FxHashMap;

use crate::entity::{
    CameraComponent, DecalComponent, DecalMaterial, Entity, EntityComponent, EntityEvent,
    EventSetComponent, FacadeComponent, FogComponent, GroupComponent, IrradianceGridComponent,
    LightComponent, OccluderComponent, PathComponent, PersistentIdComponent, ProbeComponent,
    ScriptComponent, SignalEvent, VolumeComponent, WorldComponent,
};
use crate::render::RenderSystem;
use crate::resource::ResourceManager;
use crate::types::DataType;
use crate::world::{CullingComponent, RtWorldComponent};

use super::data::{
    CameraData, ComponentData, CullingData, DecalData, EntityData, EventData, EventSetData,
    FacadeData, FogData, GroupData, IrradianceGridData, LightData, OccluderData, PathData,
    PersistentIdData, ProbeData, RtWorldData, ScriptData, SignalEventData, StandardEntityData,
    VolumeData, WorldComponentData, CAMERA_DATA, CULLING_DATA, DECAL_DATA, EVENT_SET_DATA,
    FACADE_DATA, FOG_DATA, GROUP_DATA, IRRADIANCE_GRID_DATA, LIGHT_DATA, OCCLUDER_DATA, PATH_DATA,
    PERSISTENT_ID_DATA, PROBE_DATA, RT_WORLD_DATA, SCRIPT_DATA, SIGNAL_EVENT_DATA,
    STANDARD_ENTITY_DATA, VOLUME_DATA,
};
use super::set::{EntityBuilder, EntityFactory};
use super::FactoryError;

static ENTITY_TYPES: [&DataType; 1] = [&STANDARD_ENTITY_DATA];
static COMPONENT_TYPES: [&DataType; 14] = [
    &CAMERA_DATA,
    &LIGHT_DATA,
    &PROBE_DATA,
    &FOG_DATA,
    &IRRADIANCE_GRID_DATA,
    &DECAL_DATA,
    &OCCLUDER_DATA,
    &VOLUME_DATA,
    &PATH_DATA,
    &PERSISTENT_ID_DATA,
    &SCRIPT_DATA,
    &GROUP_DATA,
    &FACADE_DATA,
    &EVENT_SET_DATA,
];
static EVENT_TYPES: [&DataType; 1] = [&SIGNAL_EVENT_DATA];
static WORLD_COMPONENT_TYPES: [&DataType; 2] = [&CULLING_DATA, &RT_WORLD_DATA];

/// Sub-factory building every blueprint shipped with this crate.
///
/// Holds the render system for world components that own GPU state and the
/// resource manager for blueprints that bind external resources.
pub struct WorldEntityFactory {
    render_system: Rc<dyn RenderSystem>,
    resources: Rc<ResourceManager>,
}

impl WorldEntityFactory {
    /// Create the standard factory.
    #[must_use]
    pub fn new(render_system: Rc<dyn RenderSystem>, resources: Rc<ResourceManager>) -> Self {
        Self {
            render_system,
            resources,
        }
    }

    fn build_children(
        &self,
        builder: &dyn EntityBuilder,
        blueprints: &[Box<dyn EntityData>],
    ) -> Result<Vec<Entity>, FactoryError> {
        let mut entities = Vec::with_capacity(blueprints.len());
        for blueprint in blueprints {
            match builder.build_entity(blueprint.as_ref()) {
                Ok(entity) => entities.push(entity),
                Err(error) if !builder.strict() => {
                    warn!(
                        "skipping child entity of type '{}': {error}",
                        blueprint.data_type().name()
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(entities)
    }
}

fn cast<'a, T: 'static>(any: &'a dyn std::any::Any, name: &'static str) -> Result<&'a T, FactoryError> {
    any.downcast_ref::<T>().ok_or(FactoryError::NoFactory(name))
}

impl EntityFactory for WorldEntityFactory {
    fn entity_types(&self) -> &[&'static DataType] {
        &ENTITY_TYPES
    }

    fn component_types(&self) -> &[&'static DataType] {
        &COMPONENT_TYPES
    }

    fn event_types(&self) -> &[&'static DataType] {
        &EVENT_TYPES
    }

    fn world_component_types(&self) -> &[&'static DataType] {
        &WORLD_COMPONENT_TYPES
    }

    fn create_entity(
        &self,
        builder: &dyn EntityBuilder,
        data: &dyn EntityData,
    ) -> Result<Entity, FactoryError> {
        let data: &StandardEntityData = cast(data.as_any(), data.data_type().name())?;

        let mut components = Vec::with_capacity(data.components.len());
        for blueprint in &data.components {
            match builder.build_component(blueprint.as_ref()) {
                Ok(component) => components.push(component),
                Err(error) if !builder.strict() => {
                    warn!(
                        "skipping component of type '{}' on entity '{}': {error}",
                        blueprint.data_type().name(),
                        data.name
                    );
                }
                Err(error) => return Err(error),
            }
        }

        let mut entity = Entity::new(data.name.clone(), data.transform, data.state, components);
        // Components learn the initial pose through the normal broadcast path.
        entity.set_transform(data.transform);
        Ok(entity)
    }

    fn create_component(
        &self,
        builder: &dyn EntityBuilder,
        data: &dyn ComponentData,
    ) -> Result<Box<dyn EntityComponent>, FactoryError> {
        let name = data.data_type().name();
        let any = data.as_any();

        if let Some(data) = any.downcast_ref::<CameraData>() {
            return Ok(Box::new(CameraComponent::new(data.projection)));
        }
        if let Some(data) = any.downcast_ref::<LightData>() {
            return Ok(Box::new(LightComponent::new(
                data.kind,
                data.color,
                data.intensity,
            )));
        }
        if let Some(data) = any.downcast_ref::<ProbeData>() {
            return Ok(Box::new(ProbeComponent::new(
                data.volume,
                data.include_dynamic,
            )));
        }
        if let Some(data) = any.downcast_ref::<FogData>() {
            return Ok(Box::new(FogComponent::new(
                data.max_distance,
                data.density,
                data.color,
            )));
        }
        if let Some(data) = any.downcast_ref::<IrradianceGridData>() {
            return Ok(Box::new(IrradianceGridComponent::new(
                data.bounds,
                data.resolution,
            )));
        }
        if let Some(data) = any.downcast_ref::<DecalData>() {
            // A decal without its material is useless; bind failure fails the
            // component and the strict flag decides the rest upstream.
            let material = self.resources.bind::<DecalMaterial>(data.material)?;
            return Ok(Box::new(DecalComponent::new(
                data.size,
                data.thickness,
                data.alpha,
                material,
            )));
        }
        if let Some(data) = any.downcast_ref::<OccluderData>() {
            return Ok(Box::new(OccluderComponent::new(data.bounds)));
        }
        if let Some(data) = any.downcast_ref::<VolumeData>() {
            return Ok(Box::new(VolumeComponent::new(data.volumes.iter().copied())));
        }
        if let Some(data) = any.downcast_ref::<PathData>() {
            return Ok(Box::new(PathComponent::new(data.keys.clone())));
        }
        if let Some(data) = any.downcast_ref::<PersistentIdData>() {
            return Ok(Box::new(PersistentIdComponent::new(data.id)));
        }
        if let Some(data) = any.downcast_ref::<ScriptData>() {
            return Ok(Box::new(ScriptComponent::new(data.class_name.clone())));
        }
        if let Some(data) = any.downcast_ref::<GroupData>() {
            let entities = self.build_children(builder, &data.entities)?;
            return Ok(Box::new(GroupComponent::with_entities(entities)));
        }
        if let Some(data) = any.downcast_ref::<FacadeData>() {
            let entities = self.build_children(builder, &data.entities)?;
            let mut facade = FacadeComponent::new(entities);
            if let Some(show) = &data.show {
                if !facade.show(show) {
                    warn!("facade has no alternative named '{show}'");
                }
            }
            return Ok(Box::new(facade));
        }
        if let Some(data) = any.downcast_ref::<EventSetData>() {
            let mut events: FxHashMap<String, Rc<dyn EntityEvent>> = FxHashMap::default();
            for (event_name, blueprint) in &data.events {
                match builder.build_event(blueprint.as_ref()) {
                    Ok(event) => {
                        events.insert(event_name.clone(), event);
                    }
                    Err(error) if !builder.strict() => {
                        warn!("skipping event '{event_name}': {error}");
                    }
                    Err(error) => return Err(error),
                }
            }
            return Ok(Box::new(EventSetComponent::new(events)));
        }

        Err(FactoryError::NoFactory(name))
    }

    fn create_event(
        &self,
        _builder: &dyn EntityBuilder,
        data: &dyn EventData,
    ) -> Result<Rc<dyn EntityEvent>, FactoryError> {
        let data: &SignalEventData = cast(data.as_any(), data.data_type().name())?;
        Ok(Rc::new(SignalEvent::new(data.signal.clone())))
    }

    fn create_world_component(
        &self,
        _builder: &dyn EntityBuilder,
        data: &dyn WorldComponentData,
    ) -> Result<Box<dyn WorldComponent>, FactoryError> {
        let name = data.data_type().name();
        let any = data.as_any();

        if any.downcast_ref::<CullingData>().is_some() {
            return Ok(Box::new(CullingComponent::new(Rc::clone(
                &self.render_system,
            ))));
        }
        if any.downcast_ref::<RtWorldData>().is_some() {
            return Ok(Box::new(RtWorldComponent::new(Rc::clone(
                &self.render_system,
            ))));
        }

        Err(FactoryError::NoFactory(name))
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use crate::entity::{EntityState, LightKind};
    use crate::factory::EntityFactorySet;
    use crate::math::Transform;
    use crate::render::null::NullRenderSystem;
    use crate::resource::ResourceId;

    use super::*;

    fn factory_set(strict: bool) -> (EntityFactorySet, Rc<ResourceManager>) {
        let resources = Rc::new(ResourceManager::new());
        let mut set = EntityFactorySet::new(strict);
        set.add_factory(Rc::new(WorldEntityFactory::new(
            Rc::new(NullRenderSystem::new()),
            Rc::clone(&resources),
        )));
        (set, resources)
    }

    fn light_blueprint() -> Box<dyn ComponentData> {
        Box::new(LightData {
            kind: LightKind::Point { range: 3.0 },
            color: Vec3::ONE,
            intensity: 2.0,
        })
    }

    fn decal_blueprint(material: ResourceId) -> Box<dyn ComponentData> {
        Box::new(DecalData {
            size: Vec2::splat(1.0),
            thickness: 0.25,
            alpha: 1.0,
            material,
        })
    }

    #[test]
    fn test_builds_standard_entity() {
        let (set, _resources) = factory_set(true);
        let blueprint = StandardEntityData {
            name: "lamp".into(),
            transform: Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
            state: EntityState::default(),
            components: vec![light_blueprint()],
        };

        let entity = set.create_entity(&blueprint).unwrap();
        assert_eq!(entity.name(), "lamp");
        let light = entity.component::<LightComponent>().unwrap();
        // Lights pick up the owner transform from the construction broadcast.
        assert_eq!(light.transform().position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_decal_bind_failure_is_fatal_when_strict() {
        let (set, _resources) = factory_set(true);
        let blueprint = StandardEntityData {
            name: "stain".into(),
            components: vec![decal_blueprint(ResourceId(404))],
            ..Default::default()
        };

        assert!(set.create_entity(&blueprint).is_err());
    }

    #[test]
    fn test_missing_component_skipped_when_not_strict() {
        let _ = env_logger::builder().is_test(true).try_init();

        let (set, _resources) = factory_set(false);
        let blueprint = StandardEntityData {
            name: "stain".into(),
            components: vec![decal_blueprint(ResourceId(404)), light_blueprint()],
            ..Default::default()
        };

        // The unbound decal is dropped; the light survives.
        let entity = set.create_entity(&blueprint).unwrap();
        assert!(entity.component::<DecalComponent>().is_none());
        assert!(entity.component::<LightComponent>().is_some());
    }

    #[test]
    fn test_decal_binds_published_material() {
        let (set, resources) = factory_set(true);
        let id = ResourceId(9);
        resources.publish(
            id,
            DecalMaterial {
                name: "tire_mark".into(),
            },
        );

        let component = set.create_component(decal_blueprint(id).as_ref()).unwrap();
        let decal = component.as_any().downcast_ref::<DecalComponent>().unwrap();
        assert_eq!(decal.material().get().name, "tire_mark");
    }

    #[test]
    fn test_group_builds_recursively() {
        let (set, _resources) = factory_set(true);
        let blueprint = StandardEntityData {
            name: "root".into(),
            components: vec![Box::new(GroupData {
                entities: vec![
                    Box::new(StandardEntityData {
                        name: "leaf_a".into(),
                        components: vec![light_blueprint()],
                        ..Default::default()
                    }),
                    Box::new(StandardEntityData {
                        name: "leaf_b".into(),
                        ..Default::default()
                    }),
                ],
            })],
            ..Default::default()
        };

        let entity = set.create_entity(&blueprint).unwrap();
        let group = entity.component::<GroupComponent>().unwrap();
        assert_eq!(group.entities().len(), 2);
        assert_eq!(group.entities()[0].name(), "leaf_a");
        assert!(group.entities()[0].component::<LightComponent>().is_some());
    }

    #[test]
    fn test_event_set_builds_events() {
        let (set, _resources) = factory_set(true);
        let mut events: FxHashMap<String, Box<dyn EventData>> = FxHashMap::default();
        events.insert(
            "explode".into(),
            Box::new(SignalEventData {
                signal: "boom".into(),
            }),
        );

        let component = set.create_component(&EventSetData { events }).unwrap();
        let event_set = component
            .as_any()
            .downcast_ref::<EventSetComponent>()
            .unwrap();
        let event = event_set.event("explode").unwrap();
        let signal = event.as_any().downcast_ref::<SignalEvent>().unwrap();
        assert_eq!(signal.signal, "boom");
    }

    #[test]
    fn test_world_components_from_blueprints() {
        let (set, _resources) = factory_set(true);
        let culling = set.create_world_component(&CullingData).unwrap();
        assert!(culling.as_any().downcast_ref::<CullingComponent>().is_some());

        let rt = set.create_world_component(&RtWorldData).unwrap();
        assert!(rt.as_any().downcast_ref::<RtWorldComponent>().is_some());
    }

    #[test]
    fn test_light_blueprint_from_ron() {
        let text = r#"(
            kind: Point(range: 3.5),
            color: (1.0, 0.5, 0.25),
            intensity: 2.0,
        )"#;
        let data: LightData = ron::from_str(text).unwrap();
        assert_eq!(data.kind, LightKind::Point { range: 3.5 });

        let (set, _resources) = factory_set(true);
        let component = set.create_component(&data).unwrap();
        assert!(component.as_any().downcast_ref::<LightComponent>().is_some());
    }
}
