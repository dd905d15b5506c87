//! World container and frame traversal
//!
//! A [`World`] owns root entities and world-scoped components. Rendering a
//! view is a three-phase traversal driven by [`WorldRenderer`]: gather walks
//! entities and collects renderables plus lighting side channels, setup
//! declares render-graph passes, and build records GPU commands inside the
//! deferred pass closures.

mod context;
mod culling;
mod renderers;
mod rt;
mod world_renderer;

pub use context::{
    BuildContext, GatherContext, GatherSource, GatherView, GatheredRenderable, RenderPass,
    SetupContext, WorldRenderView,
};
pub use culling::{CullInstanceRecord, Cullable, CullingComponent, CullingInstance};
pub use renderers::{
    DecalRenderer, EntityRenderer, FacadeRenderer, FogRenderer, GroupRenderer, LightRenderer,
    ProbeRenderer, WorldEntityRenderers,
};
pub use rt::{RtInstance, RtWorldComponent};
pub use world_renderer::{FrameInfo, WorldRenderer};

use crate::entity::{Entity, EntityId, UpdateParams, WorldComponent};

/// Root container of a scene: entities plus world-scoped components.
#[derive(Default)]
pub struct World {
    entities: Vec<Entity>,
    components: Vec<Box<dyn WorldComponent>>,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root entity.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Remove a root entity by ID. The entity is returned alive; call
    /// [`Entity::destroy`] to release its components.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|entity| entity.id() == id)?;
        Some(self.entities.remove(index))
    }

    /// Find a root entity by ID.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    /// Find a root entity by ID, mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id() == id)
    }

    /// The root entities.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The root entities, mutably.
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Attach a world component.
    pub fn add_component(&mut self, component: Box<dyn WorldComponent>) {
        self.components.push(component);
    }

    /// Find the first world component of concrete type `T`.
    #[must_use]
    pub fn component<T: WorldComponent>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|component| component.as_any().downcast_ref::<T>())
    }

    /// Advance the world one tick: world components first, then entities.
    pub fn update(&mut self, update: &UpdateParams) {
        for component in &mut self.components {
            component.update(update);
        }
        for entity in &mut self.entities {
            entity.update(update);
        }
    }

    /// Destroy all entities and world components.
    pub fn destroy(&mut self) {
        for entity in &mut self.entities {
            entity.destroy();
        }
        self.entities.clear();
        for component in &mut self.components {
            component.destroy();
        }
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::rc::Rc;

    use glam::Vec3;

    use crate::entity::{
        EntityComponent, EntityState, FogComponent, GroupComponent, LightComponent, LightKind,
    };
    use crate::math::{Aabb3, Transform};
    use crate::render::null::{NullCommandRecorder, NullRenderSystem, RecordedCommand};
    use crate::render::{RenderGraph, RenderSystem};

    use super::*;

    /// Unit-box geometry for the mesh component below.
    struct BoxGeometry;

    impl Cullable for BoxGeometry {
        fn local_bounds(&self) -> Aabb3 {
            Aabb3::from_center_extent(Vec3::ZERO, Vec3::ONE)
        }
    }

    /// Component owning a culling slot for the entity's geometry.
    struct CulledMeshComponent {
        // Kept alive so the weak reference inside the culling record holds.
        _geometry: Rc<dyn Cullable>,
        instance: Option<CullingInstance>,
    }

    impl CulledMeshComponent {
        fn new(culling: &CullingComponent, transform: Transform) -> Self {
            let geometry: Rc<dyn Cullable> = Rc::new(BoxGeometry);
            let instance = culling.allocate_instance(&geometry, transform, 0);
            Self {
                _geometry: geometry,
                instance: Some(instance),
            }
        }
    }

    impl EntityComponent for CulledMeshComponent {
        fn destroy(&mut self) {
            self.instance = None;
        }

        fn set_transform(&mut self, _old: &Transform, new: &Transform) {
            if let Some(instance) = &self.instance {
                instance.set_transform(*new);
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn entity_with(name: &'static str, component: Box<dyn EntityComponent>) -> Entity {
        Entity::new(name, Transform::IDENTITY, EntityState::default(), vec![component])
    }

    #[test]
    fn test_world_component_lookup() {
        let mut world = World::new();
        let system: Rc<dyn RenderSystem> = Rc::new(NullRenderSystem::new());
        world.add_component(Box::new(CullingComponent::new(Rc::clone(&system))));

        assert!(world.component::<CullingComponent>().is_some());
        assert!(world.component::<RtWorldComponent>().is_none());
    }

    #[test]
    fn test_destroying_entities_releases_culling_slots() {
        let mut world = World::new();
        let system: Rc<dyn RenderSystem> = Rc::new(NullRenderSystem::new());
        world.add_component(Box::new(CullingComponent::new(system)));

        let (a, b) = {
            let culling = world.component::<CullingComponent>().unwrap();
            (
                Box::new(CulledMeshComponent::new(culling, Transform::IDENTITY)),
                Box::new(CulledMeshComponent::new(
                    culling,
                    Transform::from_position(Vec3::X),
                )),
            )
        };
        world.add_entity(entity_with("a", a));
        world.add_entity(entity_with("b", b));

        assert_eq!(
            world.component::<CullingComponent>().unwrap().instance_count(),
            2
        );

        let id = world.entities()[0].id();
        let mut removed = world.remove_entity(id).unwrap();
        removed.destroy();
        assert_eq!(
            world.component::<CullingComponent>().unwrap().instance_count(),
            1
        );

        world.destroy();
        // No instance records survive the world.
    }

    #[test]
    fn test_frame_with_culling_and_shadow() {
        let mut world = World::new();
        let system: Rc<dyn RenderSystem> = Rc::new(NullRenderSystem::new());
        world.add_component(Box::new(CullingComponent::new(Rc::clone(&system))));
        world.add_component(Box::new(RtWorldComponent::new(system)));

        let mesh = {
            let culling = world.component::<CullingComponent>().unwrap();
            Box::new(CulledMeshComponent::new(
                culling,
                Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
            ))
        };
        world.add_entity(entity_with("mesh", mesh));
        world.add_entity(entity_with(
            "sun",
            Box::new(LightComponent::new(
                LightKind::Directional { cascading: true },
                Vec3::ONE,
                3.0,
            )),
        ));
        world.add_entity(entity_with(
            "group",
            Box::new(GroupComponent::with_entities(vec![entity_with(
                "fog",
                Box::new(FogComponent::new(200.0, 0.02, Vec3::ONE)),
            )])),
        ));

        let renderer = WorldRenderer::standard();
        let mut graph = RenderGraph::new();
        let info = renderer.setup(
            &world,
            WorldRenderView::default(),
            &mut graph,
            None,
            EntityState::VISIBLE,
        );

        assert_eq!(info.light_count, 1);
        assert!(info.shadow_pass);
        assert!(info.cull_pass);
        // cull + shadow + depth + opaque
        assert_eq!(graph.pass_count(), 4);

        let mut recorder = NullCommandRecorder::new();
        graph.execute(&mut recorder);

        // The cull dispatch runs before draw submission; the draw reads the
        // other buffer of the visibility pair (the previous frame's output).
        let dispatch_visibility = match &recorder.commands[0] {
            RecordedCommand::Dispatch { label, buffers, .. } => {
                assert_eq!(label, "instance cull");
                buffers[1]
            }
            other => panic!("expected the cull dispatch first, got {other:?}"),
        };
        let draw = recorder
            .commands
            .iter()
            .find_map(|command| match command {
                RecordedCommand::Draw {
                    visibility,
                    instance_count,
                    ..
                } => Some((*visibility, *instance_count)),
                RecordedCommand::Dispatch { .. } => None,
            })
            .unwrap();
        assert_ne!(draw.0, dispatch_visibility);
        assert_eq!(draw.1, 1);
    }

    #[test]
    fn test_frame_without_cascading_light_has_no_shadow_pass() {
        let mut world = World::new();
        world.add_entity(entity_with(
            "lamp",
            Box::new(LightComponent::new(
                LightKind::Point { range: 10.0 },
                Vec3::ONE,
                1.0,
            )),
        ));

        let renderer = WorldRenderer::standard();
        let mut graph = RenderGraph::new();
        let info = renderer.setup(
            &world,
            WorldRenderView::default(),
            &mut graph,
            None,
            EntityState::VISIBLE,
        );

        assert!(!info.shadow_pass);
        assert!(!info.cull_pass);
        // depth + opaque only
        assert_eq!(graph.pass_count(), 2);
    }

    #[test]
    fn test_side_channel_only_renderer_is_not_flushed() {
        use std::any::TypeId;
        use std::cell::Cell;

        struct MarkerComponent;

        impl EntityComponent for MarkerComponent {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        /// Diverts every offered renderable away from the admitted list, so
        /// it never becomes active and must not receive per-type flushes.
        struct DivertingRenderer {
            builds: Rc<Cell<usize>>,
        }

        impl EntityRenderer for DivertingRenderer {
            fn renderable_types(&self) -> Vec<TypeId> {
                vec![TypeId::of::<MarkerComponent>()]
            }

            fn gather<'w>(
                &self,
                _cx: &mut GatherContext<'_, 'w>,
                _source: crate::world::GatherSource<'w>,
            ) {
            }

            fn build(&self, _cx: &mut crate::world::BuildContext<'_>, _pass: RenderPass) {
                self.builds.set(self.builds.get() + 1);
            }
        }

        let builds = Rc::new(Cell::new(0));
        let mut registry = WorldEntityRenderers::new();
        registry.add(Rc::new(DivertingRenderer {
            builds: Rc::clone(&builds),
        }));

        let mut world = World::new();
        world.add_entity(entity_with("marker", Box::new(MarkerComponent)));

        let renderer = WorldRenderer::new(Rc::new(registry));
        let mut graph = RenderGraph::new();
        let info = renderer.setup(
            &world,
            WorldRenderView::default(),
            &mut graph,
            None,
            EntityState::VISIBLE,
        );
        let mut recorder = NullCommandRecorder::new();
        graph.execute(&mut recorder);

        assert_eq!(info.renderable_count, 0);
        assert_eq!(builds.get(), 0);
    }

    #[test]
    fn test_rt_top_level_reaches_gather_view() {
        let mut world = World::new();
        let system: Rc<dyn RenderSystem> = Rc::new(NullRenderSystem::new());
        world.add_component(Box::new(RtWorldComponent::new(system)));
        world.update(&UpdateParams::default());

        let renderers = WorldEntityRenderers::standard();
        let mut gather = GatherContext::new(&renderers, EntityState::VISIBLE);
        for entity in world.entities() {
            gather.gather_entity(entity);
        }
        let mut view = gather.into_view();
        let rt = world.component::<RtWorldComponent>().unwrap();
        view.rt_top_level = rt.top_level();

        assert!(view.rt_top_level.is_some());
    }
}
