//! Renderer protocol and registry
//!
//! Renderers translate gathered components into frame work across three
//! phases: gather admits renderables and fills side channels, setup declares
//! graph passes, build records GPU commands. The registry maps each concrete
//! component type to the single renderer claiming it.

use std::any::TypeId;
use std::rc::Rc;

use log::warn;
use rustc_hash::FxHashMap;

use crate::entity::{
    DecalComponent, FacadeComponent, FogComponent, GroupComponent, IrradianceGridComponent,
    LightComponent, ProbeComponent,
};

use super::context::{BuildContext, GatherContext, GatherSource, RenderPass, SetupContext};

/// Frame protocol of one renderer.
///
/// `gather` runs once per offered renderable; the default admits it
/// unchanged. `setup` and `build` run once per renderer per frame (the
/// per-type flush); `setup_renderable` and `build_renderable` run once per
/// admitted renderable in gather order.
///
/// The per-type flushes run only for renderers that admitted at least one
/// renderable this frame. A renderer whose gather diverts everything into
/// side channels (lights, fog, probes) is not flushed; such work is consumed
/// from the gathered view by the frame orchestration instead.
pub trait EntityRenderer {
    /// Concrete component types this renderer claims.
    fn renderable_types(&self) -> Vec<TypeId>;

    /// Decide what to do with an offered renderable: admit it, capture it
    /// into a side channel, or recurse into children.
    fn gather<'w>(&self, cx: &mut GatherContext<'_, 'w>, source: GatherSource<'w>) {
        cx.include(source);
    }

    /// Per-renderer setup, before any per-renderable setup. Runs only when
    /// the renderer admitted at least one renderable this frame.
    fn setup(&self, cx: &mut SetupContext<'_, '_>) {
        let _ = cx;
    }

    /// Per-renderable setup, in gather order.
    fn setup_renderable(&self, cx: &mut SetupContext<'_, '_>, source: &GatherSource<'_>) {
        let _ = (cx, source);
    }

    /// Per-renderable build for one pass, in gather order.
    fn build_renderable(
        &self,
        cx: &mut BuildContext<'_>,
        pass: RenderPass,
        source: &GatherSource<'_>,
    ) {
        let _ = (cx, pass, source);
    }

    /// Per-renderer flush for one pass, after all per-renderable builds.
    /// Runs only when the renderer admitted at least one renderable this
    /// frame.
    fn build(&self, cx: &mut BuildContext<'_>, pass: RenderPass) {
        let _ = (cx, pass);
    }
}

/// Registry mapping concrete component types to renderers.
///
/// Registration order is preserved and drives the per-renderer flush order
/// during setup and build. The first renderer to claim a type keeps it.
#[derive(Default)]
pub struct WorldEntityRenderers {
    renderers: Vec<Rc<dyn EntityRenderer>>,
    by_type: FxHashMap<TypeId, Rc<dyn EntityRenderer>>,
}

impl WorldEntityRenderers {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all renderers shipped with this crate.
    #[must_use]
    pub fn standard() -> Self {
        let mut renderers = Self::new();
        renderers.add(Rc::new(GroupRenderer));
        renderers.add(Rc::new(FacadeRenderer));
        renderers.add(Rc::new(LightRenderer));
        renderers.add(Rc::new(ProbeRenderer));
        renderers.add(Rc::new(FogRenderer));
        renderers.add(Rc::new(DecalRenderer));
        renderers
    }

    /// Register a renderer for all the types it claims.
    pub fn add(&mut self, renderer: Rc<dyn EntityRenderer>) {
        for type_id in renderer.renderable_types() {
            if self.by_type.contains_key(&type_id) {
                warn!("renderable type {type_id:?} already claimed; keeping the first renderer");
                continue;
            }
            self.by_type.insert(type_id, Rc::clone(&renderer));
        }
        self.renderers.push(renderer);
    }

    /// Find the renderer claiming a concrete component type.
    #[must_use]
    pub fn find(&self, type_id: TypeId) -> Option<Rc<dyn EntityRenderer>> {
        self.by_type.get(&type_id).map(Rc::clone)
    }

    /// All registered renderers, in registration order.
    #[must_use]
    pub fn renderers(&self) -> &[Rc<dyn EntityRenderer>] {
        &self.renderers
    }
}

// ============================================================================
// Standard renderers
// ============================================================================

/// Recurses gather into the children of a group.
pub struct GroupRenderer;

impl EntityRenderer for GroupRenderer {
    fn renderable_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<GroupComponent>()]
    }

    fn gather<'w>(&self, cx: &mut GatherContext<'_, 'w>, source: GatherSource<'w>) {
        if let Some(group) = source.renderable.downcast_ref::<GroupComponent>() {
            for child in group.entities() {
                cx.gather_entity(child);
            }
        }
    }
}

/// Recurses gather into the visible alternative of a facade.
pub struct FacadeRenderer;

impl EntityRenderer for FacadeRenderer {
    fn renderable_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<FacadeComponent>()]
    }

    fn gather<'w>(&self, cx: &mut GatherContext<'_, 'w>, source: GatherSource<'w>) {
        if let Some(facade) = source.renderable.downcast_ref::<FacadeComponent>() {
            if let Some(visible) = facade.visible_entity() {
                cx.gather_entity(visible);
            }
        }
    }
}

/// Captures lights into the gather view's light list.
pub struct LightRenderer;

impl EntityRenderer for LightRenderer {
    fn renderable_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<LightComponent>()]
    }

    fn gather<'w>(&self, cx: &mut GatherContext<'_, 'w>, source: GatherSource<'w>) {
        if let Some(light) = source.renderable.downcast_ref::<LightComponent>() {
            cx.view.add_light(light);
        }
    }
}

/// Captures global-illumination sources: reflection probes and the
/// irradiance grid.
pub struct ProbeRenderer;

impl EntityRenderer for ProbeRenderer {
    fn renderable_types(&self) -> Vec<TypeId> {
        vec![
            TypeId::of::<ProbeComponent>(),
            TypeId::of::<IrradianceGridComponent>(),
        ]
    }

    fn gather<'w>(&self, cx: &mut GatherContext<'_, 'w>, source: GatherSource<'w>) {
        if let Some(probe) = source.renderable.downcast_ref::<ProbeComponent>() {
            cx.view.probes.push(probe);
        } else if let Some(grid) = source.renderable.downcast_ref::<IrradianceGridComponent>() {
            cx.view.set_irradiance_grid(grid);
        }
    }
}

/// Captures the view's fog volume.
pub struct FogRenderer;

impl EntityRenderer for FogRenderer {
    fn renderable_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<FogComponent>()]
    }

    fn gather<'w>(&self, cx: &mut GatherContext<'_, 'w>, source: GatherSource<'w>) {
        if let Some(fog) = source.renderable.downcast_ref::<FogComponent>() {
            cx.view.set_fog(fog);
        }
    }
}

/// Admits decals as ordinary renderables.
pub struct DecalRenderer;

impl EntityRenderer for DecalRenderer {
    fn renderable_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<DecalComponent>()]
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use glam::Vec3;

    use crate::entity::{Entity, EntityComponent, EntityState, LightKind};
    use crate::math::Transform;

    use super::*;

    struct MeshStub(&'static str);

    impl EntityComponent for MeshStub {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct UnhandledStub;

    impl EntityComponent for UnhandledStub {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct MeshRenderer;

    impl EntityRenderer for MeshRenderer {
        fn renderable_types(&self) -> Vec<TypeId> {
            vec![TypeId::of::<MeshStub>()]
        }
    }

    fn leaf(name: &'static str, component: Box<dyn EntityComponent>) -> Entity {
        Entity::new(name, Transform::IDENTITY, EntityState::default(), vec![component])
    }

    #[test]
    fn test_gather_skips_unregistered_types() {
        let mut renderers = WorldEntityRenderers::new();
        renderers.add(Rc::new(MeshRenderer));

        let leaves = [
            leaf("a", Box::new(MeshStub("a"))),
            leaf("b", Box::new(UnhandledStub)),
            leaf("c", Box::new(MeshStub("c"))),
        ];

        let mut cx = GatherContext::new(&renderers, EntityState::VISIBLE);
        for entity in &leaves {
            cx.gather_entity(entity);
        }

        let view = cx.into_view();
        assert_eq!(view.renderables.len(), 2);
        let names: Vec<&str> = view
            .renderables
            .iter()
            .map(|gathered| {
                gathered
                    .source
                    .renderable
                    .downcast_ref::<MeshStub>()
                    .unwrap()
                    .0
            })
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_gather_respects_state_filter() {
        let mut renderers = WorldEntityRenderers::new();
        renderers.add(Rc::new(MeshRenderer));

        let hidden = Entity::new(
            "hidden",
            Transform::IDENTITY,
            EntityState::empty(),
            vec![Box::new(MeshStub("hidden"))],
        );

        let mut cx = GatherContext::new(&renderers, EntityState::VISIBLE);
        cx.gather_entity(&hidden);
        assert!(cx.into_view().renderables.is_empty());
    }

    #[test]
    fn test_group_renderer_recurses() {
        let mut renderers = WorldEntityRenderers::standard();
        renderers.add(Rc::new(MeshRenderer));

        let group = Entity::new(
            "group",
            Transform::IDENTITY,
            EntityState::default(),
            vec![Box::new(GroupComponent::with_entities(vec![
                leaf("inner", Box::new(MeshStub("inner"))),
            ]))],
        );

        let mut cx = GatherContext::new(&renderers, EntityState::VISIBLE);
        cx.gather_entity(&group);
        assert_eq!(cx.into_view().renderables.len(), 1);
    }

    #[test]
    fn test_facade_renderer_gathers_only_visible_alternative() {
        let mut renderers = WorldEntityRenderers::standard();
        renderers.add(Rc::new(MeshRenderer));

        let mut facade = FacadeComponent::new(vec![
            leaf("low", Box::new(MeshStub("low"))),
            leaf("high", Box::new(MeshStub("high"))),
        ]);
        facade.show("high");
        let entity = Entity::new(
            "lod",
            Transform::IDENTITY,
            EntityState::default(),
            vec![Box::new(facade)],
        );

        let mut cx = GatherContext::new(&renderers, EntityState::VISIBLE);
        cx.gather_entity(&entity);
        let view = cx.into_view();
        assert_eq!(view.renderables.len(), 1);
        assert_eq!(
            view.renderables[0]
                .source
                .renderable
                .downcast_ref::<MeshStub>()
                .unwrap()
                .0,
            "high"
        );
    }

    #[test]
    fn test_light_side_channels() {
        let renderers = WorldEntityRenderers::standard();

        let sun = leaf(
            "sun",
            Box::new(crate::entity::LightComponent::new(
                LightKind::Directional { cascading: true },
                Vec3::ONE,
                1.0,
            )),
        );
        let lamp = leaf(
            "lamp",
            Box::new(crate::entity::LightComponent::new(
                LightKind::Point { range: 4.0 },
                Vec3::ONE,
                1.0,
            )),
        );

        let mut cx = GatherContext::new(&renderers, EntityState::VISIBLE);
        cx.gather_entity(&sun);
        cx.gather_entity(&lamp);

        let view = cx.into_view();
        assert_eq!(view.lights.len(), 2);
        assert!(view.cascading_light().unwrap().is_cascading_directional());
        // Lights are side channels, not renderables
        assert!(view.renderables.is_empty());
    }

    #[test]
    fn test_fog_is_last_wins() {
        let renderers = WorldEntityRenderers::standard();
        let near = leaf("near", Box::new(FogComponent::new(50.0, 0.1, Vec3::ONE)));
        let far = leaf("far", Box::new(FogComponent::new(500.0, 0.01, Vec3::ONE)));

        let mut cx = GatherContext::new(&renderers, EntityState::VISIBLE);
        cx.gather_entity(&near);
        cx.gather_entity(&far);

        let view = cx.into_view();
        assert_eq!(view.fog.unwrap().max_distance, 500.0);
    }

    #[test]
    fn test_first_renderer_keeps_contested_type() {
        struct OtherMeshRenderer;
        impl EntityRenderer for OtherMeshRenderer {
            fn renderable_types(&self) -> Vec<TypeId> {
                vec![TypeId::of::<MeshStub>()]
            }
        }

        let mut renderers = WorldEntityRenderers::new();
        let first: Rc<dyn EntityRenderer> = Rc::new(MeshRenderer);
        renderers.add(Rc::clone(&first));
        renderers.add(Rc::new(OtherMeshRenderer));

        let found = renderers.find(TypeId::of::<MeshStub>()).unwrap();
        assert!(Rc::ptr_eq(&found, &first));
    }
}
