//! Frame orchestration: gather, setup, build
//!
//! One [`WorldRenderer::setup`] call turns the world into declared graph
//! passes for a single view. The gather phase walks visible entities and
//! fills the [`GatherView`](super::context::GatherView); the setup phase lets
//! renderers shape the graph; the build phase runs later, inside the deferred
//! pass closures, recording GPU commands.

use std::rc::Rc;

use log::{debug, warn};

use crate::entity::EntityState;
use crate::render::{RenderGraph, TargetHandle};

use super::context::{BuildContext, GatherContext, GatherView, RenderPass, SetupContext, WorldRenderView};
use super::culling::CullingComponent;
use super::renderers::{EntityRenderer, WorldEntityRenderers};
use super::rt::RtWorldComponent;
use super::World;

/// What one setup call produced, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Renderables admitted by the gather phase
    pub renderable_count: usize,
    /// Lights gathered
    pub light_count: usize,
    /// Whether a shadow pass was declared
    pub shadow_pass: bool,
    /// Whether a culling pass was declared
    pub cull_pass: bool,
}

/// Renders one view of a world through the registered renderers.
pub struct WorldRenderer {
    renderers: Rc<WorldEntityRenderers>,
}

impl WorldRenderer {
    /// Create over a renderer registry.
    #[must_use]
    pub fn new(renderers: Rc<WorldEntityRenderers>) -> Self {
        Self { renderers }
    }

    /// Create over the standard renderer registry.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(Rc::new(WorldEntityRenderers::standard()))
    }

    /// The renderer registry.
    #[must_use]
    pub fn renderers(&self) -> &Rc<WorldEntityRenderers> {
        &self.renderers
    }

    /// Gather the world for one view and declare this frame's passes on
    /// `graph`. The opaque pass writes `output`. Only entities whose state
    /// contains `filter` are gathered.
    ///
    /// Pass order: culling (when the world has a culling component), shadow
    /// (when a cascading directional light was gathered), depth, opaque.
    /// Build closures borrow the world; the graph must execute before that
    /// borrow ends.
    pub fn setup<'w>(
        &self,
        world: &'w World,
        view: WorldRenderView,
        graph: &mut RenderGraph<'w>,
        output: Option<TargetHandle>,
        filter: EntityState,
    ) -> FrameInfo {
        // Gather
        let mut gather = GatherContext::new(&self.renderers, filter);
        for entity in world.entities() {
            gather.gather_entity(entity);
        }
        let mut gathered = gather.into_view();
        if let Some(rt) = world.component::<RtWorldComponent>() {
            gathered.rt_top_level = rt.top_level();
        }

        let info = FrameInfo {
            renderable_count: gathered.renderables.len(),
            light_count: gathered.lights.len(),
            shadow_pass: gathered.cascading_light.is_some(),
            cull_pass: world.component::<CullingComponent>().is_some(),
        };
        debug!(
            "frame setup: {} renderables, {} lights",
            info.renderable_count, info.light_count
        );

        // Distinct renderer types present in the gather, in registry order;
        // per-type setup and build flushes run only for these.
        let active: Rc<Vec<Rc<dyn EntityRenderer>>> = Rc::new(
            self.renderers
                .renderers()
                .iter()
                .filter(|renderer| {
                    gathered
                        .renderables
                        .iter()
                        .any(|gathered| Rc::ptr_eq(&gathered.renderer, *renderer))
                })
                .map(Rc::clone)
                .collect(),
        );

        // Setup
        {
            let mut cx = SetupContext { graph, view };
            for renderer in active.iter() {
                renderer.setup(&mut cx);
            }
            for gathered in &gathered.renderables {
                gathered.renderer.setup_renderable(&mut cx, &gathered.source);
            }
        }

        let shared = Rc::new(gathered);
        let culling = world.component::<CullingComponent>();

        if let Some(culling) = culling {
            let pass = graph.add_pass("cull", None);
            graph.add_build(pass, move |recorder| {
                if let Err(error) = culling.build(recorder) {
                    warn!("culling skipped this frame: {error}");
                }
            });
        }

        if info.shadow_pass {
            let pass = graph.add_pass("shadow", None);
            Self::add_pass_build(graph, pass, RenderPass::Shadow, view, &shared, &active);
        }

        let depth = graph.add_pass("depth", None);
        Self::add_pass_build(graph, depth, RenderPass::Depth, view, &shared, &active);

        let opaque = graph.add_pass("opaque", output);
        Self::add_pass_build(graph, opaque, RenderPass::Opaque, view, &shared, &active);
        if let Some(culling) = culling {
            graph.add_build(opaque, move |recorder| {
                if let Some(visibility) = culling.visibility_buffer() {
                    let count = culling.instance_count() as u32;
                    recorder.draw_instanced("culled instances", visibility.as_ref(), count);
                }
            });
        }

        info
    }

    fn add_pass_build<'w>(
        graph: &mut RenderGraph<'w>,
        pass: crate::render::PassId,
        render_pass: RenderPass,
        view: WorldRenderView,
        shared: &Rc<GatherView<'w>>,
        active: &Rc<Vec<Rc<dyn EntityRenderer>>>,
    ) {
        let shared = Rc::clone(shared);
        let active = Rc::clone(active);
        graph.add_build(pass, move |recorder| {
            let mut cx = BuildContext { recorder, view };
            // Per-renderable work in gather order, then per-type flushes in
            // registry order.
            for gathered in &shared.renderables {
                gathered
                    .renderer
                    .build_renderable(&mut cx, render_pass, &gathered.source);
            }
            for renderer in active.iter() {
                renderer.build(&mut cx, render_pass);
            }
        });
    }
}
