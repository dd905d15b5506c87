//! Phase contexts for the gather / setup / build traversal

use std::any::Any;
use std::rc::Rc;

use glam::Mat4;
use log::warn;

use crate::entity::{
    Entity, EntityState, FogComponent, IrradianceGridComponent, LightComponent, ProbeComponent,
};
use crate::render::{CommandRecorder, RenderGraph, TopLevel};

use super::renderers::{EntityRenderer, WorldEntityRenderers};

/// Which pass a build callback is recording for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Depth pre-pass
    Depth,
    /// Opaque color pass
    Opaque,
    /// Cascaded shadow map pass
    Shadow,
}

/// Camera matrices for one rendered view.
#[derive(Debug, Clone, Copy)]
pub struct WorldRenderView {
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix
    pub projection: Mat4,
}

impl Default for WorldRenderView {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// One renderable offered to a renderer: the owning entity plus the concrete
/// component, passed as `&dyn Any` so the registry stays open-ended.
#[derive(Clone, Copy)]
pub struct GatherSource<'w> {
    /// Entity owning the renderable
    pub entity: &'w Entity,
    /// The renderable component itself
    pub renderable: &'w dyn Any,
}

/// A renderable admitted to the frame, with the renderer that claimed it.
pub struct GatheredRenderable<'w> {
    /// Renderer that will set up and build this renderable
    pub renderer: Rc<dyn EntityRenderer>,
    /// The renderable and its owner
    pub source: GatherSource<'w>,
}

/// Everything one gather pass collected from the world.
///
/// Renderables keep gather order. The singleton side channels (fog,
/// irradiance grid, cascading light) are last-wins: a later gather overwrites
/// an earlier one with a warning, so authoring mistakes are visible without
/// failing the frame.
#[derive(Default)]
pub struct GatherView<'w> {
    /// Admitted renderables, in gather order
    pub renderables: Vec<GatheredRenderable<'w>>,
    /// All gathered lights, in gather order
    pub lights: Vec<&'w LightComponent>,
    /// Index into `lights` of the cascaded-shadow directional light
    pub cascading_light: Option<usize>,
    /// All gathered reflection probes, in gather order
    pub probes: Vec<&'w ProbeComponent>,
    /// The view's fog volume, if any
    pub fog: Option<&'w FogComponent>,
    /// The view's irradiance grid, if any
    pub irradiance_grid: Option<&'w IrradianceGridComponent>,
    /// Ray-tracing top level exposed by the world, if any
    pub rt_top_level: Option<Rc<dyn TopLevel>>,
}

impl<'w> GatherView<'w> {
    /// Add a light; a cascading directional light also claims the cascading
    /// slot, displacing any earlier claimant.
    pub fn add_light(&mut self, light: &'w LightComponent) {
        let index = self.lights.len();
        self.lights.push(light);
        if light.is_cascading_directional() {
            if self.cascading_light.is_some() {
                warn!("multiple cascading directional lights gathered; keeping the last");
            }
            self.cascading_light = Some(index);
        }
    }

    /// Set the fog volume, last-wins.
    pub fn set_fog(&mut self, fog: &'w FogComponent) {
        if self.fog.is_some() {
            warn!("multiple fog volumes gathered; keeping the last");
        }
        self.fog = Some(fog);
    }

    /// Set the irradiance grid, last-wins.
    pub fn set_irradiance_grid(&mut self, grid: &'w IrradianceGridComponent) {
        if self.irradiance_grid.is_some() {
            warn!("multiple irradiance grids gathered; keeping the last");
        }
        self.irradiance_grid = Some(grid);
    }

    /// The cascaded-shadow directional light, if one was gathered.
    #[must_use]
    pub fn cascading_light(&self) -> Option<&'w LightComponent> {
        self.cascading_light.map(|index| self.lights[index])
    }
}

/// Context threaded through the gather phase.
pub struct GatherContext<'a, 'w> {
    renderers: &'a WorldEntityRenderers,
    filter: EntityState,
    /// Accumulated gather output
    pub view: GatherView<'w>,
}

impl<'a, 'w> GatherContext<'a, 'w> {
    /// Start a gather over `renderers`, visiting only entities whose state
    /// contains all bits of `filter`.
    #[must_use]
    pub fn new(renderers: &'a WorldEntityRenderers, filter: EntityState) -> Self {
        Self {
            renderers,
            filter,
            view: GatherView::default(),
        }
    }

    /// Gather one entity: every component with a registered renderer is
    /// offered to that renderer; components without one are skipped silently.
    /// Renderers of aggregate components recurse back through here.
    pub fn gather_entity(&mut self, entity: &'w Entity) {
        if !entity.state().contains(self.filter) {
            return;
        }
        for component in entity.components() {
            let renderable = component.as_ref().as_any();
            if let Some(renderer) = self.renderers.find(renderable.type_id()) {
                renderer.gather(self, GatherSource { entity, renderable });
            }
        }
    }

    /// Admit a renderable to the frame. No-op if its type has no registered
    /// renderer.
    pub fn include(&mut self, source: GatherSource<'w>) {
        if let Some(renderer) = self.renderers.find(source.renderable.type_id()) {
            self.view.renderables.push(GatheredRenderable { renderer, source });
        }
    }

    /// Finish the gather, yielding the collected view.
    #[must_use]
    pub fn into_view(self) -> GatherView<'w> {
        self.view
    }
}

/// Context for the setup phase: renderers declare targets and passes here.
pub struct SetupContext<'a, 'frame> {
    /// The frame's render graph
    pub graph: &'a mut RenderGraph<'frame>,
    /// Camera of the view being set up
    pub view: WorldRenderView,
}

/// Context for the build phase: renderers record GPU commands here.
pub struct BuildContext<'a> {
    /// Recorder for the pass being built
    pub recorder: &'a mut dyn CommandRecorder,
    /// Camera of the view being built
    pub view: WorldRenderView,
}
