//! Frame render graph
//!
//! During the setup phase, renderers declare targets and passes; build work
//! is recorded as deferred closures and runs in a later graph-execution step,
//! not while the graph is being declared. A frame is discarded by simply not
//! executing its graph.

use super::CommandRecorder;

/// Pixel format of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// 8-bit RGBA color
    Rgba8,
    /// Half-float RGBA color
    Rgba16F,
    /// 32-bit depth
    Depth32,
}

/// Declaration of a transient or persistent render target.
#[derive(Debug, Clone)]
pub struct TargetDesc {
    /// Target name, for diagnostics
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TargetFormat,
}

/// Handle to a declared render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(usize);

/// Handle to a declared pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassId(usize);

struct Pass<'frame> {
    name: String,
    target: Option<TargetHandle>,
    builds: Vec<Box<dyn FnOnce(&mut dyn CommandRecorder) + 'frame>>,
}

/// Render graph for one frame.
///
/// The `'frame` lifetime ties deferred build closures to the world borrow
/// they capture; the graph must be executed before that borrow ends.
#[derive(Default)]
pub struct RenderGraph<'frame> {
    targets: Vec<TargetDesc>,
    passes: Vec<Pass<'frame>>,
}

impl<'frame> RenderGraph<'frame> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            passes: Vec::new(),
        }
    }

    /// Declare a render target.
    pub fn add_target(&mut self, desc: TargetDesc) -> TargetHandle {
        let handle = TargetHandle(self.targets.len());
        self.targets.push(desc);
        handle
    }

    /// Look up a declared target.
    #[must_use]
    pub fn target(&self, handle: TargetHandle) -> &TargetDesc {
        &self.targets[handle.0]
    }

    /// Declare a pass, optionally writing `target`. Passes execute in
    /// declaration order.
    pub fn add_pass(&mut self, name: impl Into<String>, target: Option<TargetHandle>) -> PassId {
        let id = PassId(self.passes.len());
        self.passes.push(Pass {
            name: name.into(),
            target,
            builds: Vec::new(),
        });
        id
    }

    /// Record a deferred build callback on a pass. Callbacks run in recorded
    /// order when the graph executes.
    pub fn add_build(
        &mut self,
        pass: PassId,
        build: impl FnOnce(&mut dyn CommandRecorder) + 'frame,
    ) {
        self.passes[pass.0].builds.push(Box::new(build));
    }

    /// Number of declared passes.
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Name of a declared pass.
    #[must_use]
    pub fn pass_name(&self, pass: PassId) -> &str {
        &self.passes[pass.0].name
    }

    /// Target a pass writes, if any.
    #[must_use]
    pub fn pass_target(&self, pass: PassId) -> Option<TargetHandle> {
        self.passes[pass.0].target
    }

    /// Execute all recorded build callbacks, pass by pass in declaration
    /// order. This is the hand-off to the external graph-execution step.
    pub fn execute(self, recorder: &mut dyn CommandRecorder) {
        for pass in self.passes {
            for build in pass.builds {
                build(recorder);
            }
        }
    }
}
