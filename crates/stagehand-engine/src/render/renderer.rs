use super::types::{Color, DirectionalLight, PointLight, Quad, Viewport};

/// Pipeline surface the stage drives once per rendered frame.
///
/// Call order within a frame is fixed:
///
/// ```text
/// clear_targets
///   [begin_geometry_pass .. draw_quad* .. accumulate_lights .. composite
///    .. begin_post_process .. draw_quad*]      (only when the scene enables 3D)
/// begin_overlay .. draw_quad*
/// present
/// ```
///
/// `draw_quad` goes to whichever pass was begun last. Backends may batch and defer GPU
/// work until `present`.
pub trait Renderer {
    /// Current drawable size in logical pixels.
    fn viewport(&self) -> Viewport;

    /// Clears every render target (MRT color/normal/depth, light buffer, final target).
    fn clear_targets(&mut self, color: Color);

    /// Begins the MRT geometry pass.
    fn begin_geometry_pass(&mut self);

    /// Accumulates light contributions into the light buffer from the MRT targets.
    fn accumulate_lights(&mut self, points: &[PointLight], directionals: &[DirectionalLight]);

    /// Combines MRT color and light buffer into the final target.
    fn composite(&mut self);

    /// Begins the 3D post-process pass over the composited image.
    fn begin_post_process(&mut self);

    /// Switches to an orthographic camera for 2D overlay drawing.
    fn begin_overlay(&mut self);

    /// Draws a solid quad into the current pass.
    fn draw_quad(&mut self, quad: Quad);

    /// Finishes the frame.
    fn present(&mut self);
}

/// One call recorded by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Clear(Color),
    BeginGeometry,
    AccumulateLights { points: Vec<PointLight>, directionals: Vec<DirectionalLight> },
    Composite,
    BeginPostProcess,
    BeginOverlay,
    Quad(Quad),
    Present,
}

/// Headless renderer that logs every call. Used by tests and tools without a GPU.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub viewport: Viewport,
    pub ops: Vec<RenderOp>,
}

impl RecordingRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport, ops: Vec::new() }
    }

    /// Returns the recorded ops and starts a fresh log.
    pub fn take(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of `present` calls recorded so far.
    pub fn frames(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, RenderOp::Present)).count()
    }
}

impl Renderer for RecordingRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear_targets(&mut self, color: Color) {
        self.ops.push(RenderOp::Clear(color));
    }

    fn begin_geometry_pass(&mut self) {
        self.ops.push(RenderOp::BeginGeometry);
    }

    fn accumulate_lights(&mut self, points: &[PointLight], directionals: &[DirectionalLight]) {
        self.ops.push(RenderOp::AccumulateLights {
            points: points.to_vec(),
            directionals: directionals.to_vec(),
        });
    }

    fn composite(&mut self) {
        self.ops.push(RenderOp::Composite);
    }

    fn begin_post_process(&mut self) {
        self.ops.push(RenderOp::BeginPostProcess);
    }

    fn begin_overlay(&mut self) {
        self.ops.push(RenderOp::BeginOverlay);
    }

    fn draw_quad(&mut self, quad: Quad) {
        self.ops.push(RenderOp::Quad(quad));
    }

    fn present(&mut self) {
        self.ops.push(RenderOp::Present);
    }
}
