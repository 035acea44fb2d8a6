//! wgpu backend for [`Renderer`].
//!
//! Responsibilities:
//! - record the stage's draw calls into a [`FramePlan`] as they arrive
//! - on [`GpuRenderer::flush`], replay the plan as GPU passes against the current surface
//! - own the pipelines, offscreen targets and buffers, recreating them when the surface
//!   format or size changes
//!
//! Pass order for a 3D frame: geometry into the MRT targets (color, normal/depth, depth),
//! lighting into the light buffer, composite onto the surface, then post-process and
//! overlay quads blended on top. Flat frames clear the surface and draw the overlay only.

mod pipelines;
mod targets;

use wgpu::util::DeviceExt;

use crate::device::Gpu;
use crate::render::{Color, DirectionalLight, PointLight, Quad, Renderer, Viewport};

use pipelines::{
    GlobalsUniform, GpuDirectionalLight, GpuPointLight, LightsUniform, Pipelines, QuadInstance,
    DEPTH_SCALE, QUAD_INDICES, QUAD_VERTICES,
};
use targets::Targets;

pub use pipelines::{MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS};

/// Pass that receives `draw_quad` calls.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlanPass {
    #[default]
    None,
    Geometry,
    PostProcess,
    Overlay,
}

/// One frame's worth of renderer calls, in submission order per pass.
#[derive(Debug, Default, Clone)]
pub struct FramePlan {
    pub clear: Color,
    pub three_d: bool,
    pub geometry: Vec<Quad>,
    pub post: Vec<Quad>,
    pub overlay: Vec<Quad>,
    pub points: Vec<PointLight>,
    pub directionals: Vec<DirectionalLight>,
    pub pass: PlanPass,
    pub presented: bool,
    dropped_quads: usize,
}

impl FramePlan {
    fn reset(&mut self) {
        self.geometry.clear();
        self.post.clear();
        self.overlay.clear();
        self.points.clear();
        self.directionals.clear();
        self.three_d = false;
        self.pass = PlanPass::None;
        self.presented = false;
        self.dropped_quads = 0;
    }

    fn push(&mut self, quad: Quad) {
        match self.pass {
            PlanPass::Geometry => self.geometry.push(quad),
            PlanPass::PostProcess => self.post.push(quad),
            PlanPass::Overlay => self.overlay.push(quad),
            PlanPass::None => self.dropped_quads += 1,
        }
    }
}

/// GPU-backed [`Renderer`].
///
/// The trait calls only record; nothing touches the GPU until [`flush`](Self::flush)
/// runs the presented plan. This keeps the stage independent of the surface lifetime.
pub struct GpuRenderer {
    viewport: Viewport,
    ambient: Color,
    plan: FramePlan,

    pipelines: Option<Pipelines>,
    targets: Option<Targets>,

    globals_ubo: Option<wgpu::Buffer>,
    globals_bind_group: Option<wgpu::BindGroup>,
    lights_ubo: Option<wgpu::Buffer>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    warned_light_overflow: bool,
}

impl Default for GpuRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuRenderer {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::default(),
            ambient: Color::rgb(0.15, 0.15, 0.15),
            plan: FramePlan::default(),
            pipelines: None,
            targets: None,
            globals_ubo: None,
            globals_bind_group: None,
            lights_ubo: None,
            quad_vbo: None,
            quad_ibo: None,
            instance_vbo: None,
            instance_capacity: 0,
            warned_light_overflow: false,
        }
    }

    /// Sets the logical drawable size reported to the stage.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Light applied to every lit surface before point and directional lights.
    pub fn set_ambient(&mut self, ambient: Color) {
        self.ambient = ambient;
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    /// Executes the presented plan against the surface and starts a fresh plan.
    ///
    /// Does nothing if the stage has not presented since the last flush.
    pub fn flush(&mut self, gpu: &Gpu<'_>, scale: f32) -> Result<(), wgpu::SurfaceError> {
        if !self.plan.presented {
            return Ok(());
        }
        if self.plan.dropped_quads > 0 {
            log::debug!("{} quads drawn outside a pass were dropped", self.plan.dropped_quads);
        }

        let size = gpu.size();
        if size.width == 0 || size.height == 0 {
            self.plan.reset();
            return Ok(());
        }

        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.plan.reset();
                return Err(e);
            }
        };

        self.ensure_pipelines(gpu);
        self.ensure_static_buffers(gpu);
        self.ensure_uniforms(gpu);
        if self.plan.three_d {
            self.ensure_targets(gpu, size.width, size.height);
        }
        self.write_uniforms(gpu, scale);

        let instances = self.upload_instances(gpu);
        self.encode(&mut frame.encoder, &frame.view, instances);

        gpu.submit(frame);
        self.plan.reset();
        Ok(())
    }

    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        ranges: InstanceRanges,
    ) {
        let Some(pipelines) = self.pipelines.as_ref() else { return };
        let clear: wgpu::Color = self.plan.clear.into();

        if self.plan.three_d {
            let Some(targets) = self.targets.as_ref() else { return };

            // Geometry into MRT.
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("stagehand geometry pass"),
                    color_attachments: &[
                        Some(color_attachment(&targets.color, wgpu::LoadOp::Clear(clear))),
                        Some(color_attachment(
                            &targets.normal_depth,
                            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        )),
                    ],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &targets.depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
                self.draw_quads(&mut pass, &pipelines.geometry, ranges.geometry);
            }

            // Lights into the light buffer.
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("stagehand lighting pass"),
                    color_attachments: &[Some(color_attachment(
                        &targets.light,
                        wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    ))],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
                pass.set_pipeline(&pipelines.lighting);
                pass.set_bind_group(0, &targets.lighting_bind_group, &[]);
                pass.draw(0..3, 0..1);
            }

            // Composite onto the surface.
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("stagehand composite pass"),
                    color_attachments: &[Some(color_attachment(
                        surface_view,
                        wgpu::LoadOp::Clear(clear),
                    ))],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
                pass.set_pipeline(&pipelines.composite);
                pass.set_bind_group(0, &targets.composite_bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        // Post-process and overlay share the flat pipeline over the surface.
        let load = if self.plan.three_d { wgpu::LoadOp::Load } else { wgpu::LoadOp::Clear(clear) };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("stagehand overlay pass"),
            color_attachments: &[Some(color_attachment(surface_view, load))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.draw_quads(&mut pass, &pipelines.flat, ranges.post);
        self.draw_quads(&mut pass, &pipelines.flat, ranges.overlay);
    }

    fn draw_quads(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipeline: &wgpu::RenderPipeline,
        range: std::ops::Range<u32>,
    ) {
        if range.is_empty() {
            return;
        }
        let Some(bind_group) = self.globals_bind_group.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, quad_vbo.slice(..));
        pass.set_vertex_buffer(1, instance_vbo.slice(..));
        pass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..6, 0, range);
    }

    // ── resources ─────────────────────────────────────────────────────────

    fn ensure_pipelines(&mut self, gpu: &Gpu<'_>) {
        let format = gpu.surface_format();
        if self.pipelines.as_ref().is_some_and(|p| p.format == format) {
            return;
        }
        log::debug!("building render pipelines for {format:?}");
        self.pipelines = Some(Pipelines::new(gpu.device(), format));
        // Bind groups reference the old layouts.
        self.targets = None;
        self.globals_bind_group = None;
    }

    fn ensure_static_buffers(&mut self, gpu: &Gpu<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }
        self.quad_vbo = Some(gpu.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stagehand quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.quad_ibo = Some(gpu.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stagehand quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn ensure_uniforms(&mut self, gpu: &Gpu<'_>) {
        let device = gpu.device();
        if self.globals_ubo.is_none() {
            self.globals_ubo = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("stagehand globals ubo"),
                size: std::mem::size_of::<GlobalsUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.globals_bind_group = None;
        }
        if self.lights_ubo.is_none() {
            self.lights_ubo = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("stagehand lights ubo"),
                size: std::mem::size_of::<LightsUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.targets = None;
        }
        if self.globals_bind_group.is_none() {
            let (Some(pipelines), Some(ubo)) = (self.pipelines.as_ref(), self.globals_ubo.as_ref())
            else {
                return;
            };
            self.globals_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("stagehand globals bind group"),
                layout: &pipelines.globals_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                }],
            }));
        }
    }

    fn ensure_targets(&mut self, gpu: &Gpu<'_>, width: u32, height: u32) {
        if self.targets.as_ref().is_some_and(|t| t.matches(width, height)) {
            return;
        }
        let (Some(pipelines), Some(lights_ubo)) = (self.pipelines.as_ref(), self.lights_ubo.as_ref())
        else {
            return;
        };
        log::debug!("allocating 3d targets at {width}x{height}");
        self.targets = Some(Targets::new(gpu.device(), pipelines, lights_ubo, width, height));
    }

    fn write_uniforms(&mut self, gpu: &Gpu<'_>, scale: f32) {
        let viewport = [self.viewport.width.max(1.0), self.viewport.height.max(1.0)];
        if let Some(ubo) = self.globals_ubo.as_ref() {
            let globals = GlobalsUniform { viewport, scale, depth_scale: DEPTH_SCALE };
            gpu.queue().write_buffer(ubo, 0, bytemuck::bytes_of(&globals));
        }

        if !self.plan.three_d {
            return;
        }
        let overflow = self.plan.points.len() > MAX_POINT_LIGHTS
            || self.plan.directionals.len() > MAX_DIRECTIONAL_LIGHTS;
        if overflow && !self.warned_light_overflow {
            log::warn!(
                "{} point / {} directional lights submitted; only {MAX_POINT_LIGHTS} / {MAX_DIRECTIONAL_LIGHTS} are drawn",
                self.plan.points.len(),
                self.plan.directionals.len()
            );
            self.warned_light_overflow = true;
        }
        let lights = pack_lights(&self.plan, self.ambient, viewport, scale);
        if let Some(ubo) = self.lights_ubo.as_ref() {
            gpu.queue().write_buffer(ubo, 0, bytemuck::bytes_of(&lights));
        }
    }

    /// Uploads every quad of the frame into one instance buffer.
    fn upload_instances(&mut self, gpu: &Gpu<'_>) -> InstanceRanges {
        let plan = &self.plan;
        let total = plan.geometry.len() + plan.post.len() + plan.overlay.len();
        let ranges = InstanceRanges::new(plan.geometry.len(), plan.post.len(), plan.overlay.len());
        if total == 0 {
            return ranges;
        }

        let raw: Vec<QuadInstance> = plan
            .geometry
            .iter()
            .chain(plan.post.iter())
            .chain(plan.overlay.iter())
            .map(quad_instance)
            .collect();

        if total > self.instance_capacity || self.instance_vbo.is_none() {
            let new_cap = total.next_power_of_two().max(64);
            self.instance_vbo = Some(gpu.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("stagehand quad instance vbo"),
                size: (new_cap * std::mem::size_of::<QuadInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.instance_capacity = new_cap;
        }
        if let Some(vbo) = self.instance_vbo.as_ref() {
            gpu.queue().write_buffer(vbo, 0, bytemuck::cast_slice(&raw));
        }
        ranges
    }
}

impl Renderer for GpuRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear_targets(&mut self, color: Color) {
        if self.plan.presented {
            // Previous frame was never flushed.
            self.plan.reset();
        }
        self.plan.clear = color;
    }

    fn begin_geometry_pass(&mut self) {
        self.plan.three_d = true;
        self.plan.pass = PlanPass::Geometry;
    }

    fn accumulate_lights(&mut self, points: &[PointLight], directionals: &[DirectionalLight]) {
        self.plan.points.extend_from_slice(points);
        self.plan.directionals.extend_from_slice(directionals);
        self.plan.pass = PlanPass::None;
    }

    fn composite(&mut self) {
        self.plan.pass = PlanPass::None;
    }

    fn begin_post_process(&mut self) {
        self.plan.pass = PlanPass::PostProcess;
    }

    fn begin_overlay(&mut self) {
        self.plan.pass = PlanPass::Overlay;
    }

    fn draw_quad(&mut self, quad: Quad) {
        if quad.rect.is_empty() {
            return;
        }
        self.plan.push(quad);
    }

    fn present(&mut self) {
        self.plan.pass = PlanPass::None;
        self.plan.presented = true;
    }
}

// ── helpers ───────────────────────────────────────────────────────────────

struct InstanceRanges {
    geometry: std::ops::Range<u32>,
    post: std::ops::Range<u32>,
    overlay: std::ops::Range<u32>,
}

impl InstanceRanges {
    fn new(geometry: usize, post: usize, overlay: usize) -> Self {
        let g = geometry as u32;
        let p = g + post as u32;
        let o = p + overlay as u32;
        Self { geometry: 0..g, post: g..p, overlay: p..o }
    }
}

fn quad_instance(q: &Quad) -> QuadInstance {
    QuadInstance {
        rect: [q.rect.x, q.rect.y, q.rect.w, q.rect.h],
        color: q.color.to_array(),
        depth: q.depth,
        _pad: [0.0; 3],
    }
}

fn pack_lights(plan: &FramePlan, ambient: Color, viewport: [f32; 2], scale: f32) -> LightsUniform {
    if plan.points.len() > MAX_POINT_LIGHTS || plan.directionals.len() > MAX_DIRECTIONAL_LIGHTS {
        log::debug!(
            "dropping lights past the limit: {} point, {} directional",
            plan.points.len().saturating_sub(MAX_POINT_LIGHTS),
            plan.directionals.len().saturating_sub(MAX_DIRECTIONAL_LIGHTS)
        );
    }

    let mut points = [GpuPointLight::default(); MAX_POINT_LIGHTS];
    for (slot, light) in points.iter_mut().zip(&plan.points) {
        let [x, y, z] = light.position;
        *slot = GpuPointLight {
            position_radius: [x, y, z, light.radius],
            color: [light.color.r, light.color.g, light.color.b, light.intensity],
        };
    }

    let mut directionals = [GpuDirectionalLight::default(); MAX_DIRECTIONAL_LIGHTS];
    for (slot, light) in directionals.iter_mut().zip(&plan.directionals) {
        let [x, y, z] = light.direction;
        *slot = GpuDirectionalLight {
            direction: [x, y, z, 0.0],
            color: [light.color.r, light.color.g, light.color.b, light.intensity],
        };
    }

    LightsUniform {
        viewport,
        scale,
        depth_scale: DEPTH_SCALE,
        ambient: ambient.to_array(),
        counts: [
            plan.points.len().min(MAX_POINT_LIGHTS) as u32,
            plan.directionals.len().min(MAX_DIRECTIONAL_LIGHTS) as u32,
            0,
            0,
        ],
        points,
        directionals,
    }
}

fn color_attachment<'a>(
    view: &'a wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPassColorAttachment<'a> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Rect;

    fn quad(x: f32) -> Quad {
        Quad::new(Rect::new(x, 0.0, 10.0, 10.0), Color::WHITE)
    }

    #[test]
    fn quads_land_in_the_pass_begun_last() {
        let mut r = GpuRenderer::new();
        r.clear_targets(Color::BLACK);
        r.begin_geometry_pass();
        r.draw_quad(quad(1.0));
        r.accumulate_lights(&[PointLight::new([0.0, 0.0, 1.0], Color::WHITE, 50.0)], &[]);
        r.composite();
        r.begin_post_process();
        r.draw_quad(quad(2.0));
        r.begin_overlay();
        r.draw_quad(quad(3.0));
        r.draw_quad(quad(4.0));
        r.present();

        let plan = r.plan();
        assert!(plan.three_d && plan.presented);
        assert_eq!(plan.geometry, vec![quad(1.0)]);
        assert_eq!(plan.post, vec![quad(2.0)]);
        assert_eq!(plan.overlay, vec![quad(3.0), quad(4.0)]);
        assert_eq!(plan.points.len(), 1);
    }

    #[test]
    fn quads_outside_a_pass_are_dropped() {
        let mut r = GpuRenderer::new();
        r.clear_targets(Color::BLACK);
        r.draw_quad(quad(0.0));
        r.begin_overlay();
        r.draw_quad(Quad::new(Rect::new(0.0, 0.0, 0.0, 5.0), Color::WHITE));
        assert!(r.plan().overlay.is_empty());
        assert_eq!(r.plan().dropped_quads, 1);
    }

    #[test]
    fn unflushed_frame_is_replaced_by_the_next() {
        let mut r = GpuRenderer::new();
        r.clear_targets(Color::BLACK);
        r.begin_overlay();
        r.draw_quad(quad(0.0));
        r.present();

        r.clear_targets(Color::WHITE);
        assert!(r.plan().overlay.is_empty());
        assert!(!r.plan().presented);
        assert_eq!(r.plan().clear, Color::WHITE);
    }

    #[test]
    fn light_packing_caps_counts() {
        let mut plan = FramePlan::default();
        plan.points = vec![PointLight::new([1.0, 2.0, 0.5], Color::rgb(1.0, 0.0, 0.0), 10.0); 40];
        plan.directionals = vec![DirectionalLight::new([0.0, 0.0, -1.0], Color::WHITE)];
        let packed = pack_lights(&plan, Color::BLACK, [100.0, 100.0], 1.0);
        assert_eq!(packed.counts[0], MAX_POINT_LIGHTS as u32);
        assert_eq!(packed.counts[1], 1);
        assert_eq!(packed.points[0].position_radius, [1.0, 2.0, 0.5, 10.0]);
        assert_eq!(packed.points[0].color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn instance_ranges_are_contiguous() {
        let r = InstanceRanges::new(2, 0, 3);
        assert_eq!(r.geometry, 0..2);
        assert_eq!(r.post, 2..2);
        assert_eq!(r.overlay, 2..5);
    }
}
