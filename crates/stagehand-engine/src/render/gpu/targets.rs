use super::pipelines::{
    Pipelines, COLOR_FORMAT, DEPTH_FORMAT, LIGHT_FORMAT, NORMAL_DEPTH_FORMAT,
};

/// Offscreen targets for the 3D passes, sized to the surface in physical pixels.
///
/// Recreated whenever the surface size changes. The bind groups reference the views,
/// so they live and die with them.
pub(super) struct Targets {
    pub width: u32,
    pub height: u32,
    pub color: wgpu::TextureView,
    pub normal_depth: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub light: wgpu::TextureView,
    pub lighting_bind_group: wgpu::BindGroup,
    pub composite_bind_group: wgpu::BindGroup,
}

impl Targets {
    pub fn new(
        device: &wgpu::Device,
        pipelines: &Pipelines,
        lights_ubo: &wgpu::Buffer,
        width: u32,
        height: u32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let color = target_view(device, "stagehand mrt color", COLOR_FORMAT, width, height);
        let normal_depth =
            target_view(device, "stagehand mrt normal/depth", NORMAL_DEPTH_FORMAT, width, height);
        let depth = target_view(device, "stagehand mrt depth", DEPTH_FORMAT, width, height);
        let light = target_view(device, "stagehand light buffer", LIGHT_FORMAT, width, height);

        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stagehand lighting bind group"),
            layout: &pipelines.lighting_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lights_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&normal_depth),
                },
            ],
        });

        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stagehand composite bind group"),
            layout: &pipelines.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&light),
                },
            ],
        });

        Self {
            width,
            height,
            color,
            normal_depth,
            depth,
            light,
            lighting_bind_group,
            composite_bind_group,
        }
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width.max(1) && self.height == height.max(1)
    }
}

fn target_view(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let usage = if format == DEPTH_FORMAT {
        wgpu::TextureUsages::RENDER_ATTACHMENT
    } else {
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
