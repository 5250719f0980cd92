use anyhow::{anyhow, Result};
use scheduler::{BufferSlot, Dimensions};

use super::context::FEEDBACK_FORMAT;
use super::pipeline::PipelineLayouts;

/// One of the two float color buffers, with the bind group that exposes it
/// as pass input.
pub struct FeedbackTexture {
    pub(crate) slot: BufferSlot,
    pub(crate) _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) input_bind_group: wgpu::BindGroup,
}

impl FeedbackTexture {
    /// Allocation failures are fatal to the session.
    pub(crate) fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        slot: BufferSlot,
        dimensions: Dimensions,
    ) -> Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let label = format!("feedback buffer {slot}");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: dimensions.width,
                height: dimensions.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FEEDBACK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let input_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: &layouts.input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&layouts.input_sampler),
                },
            ],
        });

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(anyhow!(
                "failed to allocate {dimensions} feedback buffer {slot}: {err}"
            ));
        }

        tracing::debug!(%slot, %dimensions, "allocated feedback buffer");
        Ok(Self {
            slot,
            _texture: texture,
            view,
            input_bind_group,
        })
    }

    pub fn slot(&self) -> BufferSlot {
        self.slot
    }
}
