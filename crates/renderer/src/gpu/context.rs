use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scheduler::Dimensions;

use crate::types::{AdapterProfile, GpuPowerPreference};

/// Storage format of both feedback buffers. Four 32-bit float channels hold
/// the raw iterate (e.g. `z`, an escape counter and a flag).
pub(crate) const FEEDBACK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Instance, device and visible surface shared by both stages.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    /// Creates the device and a surface for `target`, failing with a message
    /// that names the missing capability when the adapter cannot host the
    /// feedback loop.
    ///
    /// `target` must outlive the returned context.
    pub(crate) fn new<T>(
        target: &T,
        dimensions: Dimensions,
        gpu_power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        if dimensions.is_empty() {
            anyhow::bail!("feedback buffers need non-zero dimensions, got {dimensions}");
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // SAFETY: callers keep the window alive for as long as the context.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let power_preference = match gpu_power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if dimensions.width > max_dimension || dimensions.height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested feedback buffers are {dimensions}"
            );
        }

        let feedback_features = adapter.get_texture_format_features(FEEDBACK_FORMAT);
        let required_usage =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !feedback_features.allowed_usages.contains(required_usage) {
            anyhow::bail!(
                "adapter '{}' cannot render to {FEEDBACK_FORMAT:?} textures (floating-point color buffers are required)",
                adapter_profile.name
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface is not compatible with the selected adapter"))?;
        if surface_format.is_srgb() {
            tracing::warn!(
                ?surface_format,
                "no linear (non-sRGB) surface format available; colors will be gamma-encoded twice"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("feedbrot device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let present_mode = select_present_mode(&surface_caps.present_modes, vsync);
        tracing::debug!(?present_mode, vsync, "using present mode");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: dimensions.width,
            height: dimensions.height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            surface_format,
            adapter_profile,
        })
    }

    /// Re-applies the surface configuration after the swapchain was lost or
    /// went out of date. The extent always matches the feedback buffers.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

/// Prefers `Fifo` with vsync, otherwise `Immediate`, then `Mailbox`.
fn select_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    let find = |wanted: wgpu::PresentMode| modes.iter().copied().find(|mode| *mode == wanted);
    let fifo = find(wgpu::PresentMode::Fifo).unwrap_or(wgpu::PresentMode::Fifo);
    if vsync {
        return fifo;
    }
    find(wgpu::PresentMode::Immediate)
        .or_else(|| find(wgpu::PresentMode::Mailbox))
        .unwrap_or(fifo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_selects_fifo() {
        let modes = [wgpu::PresentMode::Immediate, wgpu::PresentMode::Fifo];
        assert_eq!(select_present_mode(&modes, true), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn no_vsync_prefers_immediate_then_mailbox() {
        let modes = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox];
        assert_eq!(select_present_mode(&modes, false), wgpu::PresentMode::Mailbox);
        let modes = [wgpu::PresentMode::Fifo];
        assert_eq!(select_present_mode(&modes, false), wgpu::PresentMode::Fifo);
    }
}
