use std::time::Duration;

use scheduler::{Dimensions, Domain, RecenterMode, DEFAULT_MAX_ITERATIONS};

/// Adapter selection bias forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    High,
    Low,
}

/// Summary of the adapter a session ended up on, kept for logging.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Mirrors the resolved session config plus CLI overrides. `dimensions` is
/// the size of both feedback buffers and of the preview window.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub dimensions: Dimensions,
    /// Minimum spacing between feedback steps.
    pub min_frame_interval: Duration,
    pub max_iterations: u32,
    pub domain: Domain,
    pub recenter: RecenterMode,
    /// Scale applied by a zoom-in request (`< 1`).
    pub zoom_in_factor: f64,
    /// Scale applied by a zoom-out request (`> 1`).
    pub zoom_out_factor: f64,
    pub restart_on_remap: bool,
    pub power: GpuPowerPreference,
    pub vsync: bool,
    pub title: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::new(1000, 1000),
            min_frame_interval: Duration::from_secs_f64(1.0 / 30.0),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            domain: Domain::default(),
            recenter: RecenterMode::default(),
            zoom_in_factor: 0.5,
            zoom_out_factor: 2.0,
            restart_on_remap: true,
            power: GpuPowerPreference::default(),
            vsync: true,
            title: "feedbrot".to_string(),
        }
    }
}

impl RendererConfig {
    pub(crate) fn zoom_factor(&self, zoom_in: bool) -> f64 {
        if zoom_in {
            self.zoom_in_factor
        } else {
            self.zoom_out_factor
        }
    }
}
