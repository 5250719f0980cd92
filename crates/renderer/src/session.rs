use std::time::Instant;

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scheduler::{
    Dimensions, Domain, DualSurface, FrameScheduler, PacingClock, SchedulerError,
    SchedulerOptions, SchedulerState, TickOutcome, ViewportState,
};
use tracing::{debug, info, warn};

use crate::compile::compile_fragment_shader;
use crate::gpu::{FeedbackTexture, GpuContext, GpuStages, PipelineLayouts, StageError};
use crate::types::{AdapterProfile, RendererConfig};

/// A running feedback loop bound to one visible surface.
///
/// The host calls [`FeedbackSession::tick`] once per frame signal and
/// forwards zoom input through [`FeedbackSession::request_zoom`].
pub struct FeedbackSession {
    scheduler: FrameScheduler<FeedbackTexture>,
    stages: GpuStages,
    zoom_in_factor: f64,
    zoom_out_factor: f64,
}

impl FeedbackSession {
    /// One-time setup: device, capability checks, program compilation and
    /// both feedback buffers. Every failure here is fatal.
    ///
    /// `target` must outlive the session.
    pub fn initialize<T>(target: &T, config: &RendererConfig, source: &str) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let dimensions = config.dimensions;
        let context = GpuContext::new(target, dimensions, config.power, config.vsync)
            .context("failed to initialise GPU context")?;
        if context.adapter_profile.is_software() {
            warn!(
                adapter = %context.adapter_profile.name,
                "software rasterizer detected; feedback steps will be slow"
            );
        }

        let layouts = PipelineLayouts::new(&context.device)?;
        let fragment_module = compile_fragment_shader(&context.device, source)?;
        let surface = DualSurface::allocate(dimensions, |slot, dims| {
            FeedbackTexture::new(&context.device, &layouts, slot, dims)
        })?;
        let stages = GpuStages::new(context, &layouts, &fragment_module);

        let viewport = ViewportState::new(config.domain, config.recenter);
        let mut scheduler = FrameScheduler::new(
            surface,
            viewport,
            SchedulerOptions {
                max_iterations: config.max_iterations,
                pacing: PacingClock::new(config.min_frame_interval),
                restart_on_remap: config.restart_on_remap,
            },
        );
        scheduler.start();

        info!(
            %dimensions,
            adapter = %stages.context.adapter_profile.name,
            interval_ms = config.min_frame_interval.as_millis(),
            max_iterations = config.max_iterations,
            "feedback session initialised"
        );

        Ok(Self {
            scheduler,
            stages,
            zoom_in_factor: config.zoom_factor(true),
            zoom_out_factor: config.zoom_factor(false),
        })
    }

    /// Maps `screen_point` (surface pixels, top-left origin) into the
    /// current domain and zooms around it. Returns whether the zoom was
    /// accepted; rejected requests leave the session untouched.
    pub fn request_zoom(&mut self, screen_point: [f64; 2], zoom_in: bool) -> bool {
        let domain = self.scheduler.viewport().domain();
        let point = domain.point_at(screen_point, self.scheduler.dimensions());
        let scale = if zoom_in {
            self.zoom_in_factor
        } else {
            self.zoom_out_factor
        };

        let accepted = self.scheduler.remap(point, scale);
        if accepted {
            let domain = self.scheduler.viewport().domain();
            info!(
                x = ?[domain.x.min, domain.x.max],
                y = ?[domain.y.min, domain.y.max],
                zoom_in,
                "domain remapped"
            );
        } else {
            warn!(?screen_point, ?point, scale, "zoom request rejected");
        }
        accepted
    }

    /// Advances the scheduler by one host frame signal.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, SchedulerError<StageError>> {
        let outcome = self.scheduler.tick(now, &mut self.stages)?;
        if let TickOutcome::Stepped { reset, remaining } = outcome {
            debug!(reset, remaining, "feedback step presented");
        }
        Ok(outcome)
    }

    /// Re-arms an exhausted loop without changing the domain.
    pub fn restart(&mut self) -> bool {
        self.scheduler.restart()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn domain(&self) -> Domain {
        self.scheduler.viewport().domain()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.scheduler.dimensions()
    }

    pub fn steps_completed(&self) -> u64 {
        self.scheduler.steps_completed()
    }

    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        self.scheduler.next_deadline(now)
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.stages.context.adapter_profile
    }
}
