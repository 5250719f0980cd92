//! Ping-pong feedback scheduling without any GPU dependency.
//!
//! The crate owns the state that decides *when* and *with what* a feedback
//! step runs; the actual draw calls live behind [`FeedbackStages`] so the
//! renderer can plug in wgpu while tests plug in a recorder.
//!
//! ```text
//!   host frame signal ──▶ FrameScheduler::tick(now)
//!                              │ pacing due?
//!                              ▼
//!        compute(current ──▶ next, domain, reset) ──▶ present(next)
//!                              │
//!                              ▼
//!                  DualSurface::swap, budget -= 1
//! ```

mod pacing;
mod params;
mod surface;
mod viewport;

use std::time::Instant;

use tracing::{debug, error, info, trace};

pub use pacing::{PacingClock, MAX_FRAME_INTERVAL};
pub use params::{ComputeParams, Dimensions, PresentParams};
pub use surface::{BufferSlot, DualSurface};
pub use viewport::{AxisRange, Domain, DomainError, RecenterMode, ViewportState};

/// Default number of feedback steps run after every reset.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Issues the two draw passes of a feedback step.
///
/// Implementations must treat every error as fatal: the scheduler never
/// retries a step and halts after the first failure.
pub trait FeedbackStages {
    type Buffer;
    type Error: std::error::Error + 'static;

    /// Renders one iterate of `input` into `output`. The two never alias.
    fn compute(
        &mut self,
        input: &Self::Buffer,
        output: &Self::Buffer,
        params: &ComputeParams,
    ) -> Result<(), Self::Error>;

    /// Colorizes `input` onto the visible surface. All work submitted by the
    /// preceding `compute` must be visible to this pass.
    fn present(&mut self, input: &Self::Buffer, params: &PresentParams)
        -> Result<(), Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError<E: std::error::Error + 'static> {
    #[error("feedback step failed: {0}")]
    Stage(#[source] E),
    #[error("scheduler halted after an earlier feedback step failed")]
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed but not started.
    Idle,
    /// Waiting for the pacing interval to elapse.
    Armed,
    /// Inside a compute + present cycle.
    Stepping,
    /// Budget spent; no GPU work until a restart.
    Exhausted,
    /// A stage reported a fatal error.
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NotStarted,
    /// Pacing interval has not elapsed; nothing was issued.
    Waiting { until: Instant },
    /// One compute + present cycle ran.
    Stepped { reset: bool, remaining: u32 },
    Exhausted,
}

/// Counts down the feedback steps left before the loop goes idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationBudget {
    max: u32,
    remaining: u32,
}

impl IterationBudget {
    /// A zero budget is bumped to one so a reset always produces a frame.
    pub fn new(max: u32) -> Self {
        let max = max.max(1);
        Self {
            max,
            remaining: max,
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn refill(&mut self) {
        self.remaining = self.max;
    }

    pub fn consume(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub max_iterations: u32,
    pub pacing: PacingClock,
    /// Re-arm an exhausted scheduler when the domain is remapped.
    pub restart_on_remap: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            pacing: PacingClock::from_fps(30.0),
            restart_on_remap: true,
        }
    }
}

/// State machine driving the compute → present → swap loop.
///
/// Host integration is a single [`FrameScheduler::tick`] per external frame
/// signal; the scheduler decides whether that signal does any work.
pub struct FrameScheduler<B> {
    surface: DualSurface<B>,
    viewport: ViewportState,
    clock: PacingClock,
    budget: IterationBudget,
    state: SchedulerState,
    restart_on_remap: bool,
    steps: u64,
}

impl<B> FrameScheduler<B> {
    pub fn new(surface: DualSurface<B>, viewport: ViewportState, options: SchedulerOptions) -> Self {
        Self {
            surface,
            viewport,
            clock: options.pacing,
            budget: IterationBudget::new(options.max_iterations),
            state: SchedulerState::Idle,
            restart_on_remap: options.restart_on_remap,
            steps: 0,
        }
    }

    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle {
            debug!(
                budget = self.budget.max(),
                interval_ms = self.clock.min_interval().as_millis(),
                "feedback scheduler armed"
            );
            self.state = SchedulerState::Armed;
        }
    }

    /// Re-arms an exhausted scheduler with a full budget, keeping the
    /// accumulated buffers and the current domain.
    pub fn restart(&mut self) -> bool {
        match self.state {
            SchedulerState::Exhausted => {
                self.budget.refill();
                self.state = SchedulerState::Armed;
                info!(budget = self.budget.max(), "feedback scheduler restarted");
                true
            }
            _ => false,
        }
    }

    pub fn remap(&mut self, point: [f64; 2], scale: f64) -> bool {
        self.viewport.remap(point, scale)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn surface(&self) -> &DualSurface<B> {
        &self.surface
    }

    pub fn dimensions(&self) -> Dimensions {
        self.surface.dimensions()
    }

    pub fn remaining(&self) -> u32 {
        self.budget.remaining()
    }

    /// Steps run since the session started, across every reset.
    pub fn steps_completed(&self) -> u64 {
        self.steps
    }

    /// When the host should deliver the next frame signal. `None` while not
    /// armed; an armed scheduler that has never stepped is due immediately.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if self.wants_frames() {
            Some(self.clock.next_deadline().unwrap_or(now))
        } else {
            None
        }
    }

    /// True while ticks may lead to GPU work.
    pub fn wants_frames(&self) -> bool {
        match self.state {
            SchedulerState::Armed | SchedulerState::Stepping => true,
            SchedulerState::Exhausted => self.restart_on_remap && self.viewport.reset_pending(),
            SchedulerState::Idle | SchedulerState::Faulted => false,
        }
    }

    pub fn tick<S>(
        &mut self,
        now: Instant,
        stages: &mut S,
    ) -> Result<TickOutcome, SchedulerError<S::Error>>
    where
        S: FeedbackStages<Buffer = B>,
    {
        match self.state {
            SchedulerState::Idle => return Ok(TickOutcome::NotStarted),
            SchedulerState::Faulted => return Err(SchedulerError::Faulted),
            SchedulerState::Exhausted => {
                if self.restart_on_remap && self.viewport.reset_pending() {
                    info!("domain remapped after exhaustion; re-arming feedback loop");
                    self.state = SchedulerState::Armed;
                } else {
                    return Ok(TickOutcome::Exhausted);
                }
            }
            SchedulerState::Armed | SchedulerState::Stepping => {}
        }

        if !self.clock.is_due(now) {
            let until = self.clock.next_deadline().unwrap_or(now);
            trace!(
                wait_ms = until.saturating_duration_since(now).as_millis(),
                "pacing interval not elapsed"
            );
            return Ok(TickOutcome::Waiting { until });
        }

        self.state = SchedulerState::Stepping;
        let reset = match self.step(stages) {
            Ok(reset) => reset,
            Err(err) => {
                self.state = SchedulerState::Faulted;
                error!(error = %err, step = self.steps, "feedback step failed; halting");
                return Err(SchedulerError::Stage(err));
            }
        };

        self.clock.record(now);
        let remaining = self.budget.remaining();
        if self.budget.is_exhausted() {
            self.state = SchedulerState::Exhausted;
            info!(steps = self.steps, "iteration budget exhausted");
        } else {
            self.state = SchedulerState::Armed;
        }
        Ok(TickOutcome::Stepped { reset, remaining })
    }

    fn step<S>(&mut self, stages: &mut S) -> Result<bool, S::Error>
    where
        S: FeedbackStages<Buffer = B>,
    {
        debug_assert_ne!(self.surface.current_slot(), self.surface.next_slot());
        let dimensions = self.surface.dimensions();
        let reset = self.viewport.reset_pending();
        let compute = ComputeParams {
            dimensions,
            domain: self.viewport.domain(),
            reset,
        };
        stages.compute(self.surface.current(), self.surface.next(), &compute)?;
        if reset {
            self.viewport.clear_reset();
            self.budget.refill();
        }

        stages.present(self.surface.next(), &PresentParams { dimensions })?;
        self.surface.swap();
        self.budget.consume();
        self.steps += 1;
        trace!(
            step = self.steps,
            reset,
            remaining = self.budget.remaining(),
            current = %self.surface.current_slot(),
            "feedback step complete"
        );
        Ok(reset)
    }
}
