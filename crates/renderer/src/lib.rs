//! Renderer crate for feedbrot.
//!
//! Glues the `scheduler` state machine to `wgpu` and a `winit` preview
//! window. The overall flow is:
//!
//! ```text
//!   CLI / feedbrot
//!          │ RendererConfig + compute program source
//!          ▼
//!   run_window ──▶ FeedbackSession::initialize ──▶ winit event loop
//!                                                      │
//!          clicks ──▶ request_zoom ──▶ ViewportState    │ RedrawRequested
//!                                                      ▼
//!                         FeedbackSession::tick ──▶ ComputeStage ──▶ PresentStage
//! ```
//!
//! The compute program is a single GLSL fragment shader that serves both
//! passes; `u_render` tells it whether to iterate (0) or colorize (1). It is
//! wrapped at runtime so it compiles as Vulkan-style GLSL against the
//! uniform block and input texture bindings declared here.

mod compile;
mod gpu;
mod session;
mod types;
mod window;

pub use gpu::{FeedbackTexture, StageError};
pub use session::FeedbackSession;
pub use types::{AdapterProfile, GpuPowerPreference, RendererConfig};
pub use window::run_window;
