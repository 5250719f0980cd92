//! wgpu side of the feedback loop.
//!
//! - `context` owns instance/device/surface wiring and refuses adapters that
//!   cannot render into float color buffers.
//! - `pipeline` holds the bind group layouts, the shared full-screen quad and
//!   the pipeline builder used by both passes.
//! - `textures` allocates the two feedback buffers.
//! - `uniforms` mirrors the `FeedbackParams` block of the shader header.
//! - `stages` implements `scheduler::FeedbackStages` with one compute and
//!   one present pass per step.

mod context;
mod pipeline;
mod stages;
mod textures;
mod uniforms;

pub(crate) use context::GpuContext;
pub(crate) use pipeline::PipelineLayouts;
pub use stages::StageError;
pub(crate) use stages::GpuStages;
pub use textures::FeedbackTexture;
