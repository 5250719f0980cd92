use std::fmt;
use std::time::Instant;

use scheduler::{BufferSlot, ComputeParams, FeedbackStages, PresentParams};

use super::context::GpuContext;
use super::pipeline::{
    create_compute_pipeline, create_feedback_pipeline, PipelineLayouts, QuadGeometry,
};
use super::textures::FeedbackTexture;
use super::uniforms::FeedbackUniforms;

/// Fatal failure of a compute or present pass.
#[derive(Debug)]
pub enum StageError {
    Surface(wgpu::SurfaceError),
    Device(wgpu::Error),
    /// The compute pass was handed the same buffer as input and output.
    AliasedBuffers(BufferSlot),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Surface(err) => write!(f, "surface error: {err:?}"),
            StageError::Device(err) => write!(f, "device error: {err}"),
            StageError::AliasedBuffers(slot) => {
                write!(f, "compute pass would read and write buffer {slot}")
            }
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StageError::Surface(err) => Some(err),
            StageError::Device(err) => Some(err),
            StageError::AliasedBuffers(_) => None,
        }
    }
}

impl From<wgpu::SurfaceError> for StageError {
    fn from(value: wgpu::SurfaceError) -> Self {
        StageError::Surface(value)
    }
}

/// What the present stage does about a failed frame acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SurfaceAction {
    /// Reconfigure the swapchain and skip this present.
    Reconfigure,
    /// Skip this present; the next one may succeed.
    Skip,
    Fatal,
}

pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceAction::Reconfigure,
        wgpu::SurfaceError::Timeout => SurfaceAction::Skip,
        wgpu::SurfaceError::OutOfMemory => SurfaceAction::Fatal,
        _ => SurfaceAction::Fatal,
    }
}

/// Byte size of the per-stage uniform buffer.
const UNIFORM_BUFFER_SIZE: wgpu::BufferAddress =
    std::mem::size_of::<FeedbackUniforms>() as wgpu::BufferAddress;

/// Uniform buffer owned by one stage. Uploads go through `Queue::write_buffer`
/// ahead of the pass's own submission.
struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new(device: &wgpu::Device, layouts: &PipelineLayouts, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: UNIFORM_BUFFER_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn upload(&self, queue: &wgpu::Queue, uniforms: &FeedbackUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

/// Records a single quad draw into `target`.
fn encode_quad_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    uniforms: &wgpu::BindGroup,
    input: &wgpu::BindGroup,
    quad: &QuadGeometry,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, uniforms, &[]);
    render_pass.set_bind_group(1, input, &[]);
    render_pass.set_vertex_buffer(0, quad.vertex_buffer.slice(..));
    render_pass.draw(0..quad.vertex_count, 0..1);
}

/// Brackets device work so validation and out-of-memory errors come back as
/// values instead of hitting the uncaptured-error handler.
fn with_device_errors<T>(
    device: &wgpu::Device,
    work: impl FnOnce() -> Result<T, StageError>,
) -> Result<T, StageError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = work();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(err) => Err(StageError::Device(err)),
        None => result,
    }
}

/// Advances the iterate: reads one feedback buffer and renders into the other.
pub(crate) struct ComputeStage {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformSlot,
}

impl ComputeStage {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        fragment_module: &wgpu::ShaderModule,
    ) -> Self {
        Self {
            pipeline: create_compute_pipeline(device, layouts, fragment_module),
            uniforms: UniformSlot::new(device, layouts, "compute uniforms"),
        }
    }

    /// Submits one compute pass. The submission is complete, from the
    /// queue's point of view, before any later present pass is recorded.
    pub fn run_step(
        &self,
        context: &GpuContext,
        quad: &QuadGeometry,
        input: &FeedbackTexture,
        output: &FeedbackTexture,
        params: &ComputeParams,
    ) -> Result<(), StageError> {
        if input.slot() == output.slot() {
            return Err(StageError::AliasedBuffers(input.slot()));
        }

        with_device_errors(&context.device, || {
            let mut encoder = context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("feedback compute encoder"),
                });
            self.uniforms.upload(&context.queue, &FeedbackUniforms::compute(params));
            encode_quad_pass(
                &mut encoder,
                "feedback compute pass",
                &output.view,
                &self.pipeline,
                &self.uniforms.bind_group,
                &input.input_bind_group,
                quad,
            );
            context.queue.submit(Some(encoder.finish()));
            Ok(())
        })
    }
}

/// Colorizes the freshly written buffer onto the visible surface.
pub(crate) struct PresentStage {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformSlot,
}

impl PresentStage {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        fragment_module: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            pipeline: create_feedback_pipeline(
                device,
                layouts,
                fragment_module,
                "feedback present pipeline",
                surface_format,
            ),
            uniforms: UniformSlot::new(device, layouts, "present uniforms"),
        }
    }

    /// Lost or outdated surfaces are reconfigured and a timeout is waited
    /// out; both skip this present without failing the step.
    pub fn run_step(
        &self,
        context: &GpuContext,
        quad: &QuadGeometry,
        input: &FeedbackTexture,
        params: &PresentParams,
    ) -> Result<(), StageError> {
        let frame = match context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                return match classify_surface_error(&err) {
                    SurfaceAction::Reconfigure => {
                        tracing::warn!(error = ?err, "surface lost or outdated; reconfiguring");
                        context.reconfigure();
                        Ok(())
                    }
                    SurfaceAction::Skip => {
                        tracing::warn!("surface timeout; skipping present");
                        Ok(())
                    }
                    SurfaceAction::Fatal => Err(StageError::from(err)),
                };
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        with_device_errors(&context.device, || {
            let mut encoder = context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("feedback present encoder"),
                });
            self.uniforms.upload(&context.queue, &FeedbackUniforms::present(params));
            encode_quad_pass(
                &mut encoder,
                "feedback present pass",
                &view,
                &self.pipeline,
                &self.uniforms.bind_group,
                &input.input_bind_group,
                quad,
            );
            context.queue.submit(Some(encoder.finish()));
            Ok(())
        })?;
        frame.present();
        Ok(())
    }
}

/// The wgpu side of the feedback loop, driven by the scheduler.
pub(crate) struct GpuStages {
    pub context: GpuContext,
    quad: QuadGeometry,
    compute: ComputeStage,
    present: PresentStage,
}

impl GpuStages {
    pub fn new(
        context: GpuContext,
        layouts: &PipelineLayouts,
        fragment_module: &wgpu::ShaderModule,
    ) -> Self {
        let quad = QuadGeometry::new(&context.device);
        let compute = ComputeStage::new(&context.device, layouts, fragment_module);
        let present = PresentStage::new(
            &context.device,
            layouts,
            fragment_module,
            context.surface_format,
        );
        Self {
            context,
            quad,
            compute,
            present,
        }
    }
}

impl FeedbackStages for GpuStages {
    type Buffer = FeedbackTexture;
    type Error = StageError;

    fn compute(
        &mut self,
        input: &FeedbackTexture,
        output: &FeedbackTexture,
        params: &ComputeParams,
    ) -> Result<(), StageError> {
        let started = Instant::now();
        self.compute
            .run_step(&self.context, &self.quad, input, output, params)?;
        tracing::trace!(
            input = %input.slot(),
            output = %output.slot(),
            reset = params.reset,
            elapsed_us = started.elapsed().as_micros(),
            "compute pass submitted"
        );
        Ok(())
    }

    fn present(
        &mut self,
        input: &FeedbackTexture,
        params: &PresentParams,
    ) -> Result<(), StageError> {
        let started = Instant::now();
        self.present
            .run_step(&self.context, &self.quad, input, params)?;
        tracing::trace!(
            input = %input.slot(),
            elapsed_us = started.elapsed().as_micros(),
            "present pass submitted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_surface_errors_do_not_halt() {
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Lost),
            SurfaceAction::Reconfigure
        );
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Outdated),
            SurfaceAction::Reconfigure
        );
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::Timeout),
            SurfaceAction::Skip
        );
    }

    #[test]
    fn out_of_memory_is_fatal() {
        assert_eq!(
            classify_surface_error(&wgpu::SurfaceError::OutOfMemory),
            SurfaceAction::Fatal
        );
        let err = StageError::from(wgpu::SurfaceError::OutOfMemory);
        assert!(err.to_string().contains("OutOfMemory"));
    }

    #[test]
    fn uniform_writes_fill_the_stage_buffer() {
        let uniforms = FeedbackUniforms::present(&PresentParams {
            dimensions: scheduler::Dimensions::new(4, 4),
        });
        let len = bytemuck::bytes_of(&uniforms).len() as wgpu::BufferAddress;
        assert_eq!(len, UNIFORM_BUFFER_SIZE);
        assert_eq!(len % wgpu::COPY_BUFFER_ALIGNMENT, 0);
    }

    #[test]
    fn aliased_buffers_name_the_slot() {
        let err = StageError::AliasedBuffers(BufferSlot::B);
        assert_eq!(err.to_string(), "compute pass would read and write buffer B");
    }
}
