use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::compile::compile_vertex_shader;

use super::context::FEEDBACK_FORMAT;

/// Layouts and the vertex module shared by the compute and present pipelines.
///
/// Group 0 carries the uniform block, group 1 the input buffer.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub input_layout: wgpu::BindGroupLayout,
    pub input_sampler: wgpu::Sampler,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("feedback uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Float32 textures are not filterable; shaders read them with
        // texelFetch so a non-filtering sampler is enough.
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("feedback input layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let input_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("feedback input sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vertex_module = compile_vertex_shader(device)?;

        Ok(Self {
            uniform_layout,
            input_layout,
            input_sampler,
            vertex_module,
        })
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub position: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering clip space.
pub(crate) const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0] },
];

/// The static full-screen quad drawn by both passes.
pub(crate) struct QuadGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

impl QuadGeometry {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("feedback quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex_buffer,
            vertex_count: QUAD_VERTICES.len() as u32,
        }
    }
}

/// Builds one render pipeline over the shared fragment module. Compute and
/// present differ only in their color target.
pub(crate) fn create_feedback_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    fragment_module: &wgpu::ShaderModule,
    label: &str,
    target_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&layouts.uniform_layout, &layouts.input_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("main"),
            buffers: &[QuadVertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                // Float32 targets are not blendable; each pass overwrites.
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

pub(crate) fn create_compute_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    fragment_module: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    create_feedback_pipeline(
        device,
        layouts,
        fragment_module,
        "feedback compute pipeline",
        FEEDBACK_FORMAT,
    )
}
