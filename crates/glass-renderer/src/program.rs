// ABOUTME: Data description of a GPU program and its compilation into a render pipeline.
// ABOUTME: Compile and link failures are captured through error scopes and returned, never panicked on.

use std::borrow::Cow;

use crate::resources::{ResourceLedger, Tracked};
use crate::RenderError;

/// One named member of a program's uniform block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub name: &'static str,
    pub offset: u64,
    pub size: u64,
}

impl UniformField {
    pub const fn new(name: &'static str, offset: u64, size: u64) -> Self {
        Self { name, offset, size }
    }

    fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Everything needed to build a program: source text plus the schema of
/// the single uniform block it reads.
#[derive(Debug, Clone)]
pub struct ProgramDescription {
    pub label: &'static str,
    pub source: Cow<'static, str>,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub uniform_fields: &'static [UniformField],
    pub uniform_size: u64,
}

impl ProgramDescription {
    /// Check that the uniform schema is self-consistent: fields in order,
    /// non-overlapping, 4-byte aligned and inside a 16-byte multiple block.
    pub fn validate_layout(&self) -> Result<(), String> {
        if self.uniform_size % 16 != 0 {
            return Err(format!("uniform block size {} is not a multiple of 16", self.uniform_size));
        }
        let mut cursor = 0;
        for field in self.uniform_fields {
            if field.offset % 4 != 0 {
                return Err(format!("field {} at offset {} is not 4-byte aligned", field.name, field.offset));
            }
            if field.offset < cursor {
                return Err(format!("field {} overlaps the previous field", field.name));
            }
            if field.end() > self.uniform_size {
                return Err(format!("field {} ends past the uniform block", field.name));
            }
            cursor = field.end();
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.uniform_fields.iter().find(|f| f.name == name)
    }
}

/// A compiled and linked program: shader module, bind group layout and pipeline
pub struct GlassProgram {
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) pipeline: Tracked<wgpu::RenderPipeline>,
    _shader: Tracked<wgpu::ShaderModule>,
}

impl GlassProgram {
    pub fn compile(
        device: &wgpu::Device,
        description: &ProgramDescription,
        format: wgpu::TextureFormat,
        vertex_buffers: &[wgpu::VertexBufferLayout<'_>],
        ledger: &ResourceLedger,
    ) -> Result<Self, RenderError> {
        description.validate_layout().map_err(RenderError::ProgramLink)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(description.label),
            source: wgpu::ShaderSource::Wgsl(description.source.clone()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile(err.to_string()));
        }
        let shader = ledger.track(shader);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Glass Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(description.uniform_size),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Glass Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(description.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(description.vertex_entry),
                buffers: vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(description.fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
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
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ProgramLink(err.to_string()));
        }

        tracing::info!(label = description.label, ?format, "Glass program compiled");
        Ok(Self {
            bind_group_layout,
            pipeline: ledger.track(pipeline),
            _shader: shader,
        })
    }
}
