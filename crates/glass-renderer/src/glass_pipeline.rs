// ABOUTME: Glass compositing pipeline: uniform block, full-surface quad and backdrop sampler.
// ABOUTME: Uploads one RenderFrame per draw and issues a single indexed draw.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use glass_core::{RenderFrame, MAX_REGIONS};
use glass_optics::RegionGeometry;
use wgpu::util::DeviceExt;

use crate::program::{GlassProgram, ProgramDescription, UniformField};
use crate::resources::{ResourceLedger, Tracked};
use crate::RenderError;

pub const GLASS_WGSL: &str = include_str!("../../../shaders/glass.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RegionUniform {
    /// center.xy, half_size.xy
    pub center_half: [f32; 4],
    /// exponent, thickness, tier_scale, phase
    pub shape: [f32; 4],
}

impl From<&RegionGeometry> for RegionUniform {
    fn from(geom: &RegionGeometry) -> Self {
        Self {
            center_half: [geom.center.x, geom.center.y, geom.half_size.x, geom.half_size.y],
            shape: [geom.exponent, geom.thickness, geom.tier_scale, geom.phase],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GlassUniforms {
    pub surface_size: [f32; 2],
    pub pointer: [f32; 2],
    pub time: f32,
    pub device_pixel_ratio: f32,
    pub refraction_index: f32,
    pub dispersion: f32,
    pub blur_radius: f32,
    pub fresnel_strength: f32,
    pub glare_strength: f32,
    pub glare_angle: f32,
    pub liquid_wobble: f32,
    pub region_count: u32,
    pub pointer_active: u32,
    pub _pad: u32,
    /// rgb tint, a = tint intensity
    pub tint: [f32; 4],
    pub regions: [RegionUniform; MAX_REGIONS],
}

impl GlassUniforms {
    pub fn from_frame(frame: &RenderFrame) -> Self {
        let params = &frame.params;
        let mut regions = [RegionUniform::default(); MAX_REGIONS];
        let count = frame.regions.len().min(MAX_REGIONS);
        for (slot, region) in regions.iter_mut().zip(frame.regions.iter()) {
            let geom = RegionGeometry::resolve(region, params, frame.device_pixel_ratio);
            *slot = RegionUniform::from(&geom);
        }

        let (pointer, pointer_active) = match frame.pointer.position {
            Some((x, y)) => ([x, y], 1),
            None => ([0.0, 0.0], 0),
        };
        let tint = params.tint.to_array();

        Self {
            surface_size: [frame.surface_size.0 as f32, frame.surface_size.1 as f32],
            pointer,
            time: frame.elapsed,
            device_pixel_ratio: frame.device_pixel_ratio,
            refraction_index: params.refraction_index,
            dispersion: params.dispersion,
            blur_radius: params.blur_radius,
            fresnel_strength: params.fresnel_strength,
            glare_strength: params.glare_strength,
            glare_angle: params.glare_angle,
            liquid_wobble: params.liquid_wobble,
            region_count: count as u32,
            pointer_active,
            _pad: 0,
            tint: [tint[0], tint[1], tint[2], params.tint_intensity],
            regions,
        }
    }
}

/// Byte layout of `GlassUniforms` as seen by glass.wgsl
pub const GLASS_UNIFORM_FIELDS: &[UniformField] = &[
    UniformField::new("surface_size", 0, 8),
    UniformField::new("pointer", 8, 8),
    UniformField::new("time", 16, 4),
    UniformField::new("device_pixel_ratio", 20, 4),
    UniformField::new("refraction_index", 24, 4),
    UniformField::new("dispersion", 28, 4),
    UniformField::new("blur_radius", 32, 4),
    UniformField::new("fresnel_strength", 36, 4),
    UniformField::new("glare_strength", 40, 4),
    UniformField::new("glare_angle", 44, 4),
    UniformField::new("liquid_wobble", 48, 4),
    UniformField::new("region_count", 52, 4),
    UniformField::new("pointer_active", 56, 4),
    UniformField::new("_pad", 60, 4),
    UniformField::new("tint", 64, 16),
    UniformField::new("regions", 80, 32 * MAX_REGIONS as u64),
];

pub fn glass_program_description() -> ProgramDescription {
    ProgramDescription {
        label: "Glass Program",
        source: Cow::Borrowed(GLASS_WGSL),
        vertex_entry: "vs_main",
        fragment_entry: "fs_main",
        uniform_fields: GLASS_UNIFORM_FIELDS,
        uniform_size: std::mem::size_of::<GlassUniforms>() as u64,
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

pub struct GlassPipeline {
    program: GlassProgram,
    uniform_buffer: Tracked<wgpu::Buffer>,
    vertex_buffer: Tracked<wgpu::Buffer>,
    index_buffer: Tracked<wgpu::Buffer>,
    sampler: Tracked<wgpu::Sampler>,
}

impl GlassPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, ledger: &ResourceLedger) -> Result<Self, RenderError> {
        let program = GlassProgram::compile(
            device,
            &glass_program_description(),
            format,
            &[QuadVertex::desc()],
            ledger,
        )?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Glass Uniform Buffer"),
            size: std::mem::size_of::<GlassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Glass Quad Vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Glass Quad Indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Backdrop Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            program,
            uniform_buffer: ledger.track(uniform_buffer),
            vertex_buffer: ledger.track(vertex_buffer),
            index_buffer: ledger.track(index_buffer),
            sampler: ledger.track(sampler),
        })
    }

    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        backdrop_view: &wgpu::TextureView,
        ledger: &ResourceLedger,
    ) -> Tracked<wgpu::BindGroup> {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Glass Bind Group"),
            layout: &self.program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(backdrop_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        ledger.track(bind_group)
    }

    pub fn update(&self, queue: &wgpu::Queue, uniforms: &GlassUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, bind_group: &'a wgpu::BindGroup) {
        render_pass.set_pipeline(&self.program.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glass_core::{GlassRegion, IntensityTier, OpticalParameters, Pointer, Rect, RegionId};
    use std::mem::offset_of;
    use std::sync::Arc;

    #[test]
    fn uniform_block_matches_the_shader_layout() {
        assert_eq!(std::mem::size_of::<RegionUniform>(), 32);
        assert_eq!(std::mem::size_of::<GlassUniforms>(), 1104);

        let description = glass_program_description();
        assert_eq!(description.validate_layout(), Ok(()));

        let offsets = [
            ("surface_size", offset_of!(GlassUniforms, surface_size)),
            ("pointer", offset_of!(GlassUniforms, pointer)),
            ("time", offset_of!(GlassUniforms, time)),
            ("liquid_wobble", offset_of!(GlassUniforms, liquid_wobble)),
            ("region_count", offset_of!(GlassUniforms, region_count)),
            ("tint", offset_of!(GlassUniforms, tint)),
            ("regions", offset_of!(GlassUniforms, regions)),
        ];
        for (name, offset) in offsets {
            assert_eq!(description.field(name).map(|f| f.offset), Some(offset as u64), "field {name}");
        }
    }

    #[test]
    fn shader_source_declares_the_entry_points() {
        assert!(GLASS_WGSL.contains("fn vs_main"));
        assert!(GLASS_WGSL.contains("fn fs_main"));
        for field in GLASS_UNIFORM_FIELDS {
            assert!(GLASS_WGSL.contains(field.name), "shader is missing {}", field.name);
        }
    }

    #[test]
    fn frame_is_packed_into_uniforms() {
        let regions = (0..3).map(|i| {
            GlassRegion::new(
                RegionId(i),
                Rect::new(i as f32 * 100.0, 10.0, 80.0, 60.0),
                0.8,
                IntensityTier::Heavy,
            )
        });
        let params = OpticalParameters::frosted();
        let frame = RenderFrame::new(2.5, Pointer::at(40.0, 30.0), 2.0, (800, 600), Arc::new(params.clone()), regions);

        let u = GlassUniforms::from_frame(&frame);
        assert_eq!(u.region_count, 3);
        assert_eq!(u.surface_size, [800.0, 600.0]);
        assert_eq!(u.pointer_active, 1);
        assert_eq!(u.pointer, [40.0, 30.0]);
        assert_eq!(u.tint[3], params.tint_intensity);
        assert_eq!(u.regions[1].center_half, [140.0, 40.0, 40.0, 30.0]);
        assert_eq!(u.regions[1].shape[2], IntensityTier::Heavy.scale());
        assert_eq!(u.regions[3], RegionUniform::default());
    }

    #[test]
    fn missing_pointer_is_flagged() {
        let frame = RenderFrame::new(0.0, Pointer::none(), 1.0, (10, 10), Arc::new(OpticalParameters::default()), []);
        let u = GlassUniforms::from_frame(&frame);
        assert_eq!(u.pointer_active, 0);
        assert_eq!(u.region_count, 0);
    }
}
