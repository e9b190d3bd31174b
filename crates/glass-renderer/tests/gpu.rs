// ABOUTME: GPU-backed tests for program compilation and the resource ledger.
// ABOUTME: Runs on a headless adapter when one exists; shader validation needs no GPU.

use std::borrow::Cow;
use std::sync::Arc;

use glass_core::{GlassRegion, IntensityTier, OpticalParameters, Pointer, Rect, RegionId, RenderFrame};
use glass_renderer::capture::BackdropTexture;
use glass_renderer::program::{GlassProgram, ProgramDescription};
use glass_renderer::{
    glass_program_description, GlassPipeline, GlassUniforms, RenderError, ResourceKind, ResourceLedger,
    BACKDROP_FORMAT, GLASS_WGSL,
};

const SCENE_WGSL: &str = include_str!("../../../shaders/scene.wgsl");

/// Device without a surface, or None on machines with no usable adapter
fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;
    pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Test Device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
        },
        None,
    ))
    .ok()
}

fn validate_wgsl(source: &str) {
    let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|e| panic!("{}", e.emit_to_string(source)));
    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::default())
        .validate(&module)
        .unwrap_or_else(|e| panic!("{e:?}"));
}

#[test]
fn glass_shader_parses_and_validates() {
    validate_wgsl(GLASS_WGSL);
}

#[test]
fn scene_shader_parses_and_validates() {
    validate_wgsl(SCENE_WGSL);
}

#[test]
fn broken_shader_reports_compile_error() {
    let Some((device, _queue)) = headless_device() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    let ledger = ResourceLedger::new();
    let broken = ProgramDescription {
        source: Cow::Borrowed("fn broken( {"),
        ..glass_program_description()
    };

    let result = GlassProgram::compile(&device, &broken, wgpu::TextureFormat::Rgba8Unorm, &[], &ledger);

    assert!(matches!(result, Err(RenderError::ShaderCompile(_))));
    assert_eq!(ledger.total_live(), 0);
}

#[test]
fn bad_uniform_layout_reports_link_error() {
    let Some((device, _queue)) = headless_device() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    let ledger = ResourceLedger::new();
    let misaligned = ProgramDescription {
        uniform_size: 20,
        ..glass_program_description()
    };

    let result = GlassProgram::compile(&device, &misaligned, wgpu::TextureFormat::Rgba8Unorm, &[], &ledger);

    assert!(matches!(result, Err(RenderError::ProgramLink(_))));
    assert_eq!(ledger.total_live(), 0);
}

#[test]
fn pipeline_objects_return_to_baseline_when_dropped() {
    let Some((device, _queue)) = headless_device() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    let ledger = ResourceLedger::new();

    let pipeline = GlassPipeline::new(&device, BACKDROP_FORMAT, &ledger).expect("glass program builds");
    let backdrop = BackdropTexture::capture_target(&device, (64, 64), &ledger);
    let bind_group = pipeline.create_bind_group(&device, backdrop.view(), &ledger);

    assert_eq!(ledger.live(ResourceKind::Shader), 1);
    assert_eq!(ledger.live(ResourceKind::Pipeline), 1);
    assert_eq!(ledger.live(ResourceKind::Buffer), 3);
    assert_eq!(ledger.live(ResourceKind::Sampler), 1);
    assert_eq!(ledger.live(ResourceKind::Texture), 1);
    assert_eq!(ledger.live(ResourceKind::BindGroup), 1);

    drop(bind_group);
    drop(backdrop);
    drop(pipeline);
    assert_eq!(ledger.total_live(), 0);
}

#[test]
fn frame_draws_offscreen_without_validation_errors() {
    let Some((device, queue)) = headless_device() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    let ledger = ResourceLedger::new();
    let pipeline = GlassPipeline::new(&device, BACKDROP_FORMAT, &ledger).expect("glass program builds");
    let source = BackdropTexture::capture_target(&device, (64, 64), &ledger);
    let target = BackdropTexture::capture_target(&device, (64, 64), &ledger);
    let bind_group = pipeline.create_bind_group(&device, source.view(), &ledger);

    let region = GlassRegion::new(
        RegionId(1),
        Rect::new(8.0, 8.0, 48.0, 48.0),
        0.8,
        IntensityTier::Normal,
    );
    let frame = RenderFrame::new(
        0.5,
        Pointer::at(32.0, 32.0),
        1.0,
        (64, 64),
        Arc::new(OpticalParameters::default()),
        vec![region],
    );

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    pipeline.update(&queue, &GlassUniforms::from_frame(&frame));
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Test Encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Test Glass Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pipeline.render(&mut pass, &bind_group);
    }
    queue.submit(std::iter::once(encoder.finish()));
    let _ = device.poll(wgpu::Maintain::Wait);

    let error = pollster::block_on(device.pop_error_scope());
    assert!(error.is_none(), "validation error: {error:?}");
}
