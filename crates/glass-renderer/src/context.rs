// ABOUTME: Render context owning every GPU object for the glass effect.
// ABOUTME: Draws RenderFrames, survives program failure and device loss, and tears down exactly once.

use std::path::PathBuf;
use std::sync::Arc;

use glass_core::{BackdropConfig, DrawOutcome, FrameSink, RenderFrame, SkipReason};
use winit::window::Window;

use crate::backdrop::BackdropLoader;
use crate::capture::{BackdropTexture, SceneRecorder};
use crate::glass_pipeline::{GlassPipeline, GlassUniforms};
use crate::gpu::GpuState;
use crate::resources::{ResourceLedger, Tracked};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface reports no supported formats")]
    UnsupportedSurface,

    #[error("Shader failed to compile: {0}")]
    ShaderCompile(String),

    #[error("Program failed to link: {0}")]
    ProgramLink(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextState {
    Ready,
    /// The program could not be built; nothing is drawn until a rebuild
    Failed(String),
    /// The device went away; the next draw re-initializes everything
    Lost,
    TornDown,
}

pub struct RenderContext {
    window: Arc<Window>,
    gpu: Option<GpuState>,
    pipeline: Option<GlassPipeline>,
    backdrop: Option<BackdropTexture>,
    bind_group: Option<Tracked<wgpu::BindGroup>>,
    source: BackdropConfig,
    loader: BackdropLoader,
    recorder: Option<Box<dyn SceneRecorder>>,
    ledger: ResourceLedger,
    state: ContextState,
    clear_color: wgpu::Color,
}

impl RenderContext {
    /// Acquire the GPU and build the glass program. GPU acquisition errors
    /// are returned; a program that fails to build leaves the context in
    /// `Failed` so the host keeps running and simply draws nothing.
    pub async fn new(window: Arc<Window>, source: BackdropConfig) -> Result<Self, RenderError> {
        let gpu = GpuState::new(Arc::clone(&window)).await?;

        let mut ctx = Self {
            window,
            gpu: Some(gpu),
            pipeline: None,
            backdrop: None,
            bind_group: None,
            source: BackdropConfig::Live,
            loader: BackdropLoader::new(),
            recorder: None,
            ledger: ResourceLedger::new(),
            state: ContextState::Ready,
            clear_color: wgpu::Color::BLACK,
        };
        ctx.build_pipeline();
        ctx.set_source(source);
        Ok(ctx)
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn size(&self) -> (u32, u32) {
        self.gpu.as_ref().map(|g| g.size).unwrap_or((0, 0))
    }

    pub fn set_scene_recorder(&mut self, recorder: Box<dyn SceneRecorder>) {
        self.recorder = Some(recorder);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(width, height);
        }
        // Live capture follows the surface size; rebuilt on the next draw
        if self.source == BackdropConfig::Live {
            self.bind_group = None;
            self.backdrop = None;
        }
    }

    /// Switch to a still image backdrop. Drawing is skipped until it decodes.
    pub fn load_backdrop(&mut self, path: impl Into<PathBuf>) {
        self.set_source(BackdropConfig::Image { path: path.into() });
    }

    /// Switch to the live scene backdrop
    pub fn use_live_backdrop(&mut self) {
        self.set_source(BackdropConfig::Live);
    }

    fn set_source(&mut self, source: BackdropConfig) {
        self.bind_group = None;
        self.backdrop = None;
        if let BackdropConfig::Image { path } = &source {
            self.loader.request(path.clone());
        } else {
            self.loader = BackdropLoader::new();
        }
        self.source = source;
    }

    fn build_pipeline(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        match GlassPipeline::new(&gpu.device, gpu.format(), &self.ledger) {
            Ok(pipeline) => {
                self.pipeline = Some(pipeline);
                self.state = ContextState::Ready;
            }
            Err(err) => {
                tracing::error!(error = %err, "Glass program unavailable, rendering disabled");
                self.pipeline = None;
                self.state = ContextState::Failed(err.to_string());
            }
        }
    }

    /// Drop everything tied to the dead device. Releases are no-ops from here.
    fn handle_device_loss(&mut self) {
        tracing::warn!("Render context lost, will re-initialize on the next frame");
        self.ledger.mark_lost();
        self.bind_group = None;
        self.backdrop = None;
        self.pipeline = None;
        self.gpu = None;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.device_lost();
        }
        self.state = ContextState::Lost;
    }

    /// Full rebuild after device loss: device, program, buffers and backdrop
    fn reinitialize(&mut self) -> bool {
        match pollster::block_on(GpuState::new(Arc::clone(&self.window))) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                tracing::warn!(error = %err, "Re-initialization failed, will retry");
                return false;
            }
        }
        self.build_pipeline();
        if self.state != ContextState::Ready {
            return false;
        }
        if self.loader.reload() {
            tracing::info!("Reloading backdrop after device reset");
        }
        tracing::info!("Render context re-initialized");
        true
    }

    /// Bind the backdrop for this frame, if there is one to bind
    fn prepare_backdrop(&mut self) -> bool {
        let (Some(gpu), Some(pipeline)) = (self.gpu.as_ref(), self.pipeline.as_ref()) else {
            return false;
        };

        match &self.source {
            BackdropConfig::Image { .. } => {
                if let Some(image) = self.loader.poll() {
                    self.bind_group = None;
                    let texture = BackdropTexture::from_image(&gpu.device, &gpu.queue, &image, &self.ledger);
                    self.bind_group = Some(pipeline.create_bind_group(&gpu.device, texture.view(), &self.ledger));
                    self.backdrop = Some(texture);
                }
            }
            BackdropConfig::Live => {
                let size = (gpu.config.width, gpu.config.height);
                if self.backdrop.as_ref().map(|b| b.size()) != Some(size) {
                    self.bind_group = None;
                    let target = BackdropTexture::capture_target(&gpu.device, size, &self.ledger);
                    self.bind_group = Some(pipeline.create_bind_group(&gpu.device, target.view(), &self.ledger));
                    self.backdrop = Some(target);
                }
            }
        }
        self.bind_group.is_some()
    }

    pub fn draw(&mut self, frame: &RenderFrame) -> Result<DrawOutcome, RenderError> {
        match self.state {
            ContextState::TornDown => return Ok(DrawOutcome::Skipped(SkipReason::TornDown)),
            ContextState::Failed(_) => return Ok(DrawOutcome::Skipped(SkipReason::NotReady)),
            ContextState::Lost => {
                if !self.reinitialize() {
                    return Ok(DrawOutcome::Skipped(SkipReason::ContextLost));
                }
            }
            ContextState::Ready => {}
        }

        if self.gpu.as_ref().map_or(true, |g| g.is_lost()) {
            self.handle_device_loss();
            return Ok(DrawOutcome::Skipped(SkipReason::ContextLost));
        }

        if !self.prepare_backdrop() {
            return Ok(DrawOutcome::Skipped(SkipReason::BackdropPending));
        }

        let (Some(gpu), Some(pipeline), Some(backdrop), Some(bind_group)) = (
            self.gpu.as_ref(),
            self.pipeline.as_ref(),
            self.backdrop.as_ref(),
            self.bind_group.as_ref(),
        ) else {
            return Ok(DrawOutcome::Skipped(SkipReason::NotReady));
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface out of date, reconfiguring");
                gpu.reconfigure();
                return Ok(DrawOutcome::Skipped(SkipReason::NotReady));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("Surface timed out, skipping frame");
                return Ok(DrawOutcome::Skipped(SkipReason::NotReady));
            }
            Err(err) => return Err(err.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Glass Encoder"),
        });

        if self.source == BackdropConfig::Live {
            match self.recorder.as_mut() {
                Some(recorder) => {
                    recorder.record(&gpu.device, &gpu.queue, &mut encoder, backdrop.record_target(), frame);
                }
                None => {
                    // No scene: clear the capture so the glass has a defined backdrop
                    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Backdrop Clear Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: backdrop.view(),
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(self.clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                }
            }
        }

        let mut uniforms = GlassUniforms::from_frame(frame);
        // Sample against the actual target size
        uniforms.surface_size = [gpu.config.width as f32, gpu.config.height as f32];
        pipeline.update(&gpu.queue, &uniforms);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Glass Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pipeline.render(&mut render_pass, bind_group);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(DrawOutcome::Presented)
    }

    /// Release every GPU object. Later calls and draws do nothing.
    pub fn teardown(&mut self) {
        if self.state == ContextState::TornDown {
            return;
        }
        self.bind_group = None;
        self.backdrop = None;
        self.pipeline = None;
        self.recorder = None;
        self.loader = BackdropLoader::new();
        self.gpu = None;
        self.state = ContextState::TornDown;
        tracing::info!(leaked = self.ledger.total_live(), "Render context torn down");
    }
}

impl FrameSink for RenderContext {
    type Error = RenderError;

    fn draw(&mut self, frame: &RenderFrame) -> Result<DrawOutcome, RenderError> {
        RenderContext::draw(self, frame)
    }

    fn teardown(&mut self) {
        RenderContext::teardown(self);
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
