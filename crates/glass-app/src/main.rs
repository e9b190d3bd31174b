// ABOUTME: Main application entry point.
// ABOUTME: Sets up the window and event loop, seeds glass regions and drives the frame loop.

mod scene;

use std::sync::Arc;

use anyhow::Result;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use glass_core::{
    BackdropConfig, Config, FrameSink, IntensityTier, OpticalParameters, ParamsUpdate, Pointer, Rect, RectUpdate,
    RegionId, RegionPreset,
};
use glass_registry::{FrameLoop, ParamStore, RegionRegistry, TickOutcome};
use glass_renderer::RenderContext;
use scene::ProceduralScene;

/// Logical size of the lens that follows the pointer
const LENS_SIZE: f32 = 160.0;

/// Wobble used when toggling it back on from zero
const DEFAULT_WOBBLE: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostAction {
    Preset(usize),
    ToggleWobble,
    ToggleRegion,
    RemoveRegion,
    LiveBackdrop,
    SaveConfig,
}

fn action_for_key(key: &Key) -> Option<HostAction> {
    match key {
        Key::Character(c) => match c.as_str() {
            "1" => Some(HostAction::Preset(0)),
            "2" => Some(HostAction::Preset(1)),
            "3" => Some(HostAction::Preset(2)),
            "w" | "W" => Some(HostAction::ToggleWobble),
            "d" | "D" => Some(HostAction::ToggleRegion),
            "l" | "L" => Some(HostAction::LiveBackdrop),
            "s" | "S" => Some(HostAction::SaveConfig),
            _ => None,
        },
        Key::Named(NamedKey::Delete) | Key::Named(NamedKey::Backspace) => Some(HostAction::RemoveRegion),
        _ => None,
    }
}

/// Lens rect in physical pixels, centered on the pointer
fn lens_rect(x: f32, y: f32, scale: f32) -> Rect {
    let size = LENS_SIZE * scale;
    Rect::new(x - size / 2.0, y - size / 2.0, size, size)
}

/// Config rects are logical; the registry holds physical pixels
fn sync_region_geometry(registry: &RegionRegistry, seeded: &[(RegionId, RegionPreset)], scale: f32) {
    for (id, preset) in seeded {
        registry.update(*id, RectUpdate::from(preset.rect.scaled(scale)));
    }
}

/// New scale factor: frames carry the new ratio and region rects follow it
fn apply_scale_factor<S: FrameSink>(
    frame_loop: &mut FrameLoop<S>,
    seeded: &[(RegionId, RegionPreset)],
    surface_size: (u32, u32),
    scale: f32,
) {
    frame_loop.set_surface(surface_size, scale);
    sync_region_geometry(frame_loop.registry(), seeded, scale);
}

/// Seeded regions as they should be written back, with their current enabled state
fn presets_for_save(registry: &RegionRegistry, seeded: &[(RegionId, RegionPreset)]) -> Vec<RegionPreset> {
    seeded
        .iter()
        .map(|(id, preset)| RegionPreset {
            enabled: registry.get(*id).map_or(preset.enabled, |region| region.enabled),
            ..preset.clone()
        })
        .collect()
}

struct App {
    window: Option<Arc<Window>>,
    frame_loop: Option<FrameLoop<RenderContext>>,
    registry: Arc<RegionRegistry>,
    params: Arc<ParamStore>,
    config: Config,
    /// Regions seeded from the config, in registration order
    seeded: Vec<(RegionId, RegionPreset)>,
    lens: Option<RegionId>,
    scale_factor: f32,
}

impl App {
    fn new() -> Self {
        let config = Config::load_or_default();
        tracing::info!(
            regions = config.regions.len(),
            backdrop = ?config.backdrop,
            "Loaded config"
        );

        Self {
            window: None,
            frame_loop: None,
            registry: Arc::new(RegionRegistry::new()),
            params: Arc::new(ParamStore::new(config.optics.clone())),
            config,
            seeded: Vec::new(),
            lens: None,
            scale_factor: 1.0,
        }
    }

    fn seed_regions(&mut self) {
        for preset in &self.config.regions {
            let id = self.registry.next_id();
            self.registry
                .register(id, preset.rect.scaled(self.scale_factor), preset.roundness, preset.tier);
            if !preset.enabled {
                self.registry.set_enabled(id, false);
            }
            self.seeded.push((id, preset.clone()));
        }
        tracing::info!(count = self.seeded.len(), "Seeded glass regions");
    }

    fn sync_region_geometry(&self) {
        sync_region_geometry(&self.registry, &self.seeded, self.scale_factor);
    }

    fn move_lens(&mut self, x: f32, y: f32) {
        let rect = lens_rect(x, y, self.scale_factor);
        match self.lens {
            Some(id) => {
                self.registry.update(id, RectUpdate::from(rect));
                self.registry.set_enabled(id, true);
            }
            None => {
                let id = self.registry.next_id();
                self.registry.register(id, rect, 1.0, IntensityTier::Heavy);
                self.lens = Some(id);
            }
        }
    }

    fn perform(&mut self, action: HostAction) {
        match action {
            HostAction::Preset(index) => {
                if let Some((name, params)) = OpticalParameters::presets().into_iter().nth(index) {
                    self.params.replace(params);
                    tracing::info!(preset = name, "Switched optics preset");
                }
            }
            HostAction::ToggleWobble => {
                let current = self.params.current().liquid_wobble;
                let wobble = if current > 0.0 { 0.0 } else { DEFAULT_WOBBLE };
                self.params.set_params(&ParamsUpdate {
                    liquid_wobble: Some(wobble),
                    ..Default::default()
                });
                tracing::info!(wobble, "Liquid wobble toggled");
            }
            HostAction::ToggleRegion => {
                let Some((id, _)) = self.seeded.first() else {
                    return;
                };
                if let Some(region) = self.registry.get(*id) {
                    self.registry.set_enabled(*id, !region.enabled);
                    tracing::info!(id = id.0, enabled = !region.enabled, "Region toggled");
                }
            }
            HostAction::RemoveRegion => {
                if let Some((id, _)) = self.seeded.pop() {
                    self.registry.unregister(id);
                    tracing::info!(id = id.0, remaining = self.registry.len(), "Region removed");
                }
            }
            HostAction::LiveBackdrop => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.sink_mut().use_live_backdrop();
                }
                self.config.backdrop = BackdropConfig::Live;
                tracing::info!("Switched to live backdrop");
            }
            HostAction::SaveConfig => {
                self.config.optics = (*self.params.current()).clone();
                self.config.regions = presets_for_save(&self.registry, &self.seeded);
                match self.config.save_to_default() {
                    Ok(path) => tracing::info!(path = %path.display(), "Config saved"),
                    Err(e) => tracing::error!("Failed to save config: {}", e),
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(self.config.window.width, self.config.window.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        self.scale_factor = window.scale_factor() as f32;
        let physical_size = window.inner_size();
        tracing::info!(
            "Window created: {}x{} physical pixels, scale factor: {}",
            physical_size.width,
            physical_size.height,
            self.scale_factor
        );

        self.seed_regions();

        // Without a GPU the host keeps running and shows nothing
        match pollster::block_on(RenderContext::new(Arc::clone(&window), self.config.backdrop.clone())) {
            Ok(mut context) => {
                context.set_scene_recorder(Box::new(ProceduralScene::new()));
                let mut frame_loop = FrameLoop::new(
                    Arc::clone(&self.registry),
                    Arc::clone(&self.params),
                    context,
                    (physical_size.width, physical_size.height),
                );
                frame_loop.set_surface((physical_size.width, physical_size.height), self.scale_factor);
                self.frame_loop = Some(frame_loop);
            }
            Err(e) => tracing::error!("Failed to create render context: {}", e),
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.sink_mut().resize(new_size.width, new_size.height);
                    frame_loop.set_surface((new_size.width, new_size.height), self.scale_factor);
                }
                self.sync_region_geometry();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor as f32;
                match &mut self.frame_loop {
                    Some(frame_loop) => {
                        let size = frame_loop.sink().size();
                        apply_scale_factor(frame_loop, &self.seeded, size, self.scale_factor);
                    }
                    None => self.sync_region_geometry(),
                }
                tracing::info!(scale_factor = self.scale_factor, "Scale factor changed");
            }
            WindowEvent::DroppedFile(path) => {
                tracing::info!(path = %path.display(), "Loading dropped backdrop");
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.sink_mut().load_backdrop(path.clone());
                }
                self.config.backdrop = BackdropConfig::Image { path };
            }
            WindowEvent::RedrawRequested => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    if frame_loop.tick() == TickOutcome::Stopped {
                        return;
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x as f32, position.y as f32);
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.set_pointer(Pointer::at(x, y));
                }
                self.move_lens(x, y);
            }
            WindowEvent::CursorLeft { .. } => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.set_pointer(Pointer::none());
                }
                if let Some(id) = self.lens {
                    self.registry.set_enabled(id, false);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let Some(action) = action_for_key(&event.logical_key) {
                        self.perform(action);
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting liquid-glass");

    let event_loop = EventLoop::new()?;
    let mut app = App::new();

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_pick_presets() {
        assert_eq!(action_for_key(&Key::Character("1".into())), Some(HostAction::Preset(0)));
        assert_eq!(action_for_key(&Key::Character("3".into())), Some(HostAction::Preset(2)));
        assert_eq!(action_for_key(&Key::Character("9".into())), None);
    }

    #[test]
    fn letter_keys_ignore_case() {
        assert_eq!(action_for_key(&Key::Character("w".into())), Some(HostAction::ToggleWobble));
        assert_eq!(action_for_key(&Key::Character("D".into())), Some(HostAction::ToggleRegion));
        assert_eq!(action_for_key(&Key::Character("s".into())), Some(HostAction::SaveConfig));
        assert_eq!(action_for_key(&Key::Named(NamedKey::Delete)), Some(HostAction::RemoveRegion));
    }

    #[test]
    fn every_preset_key_has_a_preset() {
        let presets = OpticalParameters::presets();
        for c in ["1", "2", "3"] {
            let Some(HostAction::Preset(index)) = action_for_key(&Key::Character(c.into())) else {
                panic!("{c} should pick a preset");
            };
            assert!(index < presets.len());
        }
    }

    #[test]
    fn l_returns_to_the_live_backdrop() {
        assert_eq!(action_for_key(&Key::Character("l".into())), Some(HostAction::LiveBackdrop));
        assert_eq!(action_for_key(&Key::Character("L".into())), Some(HostAction::LiveBackdrop));
    }

    #[derive(Debug)]
    struct Never;

    impl std::fmt::Display for Never {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "never")
        }
    }

    impl std::error::Error for Never {}

    struct NullSink;

    impl FrameSink for NullSink {
        type Error = Never;

        fn draw(&mut self, _frame: &glass_core::RenderFrame) -> Result<glass_core::DrawOutcome, Never> {
            Ok(glass_core::DrawOutcome::Presented)
        }

        fn teardown(&mut self) {}
    }

    fn seed(registry: &RegionRegistry, presets: &[RegionPreset], scale: f32) -> Vec<(RegionId, RegionPreset)> {
        presets
            .iter()
            .map(|preset| {
                let id = registry.next_id();
                registry.register(id, preset.rect.scaled(scale), preset.roundness, preset.tier);
                (id, preset.clone())
            })
            .collect()
    }

    #[test]
    fn scale_change_reaches_frames_and_region_rects() {
        let registry = Arc::new(RegionRegistry::new());
        let preset = RegionPreset {
            rect: Rect::new(10.0, 20.0, 100.0, 50.0),
            ..RegionPreset::default()
        };
        let seeded = seed(&registry, &[preset], 1.0);
        let mut frame_loop = FrameLoop::new(Arc::clone(&registry), Arc::new(ParamStore::default()), NullSink, (800, 600));
        frame_loop.set_surface((800, 600), 1.0);

        apply_scale_factor(&mut frame_loop, &seeded, (1600, 1200), 2.0);

        let frame = frame_loop.build_frame(0.0);
        assert_eq!(frame.device_pixel_ratio, 2.0);
        assert_eq!(frame.surface_size, (1600, 1200));
        assert_eq!(frame.regions[0].rect, Rect::new(20.0, 40.0, 200.0, 100.0));
    }

    #[test]
    fn saved_presets_keep_the_toggled_state() {
        let registry = RegionRegistry::new();
        let presets = [RegionPreset::default(), RegionPreset::default()];
        let seeded = seed(&registry, &presets, 1.0);

        registry.set_enabled(seeded[0].0, false);
        let saved = presets_for_save(&registry, &seeded);

        assert!(!saved[0].enabled);
        assert!(saved[1].enabled);
        assert_eq!(saved[0].rect, presets[0].rect);
    }

    #[test]
    fn lens_is_centered_and_scaled() {
        let rect = lens_rect(400.0, 300.0, 2.0);
        assert_eq!(rect.center(), (400.0, 300.0));
        assert_eq!(rect.width, LENS_SIZE * 2.0);
    }
}
