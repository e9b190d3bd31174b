// ABOUTME: Frame loop driving the software compositor.
// ABOUTME: Includes unregistering mid-animation, parameter swaps and backdrop readiness.

use std::sync::Arc;
use std::time::Duration;

use glass_core::{
    DrawOutcome, FrameSink, IntensityTier, OpticalParameters, ParamsUpdate, Pointer, Rect, RenderFrame, SkipReason,
};
use glass_optics::SoftwareCompositor;
use glass_registry::{FrameLoop, ParamStore, RegionRegistry, TickOutcome};
use image::{Rgba, RgbaImage};

const SURFACE: (u32, u32) = (320, 240);
const FRAME: Duration = Duration::from_millis(16);

fn backdrop() -> RgbaImage {
    RgbaImage::from_fn(SURFACE.0, SURFACE.1, |x, y| Rgba([(x % 200) as u8, (y % 200) as u8, 90, 255]))
}

fn wobbly() -> OpticalParameters {
    OpticalParameters {
        liquid_wobble: 0.6,
        ..OpticalParameters::liquid()
    }
}

fn setup() -> FrameLoop<SoftwareCompositor> {
    FrameLoop::new(
        Arc::new(RegionRegistry::new()),
        Arc::new(ParamStore::new(wobbly())),
        SoftwareCompositor::with_backdrop(backdrop()),
        SURFACE,
    )
}

#[test]
fn unregistered_region_disappears_on_the_next_frame() {
    let mut frames = setup();
    let registry = Arc::clone(frames.registry());
    let keep = registry.next_id();
    let gone = registry.next_id();
    registry.register(keep, Rect::new(20.0, 20.0, 120.0, 90.0), 0.8, IntensityTier::Normal);
    registry.register(gone, Rect::new(170.0, 110.0, 120.0, 90.0), 0.6, IntensityTier::Heavy);

    for _ in 0..3 {
        assert_eq!(frames.tick_with(FRAME), TickOutcome::Drawn(DrawOutcome::Presented));
    }
    let with_both = frames.sink().last_frame().cloned().unwrap();
    assert_ne!(with_both.get_pixel(230, 155), backdrop().get_pixel(230, 155));

    registry.unregister(gone);
    assert_eq!(frames.tick_with(FRAME), TickOutcome::Drawn(DrawOutcome::Presented));
    let after = frames.sink().last_frame().cloned().unwrap();

    // Same time and inputs, but only the kept region
    let expected = SoftwareCompositor::render(
        &RenderFrame::new(
            frames.elapsed(),
            Pointer::none(),
            1.0,
            SURFACE,
            Arc::new(wobbly()),
            registry.get(keep),
        ),
        &backdrop(),
    );
    assert_eq!(after, expected);
    assert_eq!(after.get_pixel(230, 155), backdrop().get_pixel(230, 155));
    assert_eq!(frames.sink().frames_drawn(), 4);

    frames.shutdown();
    assert!(frames.sink().last_frame().is_none());
    assert_eq!(frames.tick_with(FRAME), TickOutcome::Stopped);
}

#[test]
fn parameter_changes_apply_whole_on_the_next_frame() {
    let mut frames = setup();
    let registry = Arc::clone(frames.registry());
    registry.register(registry.next_id(), Rect::new(60.0, 40.0, 200.0, 160.0), 0.8, IntensityTier::Normal);

    frames.tick_with(FRAME);
    let before = frames.sink().last_frame().cloned().unwrap();

    frames.params().set_params(&ParamsUpdate {
        tint_intensity: Some(0.9),
        ..Default::default()
    });
    frames.tick_with(FRAME);
    let after = frames.sink().last_frame().cloned().unwrap();

    assert_ne!(before.get_pixel(160, 120), after.get_pixel(160, 120));
    assert_eq!(frames.params().current().tint_intensity, 0.9);
}

#[test]
fn frames_are_skipped_until_the_backdrop_arrives() {
    let mut frames = FrameLoop::new(
        Arc::new(RegionRegistry::new()),
        Arc::new(ParamStore::default()),
        SoftwareCompositor::new(),
        SURFACE,
    );

    assert_eq!(
        frames.tick_with(FRAME),
        TickOutcome::Drawn(DrawOutcome::Skipped(SkipReason::BackdropPending))
    );
    frames.sink_mut().set_backdrop(Some(backdrop()));
    assert_eq!(frames.tick_with(FRAME), TickOutcome::Drawn(DrawOutcome::Presented));
}

#[test]
fn mutation_during_a_draw_is_seen_only_by_the_next_draw() {
    struct Mutating {
        registry: Arc<RegionRegistry>,
        seen: Vec<usize>,
    }

    impl FrameSink for Mutating {
        type Error = std::convert::Infallible;

        fn draw(&mut self, frame: &RenderFrame) -> Result<DrawOutcome, Self::Error> {
            self.seen.push(frame.regions.len());
            // The layout owner adds a region while this frame is in flight
            let id = self.registry.next_id();
            self.registry
                .register(id, Rect::new(0.0, 0.0, 10.0, 10.0), 0.5, IntensityTier::Light);
            self.seen.push(frame.regions.len());
            Ok(DrawOutcome::Presented)
        }

        fn teardown(&mut self) {}
    }

    let registry = Arc::new(RegionRegistry::new());
    let sink = Mutating {
        registry: Arc::clone(&registry),
        seen: Vec::new(),
    };
    let mut frames = FrameLoop::new(registry, Arc::new(ParamStore::default()), sink, SURFACE);

    frames.tick_with(FRAME);
    frames.tick_with(FRAME);
    assert_eq!(frames.sink().seen, vec![0, 0, 1, 1]);
}
