// ABOUTME: Backdrop textures on the GPU: uploaded still images and live capture targets.
// ABOUTME: SceneRecorder lets the host draw its scene into the capture target each frame.

use glass_core::RenderFrame;
use image::RgbaImage;

use crate::resources::{ResourceLedger, Tracked};

/// Backdrop textures are stored linear so the glass math sees the same
/// values the CPU compositor does.
pub const BACKDROP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Where a recorder draws this frame's scene
pub struct RecordTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub size: (u32, u32),
}

/// Host-provided scene drawn into the live backdrop before the glass pass
pub trait SceneRecorder {
    fn record(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: RecordTarget<'_>,
        frame: &RenderFrame,
    );

    /// GPU objects owned by the recorder are invalid after a device loss
    fn device_lost(&mut self) {}
}

/// A texture the glass pass samples from
pub struct BackdropTexture {
    texture: Tracked<wgpu::Texture>,
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl BackdropTexture {
    /// Upload a decoded still image
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        ledger: &ResourceLedger,
    ) -> Self {
        let size = image.dimensions();
        let texture = Self::create(
            device,
            "Backdrop Image",
            size,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            ledger,
        );

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.0),
                rows_per_image: Some(size.1),
            },
            wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
        );
        texture
    }

    /// Render target for live capture, sized to the surface
    pub fn capture_target(device: &wgpu::Device, size: (u32, u32), ledger: &ResourceLedger) -> Self {
        Self::create(
            device,
            "Backdrop Capture",
            size,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            ledger,
        )
    }

    fn create(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        usage: wgpu::TextureUsages,
        ledger: &ResourceLedger,
    ) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: BACKDROP_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture: ledger.track(texture),
            view,
            size,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn record_target(&self) -> RecordTarget<'_> {
        RecordTarget {
            view: &self.view,
            format: BACKDROP_FORMAT,
            size: self.size,
        }
    }
}
