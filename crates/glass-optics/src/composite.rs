// ABOUTME: Per-pixel evaluation of every glass region over a backdrop.
// ABOUTME: Front-to-back accumulation with the latest registered region in front.

use glass_core::{OpticalParameters, RenderFrame};
use image::RgbaImage;

use crate::geometry::RegionGeometry;
use crate::light::{
    depth, dispersion_scales, edge_factor, fresnel, light_direction, refraction_offset, specular,
};
use crate::shape::{coverage, surface_normal, wobbly_distance};
use crate::Vec2;

/// Accumulated alpha beyond which regions further back are not evaluated
const OPAQUE_CUTOFF: f32 = 0.999;

const GOLDEN_ANGLE: f32 = 2.399_963;
const BLUR_RINGS: u32 = 3;
const BLUR_SAMPLES_PER_RING: u32 = 8;

/// Source of backdrop color at a surface pixel position (pixel centers at +0.5)
pub trait BackdropSampler {
    fn sample(&self, pos: Vec2) -> [f32; 4];
}

/// Uniform backdrop color
#[derive(Debug, Clone, Copy)]
pub struct SolidBackdrop(pub [f32; 4]);

impl BackdropSampler for SolidBackdrop {
    fn sample(&self, _pos: Vec2) -> [f32; 4] {
        self.0
    }
}

/// Bilinear, clamp-to-edge sampling of an image stretched over the surface
pub struct ImageBackdrop<'a> {
    image: &'a RgbaImage,
    scale: Vec2,
}

impl<'a> ImageBackdrop<'a> {
    pub fn new(image: &'a RgbaImage, surface_size: (u32, u32)) -> Self {
        let scale = Vec2::new(
            image.width() as f32 / surface_size.0.max(1) as f32,
            image.height() as f32 / surface_size.1.max(1) as f32,
        );
        Self { image, scale }
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let w = self.image.width() as i64;
        let h = self.image.height() as i64;
        let px = self.image.get_pixel(x.clamp(0, w - 1) as u32, y.clamp(0, h - 1) as u32);
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ]
    }
}

impl BackdropSampler for ImageBackdrop<'_> {
    fn sample(&self, pos: Vec2) -> [f32; 4] {
        if self.image.width() == 0 || self.image.height() == 0 {
            return [0.0, 0.0, 0.0, 1.0];
        }
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let p = pos * self.scale - Vec2::splat(0.5);
        // Past one texel outside the image every tap clamps to the edge anyway
        let p = Vec2::new(clamp_coord(p.x, w), clamp_coord(p.y, h));
        let x0 = p.x.floor();
        let y0 = p.y.floor();
        let tx = p.x - x0;
        let ty = p.y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let a = self.texel(ix, iy);
        let b = self.texel(ix + 1, iy);
        let c = self.texel(ix, iy + 1);
        let d = self.texel(ix + 1, iy + 1);

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = a[i] * (1.0 - tx) + b[i] * tx;
            let bottom = c[i] * (1.0 - tx) + d[i] * tx;
            out[i] = top * (1.0 - ty) + bottom * ty;
        }
        out
    }
}

fn clamp_coord(v: f32, extent: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, extent)
    }
}

/// Frame-wide inputs shared by every pixel
#[derive(Debug, Clone, Copy)]
pub struct OpticsContext<'a> {
    pub time: f32,
    pub pointer: Option<Vec2>,
    pub device_pixel_ratio: f32,
    pub params: &'a OpticalParameters,
}

impl<'a> OpticsContext<'a> {
    pub fn from_frame(frame: &'a RenderFrame) -> Self {
        Self {
            time: frame.elapsed,
            pointer: frame.pointer.position.map(Vec2::from),
            device_pixel_ratio: frame.device_pixel_ratio,
            params: &frame.params,
        }
    }
}

/// Optics of one region at one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionShading {
    pub coverage: f32,
    pub depth: f32,
    pub edge: f32,
    pub normal: Vec2,
    /// Sampling positions for red, green and blue
    pub sample_positions: [Vec2; 3],
    pub fresnel: f32,
    pub specular: f32,
    pub tint_mix: f32,
}

/// Evaluate the optics model for `pixel` (a pixel center), or `None` when
/// the region does not cover it.
pub fn shade_region(pixel: Vec2, geom: &RegionGeometry, ctx: &OpticsContext<'_>) -> Option<RegionShading> {
    if geom.is_degenerate() {
        return None;
    }
    let params = ctx.params;
    let p = pixel - geom.center;
    let sd = wobbly_distance(p, geom.half_size, geom.exponent, ctx.time, geom.phase, params.liquid_wobble);
    let alpha = coverage(sd);
    if alpha <= 0.0 {
        return None;
    }

    let normal = surface_normal(p, geom.half_size, geom.exponent, ctx.time, geom.phase, params.liquid_wobble);
    let depth = depth(sd, geom.thickness);
    let edge = edge_factor(depth);
    let scale = geom.tier_scale;

    let offset = refraction_offset(normal, edge, params.refraction_index, ctx.device_pixel_ratio * scale);
    let channel_scales = dispersion_scales(params.dispersion, edge, scale);
    let sample_positions = channel_scales.map(|s| pixel - offset * s);

    let light = light_direction(params.glare_angle, ctx.pointer, geom.center);

    Some(RegionShading {
        coverage: alpha,
        depth,
        edge,
        normal,
        sample_positions,
        fresnel: fresnel(depth, params.refraction_index, params.fresnel_strength * scale),
        specular: specular(normal, edge, depth, light, params.glare_strength * scale),
        tint_mix: (params.tint_intensity * scale).clamp(0.0, 1.0),
    })
}

/// Gaussian-weighted golden-angle ring blur around `pos`
pub fn blurred_sample<S: BackdropSampler + ?Sized>(sampler: &S, pos: Vec2, radius: f32) -> [f32; 4] {
    if radius < 0.5 {
        return sampler.sample(pos);
    }

    let sigma = radius * 0.5;
    let mut color = sampler.sample(pos);
    let mut total = 1.0;

    for ring in 1..=BLUR_RINGS {
        let ring_radius = radius * ring as f32 / BLUR_RINGS as f32;
        let weight = (-(ring_radius * ring_radius) / (2.0 * sigma * sigma)).exp();
        for i in 0..BLUR_SAMPLES_PER_RING {
            let angle = i as f32 * (std::f32::consts::TAU / BLUR_SAMPLES_PER_RING as f32)
                + ring as f32 * GOLDEN_ANGLE;
            let tap = sampler.sample(pos + Vec2::new(angle.cos(), angle.sin()) * ring_radius);
            for c in 0..4 {
                color[c] += tap[c] * weight;
            }
            total += weight;
        }
    }

    color.map(|c| c / total)
}

/// Shaded glass color (before coverage) for one region
pub fn glass_color<S: BackdropSampler + ?Sized>(
    shading: &RegionShading,
    ctx: &OpticsContext<'_>,
    sampler: &S,
) -> [f32; 3] {
    let blur = ctx.params.blur_radius * ctx.device_pixel_ratio;
    let [pr, pg, pb] = shading.sample_positions;

    // One backdrop read per channel, each at its own dispersed position
    let mut color = [
        blurred_sample(sampler, pr, blur)[0],
        blurred_sample(sampler, pg, blur)[1],
        blurred_sample(sampler, pb, blur)[2],
    ];

    let tint = ctx.params.tint.to_array();
    for c in 0..3 {
        let tinted = color[c] + (tint[c] - color[c]) * shading.tint_mix;
        let rim = tinted + (1.0 - tinted) * shading.fresnel;
        color[c] = (rim + shading.specular).clamp(0.0, 1.0);
    }
    color
}

/// Final color of `pixel` with every region composited over the backdrop.
/// `regions` is in registration order; the last one is frontmost.
pub fn composite_pixel<S: BackdropSampler + ?Sized>(
    pixel: Vec2,
    regions: &[RegionGeometry],
    ctx: &OpticsContext<'_>,
    sampler: &S,
) -> [f32; 4] {
    let mut accum = [0.0f32; 3];
    let mut accum_alpha = 0.0f32;

    for geom in regions.iter().rev() {
        if accum_alpha >= OPAQUE_CUTOFF {
            break;
        }
        let Some(shading) = shade_region(pixel, geom, ctx) else {
            continue;
        };
        let color = glass_color(&shading, ctx, sampler);
        let weight = (1.0 - accum_alpha) * shading.coverage;
        for c in 0..3 {
            accum[c] += color[c] * weight;
        }
        accum_alpha += weight;
    }

    let backdrop = sampler.sample(pixel);
    if accum_alpha <= 0.0 {
        return backdrop;
    }

    let rest = 1.0 - accum_alpha;
    [
        accum[0] + backdrop[0] * rest,
        accum[1] + backdrop[1] * rest,
        accum[2] + backdrop[2] * rest,
        backdrop[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glass_core::{GlassRegion, IntensityTier, Rect, RegionId};
    use proptest::prelude::*;

    fn geometry(id: u64, rect: Rect) -> RegionGeometry {
        let region = GlassRegion::new(RegionId(id), rect, 0.8, IntensityTier::Normal);
        RegionGeometry::resolve(&region, &OpticalParameters::default(), 1.0)
    }

    #[test]
    fn image_sampling_hits_texel_centers_exactly() {
        let mut img = RgbaImage::new(4, 4);
        img.put_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        let backdrop = ImageBackdrop::new(&img, (4, 4));

        let s = backdrop.sample(Vec2::new(2.5, 1.5));
        assert_eq!(s, [10.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0, 1.0]);
    }

    #[test]
    fn far_out_of_range_positions_clamp_to_the_edge() {
        let mut img = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 3, image::Rgba([200, 100, 50, 255]));
        img.put_pixel(0, 0, image::Rgba([50, 100, 200, 255]));
        let backdrop = ImageBackdrop::new(&img, (4, 4));
        let corner = [200.0 / 255.0, 100.0 / 255.0, 50.0 / 255.0, 1.0];
        let origin = [50.0 / 255.0, 100.0 / 255.0, 200.0 / 255.0, 1.0];

        assert_eq!(backdrop.sample(Vec2::new(1.0e20, 1.0e20)), corner);
        assert_eq!(backdrop.sample(Vec2::new(f32::INFINITY, f32::INFINITY)), corner);
        assert_eq!(backdrop.sample(Vec2::new(-1.0e20, f32::NEG_INFINITY)), origin);
        assert!(backdrop.sample(Vec2::new(f32::NAN, 2.0)).iter().all(|c| c.is_finite()));
    }

    #[test]
    fn blur_of_a_solid_backdrop_is_the_same_color() {
        let solid = SolidBackdrop([0.25, 0.5, 0.75, 1.0]);
        let blurred = blurred_sample(&solid, Vec2::new(10.0, 10.0), 8.0);
        for (a, b) in blurred.iter().zip(solid.0.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn later_region_is_in_front() {
        let params = OpticalParameters {
            tint_intensity: 1.0,
            fresnel_strength: 0.0,
            glare_strength: 0.0,
            liquid_wobble: 0.0,
            ..OpticalParameters::default()
        };
        let ctx = OpticsContext {
            time: 0.0,
            pointer: None,
            device_pixel_ratio: 1.0,
            params: &params,
        };
        let back = geometry(1, Rect::new(0.0, 0.0, 100.0, 100.0));
        let front = geometry(2, Rect::new(20.0, 20.0, 100.0, 100.0));
        let backdrop = SolidBackdrop([0.0, 0.0, 0.0, 1.0]);

        // Same tint everywhere, so compare the shading that wins instead
        let pixel = Vec2::new(60.5, 60.5);
        let front_only = composite_pixel(pixel, &[front], &ctx, &backdrop);
        let both = composite_pixel(pixel, &[back, front], &ctx, &backdrop);
        assert_eq!(both, front_only);
    }

    proptest! {
        #[test]
        fn composite_is_deterministic(
            x in 0.0f32..400.0,
            y in 0.0f32..300.0,
            time in 0.0f32..60.0,
            px in 0.0f32..400.0,
            py in 0.0f32..300.0,
        ) {
            let params = OpticalParameters::crystal();
            let ctx = OpticsContext {
                time,
                pointer: Some(Vec2::new(px, py)),
                device_pixel_ratio: 1.0,
                params: &params,
            };
            let regions = [
                geometry(1, Rect::new(50.0, 40.0, 200.0, 150.0)),
                geometry(2, Rect::new(150.0, 120.0, 180.0, 120.0)),
            ];
            let backdrop = SolidBackdrop([0.2, 0.4, 0.6, 1.0]);
            let pixel = Vec2::new(x, y);

            let a = composite_pixel(pixel, &regions, &ctx, &backdrop);
            let b = composite_pixel(pixel, &regions, &ctx, &backdrop);
            prop_assert_eq!(a.map(f32::to_bits), b.map(f32::to_bits));
        }
    }
}
