// ABOUTME: Pure optics model for the glass effect.
// ABOUTME: Mirrored by shaders/glass.wgsl; the software compositor renders the same math on the CPU.

pub mod composite;
pub mod geometry;
pub mod light;
pub mod noise;
pub mod shape;
pub mod software;
pub mod vec2;

pub use composite::{composite_pixel, BackdropSampler, ImageBackdrop, OpticsContext, SolidBackdrop};
pub use geometry::RegionGeometry;
pub use light::{depth, dispersion_scales, edge_factor, fresnel, light_direction, refraction_offset, specular};
pub use shape::{coverage, roundness_exponent, shape_distance, surface_normal, wobble, wobbly_distance};
pub use software::SoftwareCompositor;
pub use vec2::Vec2;
