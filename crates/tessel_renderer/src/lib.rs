//! Tessel Renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer that refines its image across frames. Each
//! frame traces one depth-of-field sample per pixel, dispatched as image
//! tiles on a `tessel_task` worker pool, and adds it to a persistent
//! accumulation buffer. Moving the camera restarts accumulation.

mod accumulation;
mod camera;
mod error;
mod hittable;
mod material;
mod renderer;
mod scene;
mod sphere;
mod tile;

pub use accumulation::AccumulationBuffer;
pub use camera::Camera;
pub use error::{RenderError, RenderResult};
pub use hittable::HitRecord;
pub use material::{Color, Material, ScatterResult};
pub use renderer::{
    color_to_rgb, linear_to_gamma, RenderConfig, Renderer, DEFAULT_MAX_BOUNCES,
};
pub use scene::{sky_color, MaterialId, Radiance, Scene, SphereId, DEFAULT_RAY_RANGE};
pub use sphere::Sphere;
pub use tile::{generate_tiles, Tile, TileRect, DEFAULT_TILE_SIZE};

/// Re-export Vec3 and common math types from tessel_math
pub use tessel_math::{FreeCamera, Interval, Ray, UVec2, Vec3};
pub use tessel_task::PoolConfig;

use rand::{Rng, RngCore};

/// Uniform sample in [0, 1).
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}
