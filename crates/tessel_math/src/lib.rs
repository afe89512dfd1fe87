// Re-export glam for convenience
pub use glam::*;

// Tessel math types
mod free_camera;
mod interval;
mod ray;

pub use free_camera::FreeCamera;
pub use interval::Interval;
pub use ray::Ray;

/// Linearly interpolate between two vectors.
#[inline]
pub fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Mirror `v` about the plane with unit normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}
