//! Two-parameter surface material: a diffuse/metal mix.

use crate::{gen_f32, hittable::HitRecord};
use rand::RngCore;
use std::f32::consts::PI;
use tessel_math::{reflect, Ray, Vec3};

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Result of a successful bounce.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    /// Color attenuation for the continued path
    pub attenuation: Color,
    /// The bounced ray, starting at the hit point
    pub scattered: Ray,
}

/// Surface material.
///
/// Each bounce picks a lobe at random: with probability `metalness` a
/// fuzzy mirror (spread controlled by `roughness`), otherwise a
/// cosine-distributed diffuse bounce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub albedo: Color,
    pub roughness: f32,
    pub metalness: f32,
}

impl Material {
    /// Create a new material. Roughness and metalness are clamped to [0, 1].
    pub fn new(albedo: Color, roughness: f32, metalness: f32) -> Self {
        Self {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
            metalness: metalness.clamp(0.0, 1.0),
        }
    }

    /// Purely diffuse material.
    pub fn diffuse(albedo: Color) -> Self {
        Self::new(albedo, 0.0, 0.0)
    }

    /// Purely metallic material.
    ///
    /// - `roughness`: 0.0 = perfect mirror, 1.0 = very rough
    pub fn metal(albedo: Color, roughness: f32) -> Self {
        Self::new(albedo, roughness, 1.0)
    }

    /// Scatter an incoming ray.
    ///
    /// Returns `None` if the ray is absorbed.
    pub fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        if gen_f32(rng) < self.metalness {
            let reflected = reflect(ray_in.direction(), rec.normal);
            let direction = reflected + self.roughness * random_in_unit_sphere(rng);

            // Fuzz pushed the bounce below the surface
            if direction.dot(rec.normal) <= 0.0 {
                return None;
            }

            Some(ScatterResult {
                attenuation: self.albedo,
                scattered: Ray::new(rec.p, direction),
            })
        } else {
            let direction = sample_cosine_power(rec.normal, 1.0, rng);

            Some(ScatterResult {
                attenuation: self.albedo * rec.normal.dot(direction),
                scattered: Ray::new(rec.p, direction),
            })
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::splat(0.5))
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Sample a direction around `dir` with density proportional to cos^power.
///
/// `dir` must be unit length; the result is unit length.
fn sample_cosine_power(dir: Vec3, power: f32, rng: &mut dyn RngCore) -> Vec3 {
    let o1 = ortho(dir).normalize();
    let o2 = dir.cross(o1).normalize();

    let phi = gen_f32(rng) * 2.0 * PI;
    let cos_theta = gen_f32(rng).powf(1.0 / (power + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    phi.cos() * sin_theta * o1 + phi.sin() * sin_theta * o2 + cos_theta * dir
}

/// A vector perpendicular to `v`.
fn ortho(v: Vec3) -> Vec3 {
    if v.x.abs() > v.z.abs() {
        Vec3::new(-v.y, v.x, 0.0)
    } else {
        Vec3::new(0.0, -v.z, v.y)
    }
}

/// Uniform point strictly inside the unit sphere (rejection sampling).
fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
