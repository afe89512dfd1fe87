//! Scene storage, closest-hit queries and path-traced shading.

use crate::error::{RenderError, RenderResult};
use crate::hittable::HitRecord;
use crate::material::{Color, Material};
use crate::sphere::Sphere;
use rand::RngCore;
use tessel_math::{lerp, Interval, Ray, Vec3};

/// Index of a material in [`Scene::materials`].
pub type MaterialId = usize;

/// Index of a sphere in [`Scene::spheres`].
pub type SphereId = usize;

/// Ray parameter range used when tracing paths.
pub const DEFAULT_RAY_RANGE: Interval = Interval {
    min: 0.01,
    max: 1000.0,
};

/// Horizon and zenith of the sky gradient.
const SKY_BOTTOM: Color = Color::ZERO;
const SKY_TOP: Color = Color::new(0.6, 0.6, 1.0);

/// Something that can estimate the light arriving along a ray.
///
/// Tiles only see this trait, so the renderer can be driven by a synthetic
/// source in tests.
pub trait Radiance: Send + Sync {
    fn radiance(&self, ray: &Ray, max_bounces: u32, rng: &mut dyn RngCore) -> Color;
}

/// A flat collection of spheres and the materials they reference.
#[derive(Debug, Clone)]
pub struct Scene {
    spheres: Vec<Sphere>,
    materials: Vec<Material>,
    ray_range: Interval,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            spheres: Vec::new(),
            materials: Vec::new(),
            ray_range: DEFAULT_RAY_RANGE,
        }
    }

    /// Override the ray parameter range used by [`Scene::get_color`].
    pub fn with_ray_range(mut self, ray_range: Interval) -> Self {
        self.ray_range = ray_range;
        self
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Add a sphere. The radius must be positive and the material must
    /// already exist.
    pub fn add_sphere(&mut self, sphere: Sphere) -> RenderResult<SphereId> {
        if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
            return Err(RenderError::InvalidRadius(sphere.radius));
        }
        if sphere.material >= self.materials.len() {
            return Err(RenderError::UnknownMaterial {
                index: sphere.material,
                count: self.materials.len(),
            });
        }

        self.spheres.push(sphere);
        Ok(self.spheres.len() - 1)
    }

    /// Closest intersection inside `ray_t`, if any.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let mut closest: Option<HitRecord> = None;
        let mut closest_so_far = ray_t.max;

        for sphere in &self.spheres {
            if let Some(rec) = sphere.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = rec.t;
                closest = Some(rec);
            }
        }

        closest
    }

    /// Trace a path starting at `bounce` and return its colour.
    ///
    /// Rays that miss, or that run out of bounces, see the sky.
    pub fn get_color(
        &self,
        ray: &Ray,
        max_bounces: u32,
        bounce: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        if bounce >= max_bounces {
            return sky_color(ray.direction());
        }

        let Some(rec) = self.intersect(ray, self.ray_range) else {
            return sky_color(ray.direction());
        };

        // add_sphere guarantees the index is valid
        let material = &self.materials[rec.material];
        match material.scatter(ray, &rec, rng) {
            Some(scatter) => {
                scatter.attenuation
                    * self.get_color(&scatter.scattered, max_bounces, bounce + 1, rng)
            }
            None => Color::ZERO,
        }
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn ray_range(&self) -> Interval {
        self.ray_range
    }

    /// Number of spheres.
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Radiance for Scene {
    fn radiance(&self, ray: &Ray, max_bounces: u32, rng: &mut dyn RngCore) -> Color {
        self.get_color(ray, max_bounces, 0, rng)
    }
}

/// Vertical sky gradient: black below the horizon line, pale blue at the zenith.
pub fn sky_color(direction: Vec3) -> Color {
    let unit = direction.normalize_or_zero();
    let t = 0.5 * unit.y + 0.5;
    lerp(SKY_BOTTOM, SKY_TOP, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn white_scene() -> (Scene, MaterialId) {
        let mut scene = Scene::new();
        let white = scene.add_material(Material::diffuse(Color::ONE));
        (scene, white)
    }

    #[test]
    fn test_closest_hit_wins_in_any_order() {
        let near = |m| Sphere::new(Vec3::new(0.0, 0.0, -2.0), 0.5, m);
        let far = |m| Sphere::new(Vec3::new(0.0, 0.0, -6.0), 0.5, m);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        for near_first in [true, false] {
            let mut scene = Scene::new();
            let a = scene.add_material(Material::diffuse(Color::X));
            let b = scene.add_material(Material::diffuse(Color::Y));
            if near_first {
                scene.add_sphere(near(a)).unwrap();
                scene.add_sphere(far(b)).unwrap();
            } else {
                scene.add_sphere(far(b)).unwrap();
                scene.add_sphere(near(a)).unwrap();
            }

            let rec = scene.intersect(&ray, DEFAULT_RAY_RANGE).unwrap();
            assert!((rec.t - 1.5).abs() < 1e-4);
            assert_eq!(rec.material, a);
        }
    }

    #[test]
    fn test_intersect_respects_interval() {
        let (mut scene, white) = white_scene();
        scene
            .add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, white))
            .unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert!(scene.intersect(&ray, Interval::new(0.01, 3.0)).is_none());

        assert_eq!(scene.ray_range(), DEFAULT_RAY_RANGE);
        let short = scene.clone().with_ray_range(Interval::new(0.01, 3.0));
        assert_eq!(short.ray_range(), Interval::new(0.01, 3.0));
        let mut rng = StdRng::seed_from_u64(0);
        // Too short to reach the sphere: the path sees the sky
        assert_eq!(short.get_color(&ray, 4, 0, &mut rng), sky_color(Vec3::NEG_Z));

        // Starting past the near wall finds the far wall
        let rec = scene.intersect(&ray, Interval::new(4.5, 100.0)).unwrap();
        assert!((rec.t - 6.0).abs() < 1e-4);
        assert!(!rec.front_face);
    }

    #[test]
    fn test_empty_scene_returns_sky() {
        let scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(0);

        let up = scene.get_color(&Ray::new(Vec3::ZERO, Vec3::Y * 3.0), 4, 0, &mut rng);
        assert!((up - SKY_TOP).length() < 1e-6);

        let down = scene.get_color(&Ray::new(Vec3::ZERO, Vec3::NEG_Y), 4, 0, &mut rng);
        assert!(down.length() < 1e-6);

        let level = sky_color(Vec3::X);
        assert!((level - Color::new(0.3, 0.3, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_out_of_bounces_sees_sky() {
        let (mut scene, white) = white_scene();
        scene
            .add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, white))
            .unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let mut rng = StdRng::seed_from_u64(0);

        let color = scene.get_color(&ray, 0, 0, &mut rng);
        assert_eq!(color, sky_color(Vec3::NEG_Z));

        let color = scene.get_color(&ray, 4, 4, &mut rng);
        assert_eq!(color, sky_color(Vec3::NEG_Z));
    }

    #[test]
    fn test_absorbed_path_is_black() {
        let mut scene = Scene::new();
        let rough = scene.add_material(Material::metal(Color::ONE, 1.0));
        scene
            .add_sphere(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 999.0, rough))
            .unwrap();

        // Nearly grazing: most fuzzed reflections dip below the surface
        let ray = Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(1.0, -0.1, 0.0));
        let mut rng = StdRng::seed_from_u64(9);

        let black = (0..64)
            .map(|_| scene.get_color(&ray, 1, 0, &mut rng))
            .filter(|c| *c == Color::ZERO)
            .count();
        assert!(black > 0);
    }

    #[test]
    fn test_ground_sphere_is_shaded_white() {
        let (mut scene, white) = white_scene();
        scene
            .add_sphere(Sphere::new(Vec3::new(0.0, -100000.0, 0.0), 99999.0, white))
            .unwrap();

        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(1234);

        let samples = 256;
        let sum = (0..samples).fold(Color::ZERO, |acc, _| {
            acc + scene.get_color(&ray, 4, 0, &mut rng)
        });
        let mean = sum / samples as f32;

        // The sky straight down is black; the ground reflects the blue sky
        assert!(mean.x > 0.1 && mean.x < 0.6, "mean = {:?}", mean);
        assert!((mean.x - mean.y).abs() < 1e-4);
        assert!(mean.z > mean.x);
    }

    #[test]
    fn test_add_sphere_validates() {
        let (mut scene, white) = white_scene();

        assert!(matches!(
            scene.add_sphere(Sphere::new(Vec3::ZERO, 0.0, white)),
            Err(RenderError::InvalidRadius(_))
        ));
        assert!(matches!(
            scene.add_sphere(Sphere::new(Vec3::ZERO, f32::NAN, white)),
            Err(RenderError::InvalidRadius(_))
        ));
        assert!(matches!(
            scene.add_sphere(Sphere::new(Vec3::ZERO, 1.0, 7)),
            Err(RenderError::UnknownMaterial { index: 7, count: 1 })
        ));
        assert!(scene.is_empty());

        assert_eq!(scene.add_sphere(Sphere::new(Vec3::ZERO, 1.0, white)).unwrap(), 0);
        assert_eq!(scene.len(), 1);
        assert!(scene.material(white).is_some());
        assert!(scene.material(1).is_none());
    }

    #[test]
    fn test_radiance_starts_at_first_bounce() {
        let (mut scene, white) = white_scene();
        scene
            .add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, white))
            .unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.1, 0.2, -1.0).normalize());

        let mut a = StdRng::seed_from_u64(77);
        let mut b = StdRng::seed_from_u64(77);
        assert_eq!(
            scene.radiance(&ray, 3, &mut a),
            scene.get_color(&ray, 3, 0, &mut b)
        );
    }
}
