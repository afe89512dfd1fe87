//! Random demo scene: a huge ground sphere plus non-overlapping spheres resting on it.

use crate::config::SceneConfig;
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessel_math::Vec3;
use tessel_renderer::{Color, Material, MaterialId, Scene, Sphere};

const GROUND_CENTER: Vec3 = Vec3::new(0.0, -100000.0, 0.0);
const GROUND_RADIUS: f32 = 99999.0;

/// Height of the ground's top surface.
const GROUND_LEVEL: f32 = GROUND_CENTER.y + GROUND_RADIUS;

/// Placement attempts per sphere before giving up.
const MAX_ATTEMPTS: u32 = 10_000;

/// Materials random spheres pick from.
fn palette() -> [Material; 4] {
    [
        Material::new(Color::new(0.8, 0.05, 0.05), 0.0, 1.0),
        Material::new(Color::new(0.8, 0.8, 0.8), 0.2, 0.0),
        Material::new(Color::new(0.05, 0.85, 0.05), 0.2, 0.0),
        Material::new(Color::new(0.8, 0.85, 0.05), 0.9, 1.0),
    ]
}

fn ground_material() -> Material {
    Material::new(Color::new(0.8, 0.85, 0.8), 0.1, 1.0)
}

/// Build the demo scene. The same seed always yields the same scene.
pub fn build_scene(config: &SceneConfig) -> Result<Scene> {
    let mut scene = Scene::new();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let palette: Vec<MaterialId> = palette()
        .into_iter()
        .map(|material| scene.add_material(material))
        .collect();
    let ground = scene.add_material(ground_material());

    scene.add_sphere(Sphere::new(GROUND_CENTER, GROUND_RADIUS, ground))?;

    let mut placed: Vec<Sphere> = Vec::with_capacity(config.sphere_count as usize);
    for i in 0..config.sphere_count {
        let Some((center, radius)) = place_sphere(&placed, config.extents, &mut rng) else {
            bail!(
                "Could not place sphere {} of {} within extents {}",
                i + 1,
                config.sphere_count,
                config.extents
            );
        };

        let material = palette[rng.gen_range(0..palette.len())];
        let sphere = Sphere::new(center, radius, material);
        scene.add_sphere(sphere)?;
        placed.push(sphere);
    }

    log::info!(
        "Demo scene: {} spheres, {} materials (seed {})",
        scene.len(),
        scene.materials().len(),
        config.seed
    );
    Ok(scene)
}

/// Pick a random sphere resting on the ground that overlaps none of `placed`.
fn place_sphere(placed: &[Sphere], extents: Vec3, rng: &mut StdRng) -> Option<(Vec3, f32)> {
    for _ in 0..MAX_ATTEMPTS {
        let radius = (rng.gen::<f32>() + 0.3) * 1.5;
        let center = Vec3::new(
            (2.0 * rng.gen::<f32>() - 1.0) * extents.x,
            GROUND_LEVEL + radius - 0.0001,
            (2.0 * rng.gen::<f32>() - 1.0) * extents.z,
        );

        let overlaps = placed
            .iter()
            .any(|other| center.distance(other.center) < radius + other.radius);
        if !overlaps {
            return Some((center, radius));
        }
    }
    None
}
