//! Camera for depth-of-field ray generation.

use crate::gen_f32;
use rand::RngCore;
use tessel_math::{FreeCamera, Mat4, Ray, UVec2, Vec3};

/// A free-flying thin-lens camera.
///
/// Also carries the progressive frame counter: any movement or rotation
/// resets it to zero so the renderer knows to discard accumulated samples.
#[derive(Debug, Clone)]
pub struct Camera {
    rig: FreeCamera,

    // Image settings
    image_width: u32,
    image_height: u32,

    // Lens settings
    vfov: f32,           // Vertical field of view in degrees
    aperture: f32,       // Half-width of the square lens
    focal_distance: f32, // Distance from camera to plane of perfect focus

    // Cached computed values (set by initialize())
    pixel_width: f32,
    pixel_height: f32,
    plane_width: f32,
    plane_height: f32,

    frame_count: u32,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            rig: FreeCamera::default(),
            image_width: 400,
            image_height: 400,
            vfov: 70.0,
            aperture: 0.2,
            focal_distance: 5.0,
            pixel_width: 0.0,
            pixel_height: 0.0,
            plane_width: 0.0,
            plane_height: 0.0,
            frame_count: 0,
        };
        camera.initialize();
        camera
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self.initialize();
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focal_distance: f32) -> Self {
        self.vfov = vfov;
        self.aperture = aperture.max(0.0);
        self.focal_distance = focal_distance;
        self.initialize();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.rig.set_position(position);
        self
    }

    /// Set distance moved per unit of movement input.
    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.rig.set_velocity(velocity);
        self
    }

    fn initialize(&mut self) {
        self.pixel_width = 1.0 / self.image_width as f32;
        self.pixel_height = 1.0 / self.image_height as f32;

        let aspect_ratio = self.image_width as f32 / self.image_height as f32;
        self.plane_height = 2.0 * (self.vfov.to_radians() * 0.5).tan();
        self.plane_width = aspect_ratio * self.plane_height;
    }

    /// Translate sideways (`x_amount`) and along the rig's forward axis (`z_amount`).
    pub fn move_by(&mut self, x_amount: f32, z_amount: f32) {
        self.rig.translate(x_amount, z_amount);
        self.frame_count = 0;
    }

    /// Rotate: `angle_x` pitches, `angle_y` yaws.
    pub fn rotate(&mut self, angle_x: f32, angle_y: f32) {
        self.rig.rotate(angle_x, angle_y);
        self.frame_count = 0;
    }

    /// Discard progressive state without moving.
    pub fn invalidate(&mut self) {
        self.frame_count = 0;
    }

    /// Advance the frame counter and return the new value.
    ///
    /// A return value of 1 means this is the first frame since the camera
    /// last changed.
    pub fn increment_frame_count(&mut self) -> u32 {
        self.frame_count = self.frame_count.saturating_add(1);
        self.frame_count
    }

    /// Generate a depth-of-field ray through pixel (x, y).
    ///
    /// Row 0 is the top of the image. The pixel footprint is jittered for
    /// anti-aliasing and the origin is drawn from a square lens of
    /// half-width `aperture`. Every ray for a pixel meets the focal plane
    /// inside that pixel's footprint, so geometry at the focal distance
    /// stays sharp.
    pub fn generate_ray(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        let u = (x as f32 + gen_f32(rng)) * self.pixel_width - 0.5;
        let v = 0.5 - (y as f32 + gen_f32(rng)) * self.pixel_height;

        let tx = self.rig.transform();

        let focal_point = tx.transform_point3(Vec3::new(
            u * self.plane_width * self.focal_distance,
            v * self.plane_height * self.focal_distance,
            -self.focal_distance,
        ));

        let lens_point = tx.transform_point3(Vec3::new(
            (2.0 * gen_f32(rng) - 1.0) * self.aperture,
            (2.0 * gen_f32(rng) - 1.0) * self.aperture,
            0.0,
        ));

        let direction = (focal_point - lens_point)
            .try_normalize()
            .unwrap_or(self.forward());

        Ray::new(lens_point, direction)
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn resolution(&self) -> UVec2 {
        UVec2::new(self.image_width, self.image_height)
    }

    pub fn position(&self) -> Vec3 {
        self.rig.position()
    }

    /// World-space viewing direction (the rig's local -Z).
    pub fn forward(&self) -> Vec3 {
        -self.rig.forward()
    }

    pub fn rig(&self) -> &FreeCamera {
        &self.rig
    }

    /// Camera space -> world space.
    pub fn transform(&self) -> &Mat4 {
        self.rig.transform()
    }

    /// World space -> camera space.
    pub fn inverse_transform(&self) -> &Mat4 {
        self.rig.inverse_transform()
    }

    pub fn vfov(&self) -> f32 {
        self.vfov
    }

    pub fn aperture(&self) -> f32 {
        self.aperture
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_camera_initialize() {
        let camera = Camera::new()
            .with_resolution(800, 400)
            .with_lens(90.0, 0.0, 1.0);

        assert_eq!(camera.resolution(), UVec2::new(800, 400));
        assert_eq!(camera.vfov(), 90.0);
        assert_eq!(camera.aperture(), 0.0);
        assert_eq!(camera.focal_distance(), 1.0);
        assert!((camera.plane_height - 2.0).abs() < 1e-5);
        assert!((camera.plane_width - 4.0).abs() < 1e-5);
        assert!((camera.pixel_width - 1.0 / 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_camera_ray_direction() {
        let camera = Camera::new()
            .with_resolution(100, 100)
            .with_lens(90.0, 0.0, 1.0);

        let mut rng = StdRng::seed_from_u64(42);

        // Center ray should point roughly towards -Z
        let ray = camera.generate_ray(50, 50, &mut rng);
        assert!(ray.direction().z < -0.9);
        assert!((ray.direction().length() - 1.0).abs() < 1e-5);

        // Top row points up, left column points left
        let top = camera.generate_ray(50, 0, &mut rng);
        assert!(top.direction().y > 0.0);
        let left = camera.generate_ray(0, 50, &mut rng);
        assert!(left.direction().x < 0.0);
    }

    #[test]
    fn test_zero_aperture_origin_is_camera_position() {
        let position = Vec3::new(1.5, -2.0, 7.25);
        let mut camera = Camera::new()
            .with_resolution(64, 48)
            .with_lens(60.0, 0.0, 3.0)
            .with_position(position);
        camera.rotate(0.2, 0.4);

        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (x, y) in [(0, 0), (63, 47), (32, 24), (5, 40)] {
                let ray = camera.generate_ray(x, y, &mut rng);
                assert_eq!(ray.origin(), camera.position());
            }
        }
    }

    #[test]
    fn test_focal_plane_is_sharp() {
        let focal_distance = 4.0;
        let camera = Camera::new()
            .with_resolution(50, 50)
            .with_lens(60.0, 2.0, focal_distance);

        let footprint = camera.plane_width * focal_distance / 50.0;
        let mut rng = StdRng::seed_from_u64(7);
        let mut max_origin_offset = 0.0f32;

        for _ in 0..256 {
            let ray = camera.generate_ray(25, 25, &mut rng);
            max_origin_offset = max_origin_offset.max(ray.origin().length());

            // Rig is at the origin looking down -Z: intersect z = -focal_distance
            let t = (-focal_distance - ray.origin().z) / ray.direction().z;
            let hit = ray.at(t);

            // Pixel 25 of 50 spans [0, footprint) on both axes (y is flipped)
            assert!(hit.x > -1e-4 && hit.x < footprint + 1e-4, "x = {}", hit.x);
            assert!(hit.y < 1e-4 && hit.y > -footprint - 1e-4, "y = {}", hit.y);
        }

        // The lens actually spread the origins
        assert!(max_origin_offset > 0.5);
    }

    #[test]
    fn test_frame_counter_resets_on_movement() {
        let mut camera = Camera::new();

        assert_eq!(camera.increment_frame_count(), 1);
        assert_eq!(camera.increment_frame_count(), 2);

        camera.move_by(1.0, 0.0);
        assert_eq!(camera.frame_count(), 0);
        assert_eq!(camera.increment_frame_count(), 1);

        camera.increment_frame_count();
        camera.rotate(0.0, 0.1);
        assert_eq!(camera.increment_frame_count(), 1);

        camera.invalidate();
        assert_eq!(camera.increment_frame_count(), 1);
    }

    #[test]
    fn test_move_follows_rig_axes() {
        let mut camera = Camera::new().with_velocity(2.0);

        // Negative z moves along the viewing direction (-Z)
        camera.move_by(0.0, -1.0);
        assert!((camera.position() - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-6);

        // A positive quarter yaw turns the view towards +X
        camera.rotate(0.0, std::f32::consts::FRAC_PI_2);
        assert!((camera.forward() - Vec3::X).length() < 1e-5);
    }
}
