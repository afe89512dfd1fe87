//! Free-flying camera rig.
//!
//! Tracks a position plus yaw/pitch angles and keeps the world transform
//! and its inverse in sync with them. The rig looks down its local -Z axis.

use glam::{Mat4, Quat, Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

/// A yaw/pitch camera rig with a world transform and its inverse.
#[derive(Debug, Clone, Copy)]
pub struct FreeCamera {
    position: Vec3,
    /// x = yaw around +Y, y = pitch around +X (radians)
    angle: Vec2,
    /// Distance covered per unit of movement input
    velocity: f32,

    // Derived by update()
    forward: Vec3,
    right: Vec3,
    tx: Mat4,
    tx_inverse: Mat4,
}

impl FreeCamera {
    /// Create a new rig.
    pub fn new(position: Vec3, angle: Vec2, velocity: f32) -> Self {
        let mut camera = Self {
            position,
            angle,
            velocity,
            forward: Vec3::Z,
            right: Vec3::NEG_X,
            tx: Mat4::IDENTITY,
            tx_inverse: Mat4::IDENTITY,
        };
        camera.update();
        camera
    }

    /// Translate along the rig's right (`x_amount`) and forward (`z_amount`) axes.
    pub fn translate(&mut self, x_amount: f32, z_amount: f32) {
        self.position += z_amount * self.velocity * self.forward
            + x_amount * self.velocity * self.right;
        self.update();
    }

    /// Rotate the rig.
    ///
    /// `angle_y` turns around the world up axis. `angle_x` tilts; a tilt that
    /// would reach straight up or down is ignored.
    pub fn rotate(&mut self, angle_x: f32, angle_y: f32) {
        self.angle.x -= angle_y;
        let pitch = self.angle.y - angle_x;
        if pitch < FRAC_PI_2 && pitch > -FRAC_PI_2 {
            self.angle.y = pitch;
        }
        self.update();
    }

    /// Move the rig to an absolute position.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update();
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = velocity;
    }

    fn update(&mut self) {
        let orientation = self.orientation();

        self.forward = orientation * Vec3::Z;
        self.right = self.forward.cross(Vec3::Y);

        self.tx = Mat4::from_rotation_translation(orientation, self.position);
        self.tx_inverse = self.tx.inverse();
    }

    /// Rotation built from yaw then pitch.
    pub fn orientation(&self) -> Quat {
        Quat::from_axis_angle(Vec3::Y, self.angle.x) * Quat::from_axis_angle(Vec3::X, self.angle.y)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn angle(&self) -> Vec2 {
        self.angle
    }

    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Local +Z in world space (the rig views along the opposite direction).
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Camera space -> world space.
    #[inline]
    pub fn transform(&self) -> &Mat4 {
        &self.tx
    }

    /// World space -> camera space.
    #[inline]
    pub fn inverse_transform(&self) -> &Mat4 {
        &self.tx_inverse
    }
}

impl Default for FreeCamera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec2::ZERO, 1.0)
    }
}
