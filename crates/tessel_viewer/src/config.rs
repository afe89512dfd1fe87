//! Viewer configuration, optionally loaded from a JSON file.

use crate::input::ScriptedInput;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tessel_math::Vec3;
use tessel_renderer::{Camera, RenderConfig};

/// Everything the viewer needs for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub render: RenderConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub run: RunConfig,
}

impl ViewerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Camera matching the render resolution.
    pub fn build_camera(&self) -> Camera {
        let resolution = self.render.resolution;
        Camera::new()
            .with_resolution(resolution.x, resolution.y)
            .with_lens(
                self.camera.vfov,
                self.camera.aperture,
                self.camera.focal_distance,
            )
            .with_position(self.camera.position)
            .with_velocity(self.camera.velocity)
    }
}

/// Lens and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    pub aperture: f32,
    pub focal_distance: f32,
    /// Distance moved per movement key press
    pub velocity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 15.0),
            vfov: 70.0,
            aperture: 0.2,
            focal_distance: 5.0,
            velocity: 1.0,
        }
    }
}

/// Demo scene generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub sphere_count: u32,
    /// Half-size of the area spheres are scattered over (y is ignored)
    pub extents: Vec3,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            sphere_count: 10,
            extents: Vec3::new(10.0, 0.0, 10.0),
            seed: 0,
        }
    }
}

/// Frame loop and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Frames to render before writing the image
    pub frames: u32,
    pub output: PathBuf,
    /// Input events replayed during the run
    pub input: Vec<ScriptedInput>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 64,
            output: PathBuf::from("tessel.png"),
            input: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, Key};
    use tessel_math::UVec2;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "render": { "resolution": [200, 100], "tile_size": [50, 50] },
            "scene": { "seed": 7 },
            "run": {
                "frames": 3,
                "input": [
                    { "frame": 1, "event": { "type": "key", "key": "w" } },
                    { "frame": 2, "event": { "type": "mouse_drag", "dx": 4.0, "dy": -2.0 } }
                ]
            }
        }"#;

        let config: ViewerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.render.resolution, UVec2::new(200, 100));
        assert_eq!(config.render.max_bounces, 4);
        assert_eq!(config.scene.seed, 7);
        assert_eq!(config.scene.sphere_count, 10);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.run.frames, 3);
        assert_eq!(config.run.input[0].event, InputEvent::Key { key: Key::Forward });
        assert_eq!(
            config.run.input[1].event,
            InputEvent::MouseDrag { dx: 4.0, dy: -2.0 }
        );
    }

    #[test]
    fn test_camera_matches_render_resolution() {
        let mut config = ViewerConfig::default();
        config.render.resolution = UVec2::new(300, 200);

        let camera = config.build_camera();
        assert_eq!(camera.resolution(), UVec2::new(300, 200));
        assert_eq!(camera.position(), config.camera.position);
        assert_eq!(camera.frame_count(), 0);
    }
}
