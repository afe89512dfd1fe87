//! Input events and their effect on the camera.

use serde::{Deserialize, Serialize};
use tessel_renderer::Camera;

/// Radians of rotation per pixel of mouse drag.
const DRAG_SENSITIVITY: f32 = 0.01;

/// Movement keys. Each also answers to its WASD letter and arrow name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    #[serde(alias = "w", alias = "up")]
    Forward,
    #[serde(alias = "s", alias = "down")]
    Back,
    #[serde(alias = "a")]
    Left,
    #[serde(alias = "d")]
    Right,
}

/// A single input event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Key { key: Key },
    /// Drag with the button held, in pixels
    MouseDrag { dx: f32, dy: f32 },
}

/// An event to apply before rendering `frame` (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedInput {
    pub frame: u32,
    pub event: InputEvent,
}

impl InputEvent {
    /// Move or rotate the camera. Either one restarts accumulation.
    pub fn apply(&self, camera: &mut Camera) {
        match *self {
            InputEvent::Key { key } => {
                let (x, z) = match key {
                    Key::Forward => (0.0, -1.0),
                    Key::Back => (0.0, 1.0),
                    Key::Left => (1.0, 0.0),
                    Key::Right => (-1.0, 0.0),
                };
                camera.move_by(x, z);
            }
            InputEvent::MouseDrag { dx, dy } => {
                camera.rotate(dy * DRAG_SENSITIVITY, dx * DRAG_SENSITIVITY);
            }
        }
    }
}
