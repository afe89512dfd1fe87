//! Renderer error types.

use tessel_math::UVec2;
use tessel_task::TaskError;
use thiserror::Error;

/// Errors that can occur while building a scene or rendering it.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Resolution must be non-zero, got {0}")]
    EmptyResolution(UVec2),

    #[error("Tile size must be non-zero, got {0}")]
    ZeroTileSize(UVec2),

    #[error("Resolution {resolution} is not divisible by tile size {tile_size}")]
    IndivisibleResolution { resolution: UVec2, tile_size: UVec2 },

    #[error("Camera resolution {camera} does not match render resolution {render}")]
    ResolutionMismatch { camera: UVec2, render: UVec2 },

    #[error("Sphere radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    #[error("Unknown material index {index} (scene has {count} materials)")]
    UnknownMaterial { index: usize, count: usize },

    #[error("Task scheduling error: {0}")]
    Task(#[from] TaskError),
}

/// Result alias for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
