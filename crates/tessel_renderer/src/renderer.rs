//! Progressive frame renderer.
//!
//! Owns one persistent task per image tile and a worker pool. Every call to
//! [`Renderer::render`] traces one more sample per pixel, adds it to the
//! accumulation buffer and tonemaps the running average into RGB8 bytes.

use crate::accumulation::AccumulationBuffer;
use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::material::Color;
use crate::scene::{Radiance, Scene};
use crate::tile::{generate_tiles, Tile, DEFAULT_TILE_SIZE};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Instant;
use tessel_math::UVec2;
use tessel_task::{PoolConfig, Task, TaskError, TaskRef, ThreadPool};

/// Default path length before a ray gives up and sees the sky.
pub const DEFAULT_MAX_BOUNCES: u32 = 4;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output image size in pixels
    pub resolution: UVec2,
    /// Tile size in pixels; must divide the resolution exactly
    pub tile_size: UVec2,
    /// Maximum bounces per path
    pub max_bounces: u32,
    /// Worker pool settings
    pub pool: PoolConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: UVec2::splat(400),
            tile_size: UVec2::splat(DEFAULT_TILE_SIZE),
            max_bounces: DEFAULT_MAX_BOUNCES,
            pool: PoolConfig::default(),
        }
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a linear color to 8-bit RGB.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b]
}

/// Progressive tile renderer.
///
/// The camera is shared with whoever drives it (the viewer's input
/// handling); moving or rotating it restarts accumulation on the next frame.
pub struct Renderer<S: Radiance + ?Sized + 'static = Scene> {
    config: RenderConfig,
    camera: Arc<RwLock<Camera>>,
    scene: Arc<S>,
    accumulation: Arc<AccumulationBuffer>,
    tiles: Vec<Arc<Task<Tile<S>>>>,
    pool: ThreadPool,
    image: Vec<u8>,
    frame_count: u32,
}

impl<S: Radiance + ?Sized + 'static> Renderer<S> {
    /// Build the tile grid and start the worker pool.
    pub fn new(
        config: RenderConfig,
        camera: Arc<RwLock<Camera>>,
        scene: Arc<S>,
    ) -> RenderResult<Self> {
        let rects = generate_tiles(config.resolution, config.tile_size)?;

        let camera_resolution = camera
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolution();
        if camera_resolution != config.resolution {
            return Err(RenderError::ResolutionMismatch {
                camera: camera_resolution,
                render: config.resolution,
            });
        }

        let accumulation = Arc::new(AccumulationBuffer::new(
            config.resolution,
            config.tile_size,
        ));

        let tiles = rects
            .into_iter()
            .map(|rect| {
                Task::new(Tile::new(
                    rect,
                    Arc::clone(&scene),
                    Arc::clone(&camera),
                    Arc::clone(&accumulation),
                    config.max_bounces,
                ))
            })
            .collect::<Vec<_>>();

        let pool = ThreadPool::new(config.pool.clone())?;

        // The fresh buffer holds no samples, so any earlier frames are void
        camera
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate();

        log::info!(
            "Renderer: {}x{} in {} tiles of {}x{}, {} workers, {} bounces",
            config.resolution.x,
            config.resolution.y,
            tiles.len(),
            config.tile_size.x,
            config.tile_size.y,
            pool.thread_count(),
            config.max_bounces
        );

        let image = vec![0; (config.resolution.x * config.resolution.y * 3) as usize];

        Ok(Self {
            config,
            camera,
            scene,
            accumulation,
            tiles,
            pool,
            image,
            frame_count: 0,
        })
    }

    /// Trace one more sample per pixel and refresh [`Renderer::image`].
    ///
    /// Returns the number of frames now accumulated. A return value of 1
    /// means accumulation restarted.
    pub fn render(&mut self) -> RenderResult<u32> {
        let start = Instant::now();

        // Checked first so a dead pool leaves the frame counter alone
        if self.pool.has_exited() {
            return Err(TaskError::PoolExited.into());
        }

        let frame_count = self.write_camera().increment_frame_count();
        if frame_count == 1 {
            self.accumulation.reset();
        }

        let submitted = self
            .tiles
            .iter()
            .try_for_each(|tile| self.pool.add_task(Arc::clone(tile) as TaskRef));
        // Whatever was submitted must finish before the buffer is read
        self.pool.wait_for_completion();
        submitted?;

        let scale = 1.0 / frame_count as f32;
        let row_len = self.config.resolution.x as usize * 3;
        let accumulation = &self.accumulation;
        self.image
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| accumulation.resolve_row(y as u32, scale, row));

        self.frame_count = frame_count;
        log::debug!("Frame {} rendered in {:.2?}", frame_count, start.elapsed());

        Ok(frame_count)
    }

    /// Tonemapped output: RGB8, row-major, top row first.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Raw accumulated sum at pixel (x, y).
    pub fn accumulated(&self, x: u32, y: u32) -> Option<Color> {
        self.accumulation.get(x, y)
    }

    /// Frames accumulated as of the last completed render.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn resolution(&self) -> UVec2 {
        self.config.resolution
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn camera(&self) -> &Arc<RwLock<Camera>> {
        &self.camera
    }

    pub fn scene(&self) -> &Arc<S> {
        &self.scene
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Stop the worker pool. Further renders fail.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        self.pool.exit()?;
        Ok(())
    }

    fn write_camera(&self) -> RwLockWriteGuard<'_, Camera> {
        self.camera.write().unwrap_or_else(PoisonError::into_inner)
    }
}
