//! Tile-based progressive rendering.
//!
//! Divides the image into equal tiles. Each tile is a persistent task that
//! traces one sample per pixel per frame into its own accumulation slab.

use crate::accumulation::AccumulationBuffer;
use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::scene::Radiance;
use std::sync::{Arc, PoisonError, RwLock};
use tessel_math::UVec2;
use tessel_task::Work;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 100;

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Row-major grid position; also the accumulation slab index
    pub slot: usize,
    /// Position in dispatch order
    pub index: usize,
}

impl TileRect {
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Split `resolution` into tiles, sorted in spiral order from the centre.
///
/// The resolution must be an exact multiple of the tile size.
pub fn generate_tiles(resolution: UVec2, tile_size: UVec2) -> RenderResult<Vec<TileRect>> {
    if resolution.x == 0 || resolution.y == 0 {
        return Err(RenderError::EmptyResolution(resolution));
    }
    if tile_size.x == 0 || tile_size.y == 0 {
        return Err(RenderError::ZeroTileSize(tile_size));
    }
    if resolution.x % tile_size.x != 0 || resolution.y % tile_size.y != 0 {
        return Err(RenderError::IndivisibleResolution {
            resolution,
            tile_size,
        });
    }

    let grid = resolution / tile_size;
    let mut tiles: Vec<TileRect> = (0..grid.y)
        .flat_map(|row| (0..grid.x).map(move |column| (column, row)))
        .enumerate()
        .map(|(slot, (column, row))| TileRect {
            x: column * tile_size.x,
            y: row * tile_size.y,
            width: tile_size.x,
            height: tile_size.y,
            slot,
            index: slot,
        })
        .collect();

    sort_spiral(&mut tiles, resolution);

    for (i, tile) in tiles.iter_mut().enumerate() {
        tile.index = i;
    }

    Ok(tiles)
}

/// Sort tiles by distance from the image centre.
///
/// The sort is stable, so equidistant tiles keep row-major order.
fn sort_spiral(tiles: &mut [TileRect], resolution: UVec2) {
    let center_x = resolution.x as f32 / 2.0;
    let center_y = resolution.y as f32 / 2.0;

    tiles.sort_by(|a, b| {
        let (ax, ay) = a.center();
        let (bx, by) = b.center();

        let a_dist = (ax - center_x).powi(2) + (ay - center_y).powi(2);
        let b_dist = (bx - center_x).powi(2) + (by - center_y).powi(2);

        a_dist.partial_cmp(&b_dist).unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// The work of one tile: trace a sample for each of its pixels.
pub struct Tile<S: ?Sized> {
    rect: TileRect,
    scene: Arc<S>,
    camera: Arc<RwLock<Camera>>,
    accumulation: Arc<AccumulationBuffer>,
    max_bounces: u32,
}

impl<S: Radiance + ?Sized> Tile<S> {
    pub fn new(
        rect: TileRect,
        scene: Arc<S>,
        camera: Arc<RwLock<Camera>>,
        accumulation: Arc<AccumulationBuffer>,
        max_bounces: u32,
    ) -> Self {
        Self {
            rect,
            scene,
            camera,
            accumulation,
            max_bounces,
        }
    }

    pub fn rect(&self) -> &TileRect {
        &self.rect
    }
}

impl<S: Radiance + ?Sized> Work for Tile<S> {
    fn run(&self) {
        // Held for this tile only; the camera may still change between tiles
        let camera = self.camera.read().unwrap_or_else(PoisonError::into_inner);
        let mut slab = self.accumulation.lock_slab(self.rect.slot);
        let mut rng = rand::thread_rng();

        let TileRect {
            x, y, width, height, ..
        } = self.rect;

        for local_y in 0..height {
            for local_x in 0..width {
                let ray = camera.generate_ray(x + local_x, y + local_y, &mut rng);
                let color = self.scene.radiance(&ray, self.max_bounces, &mut rng);
                slab[(local_y * width + local_x) as usize] += color;
            }
        }

        log::trace!("tile {} ({}, {}) done", self.rect.index, x, y);
    }
}
