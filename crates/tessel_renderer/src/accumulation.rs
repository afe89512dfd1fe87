//! Progressive accumulation storage.
//!
//! The image is split into one slab per tile. Each slab sits behind its own
//! mutex and is only ever written by the tile that owns it, so the locks are
//! uncontended during a frame.

use crate::material::Color;
use crate::renderer::color_to_rgb;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tessel_math::UVec2;

/// Running sum of every sample traced since the last reset.
#[derive(Debug)]
pub struct AccumulationBuffer {
    resolution: UVec2,
    tile_size: UVec2,
    tiles_x: u32,
    slabs: Vec<Mutex<Vec<Color>>>,
}

impl AccumulationBuffer {
    /// Allocate a zeroed buffer.
    ///
    /// `resolution` must be a non-zero multiple of `tile_size`; the renderer
    /// validates this before constructing one.
    pub fn new(resolution: UVec2, tile_size: UVec2) -> Self {
        let tiles = resolution / tile_size;
        let slab_len = (tile_size.x * tile_size.y) as usize;
        let slabs = (0..tiles.x * tiles.y)
            .map(|_| Mutex::new(vec![Color::ZERO; slab_len]))
            .collect();

        Self {
            resolution,
            tile_size,
            tiles_x: tiles.x,
            slabs,
        }
    }

    /// Lock the slab for grid cell `slot`, laid out row-major with
    /// `tile_size.x` entries per row.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn lock_slab(&self, slot: usize) -> MutexGuard<'_, Vec<Color>> {
        lock(&self.slabs[slot])
    }

    /// Zero every slab.
    pub fn reset(&self) {
        for slab in &self.slabs {
            lock(slab).fill(Color::ZERO);
        }
    }

    /// Accumulated sum for pixel (x, y), or `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.resolution.x || y >= self.resolution.y {
            return None;
        }
        let (slot, offset) = self.locate(x, y);
        Some(lock(&self.slabs[slot])[offset])
    }

    /// Tonemap row `y`, scaled by `scale`, into RGB8 bytes.
    ///
    /// `row` must hold exactly `width * 3` bytes.
    pub fn resolve_row(&self, y: u32, scale: f32, row: &mut [u8]) {
        debug_assert_eq!(row.len(), self.resolution.x as usize * 3);

        let tile_width = self.tile_size.x as usize;
        let local_y = (y % self.tile_size.y) as usize;
        let first_slot = (y / self.tile_size.y * self.tiles_x) as usize;

        for (tile_x, chunk) in row.chunks_mut(tile_width * 3).enumerate() {
            let slab = lock(&self.slabs[first_slot + tile_x]);
            let start = local_y * tile_width;

            for (pixel, color) in chunk
                .chunks_exact_mut(3)
                .zip(&slab[start..start + tile_width])
            {
                pixel.copy_from_slice(&color_to_rgb(*color * scale));
            }
        }
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn tile_size(&self) -> UVec2 {
        self.tile_size
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    fn locate(&self, x: u32, y: u32) -> (usize, usize) {
        let slot = (y / self.tile_size.y * self.tiles_x + x / self.tile_size.x) as usize;
        let offset = ((y % self.tile_size.y) * self.tile_size.x + x % self.tile_size.x) as usize;
        (slot, offset)
    }
}

fn lock(slab: &Mutex<Vec<Color>>) -> MutexGuard<'_, Vec<Color>> {
    slab.lock().unwrap_or_else(PoisonError::into_inner)
}
