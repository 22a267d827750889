//! Tileset renderer seam.
//!
//! A tileset maps a tile index to a drawn rectangle. Texture loading and the
//! actual draw calls belong to the host renderer; the map only needs the tile
//! size and a `draw` entry point.

use std::sync::atomic::{AtomicUsize, Ordering};

pub trait Tileset: Send + Sync {
    fn name(&self) -> &str;
    /// Tile width and height in pixels.
    fn tile_size(&self) -> (i32, i32);
    /// Draws `tile` with its top-left corner at screen position `(x, y)`.
    fn draw(&self, tile: i32, x: i32, y: i32, opacity: f32);
}

/// Tileset without a texture, for tools and simulations that never present
/// a frame. Counts the tiles it was asked to draw.
#[derive(Debug)]
pub struct HeadlessTileset {
    name: String,
    tile_w: i32,
    tile_h: i32,
    draws: AtomicUsize,
}

impl HeadlessTileset {
    pub fn new(name: impl Into<String>, tile_w: i32, tile_h: i32) -> Self {
        Self {
            name: name.into(),
            tile_w,
            tile_h,
            draws: AtomicUsize::new(0),
        }
    }

    /// Parses a `WxH` size such as `16x16`.
    pub fn parse_size(size: &str) -> Option<(i32, i32)> {
        let (w, h) = size.trim().split_once(['x', 'X'])?;
        let w = w.trim().parse().ok()?;
        let h = h.trim().parse().ok()?;
        (w > 0 && h > 0).then_some((w, h))
    }

    /// Number of tiles drawn so far.
    pub fn draw_count(&self) -> usize {
        self.draws.load(Ordering::Relaxed)
    }
}

impl Tileset for HeadlessTileset {
    fn name(&self) -> &str {
        &self.name
    }

    fn tile_size(&self) -> (i32, i32) {
        (self.tile_w, self.tile_h)
    }

    fn draw(&self, _tile: i32, _x: i32, _y: i32, _opacity: f32) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }
}
