//! Commands Lua scripts queue against the running map.
//!
//! Scripts never touch the map directly. Each `map.*` call pushes a
//! command here and the host applies the queue once the chunk returns.

use crate::map::tilemap::TileMap;
use log::warn;

/// A map edit requested from Lua. Layer indices are 0-based.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCmd {
    /// Set one tile
    SetTile {
        layer: usize,
        x: i32,
        y: i32,
        tile: i32,
    },
    /// Fill a rectangle, clipped to the layer
    FillArea {
        layer: usize,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        tile: i32,
    },
    /// Rename a layer
    SetLayerName { layer: usize, name: String },
    /// Move or resize the viewport
    SetViewport { x: i32, y: i32, w: i32, h: i32 },
}

impl MapCmd {
    /// Applies the command to `map`. Commands naming a missing layer are
    /// logged and dropped.
    pub fn apply(self, map: &mut TileMap) {
        match self {
            MapCmd::SetTile { layer, x, y, tile } => {
                if layer >= map.layer_count() {
                    warn!("map.set_tile: no layer {} in '{}'", layer, map.name());
                    return;
                }
                map.set_tile(layer, x, y, tile);
            }
            MapCmd::FillArea {
                layer,
                x,
                y,
                w,
                h,
                tile,
            } => {
                if layer >= map.layer_count() {
                    warn!("map.fill_area: no layer {} in '{}'", layer, map.name());
                    return;
                }
                map.fill_area(layer, x, y, w, h, tile);
            }
            MapCmd::SetLayerName { layer, name } => {
                if !map.set_layer_name(layer, name) {
                    warn!("map.set_layer_name: no layer {} in '{}'", layer, map.name());
                }
            }
            MapCmd::SetViewport { x, y, w, h } => map.set_viewport(x, y, w, h),
        }
    }
}
