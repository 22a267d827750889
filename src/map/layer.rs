//! Tile layer: a fixed-size grid of tile indices plus entity residency lists.
//!
//! Grid accessors are bounds checked and never panic: out-of-bounds reads
//! return 0 and out-of-bounds writes are ignored. The `wrap` flag is only
//! honoured by [`Layer::sample`]; `get`, `set` and map drawing never wrap.

use super::entity::EntityId;
use super::error::MapError;
use super::tilemap::Mode;
use super::tileset::Tileset;
use smallvec::SmallVec;
use std::fmt::{self, Write as FmtWrite};
use std::sync::Arc;

/// Tile index stored in a layer cell. 0 means "no tile".
pub type TileIndex = i32;

/// Ordered entity ids resident on a layer.
pub type EntityList = SmallVec<[EntityId; 8]>;

#[derive(Clone)]
pub struct Layer {
    width: usize,
    height: usize,
    tiles: Vec<TileIndex>,
    /// Whether sampling outside the grid wraps around (see [`Layer::sample`]).
    pub wrap: bool,
    /// Display label, not required to be unique.
    pub name: String,
    tileset: Option<Arc<dyn Tileset>>,
    entities: EntityList,
    start_entities: EntityList,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("wrap", &self.wrap)
            .field("tileset", &self.tileset.as_ref().map(|t| t.name().to_string()))
            .field("entities", &self.entities)
            .field("start_entities", &self.start_entities)
            .finish()
    }
}

/// Number of cells in a `width` x `height` layer. Zero sizes and sizes whose
/// tile buffer cannot be addressed are rejected.
fn check_dimensions(width: usize, height: usize) -> Result<usize, MapError> {
    let cells = width
        .checked_mul(height)
        .filter(|&cells| cells > 0)
        .filter(|&cells| {
            cells
                .checked_mul(std::mem::size_of::<TileIndex>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        });
    cells.ok_or(MapError::InvalidDimensions { width, height })
}

impl Layer {
    /// Creates a `width` x `height` layer with every cell set to `fill`.
    pub fn new(width: usize, height: usize, fill: TileIndex) -> Result<Self, MapError> {
        let cells = check_dimensions(width, height)?;
        Ok(Self::from_parts(width, height, vec![fill; cells]))
    }

    /// Creates a layer from row-major tile data.
    pub fn from_tiles(
        name: impl Into<String>,
        width: usize,
        height: usize,
        tiles: Vec<TileIndex>,
    ) -> Result<Self, MapError> {
        let name = name.into();
        let cells = check_dimensions(width, height)?;
        if tiles.len() != cells {
            return Err(MapError::InvalidLayerSize {
                layer: name,
                expected: cells,
                found: tiles.len(),
            });
        }
        let mut layer = Self::from_parts(width, height, tiles);
        layer.name = name;
        Ok(layer)
    }

    /// Creates a `width` x `height` window onto `source` starting at
    /// `(x_offset, y_offset)`. Cells outside `source` get `fill`.
    pub fn cropped(
        source: &Layer,
        x_offset: i32,
        y_offset: i32,
        width: usize,
        height: usize,
        fill: TileIndex,
    ) -> Result<Self, MapError> {
        let mut layer = Self::new(width, height, fill)?;
        for y in 0..height {
            for x in 0..width {
                if let Some(src) = source.index(x as i64 + x_offset as i64, y as i64 + y_offset as i64) {
                    layer.tiles[x + y * width] = source.tiles[src];
                }
            }
        }
        layer.wrap = source.wrap;
        layer.name = source.name.clone();
        layer.tileset = source.tileset.clone();
        Ok(layer)
    }

    /// Copy of the grid, name, wrap flag and tileset without entity placements.
    pub fn duplicate(&self) -> Self {
        Self {
            entities: EntityList::new(),
            start_entities: EntityList::new(),
            ..self.clone()
        }
    }

    fn from_parts(width: usize, height: usize, tiles: Vec<TileIndex>) -> Self {
        Self {
            width,
            height,
            tiles,
            wrap: false,
            name: String::new(),
            tileset: None,
            entities: EntityList::new(),
            start_entities: EntityList::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major tile data, `width * height` long.
    pub fn tiles(&self) -> &[TileIndex] {
        &self.tiles
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        (x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height)
            .then(|| x as usize + y as usize * self.width)
    }

    /// Tile at `(x, y)`, or 0 outside the grid.
    pub fn get(&self, x: i32, y: i32) -> TileIndex {
        self.index(x as i64, y as i64).map_or(0, |i| self.tiles[i])
    }

    /// Sets the tile at `(x, y)`; ignored outside the grid.
    pub fn set(&mut self, x: i32, y: i32, tile: TileIndex) {
        if let Some(i) = self.index(x as i64, y as i64) {
            self.tiles[i] = tile;
        }
    }

    /// Reads `(x, y)` wrapping around the edges when `wrap` is set.
    pub fn sample(&self, x: i32, y: i32) -> TileIndex {
        if !self.wrap {
            return self.get(x, y);
        }
        let x = (x as i64).rem_euclid(self.width as i64);
        let y = (y as i64).rem_euclid(self.height as i64);
        self.tiles[x as usize + y as usize * self.width]
    }

    /// Resizes the grid, keeping the overlapping top-left region and filling
    /// new cells with `fill`. Zero dimensions leave the layer untouched.
    pub fn resize(&mut self, width: usize, height: usize, fill: TileIndex) -> Result<(), MapError> {
        let cells = check_dimensions(width, height)?;
        let mut tiles = vec![fill; cells];
        for y in 0..self.height.min(height) {
            for x in 0..self.width.min(width) {
                tiles[x + y * width] = self.tiles[x + y * self.width];
            }
        }
        self.tiles = tiles;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Replaces the grid with the `width` x `height` window starting at
    /// `(x_offset, y_offset)`, keeping entity placements. See [`Layer::cropped`].
    pub fn crop(
        &mut self,
        x_offset: i32,
        y_offset: i32,
        width: usize,
        height: usize,
        fill: TileIndex,
    ) -> Result<(), MapError> {
        let cropped = Self::cropped(self, x_offset, y_offset, width, height, fill)?;
        self.tiles = cropped.tiles;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Sets every cell of the rectangle that lies inside the grid to `fill`.
    pub fn fill_area(&mut self, x: i32, y: i32, w: i32, h: i32, fill: TileIndex) {
        let x0 = (x as i64).max(0);
        let y0 = (y as i64).max(0);
        let x1 = (x as i64 + w as i64).min(self.width as i64);
        let y1 = (y as i64 + h as i64).min(self.height as i64);
        for cy in y0..y1 {
            let row = cy as usize * self.width;
            for cx in x0..x1 {
                self.tiles[row + cx as usize] = fill;
            }
        }
    }

    pub fn clear(&mut self, fill: TileIndex) {
        self.fill_area(0, 0, self.width as i32, self.height as i32, fill);
    }

    /// Copies this layer's cells from `(start_x, start_y)` onward into
    /// `target`, shifted by `(x_offset, y_offset)`. Cells landing outside
    /// `target` are dropped. With `skip_zero`, empty source cells leave the
    /// target untouched.
    pub fn stamp(
        &self,
        target: &mut Layer,
        x_offset: i32,
        y_offset: i32,
        start_x: i32,
        start_y: i32,
        skip_zero: bool,
    ) {
        for y in start_y.max(0) as usize..self.height {
            for x in start_x.max(0) as usize..self.width {
                let tile = self.tiles[x + y * self.width];
                if skip_zero && tile == 0 {
                    continue;
                }
                if let Some(i) = target.index(x as i64 + x_offset as i64, y as i64 + y_offset as i64) {
                    target.tiles[i] = tile;
                }
            }
        }
    }

    /// Grid as text: one row per line, each cell right-aligned in 4 columns
    /// followed by a space.
    pub fn dump(&self, indent: &str) -> String {
        let mut out = String::with_capacity((self.width * 5 + indent.len() + 1) * self.height);
        for row in self.tiles.chunks(self.width) {
            out.push_str(indent);
            for tile in row {
                let _ = write!(out, "{:>4} ", tile);
            }
            out.push('\n');
        }
        out
    }

    pub fn tileset(&self) -> Option<&Arc<dyn Tileset>> {
        self.tileset.as_ref()
    }

    pub fn set_tileset(&mut self, tileset: Option<Arc<dyn Tileset>>) {
        self.tileset = tileset;
    }

    /// Entity list targeted by `mode`: live entities in play, start
    /// placements in edit.
    pub fn entities(&self, mode: Mode) -> &[EntityId] {
        match mode {
            Mode::Play => &self.entities,
            Mode::Edit => &self.start_entities,
        }
    }

    pub(crate) fn entities_mut(&mut self, mode: Mode) -> &mut EntityList {
        match mode {
            Mode::Play => &mut self.entities,
            Mode::Edit => &mut self.start_entities,
        }
    }

    pub fn live_entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn start_entities(&self) -> &[EntityId] {
        &self.start_entities
    }

    /// Appends `id` to the list targeted by `mode`.
    pub fn push_entity(&mut self, mode: Mode, id: EntityId) {
        self.entities_mut(mode).push(id);
    }

    /// Removes the first occurrence of `id` from the list targeted by `mode`.
    pub fn remove_entity(&mut self, mode: Mode, id: EntityId) -> bool {
        let list = self.entities_mut(mode);
        match list.iter().position(|e| *e == id) {
            Some(i) => {
                list.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn push_start_entity(&mut self, id: EntityId) {
        self.start_entities.push(id);
    }

    pub fn remove_start_entity(&mut self, id: EntityId) -> bool {
        self.remove_entity(Mode::Edit, id)
    }

    pub fn contains_entity(&self, mode: Mode, id: EntityId) -> bool {
        self.entities(mode).contains(&id)
    }

    /// Empties the live list, returning what it held.
    pub(crate) fn take_live_entities(&mut self) -> EntityList {
        std::mem::take(&mut self.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> Layer {
        let tiles = (0..(width * height) as i32).collect();
        Layer::from_tiles("numbered", width, height, tiles).unwrap()
    }

    #[test]
    fn set_then_get_in_bounds() {
        let mut layer = Layer::new(4, 3, 0).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                layer.set(x, y, x * 10 + y + 1);
            }
        }
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(layer.get(x, y), x * 10 + y + 1);
            }
        }
    }

    #[test]
    fn out_of_bounds_get_is_zero_and_set_is_ignored() {
        let mut layer = Layer::new(3, 3, 9).unwrap();
        let before = layer.tiles().to_vec();
        for (x, y) in [(-1, 0), (0, -1), (3, 0), (0, 3), (i32::MAX, i32::MIN)] {
            assert_eq!(layer.get(x, y), 0);
            layer.set(x, y, 42);
        }
        assert_eq!(layer.tiles(), before.as_slice());
    }

    #[test]
    fn zero_dimensions_fail_fast() {
        assert!(matches!(Layer::new(0, 4, 0), Err(MapError::InvalidDimensions { .. })));
        let mut layer = Layer::new(2, 2, 1).unwrap();
        assert!(layer.resize(2, 0, 0).is_err());
        assert_eq!((layer.width(), layer.height()), (2, 2));
        assert_eq!(layer.tiles(), &[1, 1, 1, 1]);
    }

    #[test]
    fn overflowing_dimensions_are_rejected() {
        let huge = usize::MAX / 2 + 1;
        assert!(matches!(
            Layer::new(huge, 2, 0),
            Err(MapError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Layer::from_tiles("big", usize::MAX, usize::MAX, vec![0]),
            Err(MapError::InvalidDimensions { .. })
        ));
        let mut layer = Layer::new(2, 2, 1).unwrap();
        assert!(layer.resize(usize::MAX, 3, 0).is_err());
        assert_eq!(layer.tiles(), &[1, 1, 1, 1]);
    }

    #[test]
    fn resize_keeps_overlap_and_fills_rest() {
        let mut layer = numbered(4, 3);
        let old = layer.clone();
        layer.resize(3, 5, -1).unwrap();
        assert_eq!(layer.tiles().len(), 15);
        for y in 0..5 {
            for x in 0..3 {
                let expected = if y < 3 { old.get(x, y) } else { -1 };
                assert_eq!(layer.get(x, y), expected, "cell ({x}, {y})");
            }
        }
    }

    #[test]
    fn clear_overwrites_everything() {
        let mut layer = numbered(5, 4);
        layer.clear(3);
        assert!(layer.tiles().iter().all(|t| *t == 3));
    }

    #[test]
    fn fill_area_scenario() {
        let mut layer = Layer::new(10, 10, 0).unwrap();
        layer.fill_area(2, 2, 3, 3, 5);
        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..5).contains(&x) && (2..5).contains(&y);
                assert_eq!(layer.get(x, y), if inside { 5 } else { 0 });
            }
        }
    }

    #[test]
    fn fill_area_clips_negative_and_overflowing_rects() {
        let mut layer = Layer::new(4, 4, 0).unwrap();
        layer.fill_area(-2, -2, 3, 3, 1);
        layer.fill_area(3, 3, 100, 100, 2);
        assert_eq!(layer.get(0, 0), 1);
        assert_eq!(layer.get(1, 0), 0);
        assert_eq!(layer.get(3, 3), 2);
        assert_eq!(layer.tiles().iter().filter(|t| **t != 0).count(), 2);
    }

    #[test]
    fn stamp_skip_zero_scenario() {
        let mut source = Layer::new(4, 4, 0).unwrap();
        source.set(1, 1, 9);
        let mut target = Layer::new(4, 4, 7).unwrap();
        source.stamp(&mut target, 0, 0, 0, 0, true);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(target.get(x, y), if (x, y) == (1, 1) { 9 } else { 7 });
            }
        }
    }

    #[test]
    fn stamp_without_skip_copies_zeroes_and_clips() {
        let source = numbered(3, 3);
        let mut target = Layer::new(3, 3, 7).unwrap();
        source.stamp(&mut target, 1, 1, 0, 0, false);
        assert_eq!(target.get(0, 0), 7);
        assert_eq!(target.get(1, 1), 0);
        assert_eq!(target.get(2, 2), source.get(1, 1));
    }

    #[test]
    fn stamp_respects_start_coordinates() {
        let source = numbered(3, 3);
        let mut target = Layer::new(3, 3, -1).unwrap();
        source.stamp(&mut target, 0, 0, 2, 1, false);
        assert_eq!(target.get(1, 1), -1);
        assert_eq!(target.get(2, 1), source.get(2, 1));
        assert_eq!(target.get(2, 2), source.get(2, 2));
        assert_eq!(target.get(2, 0), -1);
    }

    #[test]
    fn cropped_copies_window_and_fills_outside() {
        let source = numbered(4, 4);
        let crop = Layer::cropped(&source, 2, -1, 3, 2, 99).unwrap();
        assert_eq!(crop.get(0, 0), 99);
        assert_eq!(crop.get(0, 1), source.get(2, 0));
        assert_eq!(crop.get(1, 1), source.get(3, 0));
        assert_eq!(crop.get(2, 1), 99);
    }

    #[test]
    fn sample_wraps_only_when_enabled() {
        let mut layer = numbered(3, 2);
        assert_eq!(layer.sample(-1, 0), 0);
        layer.wrap = true;
        assert_eq!(layer.sample(-1, 0), layer.get(2, 0));
        assert_eq!(layer.sample(4, 3), layer.get(1, 1));
        assert_eq!(layer.get(-1, 0), 0);
    }

    #[test]
    fn dump_pads_each_cell_to_four_columns() {
        let layer = Layer::from_tiles("l", 2, 2, vec![1, 23, 456, -7]).unwrap();
        assert_eq!(layer.dump("  "), "     1   23 \n   456   -7 \n");
    }

    #[test]
    fn entity_lists_follow_mode() {
        let mut layer = Layer::new(1, 1, 0).unwrap();
        layer.push_entity(Mode::Edit, EntityId(1));
        layer.push_entity(Mode::Play, EntityId(2));
        assert_eq!(layer.start_entities(), &[EntityId(1)]);
        assert_eq!(layer.live_entities(), &[EntityId(2)]);
        assert!(layer.remove_entity(Mode::Play, EntityId(2)));
        assert!(!layer.remove_entity(Mode::Play, EntityId(2)));
        assert!(layer.contains_entity(Mode::Edit, EntityId(1)));
        layer.push_start_entity(EntityId(3));
        assert!(layer.remove_start_entity(EntityId(1)));
        assert_eq!(layer.start_entities(), &[EntityId(3)]);
    }

    #[test]
    fn duplicate_drops_entity_placements() {
        let mut layer = numbered(2, 2);
        layer.wrap = true;
        layer.push_entity(Mode::Edit, EntityId(5));
        let copy = layer.duplicate();
        assert_eq!(copy.tiles(), layer.tiles());
        assert!(copy.wrap);
        assert!(copy.start_entities().is_empty());
    }
}
