//! Layered tile map.
//!
//! A [`TileMap`] owns an ordered list of [`Layer`]s and orchestrates the
//! per-frame protocol:
//!
//! 1. [`TileMap::update`] runs due scripts, then updates every live entity
//! 2. [`TileMap::draw`] composites one layer: viewport-clipped tiles through
//!    the tileset, then entities in depth order
//!
//! # Edit and play mode
//!
//! Each layer keeps two entity lists. Start entities are the authored
//! placement edited in the editor; live entities are the instances simulated
//! during a playthrough. The map's [`Mode`] decides which list entity
//! operations target. [`TileMap::reset`] regenerates the live lists from
//! clones of the start lists.
//!
//! Entities are referenced by [`EntityId`] and owned by the
//! [`EntityStore`]; the map is registered by name in the [`MapRegistry`].

use super::entity::EntityId;
use super::error::MapError;
use super::layer::{Layer, TileIndex};
use super::script::{MapScript, ScriptCondition, ScriptHost};
use super::tileset::Tileset;
use crate::resources::diagnostics::DiagnosticSink;
use crate::resources::entitystore::EntityStore;
use crate::resources::mapregistry::{MapHandle, MapRegistry};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Which entity list map operations target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Editing: operations target each layer's start entities.
    #[default]
    Edit,
    /// Playing: operations target each layer's live entities.
    Play,
}

/// Visible screen rectangle, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Collaborators needed by [`TileMap::update`].
pub struct UpdateContext<'a> {
    pub scripts: &'a mut dyn ScriptHost,
    pub entities: &'a mut EntityStore,
    pub diagnostics: &'a dyn DiagnosticSink,
    /// Global pause: scripts still run, entities are not updated.
    pub paused: bool,
}

pub struct TileMap {
    name: String,
    handle: MapHandle,
    layers: Vec<Layer>,
    viewport: Viewport,
    tile_w: i32,
    tile_h: i32,
    tileset: Option<Arc<dyn Tileset>>,
    scripts: Vec<MapScript>,
    starting: bool,
    mode: Mode,
    entity_names: FxHashMap<String, EntityId>,
    /// Live clones created by `reset`, despawned again by `clear`.
    spawned: Vec<EntityId>,
}

impl fmt::Debug for TileMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileMap")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("mode", &self.mode)
            .field("viewport", &self.viewport)
            .field("tile_size", &(self.tile_w, self.tile_h))
            .field("tileset", &self.tileset.as_ref().map(|t| t.name().to_string()))
            .field("layers", &self.layers)
            .field("scripts", &self.scripts)
            .field("starting", &self.starting)
            .finish()
    }
}

impl TileMap {
    /// Creates an empty map and registers it. If `name` is taken the map is
    /// registered under a suffixed name; check [`TileMap::name`].
    pub fn new(name: &str, registry: &mut MapRegistry) -> Self {
        let (handle, name) = registry.register(name);
        Self {
            name,
            handle,
            layers: Vec::new(),
            viewport: Viewport::default(),
            tile_w: 0,
            tile_h: 0,
            tileset: None,
            scripts: Vec::new(),
            starting: true,
            mode: Mode::Edit,
            entity_names: FxHashMap::default(),
            spawned: Vec::new(),
        }
    }

    /// Creates a map drawing with `tileset` into `viewport`.
    pub fn with_tileset(
        name: &str,
        tileset: Arc<dyn Tileset>,
        viewport: Viewport,
        registry: &mut MapRegistry,
    ) -> Self {
        let mut map = Self::new(name, registry);
        map.set_tileset(tileset);
        map.viewport = viewport;
        map
    }

    /// Destroys the map: despawns the clones it spawned and removes its
    /// registry entry. Start entities stay in the store.
    pub fn release(mut self, registry: &mut MapRegistry, store: &mut EntityStore) {
        self.clear(store);
        registry.unregister(self.handle);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> MapHandle {
        self.handle
    }

    /// Renames the map. Fails, leaving everything unchanged, if another map
    /// already uses `new_name`.
    pub fn set_name(&mut self, new_name: &str, registry: &mut MapRegistry) -> bool {
        if !registry.rename(self.handle, new_name) {
            return false;
        }
        self.name = new_name.to_string();
        true
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn is_starting(&self) -> bool {
        self.starting
    }

    pub fn set_starting(&mut self, starting: bool) {
        self.starting = starting;
    }

    /// Switches to play mode, rebuilds the live entities and arms the Load
    /// scripts for the next update.
    pub fn activate(&mut self, store: &mut EntityStore) {
        self.mode = Mode::Play;
        self.reset(store);
        self.starting = true;
    }

    // ---- tileset and viewport ----

    pub fn tileset(&self) -> Option<&Arc<dyn Tileset>> {
        self.tileset.as_ref()
    }

    /// Sets the default tileset and takes the tile size from it.
    pub fn set_tileset(&mut self, tileset: Arc<dyn Tileset>) {
        (self.tile_w, self.tile_h) = tileset.tile_size();
        self.tileset = Some(tileset);
    }

    /// Overrides the tileset of one layer; `None` falls back to the map's.
    pub fn set_layer_tileset(&mut self, layer: usize, tileset: Option<Arc<dyn Tileset>>) -> bool {
        match self.layers.get_mut(layer) {
            Some(l) => {
                l.set_tileset(tileset);
                true
            }
            None => false,
        }
    }

    /// Tileset a layer draws with: its own override, else the map's.
    pub fn layer_tileset(&self, layer: usize) -> Option<&Arc<dyn Tileset>> {
        let l = self.layers.get(layer)?;
        l.tileset().or(self.tileset.as_ref())
    }

    pub fn tile_size(&self) -> (i32, i32) {
        (self.tile_w, self.tile_h)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.viewport = Viewport { x, y, w, h };
    }

    // ---- layers ----

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_name(&self, index: usize) -> Option<&str> {
        self.layers.get(index).map(|l| l.name.as_str())
    }

    pub fn set_layer_name(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.layers.get_mut(index) {
            Some(l) => {
                l.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Layer size in tiles, `(0, 0)` for a missing layer.
    pub fn layer_size(&self, index: usize) -> (usize, usize) {
        self.layers
            .get(index)
            .map_or((0, 0), |l| (l.width(), l.height()))
    }

    fn new_layer(
        width: usize,
        height: usize,
        wrap: bool,
        fill: TileIndex,
        name: impl Into<String>,
    ) -> Result<Layer, MapError> {
        let mut layer = Layer::new(width, height, fill)?;
        layer.wrap = wrap;
        layer.name = name.into();
        Ok(layer)
    }

    /// Appends a new layer filled with `fill` and returns its index.
    pub fn add_layer(
        &mut self,
        width: usize,
        height: usize,
        wrap: bool,
        fill: TileIndex,
        name: impl Into<String>,
    ) -> Result<usize, MapError> {
        self.layers.push(Self::new_layer(width, height, wrap, fill, name)?);
        Ok(self.layers.len() - 1)
    }

    /// Appends an already built layer and returns its index.
    pub fn push_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    /// Inserts a new layer at `index` (clamped to the end).
    pub fn insert_layer_before(
        &mut self,
        index: usize,
        width: usize,
        height: usize,
        wrap: bool,
        fill: TileIndex,
        name: impl Into<String>,
    ) -> Result<usize, MapError> {
        let at = index.min(self.layers.len());
        self.layers
            .insert(at, Self::new_layer(width, height, wrap, fill, name)?);
        Ok(at)
    }

    /// Inserts a new layer right after `index` (clamped to the end).
    pub fn insert_layer_after(
        &mut self,
        index: usize,
        width: usize,
        height: usize,
        wrap: bool,
        fill: TileIndex,
        name: impl Into<String>,
    ) -> Result<usize, MapError> {
        self.insert_layer_before(index.saturating_add(1), width, height, wrap, fill, name)
    }

    /// Moves the layer at `from` so that it ends up at index `to`.
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        if from >= self.layers.len() || to >= self.layers.len() {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        true
    }

    /// Removes a layer. Its entities stay in the store.
    pub fn delete_layer(&mut self, index: usize) -> Option<Layer> {
        (index < self.layers.len()).then(|| self.layers.remove(index))
    }

    /// Inserts a copy of the layer's grid right after it.
    pub fn duplicate_layer(&mut self, index: usize) -> Option<usize> {
        let copy = self.layers.get(index)?.duplicate();
        self.layers.insert(index + 1, copy);
        Some(index + 1)
    }

    /// Crops a layer in place. A missing layer is a no-op returning `Ok(false)`.
    pub fn crop_layer(
        &mut self,
        index: usize,
        x_offset: i32,
        y_offset: i32,
        width: usize,
        height: usize,
        fill: TileIndex,
    ) -> Result<bool, MapError> {
        match self.layers.get_mut(index) {
            Some(l) => l.crop(x_offset, y_offset, width, height, fill).map(|_| true),
            None => Ok(false),
        }
    }

    /// Resizes a layer. A missing layer is a no-op returning `Ok(false)`.
    pub fn resize_layer(
        &mut self,
        index: usize,
        width: usize,
        height: usize,
        fill: TileIndex,
    ) -> Result<bool, MapError> {
        match self.layers.get_mut(index) {
            Some(l) => l.resize(width, height, fill).map(|_| true),
            None => Ok(false),
        }
    }

    /// Stamps layer `source` onto layer `target`, see [`Layer::stamp`].
    /// Source and target may be the same layer.
    #[allow(clippy::too_many_arguments)]
    pub fn stamp_layer(
        &mut self,
        source: usize,
        target: usize,
        x_offset: i32,
        y_offset: i32,
        start_x: i32,
        start_y: i32,
        skip_zero: bool,
    ) -> bool {
        let count = self.layers.len();
        if source >= count || target >= count {
            return false;
        }
        if source == target {
            let copy = self.layers[source].clone();
            copy.stamp(&mut self.layers[target], x_offset, y_offset, start_x, start_y, skip_zero);
        } else if source < target {
            let (head, tail) = self.layers.split_at_mut(target);
            head[source].stamp(&mut tail[0], x_offset, y_offset, start_x, start_y, skip_zero);
        } else {
            let (head, tail) = self.layers.split_at_mut(source);
            tail[0].stamp(&mut head[target], x_offset, y_offset, start_x, start_y, skip_zero);
        }
        true
    }

    // ---- tiles ----

    /// Tile at `(x, y)` on `layer`; 0 for any out-of-range coordinate.
    pub fn tile(&self, layer: usize, x: i32, y: i32) -> TileIndex {
        self.layers.get(layer).map_or(0, |l| l.get(x, y))
    }

    pub fn set_tile(&mut self, layer: usize, x: i32, y: i32, tile: TileIndex) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.set(x, y, tile);
        }
    }

    pub fn fill_area(&mut self, layer: usize, x: i32, y: i32, w: i32, h: i32, fill: TileIndex) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.fill_area(x, y, w, h, fill);
        }
    }

    pub fn clear_layer(&mut self, layer: usize, fill: TileIndex) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.clear(fill);
        }
    }

    // ---- entities ----

    /// Places `id` on `layer` in the list the current mode targets, after
    /// removing it from every layer's list. Returns `false` if the entity is
    /// unknown or the layer is missing; in the latter case the entity is
    /// left on no layer.
    pub fn add_entity(&mut self, layer: usize, id: EntityId, store: &mut EntityStore) -> bool {
        let Some(entity) = store.get_mut(id) else {
            return false;
        };
        let mode = self.mode;
        for l in &mut self.layers {
            while l.remove_entity(mode, id) {}
        }
        match self.layers.get_mut(layer) {
            Some(target) => {
                target.push_entity(mode, id);
                entity.set_layer(Some(layer));
                true
            }
            None => {
                entity.set_layer(None);
                false
            }
        }
    }

    /// Appends `id` to the start entities of `layer`, whatever the mode.
    pub fn add_start_entity(&mut self, layer: usize, id: EntityId, store: &mut EntityStore) -> bool {
        let Some(l) = self.layers.get_mut(layer) else {
            return false;
        };
        l.push_start_entity(id);
        if let Some(entity) = store.get_mut(id) {
            entity.set_layer(Some(layer));
        }
        true
    }

    /// Removes `id` from `layer`'s list for the current mode.
    pub fn remove_entity(&mut self, layer: usize, id: EntityId) -> bool {
        let mode = self.mode;
        self.layers
            .get_mut(layer)
            .is_some_and(|l| l.remove_entity(mode, id))
    }

    pub fn remove_start_entity(&mut self, layer: usize, id: EntityId) -> bool {
        self.layers
            .get_mut(layer)
            .is_some_and(|l| l.remove_start_entity(id))
    }

    pub fn entity(&self, layer: usize, index: usize) -> Option<EntityId> {
        self.layers.get(layer)?.live_entities().get(index).copied()
    }

    pub fn start_entity(&self, layer: usize, index: usize) -> Option<EntityId> {
        self.layers.get(layer)?.start_entities().get(index).copied()
    }

    pub fn entity_count(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.live_entities().len())
    }

    pub fn start_entity_count(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.start_entities().len())
    }

    /// Live entity registered under `name` by the last [`TileMap::reset`].
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entity_names.get(name).copied()
    }

    /// Starts a fresh playthrough from the authored layout: clears the live
    /// lists, then clones every start entity into the live list of its
    /// layer. Start lists are never modified.
    pub fn reset(&mut self, store: &mut EntityStore) {
        self.clear(store);

        for (index, layer) in self.layers.iter_mut().enumerate() {
            let starts: Vec<EntityId> = layer.start_entities().to_vec();
            for id in starts {
                let Some(clone) = store.clone_entity(id) else {
                    warn!(
                        "Map '{}' layer {}: start entity {:?} is not in the store",
                        self.name, index, id
                    );
                    continue;
                };
                if let Some(entity) = store.get_mut(clone) {
                    entity.set_layer(Some(index));
                    self.entity_names.insert(entity.name().to_string(), clone);
                }
                layer.push_entity(Mode::Play, clone);
                self.spawned.push(clone);
            }
        }

        info!(
            "Reset map '{}': {} live entities",
            self.name,
            self.spawned.len()
        );
    }

    /// Empties every live list and the name lookup. Clones spawned by
    /// [`TileMap::reset`] are despawned; other live entities are detached.
    pub fn clear(&mut self, store: &mut EntityStore) {
        for layer in &mut self.layers {
            for id in layer.take_live_entities() {
                if let Some(entity) = store.get_mut(id) {
                    entity.set_layer(None);
                }
            }
        }
        for id in self.spawned.drain(..) {
            store.despawn(id);
        }
        self.entity_names.clear();
    }

    // ---- scripts ----

    pub fn add_script(&mut self, condition: ScriptCondition, source: impl Into<String>) {
        self.scripts.push(MapScript::new(condition, source));
    }

    pub fn clear_scripts(&mut self) {
        self.scripts.clear();
    }

    pub fn scripts(&self) -> &[MapScript] {
        &self.scripts
    }

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    pub fn script(&self, index: usize) -> Option<&str> {
        self.scripts.get(index).map(|s| s.source.as_str())
    }

    pub fn script_condition(&self, index: usize) -> Option<ScriptCondition> {
        self.scripts.get(index).map(|s| s.condition)
    }

    fn run_scripts(
        &mut self,
        sources: &[String],
        host: &mut dyn ScriptHost,
        diagnostics: &dyn DiagnosticSink,
    ) {
        for source in sources {
            if let Err(err) = host.run(source, self) {
                diagnostics.report(&format!("Script error on map '{}': {}", self.name, err));
            }
        }
    }

    fn due_scripts(&self, fires: impl Fn(ScriptCondition) -> bool) -> Vec<String> {
        self.scripts
            .iter()
            .filter(|s| fires(s.condition))
            .map(|s| s.source.clone())
            .collect()
    }

    // ---- frame protocol ----

    /// Per-frame tick.
    ///
    /// Runs Load scripts if this is the first tick since activation and
    /// EveryFrame scripts always, then updates every live entity unless
    /// paused. A failing script is reported and never stops the frame.
    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let starting = self.starting;
        let due = self.due_scripts(|c| match c {
            ScriptCondition::Load => starting,
            ScriptCondition::EveryFrame => true,
            ScriptCondition::UnLoad => false,
        });
        self.run_scripts(&due, &mut *ctx.scripts, ctx.diagnostics);

        if !ctx.paused {
            for (index, layer) in self.layers.iter().enumerate() {
                for (slot, id) in layer.live_entities().iter().enumerate() {
                    let Some(entity) = ctx.entities.get_mut(*id) else {
                        continue;
                    };
                    if entity.is_activated() {
                        debug!("{} {}: {}", index, slot, entity.name());
                    }
                    entity.update();
                }
            }
        }

        self.starting = false;
    }

    /// Runs the unload protocol: every live entity's `unload`, then every
    /// UnLoad script. Does nothing outside play mode.
    pub fn run_unload_scripts(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.mode != Mode::Play {
            return;
        }
        for layer in &self.layers {
            for id in layer.live_entities() {
                if let Some(entity) = ctx.entities.get_mut(*id) {
                    entity.unload();
                }
            }
        }
        let due = self.due_scripts(|c| c == ScriptCondition::UnLoad);
        self.run_scripts(&due, &mut *ctx.scripts, ctx.diagnostics);
    }

    /// Draws one layer scrolled to world position `(world_x, world_y)`.
    ///
    /// Only tiles intersecting the viewport are sent to the tileset, plus a
    /// one tile margin for partially visible edges. With `draw_entities`,
    /// the mode's entity list is stable-sorted by Y (lower on screen draws
    /// on top) and drawn after the tiles.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        layer: usize,
        world_x: i32,
        world_y: i32,
        opacity: f32,
        bounding_boxes: bool,
        draw_entities: bool,
        store: &EntityStore,
    ) {
        let Some(l) = self.layers.get_mut(layer) else {
            return;
        };
        let Some(tileset) = l.tileset().or(self.tileset.as_ref()).cloned() else {
            return;
        };
        let (tw, th) = tileset.tile_size();
        if tw <= 0 || th <= 0 {
            return;
        }

        let view = self.viewport;
        let xs = world_x.div_euclid(tw);
        let ys = world_y.div_euclid(th);
        let wide = (view.w / tw).saturating_add(2);
        let high = (view.h / th).saturating_add(2);
        let x_off = world_x.rem_euclid(tw);
        let y_off = world_y.rem_euclid(th);

        // Only cells inside both the view and the layer are visited.
        let cols = i32::try_from(l.width()).unwrap_or(i32::MAX);
        let rows = i32::try_from(l.height()).unwrap_or(i32::MAX);
        let screen = |cell: i32, first: i32, size: i32, off: i32, origin: i32| {
            let pos = (i64::from(cell) - i64::from(first)) * i64::from(size) - i64::from(off)
                + i64::from(origin);
            i32::try_from(pos).ok()
        };

        for j in ys.max(0)..ys.saturating_add(high).min(rows) {
            let Some(sy) = screen(j, ys, th, y_off, view.y) else {
                continue;
            };
            for i in xs.max(0)..xs.saturating_add(wide).min(cols) {
                let Some(sx) = screen(i, xs, tw, x_off, view.x) else {
                    continue;
                };
                tileset.draw(l.get(i, j), sx, sy, opacity);
            }
        }

        if draw_entities {
            let mode = self.mode;
            let list = l.entities_mut(mode);
            let depth = |id: &EntityId| store.get(*id).map_or(f32::INFINITY, |e| e.position().1);
            if list.len() > 1 {
                list.sort_by(|a, b| depth(a).total_cmp(&depth(b)));
            }
            let entity_opacity = match mode {
                Mode::Play => 1.0,
                Mode::Edit => opacity,
            };
            for id in list.iter() {
                if let Some(entity) = store.get(*id) {
                    entity.draw(world_x, world_y, entity_opacity, bounding_boxes);
                }
            }
        }
    }

    /// Draws every layer in order.
    pub fn draw_all(
        &mut self,
        world_x: i32,
        world_y: i32,
        opacity: f32,
        bounding_boxes: bool,
        draw_entities: bool,
        store: &EntityStore,
    ) {
        for layer in 0..self.layers.len() {
            self.draw(layer, world_x, world_y, opacity, bounding_boxes, draw_entities, store);
        }
    }
}
