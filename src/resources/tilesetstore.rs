//! Tilesets available to maps, keyed by name.
//!
//! Saved maps reference tilesets by name only; the map reader resolves those
//! names through this store.

use crate::map::tileset::{HeadlessTileset, Tileset};
use crate::resources::engineconfig::EngineConfig;
use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Resource, Default, Clone)]
pub struct TilesetStore {
    pub map: FxHashMap<String, Arc<dyn Tileset>>,
}

impl fmt::Debug for TilesetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.map.keys().collect();
        names.sort_unstable();
        f.debug_struct("TilesetStore").field("tilesets", &names).finish()
    }
}

impl TilesetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Headless tilesets for every `[tilesets]` entry of the configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut store = Self::new();
        for def in &config.tilesets {
            store.insert(Arc::new(HeadlessTileset::new(&def.name, def.tile_w, def.tile_h)));
        }
        store
    }

    /// Insert a tileset under its own name, replacing any previous one.
    pub fn insert(&mut self, tileset: Arc<dyn Tileset>) {
        self.map.insert(tileset.name().to_string(), tileset);
    }

    /// Get a tileset by name.
    pub fn get(&self, name: impl AsRef<str>) -> Option<Arc<dyn Tileset>> {
        self.map.get(name.as_ref()).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
