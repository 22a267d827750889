//! Engine configuration resource.
//!
//! Holds viewport, new-map defaults and tileset definitions loaded from an
//! INI file. Defaults are safe to start with when no file exists.
//!
//! # Configuration File Format
//!
//! ```ini
//! [viewport]
//! x = 0
//! y = 0
//! width = 320
//! height = 240
//!
//! [map]
//! width = 20
//! height = 15
//! fill = 0
//! name = Unnamed Map
//!
//! [tilesets]
//! overworld = 16x16
//! ```

use crate::map::tilemap::Viewport;
use crate::map::tileset::HeadlessTileset;
use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};
use std::path::PathBuf;

/// Default safe values for startup
const DEFAULT_VIEWPORT_WIDTH: i32 = 320;
const DEFAULT_VIEWPORT_HEIGHT: i32 = 240;
const DEFAULT_MAP_WIDTH: usize = 20;
const DEFAULT_MAP_HEIGHT: usize = 15;
const DEFAULT_MAP_FILL: i32 = 0;
const DEFAULT_MAP_NAME: &str = "Unnamed Map";
const DEFAULT_CONFIG_PATH: &str = "./rpgmap.ini";

/// A tileset declared in the `[tilesets]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetDef {
    pub name: String,
    pub tile_w: i32,
    pub tile_h: i32,
}

#[derive(Resource, Debug, Clone)]
pub struct EngineConfig {
    /// Screen rectangle maps are drawn into.
    pub viewport: Viewport,
    /// Width in tiles of layers created by "new map".
    pub map_width: usize,
    /// Height in tiles of layers created by "new map".
    pub map_height: usize,
    /// Tile every cell of a new layer starts with.
    pub map_fill: i32,
    pub map_name: String,
    /// Tilesets available to loaded maps, sorted by name.
    pub tilesets: Vec<TilesetDef>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            viewport: Viewport {
                x: 0,
                y: 0,
                w: DEFAULT_VIEWPORT_WIDTH,
                h: DEFAULT_VIEWPORT_HEIGHT,
            },
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
            map_fill: DEFAULT_MAP_FILL,
            map_name: DEFAULT_MAP_NAME.to_string(),
            tilesets: Vec::new(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new_cs();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new_cs();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [viewport] section
        if let Some(x) = config.getint("viewport", "x").ok().flatten() {
            self.viewport.x = x as i32;
        }
        if let Some(y) = config.getint("viewport", "y").ok().flatten() {
            self.viewport.y = y as i32;
        }
        if let Some(w) = config.getuint("viewport", "width").ok().flatten() {
            self.viewport.w = w as i32;
        }
        if let Some(h) = config.getuint("viewport", "height").ok().flatten() {
            self.viewport.h = h as i32;
        }

        // [map] section
        if let Some(width) = config.getuint("map", "width").ok().flatten() {
            self.map_width = width as usize;
        }
        if let Some(height) = config.getuint("map", "height").ok().flatten() {
            self.map_height = height as usize;
        }
        if let Some(fill) = config.getint("map", "fill").ok().flatten() {
            self.map_fill = fill as i32;
        }
        if let Some(name) = config.get("map", "name") {
            self.map_name = name;
        }

        // [tilesets] section: name = WxH
        if let Some(section) = config.get_map_ref().get("tilesets") {
            for (name, value) in section {
                let Some(size) = value.as_deref().and_then(HeadlessTileset::parse_size) else {
                    warn!("Ignoring tileset '{}': expected a WxH tile size", name);
                    continue;
                };
                self.tilesets.retain(|t| &t.name != name);
                self.tilesets.push(TilesetDef {
                    name: name.clone(),
                    tile_w: size.0,
                    tile_h: size.1,
                });
            }
            self.tilesets.sort_by(|a, b| a.name.cmp(&b.name));
        }

        info!(
            "Loaded config: viewport {}x{} at ({}, {}), new maps {}x{} fill {}, {} tilesets",
            self.viewport.w,
            self.viewport.h,
            self.viewport.x,
            self.viewport.y,
            self.map_width,
            self.map_height,
            self.map_fill,
            self.tilesets.len()
        );
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new_cs();

        // [viewport] section
        config.set("viewport", "x", Some(self.viewport.x.to_string()));
        config.set("viewport", "y", Some(self.viewport.y.to_string()));
        config.set("viewport", "width", Some(self.viewport.w.to_string()));
        config.set("viewport", "height", Some(self.viewport.h.to_string()));

        // [map] section
        config.set("map", "width", Some(self.map_width.to_string()));
        config.set("map", "height", Some(self.map_height.to_string()));
        config.set("map", "fill", Some(self.map_fill.to_string()));
        config.set("map", "name", Some(self.map_name.clone()));

        // [tilesets] section
        for t in &self.tilesets {
            config.set("tilesets", &t.name, Some(format!("{}x{}", t.tile_w, t.tile_h)));
        }

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_used_for_missing_keys() {
        let mut cfg = EngineConfig::new();
        cfg.load_from_str("[viewport]\nwidth = 640\n").unwrap();
        assert_eq!(cfg.viewport.w, 640);
        assert_eq!(cfg.viewport.h, DEFAULT_VIEWPORT_HEIGHT);
        assert_eq!(cfg.map_width, DEFAULT_MAP_WIDTH);
        assert_eq!(cfg.map_name, DEFAULT_MAP_NAME);
    }

    #[test]
    fn tilesets_are_parsed_and_sorted() {
        let mut cfg = EngineConfig::new();
        cfg.load_from_str("[tilesets]\nTown = 16x16\nCave = 8x12\nbroken = big\n")
            .unwrap();
        let names: Vec<_> = cfg.tilesets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Cave", "Town"]);
        assert_eq!((cfg.tilesets[0].tile_w, cfg.tilesets[0].tile_h), (8, 12));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = EngineConfig::with_path(dir.path().join("rpgmap.ini"));
        cfg.map_width = 33;
        cfg.map_fill = 4;
        cfg.tilesets.push(TilesetDef {
            name: "Forest".into(),
            tile_w: 24,
            tile_h: 24,
        });
        cfg.save_to_file().unwrap();

        let mut back = EngineConfig::with_path(dir.path().join("rpgmap.ini"));
        back.load_from_file().unwrap();
        assert_eq!(back.map_width, 33);
        assert_eq!(back.map_fill, 4);
        assert_eq!(back.tilesets, cfg.tilesets);
    }
}
