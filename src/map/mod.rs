//! Layered tile maps and everything they own.
//!
//! A [`TileMap`] is an ordered stack of [`Layer`]s (grids of tile indices),
//! each carrying two entity lists: the live list used during play and the
//! start list edited in the editor and saved with the map. Maps also carry
//! Lua-facing scripts fired on load, every frame or unload.
//!
//! Overview
//! - `entity` – the entity trait maps place on layers, plus a simple entity
//! - `error` – the error type for map construction and loading
//! - `layer` – one grid of tiles and its entity lists
//! - `persist` – the XML-like save format and the map reader
//! - `script` – script conditions and the host trait that runs them
//! - `tilemap` – the map itself: editing, frame protocol and drawing
//! - `tileset` – the drawing surface maps render through
//! - `xml` – a minimal element scanner for the save format

pub mod entity;
pub mod error;
pub mod layer;
pub mod persist;
pub mod script;
pub mod tilemap;
pub mod tileset;
pub mod xml;

pub use entity::{EntityFactory, EntityId, MapEntity, SimpleEntity, SimpleEntityFactory};
pub use error::MapError;
pub use layer::{Layer, TileIndex};
pub use persist::MapReader;
pub use script::{MapScript, NullScriptHost, ScriptCondition, ScriptError, ScriptHost};
pub use tilemap::{Mode, TileMap, UpdateContext, Viewport};
pub use tileset::{HeadlessTileset, Tileset};
