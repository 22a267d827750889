//! RPG map library.
//!
//! This module exposes the tile map model, its persistence format and the
//! shared resources (registry, entity store, tilesets, script host) for use
//! by the `rpgmap` tool and in integration tests.

pub mod map;
pub mod resources;
