//! Long-lived state shared by maps, stored as ECS resources.
//!
//! Overview
//! - `diagnostics` – channel collecting script failures for the host
//! - `engineconfig` – INI-backed configuration: viewport, new-map defaults, tilesets
//! - `entitystore` – arena owning every entity placed on any map
//! - `lua_runtime` – the Lua script host (feature `lua`)
//! - `mapregistry` – unique map names and their handles
//! - `tilesetstore` – tilesets keyed by name for the map reader
pub mod diagnostics;
pub mod engineconfig;
pub mod entitystore;
#[cfg(feature = "lua")]
pub mod lua_runtime;
pub mod mapregistry;
pub mod tilesetstore;
