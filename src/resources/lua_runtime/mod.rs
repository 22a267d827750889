//! Lua scripting for map scripts.
//!
//! Map scripts are Lua chunks run by [`LuaScriptHost`]. While a chunk runs,
//! the global `this` table describes the map it belongs to and the `map`
//! table queues edits that are applied when the chunk returns.
//!
//! # Example
//!
//! ```lua
//! engine.log("entering " .. this.name)
//! map.fill_area(0, 0, 0, this.layers[0].width, 1, 12)
//! map.set_viewport(0, 0, 320, 240)
//! ```

mod commands;
mod runtime;

pub use commands::MapCmd;
pub use runtime::LuaScriptHost;
