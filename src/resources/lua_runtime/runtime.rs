//! Lua interpreter state and the script API.

use super::commands::MapCmd;
use crate::map::script::{ScriptError, ScriptHost};
use crate::map::tilemap::TileMap;
use mlua::prelude::*;
use std::cell::RefCell;

use log::{debug, error, info, warn};

/// Shared state accessible from Lua function closures.
/// Stored in Lua's app_data so the `map` functions can queue commands.
#[derive(Default)]
pub(super) struct LuaAppData {
    map_commands: RefCell<Vec<MapCmd>>,
}

/// Runs map scripts in a single Lua state.
///
/// The state is not thread-safe; keep the host on the thread that updates
/// the maps (a `NonSend` resource when stored in a bevy world).
pub struct LuaScriptHost {
    lua: Lua,
}

/// Registers a Lua function that pushes a command to the map queue.
macro_rules! register_cmd {
    ($table:expr, $lua:expr, $name:expr, |$args:pat_param| $arg_ty:ty, $cmd:expr) => {
        $table.set(
            $name,
            $lua.create_function(|lua, $args: $arg_ty| {
                lua.app_data_ref::<LuaAppData>()
                    .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                    .map_commands
                    .borrow_mut()
                    .push($cmd);
                Ok(())
            })?,
        )?;
    };
}

impl LuaScriptHost {
    /// Creates a new Lua state with the `engine` and `map` tables registered.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization or API registration fails.
    pub fn new() -> LuaResult<Self> {
        let lua = Lua::new();
        lua.set_app_data(LuaAppData::default());

        let host = Self { lua };
        host.register_base_api()?;
        host.register_map_api()?;
        info!("Lua script host initialized");
        Ok(host)
    }

    /// The underlying interpreter, for hosts that want to add globals.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Registers the `engine` table with logging functions.
    fn register_base_api(&self) -> LuaResult<()> {
        let engine = self.lua.create_table()?;

        engine.set(
            "log",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;
        engine.set(
            "log_debug",
            self.lua.create_function(|_, msg: String| {
                debug!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;
        engine.set(
            "log_warn",
            self.lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;
        engine.set(
            "log_error",
            self.lua.create_function(|_, msg: String| {
                error!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("engine", engine)?;
        Ok(())
    }

    /// Registers the `map` table. Every function only queues a command.
    fn register_map_api(&self) -> LuaResult<()> {
        let map = self.lua.create_table()?;

        register_cmd!(map, self.lua, "set_tile",
            |(layer, x, y, tile)| (usize, i32, i32, i32),
            MapCmd::SetTile { layer, x, y, tile });
        register_cmd!(map, self.lua, "fill_area",
            |(layer, x, y, w, h, tile)| (usize, i32, i32, i32, i32, i32),
            MapCmd::FillArea { layer, x, y, w, h, tile });
        register_cmd!(map, self.lua, "set_layer_name",
            |(layer, name)| (usize, String),
            MapCmd::SetLayerName { layer, name });
        register_cmd!(map, self.lua, "set_viewport",
            |(x, y, w, h)| (i32, i32, i32, i32),
            MapCmd::SetViewport { x, y, w, h });

        self.lua.globals().set("map", map)?;
        Ok(())
    }

    /// Publishes the read-only `this` table describing `map`.
    fn bind_receiver(&self, map: &TileMap) -> LuaResult<()> {
        let this = self.lua.create_table()?;
        this.set("name", map.name())?;
        this.set("starting", map.is_starting())?;
        this.set("layer_count", map.layer_count())?;

        let layers = self.lua.create_table()?;
        for (index, layer) in map.layers().iter().enumerate() {
            let entry = self.lua.create_table()?;
            entry.set("name", layer.name.as_str())?;
            entry.set("width", layer.width())?;
            entry.set("height", layer.height())?;
            entry.set("wrap", layer.wrap)?;
            layers.set(index, entry)?;
        }
        this.set("layers", layers)?;

        let view = map.viewport();
        let viewport = self.lua.create_table()?;
        viewport.set("x", view.x)?;
        viewport.set("y", view.y)?;
        viewport.set("w", view.w)?;
        viewport.set("h", view.h)?;
        this.set("viewport", viewport)?;

        self.lua.globals().set("this", this)
    }

    /// Takes every queued map command.
    pub fn drain_map_commands(&self) -> Vec<MapCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.map_commands.take())
            .unwrap_or_default()
    }
}

impl ScriptHost for LuaScriptHost {
    /// Runs `source` with `this` bound to `map`. Commands queued before an
    /// error are still applied.
    fn run(&mut self, source: &str, map: &mut TileMap) -> Result<(), ScriptError> {
        self.bind_receiver(map)
            .map_err(|e| ScriptError(format!("binding map '{}': {}", map.name(), e)))?;

        let result = self
            .lua
            .load(source)
            .set_name(format!("map:{}", map.name()))
            .exec();

        for cmd in self.drain_map_commands() {
            cmd.apply(map);
        }

        result.map_err(|e| ScriptError(e.to_string()))
    }
}
