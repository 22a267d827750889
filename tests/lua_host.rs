//! Lua Script Host Integration Tests
//!
//! Runs real Lua map scripts through the frame protocol.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test lua_host
//! ```

#![cfg(feature = "lua")]

use rpgmap::map::{ScriptCondition, ScriptHost, TileMap, UpdateContext, Viewport};
use rpgmap::resources::diagnostics::DiagnosticBridge;
use rpgmap::resources::entitystore::EntityStore;
use rpgmap::resources::lua_runtime::{LuaScriptHost, MapCmd};
use rpgmap::resources::mapregistry::MapRegistry;

fn map_with_layers(registry: &mut MapRegistry) -> TileMap {
    let mut map = TileMap::new("Shrine", registry);
    map.add_layer(4, 3, false, 0, "floor").unwrap();
    map.add_layer(2, 2, true, 1, "roof").unwrap();
    map
}

fn run_frames(map: &mut TileMap, host: &mut LuaScriptHost, frames: usize) -> Vec<String> {
    let mut store = EntityStore::new();
    let diagnostics = DiagnosticBridge::new();
    map.activate(&mut store);
    for _ in 0..frames {
        let mut ctx = UpdateContext {
            scripts: &mut *host,
            entities: &mut store,
            diagnostics: &diagnostics,
            paused: false,
        };
        map.update(&mut ctx);
    }
    diagnostics.drain()
}

#[test]
fn load_script_edits_the_map() {
    let mut registry = MapRegistry::new();
    let mut map = map_with_layers(&mut registry);
    map.add_script(
        ScriptCondition::Load,
        "map.set_tile(0, 1, 2, 7)\n\
         map.fill_area(1, 0, 0, 5, 5, 4)\n\
         map.set_layer_name(0, this.name .. ' floor')\n\
         map.set_viewport(1, 2, 64, 48)",
    );
    let mut host = LuaScriptHost::new().unwrap();

    let diagnostics = run_frames(&mut map, &mut host, 1);

    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(map.tile(0, 1, 2), 7);
    assert_eq!(map.layer(1).unwrap().tiles(), &[4, 4, 4, 4]);
    assert_eq!(map.layer_name(0), Some("Shrine floor"));
    assert_eq!(
        map.viewport(),
        Viewport {
            x: 1,
            y: 2,
            w: 64,
            h: 48
        }
    );
}

#[test]
fn this_table_describes_the_map() {
    let mut registry = MapRegistry::new();
    let mut map = map_with_layers(&mut registry);
    let mut host = LuaScriptHost::new().unwrap();
    let check = "assert(this.layer_count == 2)\n\
                 assert(this.layers[0].width == 4 and this.layers[0].height == 3)\n\
                 assert(this.layers[1].name == 'roof' and this.layers[1].wrap)\n\
                 assert(this.starting)\n\
                 map.set_tile(0, 0, 0, 1)";
    host.run(check, &mut map).unwrap();
    assert_eq!(map.tile(0, 0, 0), 1);
}

#[test]
fn everyframe_script_keeps_state_between_frames() {
    let mut registry = MapRegistry::new();
    let mut map = map_with_layers(&mut registry);
    map.add_script(
        ScriptCondition::EveryFrame,
        "frames = (frames or 0) + 1\nmap.set_tile(0, 3, 0, frames)",
    );
    let mut host = LuaScriptHost::new().unwrap();

    let diagnostics = run_frames(&mut map, &mut host, 3);

    assert!(diagnostics.is_empty());
    assert_eq!(map.tile(0, 3, 0), 3);
}

#[test]
fn script_error_is_reported_and_queued_edits_still_apply() {
    let mut registry = MapRegistry::new();
    let mut map = map_with_layers(&mut registry);
    map.add_script(ScriptCondition::Load, "map.set_tile(0, 0, 0, 5)\nerror('broken gate')");
    map.add_script(ScriptCondition::Load, "map.set_tile(0, 1, 0, 6)");
    let mut host = LuaScriptHost::new().unwrap();

    let diagnostics = run_frames(&mut map, &mut host, 1);

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("broken gate"));
    assert!(diagnostics[0].contains("Shrine"));
    assert_eq!(map.tile(0, 0, 0), 5);
    assert_eq!(map.tile(0, 1, 0), 6);
}

#[test]
fn commands_for_missing_layers_are_dropped() {
    let mut registry = MapRegistry::new();
    let mut map = map_with_layers(&mut registry);
    MapCmd::SetTile {
        layer: 9,
        x: 0,
        y: 0,
        tile: 3,
    }
    .apply(&mut map);
    MapCmd::SetLayerName {
        layer: 9,
        name: "nowhere".into(),
    }
    .apply(&mut map);
    assert_eq!(map.layer_count(), 2);
    assert_eq!(map.tile(0, 0, 0), 0);
}

#[test]
fn syntax_errors_surface_as_script_errors() {
    let mut registry = MapRegistry::new();
    let mut map = map_with_layers(&mut registry);
    let mut host = LuaScriptHost::new().unwrap();
    assert!(host.run("this is not lua", &mut map).is_err());
    assert!(host.drain_map_commands().is_empty());
}
