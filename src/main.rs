//! rpgmap command-line tool.
//!
//! Creates, inspects and simulates layered tile maps saved in the rpgmap
//! document format. Drawing goes through a headless tileset so the tool runs
//! without a window; map scripts run in the Lua host when the `lua` feature
//! is enabled.
//!
//! # Running
//!
//! ```sh
//! rpgmap new --name Village --width 40 --height 30 --layers 2 --out village.map
//! rpgmap info village.map --json
//! rpgmap dump village.map --layer 0
//! rpgmap run village.map --frames 60
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use rpgmap::map::{
    HeadlessTileset, MapReader, ScriptCondition, ScriptHost, SimpleEntityFactory, TileMap,
    UpdateContext,
};
use rpgmap::resources::diagnostics::DiagnosticBridge;
use rpgmap::resources::engineconfig::EngineConfig;
use rpgmap::resources::entitystore::EntityStore;
use rpgmap::resources::mapregistry::MapRegistry;
use rpgmap::resources::tilesetstore::TilesetStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tile size used when neither the map nor the config names a tileset.
const FALLBACK_TILE_SIZE: i32 = 16;

/// Layered RPG tile map tool
#[derive(Parser)]
#[command(version, about = "Create, inspect and simulate rpgmap tile maps")]
struct Cli {
    /// Configuration file (default: ./rpgmap.ini).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new map and save it.
    New {
        /// Map name; defaults to the configured name.
        #[arg(long)]
        name: Option<String>,
        /// Layer width in tiles; defaults to the configured width.
        #[arg(long)]
        width: Option<usize>,
        /// Layer height in tiles; defaults to the configured height.
        #[arg(long)]
        height: Option<usize>,
        #[arg(long, default_value_t = 1)]
        layers: usize,
        /// Tileset name from the `[tilesets]` section.
        #[arg(long)]
        tileset: Option<String>,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Print a summary of a saved map.
    Info {
        file: PathBuf,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the tile grid of one layer.
    Dump {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        layer: usize,
    },
    /// Activate a map and run it for a number of frames.
    Run {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        frames: u32,
        /// Extra script file attached to the map before activation.
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
        /// When the extra script fires.
        #[arg(long, value_enum, default_value_t = ConditionArg::Load)]
        condition: ConditionArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConditionArg {
    Load,
    Everyframe,
    Unload,
}

impl From<ConditionArg> for ScriptCondition {
    fn from(arg: ConditionArg) -> Self {
        match arg {
            ConditionArg::Load => ScriptCondition::Load,
            ConditionArg::Everyframe => ScriptCondition::EveryFrame,
            ConditionArg::Unload => ScriptCondition::UnLoad,
        }
    }
}

#[derive(Serialize)]
struct LayerSummary {
    name: String,
    width: usize,
    height: usize,
    wrap: bool,
    tileset: Option<String>,
    start_entities: usize,
}

#[derive(Serialize)]
struct MapSummary {
    name: String,
    tileset: Option<String>,
    scripts: Vec<String>,
    layers: Vec<LayerSummary>,
}

impl MapSummary {
    fn of(map: &TileMap) -> Self {
        Self {
            name: map.name().to_string(),
            tileset: map.tileset().map(|t| t.name().to_string()),
            scripts: map.scripts().iter().map(|s| s.condition.to_string()).collect(),
            layers: map
                .layers()
                .iter()
                .enumerate()
                .map(|(index, layer)| LayerSummary {
                    name: layer.name.clone(),
                    width: layer.width(),
                    height: layer.height(),
                    wrap: layer.wrap,
                    tileset: map.layer_tileset(index).map(|t| t.name().to_string()),
                    start_entities: map.start_entity_count(index),
                })
                .collect(),
        }
    }
}

/// Shared state every subcommand works against.
struct Session {
    config: EngineConfig,
    registry: MapRegistry,
    entities: EntityStore,
    tilesets: TilesetStore,
    diagnostics: DiagnosticBridge,
}

impl Session {
    fn new(config_path: Option<PathBuf>) -> Self {
        let mut config = match config_path {
            Some(path) => EngineConfig::with_path(path),
            None => EngineConfig::new(),
        };
        if let Err(e) = config.load_from_file() {
            info!("{}; using defaults", e);
        }
        let tilesets = TilesetStore::from_config(&config);
        Self {
            config,
            registry: MapRegistry::new(),
            entities: EntityStore::new(),
            tilesets,
            diagnostics: DiagnosticBridge::new(),
        }
    }

    fn load(&mut self, file: &Path) -> Result<TileMap, String> {
        let factory = SimpleEntityFactory;
        let reader = MapReader::new(&self.tilesets, &factory);
        let mut map = reader
            .read_file(file, &mut self.registry, &mut self.entities)
            .map_err(|e| format!("Failed to load {}: {}", file.display(), e))?;
        map.set_viewport(
            self.config.viewport.x,
            self.config.viewport.y,
            self.config.viewport.w,
            self.config.viewport.h,
        );
        Ok(map)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut session = Session::new(cli.config);

    let result = match cli.command {
        Command::New {
            name,
            width,
            height,
            layers,
            tileset,
            out,
        } => new_map(&mut session, name, width, height, layers, tileset, out),
        Command::Info { file, json } => info_map(&mut session, &file, json),
        Command::Dump { file, layer } => dump_map(&mut session, &file, layer),
        Command::Run {
            file,
            frames,
            script,
            condition,
        } => run_map(&mut session, &file, frames, script, condition.into()),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn new_map(
    session: &mut Session,
    name: Option<String>,
    width: Option<usize>,
    height: Option<usize>,
    layers: usize,
    tileset: Option<String>,
    out: PathBuf,
) -> Result<(), String> {
    let name = name.unwrap_or_else(|| session.config.map_name.clone());
    let width = width.unwrap_or(session.config.map_width);
    let height = height.unwrap_or(session.config.map_height);

    let mut map = TileMap::new(&name, &mut session.registry);
    if let Some(tileset_name) = tileset {
        let found = session
            .tilesets
            .get(&tileset_name)
            .ok_or_else(|| format!("Unknown tileset '{}'", tileset_name))?;
        map.set_tileset(found);
    }
    for index in 0..layers.max(1) {
        map.add_layer(
            width,
            height,
            false,
            session.config.map_fill,
            format!("Layer {}", index),
        )
        .map_err(|e| e.to_string())?;
    }
    map.save(&out, &session.entities).map_err(|e| e.to_string())?;
    println!("Map '{}' written to {}", map.name(), out.display());
    Ok(())
}

fn info_map(session: &mut Session, file: &Path, json: bool) -> Result<(), String> {
    let map = session.load(file)?;
    let summary = MapSummary::of(&map);
    if json {
        let text = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!("Map: {}", summary.name);
    println!("Tileset: {}", summary.tileset.as_deref().unwrap_or("-"));
    println!("Scripts: {}", summary.scripts.join(", "));
    for (index, layer) in summary.layers.iter().enumerate() {
        println!(
            "  [{}] {:<16} {}x{}{} tileset={} start_entities={}",
            index,
            layer.name,
            layer.width,
            layer.height,
            if layer.wrap { " wrap" } else { "" },
            layer.tileset.as_deref().unwrap_or("-"),
            layer.start_entities
        );
    }
    Ok(())
}

fn dump_map(session: &mut Session, file: &Path, layer: usize) -> Result<(), String> {
    let map = session.load(file)?;
    let found = map
        .layer(layer)
        .ok_or_else(|| format!("Map '{}' has no layer {}", map.name(), layer))?;
    print!("{}", found.dump(""));
    Ok(())
}

#[cfg(feature = "lua")]
fn script_host() -> Result<Box<dyn ScriptHost>, String> {
    use rpgmap::resources::lua_runtime::LuaScriptHost;
    let host = LuaScriptHost::new().map_err(|e| format!("Failed to create Lua host: {}", e))?;
    Ok(Box::new(host))
}

#[cfg(not(feature = "lua"))]
fn script_host() -> Result<Box<dyn ScriptHost>, String> {
    Ok(Box::new(rpgmap::map::NullScriptHost))
}

fn run_map(
    session: &mut Session,
    file: &Path,
    frames: u32,
    script: Option<PathBuf>,
    condition: ScriptCondition,
) -> Result<(), String> {
    let mut map = session.load(file)?;
    if map.tileset().is_none() {
        map.set_tileset(Arc::new(HeadlessTileset::new(
            "headless",
            FALLBACK_TILE_SIZE,
            FALLBACK_TILE_SIZE,
        )));
    }
    if let Some(path) = script {
        let source = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        map.add_script(condition, source);
    }

    let mut host = script_host()?;
    map.activate(&mut session.entities);
    info!("Running map '{}' for {} frames", map.name(), frames);

    for _ in 0..frames {
        let mut ctx = UpdateContext {
            scripts: host.as_mut(),
            entities: &mut session.entities,
            diagnostics: &session.diagnostics,
            paused: false,
        };
        map.update(&mut ctx);
        map.draw_all(0, 0, 1.0, false, true, &session.entities);
    }

    let mut ctx = UpdateContext {
        scripts: host.as_mut(),
        entities: &mut session.entities,
        diagnostics: &session.diagnostics,
        paused: false,
    };
    map.run_unload_scripts(&mut ctx);

    let messages = session.diagnostics.drain();
    for message in &messages {
        println!("diagnostic: {message}");
    }
    println!(
        "Ran '{}' for {} frames, {} diagnostics",
        map.name(),
        frames,
        messages.len()
    );
    map.release(&mut session.registry, &mut session.entities);
    Ok(())
}
