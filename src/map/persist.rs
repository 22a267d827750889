//! Saving and loading maps.
//!
//! The document layout:
//!
//! ```text
//! <map>
//!   <name>NAME</name>
//!   <layers>COUNT</layers>
//!   <tileset>TILESET_NAME</tileset>
//!   <scripts>
//!     <script condition="load">SOURCE</script>
//!   </scripts>
//!   <layer>
//!     <width>W</width>
//!     <height>H</height>
//!     <tileset>TILESET_NAME</tileset>
//!     <name>LAYER_NAME</name>
//!     <layerdata>
//!       H rows of W cells, each right-aligned in 4 columns plus a space
//!     </layerdata>
//!     <entities>
//!       one fragment per start entity
//!     </entities>
//!   </layer>
//! </map>
//! ```
//!
//! `<wrap>true</wrap>` is added to a layer only when its wrap flag is set.
//! Only start entities are saved; live entities are rebuilt by `reset`.

use super::entity::{EntityFactory, EntityId};
use super::error::MapError;
use super::layer::{Layer, TileIndex};
use super::script::ScriptCondition;
use super::tilemap::TileMap;
use super::tileset::Tileset;
use super::xml::{self, Element};
use crate::resources::entitystore::EntityStore;
use crate::resources::mapregistry::MapRegistry;
use crate::resources::tilesetstore::TilesetStore;
use log::{debug, info, warn};
use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

impl TileMap {
    /// Serializes the map, resolving start entities through `store`.
    pub fn to_document(&self, store: &EntityStore) -> String {
        let mut out = String::new();
        let tileset_name = |t: Option<&Arc<dyn Tileset>>| {
            t.map(|t| xml::escape(t.name()).into_owned()).unwrap_or_default()
        };

        let _ = writeln!(out, "<map>");
        let _ = writeln!(out, "  <name>{}</name>", xml::escape(self.name()));
        let _ = writeln!(out, "  <layers>{}</layers>", self.layer_count());
        let _ = writeln!(out, "  <tileset>{}</tileset>", tileset_name(self.tileset()));

        let _ = writeln!(out, "  <scripts>");
        for script in self.scripts() {
            let _ = writeln!(
                out,
                "    <script condition=\"{}\">{}</script>",
                script.condition,
                xml::escape(&script.source)
            );
        }
        let _ = writeln!(out, "  </scripts>");

        for (index, layer) in self.layers().iter().enumerate() {
            let _ = writeln!(out, "  <layer>");
            let _ = writeln!(out, "    <width>{}</width>", layer.width());
            let _ = writeln!(out, "    <height>{}</height>", layer.height());
            let _ = writeln!(out, "    <tileset>{}</tileset>", tileset_name(self.layer_tileset(index)));
            let _ = writeln!(out, "    <name>{}</name>", xml::escape(&layer.name));
            if layer.wrap {
                let _ = writeln!(out, "    <wrap>true</wrap>");
            }
            let _ = writeln!(out, "    <layerdata>");
            out.push_str(&layer.dump("      "));
            let _ = writeln!(out, "    </layerdata>");
            let _ = writeln!(out, "    <entities>");
            for id in layer.start_entities() {
                match store.get(*id) {
                    Some(entity) => out.push_str(&entity.to_xml()),
                    None => warn!(
                        "Map '{}' layer {}: skipping missing start entity {:?}",
                        self.name(),
                        index,
                        id
                    ),
                }
            }
            let _ = writeln!(out, "    </entities>");
            let _ = writeln!(out, "  </layer>");
        }
        let _ = writeln!(out, "</map>");
        out
    }

    /// Writes the map document to `path`.
    pub fn save(&self, path: impl AsRef<Path>, store: &EntityStore) -> Result<(), MapError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_document(store))?;
        info!("Saved map '{}' to {:?}", self.name(), path);
        Ok(())
    }
}

/// Rebuilds maps from saved documents.
pub struct MapReader<'a> {
    tilesets: &'a TilesetStore,
    factory: &'a dyn EntityFactory,
}

impl<'a> MapReader<'a> {
    pub fn new(tilesets: &'a TilesetStore, factory: &'a dyn EntityFactory) -> Self {
        Self { tilesets, factory }
    }

    pub fn read_file(
        &self,
        path: impl AsRef<Path>,
        registry: &mut MapRegistry,
        store: &mut EntityStore,
    ) -> Result<TileMap, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let map = self.read_str(&text, registry, store)?;
        info!("Loaded map '{}' from {:?}", map.name(), path);
        Ok(map)
    }

    /// Parses a map document. Entities found in `<entities>` blocks are
    /// spawned into `store` and placed as start entities. On error nothing
    /// is registered, though entities of earlier layers may already have
    /// been spawned.
    pub fn read_str(
        &self,
        text: &str,
        registry: &mut MapRegistry,
        store: &mut EntityStore,
    ) -> Result<TileMap, MapError> {
        let top = xml::elements(text)?;
        let root = xml::require(&top, "map")?;
        let items = root.children()?;

        let mut layers = Vec::new();
        for item in items.iter().filter(|e| e.tag == "layer") {
            layers.push(self.read_layer(item, store)?);
        }
        if let Some(count) = xml::find(&items, "layers") {
            if count.value().parse::<usize>().ok() != Some(layers.len()) {
                warn!(
                    "Map declares {} layers but contains {}",
                    count.value(),
                    layers.len()
                );
            }
        }

        let mut scripts = Vec::new();
        if let Some(block) = xml::find(&items, "scripts") {
            for script in block.children()?.iter().filter(|e| e.tag == "script") {
                let condition: ScriptCondition = script
                    .attr("condition")
                    .ok_or_else(|| MapError::MissingElement("script condition".into()))?
                    .parse()
                    .map_err(MapError::Malformed)?;
                scripts.push((condition, script.text()));
            }
        }

        let name = xml::require(&items, "name")?.text();
        let mut map = TileMap::new(&name, registry);
        let tileset_name = xml::find(&items, "tileset").map(|e| e.value()).unwrap_or_default();
        if let Some(tileset) = self.tileset(&tileset_name) {
            map.set_tileset(tileset);
        }
        let map_tileset = map.tileset().map(|t| t.name().to_string());

        for (mut layer, layer_tileset, entities) in layers {
            // Layers naming the map's own tileset inherit it instead of
            // pinning an override.
            if layer_tileset.is_some() && layer_tileset != map_tileset {
                let resolved = layer_tileset.as_deref().and_then(|n| self.tileset(n));
                layer.set_tileset(resolved);
            }
            let index = map.push_layer(layer);
            for id in entities {
                map.add_start_entity(index, id, store);
            }
        }
        for (condition, source) in scripts {
            map.add_script(condition, source);
        }

        Ok(map)
    }

    fn tileset(&self, name: &str) -> Option<Arc<dyn Tileset>> {
        if name.is_empty() {
            return None;
        }
        let found = self.tilesets.get(name);
        if found.is_none() {
            warn!("Unknown tileset '{}'; leaving it unset", name);
        }
        found
    }

    fn read_layer(
        &self,
        element: &Element<'_>,
        store: &mut EntityStore,
    ) -> Result<(Layer, Option<String>, Vec<EntityId>), MapError> {
        let fields = element.children()?;
        let width: usize = xml::require_int(&fields, "width")?;
        let height: usize = xml::require_int(&fields, "height")?;
        let name = xml::find(&fields, "name").map(|e| e.text()).unwrap_or_default();

        let tiles = xml::require(&fields, "layerdata")?
            .body
            .split_whitespace()
            .map(|cell| {
                cell.parse::<TileIndex>().map_err(|source| MapError::BadNumber {
                    field: "layerdata".into(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut layer = Layer::from_tiles(name, width, height, tiles)?;
        layer.wrap = xml::find(&fields, "wrap").is_some_and(|e| e.value() == "true");

        let tileset = xml::find(&fields, "tileset")
            .map(|e| e.value())
            .filter(|n| !n.is_empty());

        let mut entities = Vec::new();
        if let Some(block) = xml::find(&fields, "entities") {
            for fragment in block.children()? {
                let entity = self.factory.from_xml(&fragment)?;
                entities.push(store.spawn_boxed(entity));
            }
        }

        for other in fields.iter().filter(|e| {
            !matches!(
                e.tag,
                "width" | "height" | "name" | "layerdata" | "wrap" | "tileset" | "entities"
            )
        }) {
            debug!("Ignoring <{}> in layer '{}'", other.tag, layer.name);
        }

        Ok((layer, tileset, entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::entity::{SimpleEntity, SimpleEntityFactory};
    use crate::map::tileset::HeadlessTileset;

    fn sample_map(registry: &mut MapRegistry, store: &mut EntityStore) -> TileMap {
        let tileset = Arc::new(HeadlessTileset::new("town", 16, 16));
        let mut map = TileMap::with_tileset("Village", tileset, Default::default(), registry);
        map.add_layer(3, 2, false, 1, "ground").unwrap();
        map.set_tile(0, 2, 1, 1234);
        map.set_tile(0, 0, 0, -5);
        let id = store.spawn(SimpleEntity::new("mayor", 8.0, 24.0, 3));
        map.add_start_entity(0, id, store);
        map.add_script(ScriptCondition::Load, "print(\"a < b\")");
        map
    }

    #[test]
    fn document_matches_layout() {
        let mut registry = MapRegistry::new();
        let mut store = EntityStore::new();
        let map = sample_map(&mut registry, &mut store);
        let doc = map.to_document(&store);
        assert!(doc.starts_with("<map>\n  <name>Village</name>\n  <layers>1</layers>\n"));
        assert!(doc.contains("  <tileset>town</tileset>\n"));
        assert!(doc.contains("<script condition=\"load\">print(&quot;a &lt; b&quot;)</script>"));
        assert!(doc.contains("    <layerdata>\n        -5    1    1 \n         1    1 1234 \n    </layerdata>\n"));
        assert!(doc.contains("<name>mayor</name>"));
        assert!(!doc.contains("<wrap>"));
    }

    #[test]
    fn layer_data_length_is_checked() {
        let doc = "<map><name>m</name><tileset></tileset><layer><width>2</width>\
                   <height>2</height><layerdata>1 2 3</layerdata></layer></map>";
        let mut registry = MapRegistry::new();
        let mut store = EntityStore::new();
        let tilesets = TilesetStore::new();
        let reader = MapReader::new(&tilesets, &SimpleEntityFactory);
        let err = reader.read_str(doc, &mut registry, &mut store).unwrap_err();
        assert!(matches!(err, MapError::InvalidLayerSize { expected: 4, found: 3, .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_name_is_reported() {
        let mut registry = MapRegistry::new();
        let mut store = EntityStore::new();
        let tilesets = TilesetStore::new();
        let reader = MapReader::new(&tilesets, &SimpleEntityFactory);
        let err = reader
            .read_str("<map><tileset/></map>", &mut registry, &mut store)
            .unwrap_err();
        assert!(matches!(err, MapError::MissingElement(ref tag) if tag == "name"));
    }
}
