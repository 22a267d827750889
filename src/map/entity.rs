//! Entity seam of the map core.
//!
//! Entities (NPCs, players, triggers) are opaque to the map: it only needs
//! their name, position, layer membership, and the update/draw/clone/serialize
//! capabilities described by [`MapEntity`]. Entities are owned by the
//! [`EntityStore`](crate::resources::entitystore::EntityStore) and referenced
//! from layers by [`EntityId`].

use super::error::MapError;
use super::xml;
use std::fmt::Write as FmtWrite;

/// Stable identifier of an entity inside the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Capabilities the map requires from an entity.
pub trait MapEntity: Send + Sync {
    fn name(&self) -> &str;
    /// Layer index the entity last recorded as its residence.
    fn layer(&self) -> Option<usize>;
    fn set_layer(&mut self, layer: Option<usize>);
    /// World position in pixels. The Y component orders entity drawing.
    fn position(&self) -> (f32, f32);
    /// Per-frame simulation step.
    fn update(&mut self);
    /// Draws the entity relative to the scrolled world origin `(x, y)`.
    fn draw(&self, x: i32, y: i32, opacity: f32, show_bounding_box: bool);
    /// Deep copy used to spawn a live instance from a start placement.
    fn clone_entity(&self) -> Box<dyn MapEntity>;
    /// Serialized placement written inside a layer's `<entities>` block.
    fn to_xml(&self) -> String;
    /// Activated entities get their updates traced at debug level.
    fn is_activated(&self) -> bool {
        false
    }
    /// Called when the owning map runs its unload scripts.
    fn unload(&mut self) {}
}

/// Builds entities from the fragments found in a saved map.
pub trait EntityFactory {
    fn from_xml(&self, fragment: &xml::Element<'_>) -> Result<Box<dyn MapEntity>, MapError>;
}

/// Plain positioned entity drawn with a single tile.
///
/// Used by the command-line tool and as the default entity kind for maps
/// whose placements carry no behaviour of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEntity {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub tile: i32,
    pub layer: Option<usize>,
    pub updates: u64,
}

impl SimpleEntity {
    pub fn new(name: impl Into<String>, x: f32, y: f32, tile: i32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            tile,
            layer: None,
            updates: 0,
        }
    }
}

impl MapEntity for SimpleEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn layer(&self) -> Option<usize> {
        self.layer
    }

    fn set_layer(&mut self, layer: Option<usize>) {
        self.layer = layer;
    }

    fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    fn update(&mut self) {
        self.updates += 1;
    }

    fn draw(&self, _x: i32, _y: i32, _opacity: f32, _show_bounding_box: bool) {}

    fn clone_entity(&self) -> Box<dyn MapEntity> {
        Box::new(Self {
            updates: 0,
            ..self.clone()
        })
    }

    fn to_xml(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "      <entity>");
        let _ = writeln!(out, "        <name>{}</name>", xml::escape(&self.name));
        let _ = writeln!(out, "        <x>{}</x>", self.x);
        let _ = writeln!(out, "        <y>{}</y>", self.y);
        let _ = writeln!(out, "        <tile>{}</tile>", self.tile);
        let _ = writeln!(out, "      </entity>");
        out
    }
}

/// Factory for [`SimpleEntity`] fragments.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleEntityFactory;

impl EntityFactory for SimpleEntityFactory {
    fn from_xml(&self, fragment: &xml::Element<'_>) -> Result<Box<dyn MapEntity>, MapError> {
        if fragment.tag != "entity" {
            return Err(MapError::Entity(format!("unknown entity kind <{}>", fragment.tag)));
        }
        let fields = fragment.children()?;
        let coord = |tag: &str| -> Result<f32, MapError> {
            let text = xml::require(&fields, tag)?.value();
            text.parse()
                .map_err(|_| MapError::Entity(format!("bad <{}> value '{}'", tag, text)))
        };
        Ok(Box::new(SimpleEntity::new(
            xml::require(&fields, "name")?.text(),
            coord("x")?,
            coord("y")?,
            xml::require_int(&fields, "tile")?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_entity_fragment_is_read_back() {
        let mut npc = SimpleEntity::new("old <sage>", 12.5, 40.0, 7);
        npc.update();
        let text = npc.to_xml();
        let items = xml::elements(&text).unwrap();
        let back = SimpleEntityFactory.from_xml(&items[0]).unwrap();
        assert_eq!(back.name(), "old <sage>");
        assert_eq!(back.position(), (12.5, 40.0));
        assert_eq!(back.to_xml(), text);
    }

    #[test]
    fn clone_resets_runtime_state() {
        let mut npc = SimpleEntity::new("guard", 0.0, 0.0, 1);
        npc.update();
        npc.update();
        let copy = npc.clone_entity();
        assert_eq!(copy.name(), "guard");
        assert_eq!(npc.updates, 2);
    }

    #[test]
    fn factory_rejects_unknown_kind() {
        let items = xml::elements("<chest><name>c</name></chest>").unwrap();
        assert!(matches!(
            SimpleEntityFactory.from_xml(&items[0]),
            Err(MapError::Entity(_))
        ));
    }
}
