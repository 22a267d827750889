//! Process-wide registry of maps.
//!
//! Maps are globally addressable by name and by index, which cross-map
//! scripting and teleports rely on. The registry is an explicit resource
//! handed to map-owning code instead of ambient global state.
//!
//! Entries live exactly as long as their map: [`TileMap::release`] removes
//! the entry. Released slots are never reused, so a stale [`MapHandle`] can
//! not alias a newer map.
//!
//! [`TileMap::release`]: crate::map::tilemap::TileMap::release

use bevy_ecs::prelude::Resource;
use log::info;
use rustc_hash::FxHashMap;

/// Index of a map's registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapHandle(pub usize);

#[derive(Resource, Debug, Default)]
pub struct MapRegistry {
    slots: Vec<Option<String>>,
    names: FxHashMap<String, MapHandle>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a map under `name` and returns its handle with the name it
    /// was actually registered under. A taken name gets a ` (n)` suffix so
    /// names stay unique.
    pub fn register(&mut self, name: &str) -> (MapHandle, String) {
        let mut assigned = name.to_string();
        let mut n = 2;
        while self.names.contains_key(&assigned) {
            assigned = format!("{} ({})", name, n);
            n += 1;
        }
        let handle = MapHandle(self.slots.len());
        self.slots.push(Some(assigned.clone()));
        self.names.insert(assigned.clone(), handle);
        info!("Registered map '{}' as #{}", assigned, handle.0);
        (handle, assigned)
    }

    /// Renames the map behind `handle`.
    ///
    /// Fails without changing anything when another map holds `new_name` or
    /// the handle is not registered. Renaming to the current name succeeds.
    pub fn rename(&mut self, handle: MapHandle, new_name: &str) -> bool {
        let Some(Some(current)) = self.slots.get(handle.0) else {
            return false;
        };
        if current == new_name {
            return true;
        }
        if self.names.contains_key(new_name) {
            return false;
        }
        let old = current.clone();
        self.names.remove(&old);
        self.names.insert(new_name.to_string(), handle);
        self.slots[handle.0] = Some(new_name.to_string());
        info!("Renamed map #{} from '{}' to '{}'", handle.0, old, new_name);
        true
    }

    /// Removes the entry behind `handle`, returning its name.
    pub fn unregister(&mut self, handle: MapHandle) -> Option<String> {
        let name = self.slots.get_mut(handle.0)?.take()?;
        self.names.remove(&name);
        info!("Unregistered map '{}' (#{})", name, handle.0);
        Some(name)
    }

    pub fn lookup(&self, name: &str) -> Option<MapHandle> {
        self.names.get(name).copied()
    }

    pub fn name(&self, handle: MapHandle) -> Option<&str> {
        self.slots.get(handle.0)?.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Live entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (MapHandle, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_deref().map(|name| (MapHandle(i), name)))
    }
}
