//! Entity arena.
//!
//! Owns every entity placed on a map. Layers and maps refer to entities by
//! [`EntityId`] only, so despawning an entity can never leave a dangling
//! reference behind: a stale id simply resolves to `None`.

use crate::map::entity::{EntityId, MapEntity};
use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Resource, Default)]
pub struct EntityStore {
    entities: FxHashMap<EntityId, Box<dyn MapEntity>>,
    next_id: u64,
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entities.iter().map(|(id, e)| (id.0, e.name())).collect();
        names.sort_unstable();
        f.debug_struct("EntityStore")
            .field("entities", &names)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: impl MapEntity + 'static) -> EntityId {
        self.spawn_boxed(Box::new(entity))
    }

    pub fn spawn_boxed(&mut self, entity: Box<dyn MapEntity>) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(id, entity);
        id
    }

    /// Spawns a clone of `id`. Returns `None` if `id` is unknown.
    pub fn clone_entity(&mut self, id: EntityId) -> Option<EntityId> {
        let copy = self.entities.get(&id)?.clone_entity();
        Some(self.spawn_boxed(copy))
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Box<dyn MapEntity>> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&(dyn MapEntity + 'static)> {
        self.entities.get(&id).map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut (dyn MapEntity + 'static)> {
        self.entities.get_mut(&id).map(|e| e.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
