use std::collections::HashMap;

use mirror_protocol::EntityId;

use crate::entity::Entity;

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),

    #[error("entity {0} not found")]
    NotFound(EntityId),
}

/// Owns every entity the server has told us about.
///
/// Only the session writes to the registry, one frame at a time.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
}

impl EntityRegistry {
    pub fn new() -> EntityRegistry {
        Default::default()
    }

    /// Insert a fully built entity.  An id which is already present is a protocol violation and the existing entity is
    /// left as it was.
    pub fn insert(&mut self, entity: Entity) -> Result<&mut Entity, RegistryError> {
        use std::collections::hash_map::Entry;

        match self.entities.entry(entity.id()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateEntity(entity.id())),
            Entry::Vacant(v) => Ok(v.insert(entity)),
        }
    }

    pub fn create(&mut self, type_name: &str, id: EntityId) -> Result<&mut Entity, RegistryError> {
        self.insert(Entity::new(type_name, id))
    }

    pub fn lookup(&self, id: &EntityId) -> Result<&Entity, RegistryError> {
        self.entities.get(id).ok_or(RegistryError::NotFound(*id))
    }

    pub fn lookup_mut(&mut self, id: &EntityId) -> Result<&mut Entity, RegistryError> {
        self.entities.get_mut(id).ok_or(RegistryError::NotFound(*id))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Remove and return an entity.
    pub fn destroy(&mut self, id: &EntityId) -> Result<Entity, RegistryError> {
        self.entities.remove(id).ok_or(RegistryError::NotFound(*id))
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }
}
