use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{error::Result, state::EntityState};

/// The host's entity state store, as seen by the trend engine.
///
/// Reads and writes are synchronous: the host keeps its state machine in
/// memory and publishing a derived state is a map insert on its side.
/// Implementations report transport or host failures through `Err`; a
/// missing entity is `Ok(None)`, not an error.
pub trait StateProvider: Send + Sync {
    /// Current state of `entity_id`, or `None` if the entity does not exist.
    fn get(&self, entity_id: &str) -> Result<Option<EntityState>>;

    /// Publish (create or overwrite) the state of `entity_id`.
    fn set(&self, entity_id: &str, state: EntityState) -> Result<()>;
}

impl<P: StateProvider + ?Sized> StateProvider for Arc<P> {
    fn get(&self, entity_id: &str) -> Result<Option<EntityState>> {
        (**self).get(entity_id)
    }

    fn set(&self, entity_id: &str, state: EntityState) -> Result<()> {
        (**self).set(entity_id, state)
    }
}

/// In-process state store backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<String, EntityState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a state, returning the previous one.
    pub fn insert(&self, entity_id: impl Into<String>, state: EntityState) -> Option<EntityState> {
        self.states.write().insert(entity_id.into(), state)
    }

    pub fn remove(&self, entity_id: &str) -> Option<EntityState> {
        self.states.write().remove(entity_id)
    }

    /// Raw state string of `entity_id`, if present.
    pub fn state_of(&self, entity_id: &str) -> Option<String> {
        self.states.read().get(entity_id).map(|s| s.state.clone())
    }

    pub fn snapshot(&self) -> HashMap<String, EntityState> {
        self.states.read().clone()
    }
}

impl StateProvider for MemoryStore {
    fn get(&self, entity_id: &str) -> Result<Option<EntityState>> {
        Ok(self.states.read().get(entity_id).cloned())
    }

    fn set(&self, entity_id: &str, state: EntityState) -> Result<()> {
        self.states.write().insert(entity_id.to_string(), state);
        Ok(())
    }
}
