//! # Persistence
//!
//! The boundary to whatever stores worlds. A world record is a seed plus the
//! ordered list of block changes to replay on top of generated terrain; the
//! engine never stores chunks.
//!
//! [`PersistenceClient`] is the collaborator contract. Two implementations ship
//! with the crate:
//! - [`InMemoryPersistence`] for tests and throwaway sessions
//! - [`JsonFilePersistence`] with one JSON document per world on disk
//!
//! Edits reach the collaborator through the debounced [`ChangeSyncer`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error::PersistenceError, voxels::change_log::PersistedChange};

pub mod file;
pub mod memory;
pub mod sync;

pub use file::JsonFilePersistence;
pub use memory::InMemoryPersistence;
pub use sync::ChangeSyncer;

/// A stored world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    pub id: u64,
    /// Opaque generation seed.
    pub seed: String,
    /// Every change ever submitted, in submission order.
    #[serde(default)]
    pub changes: Vec<PersistedChange>,
    pub last_updated: DateTime<Utc>,
}

impl WorldData {
    /// A fresh record with no changes.
    pub fn new(id: u64, seed: &str) -> Self {
        WorldData {
            id,
            seed: seed.to_string(),
            changes: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Appends a batch and bumps `last_updated`.
    pub fn append_changes(&mut self, changes: &[PersistedChange]) {
        self.changes.extend_from_slice(changes);
        self.last_updated = Utc::now();
    }
}

/// Creates, loads and appends to world records.
///
/// Implementations are called from the sync thread as well as the main
/// timeline, so they must be shareable.
pub trait PersistenceClient: Send + Sync {
    /// Creates a new world with an empty change list.
    fn create_world(&self, seed: &str) -> Result<WorldData, PersistenceError>;

    /// Loads a world by id.
    fn get_world(&self, id: u64) -> Result<WorldData, PersistenceError>;

    /// Appends `changes` to a world's change list.
    ///
    /// # Returns
    /// The updated record
    fn update_world_changes(
        &self,
        id: u64,
        changes: &[PersistedChange],
    ) -> Result<WorldData, PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::change_log::ChangeAction;

    #[test]
    fn world_record_wire_format() {
        let json = r#"{
            "id": 7,
            "seed": "abc",
            "changes": [{"x": 2, "y": 11, "z": 2, "type": "stone", "action": "place"}],
            "last_updated": "2024-05-01T12:00:00Z"
        }"#;
        let world: WorldData = serde_json::from_str(json).unwrap();
        assert_eq!(world.id, 7);
        assert_eq!(world.changes[0].action, ChangeAction::Place);
        assert_eq!(world.changes[0].block_type, "stone");

        let round = serde_json::to_value(&world).unwrap();
        assert_eq!(round["changes"][0]["type"], "stone");
        assert_eq!(round["last_updated"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn missing_changes_default_to_empty() {
        let json = r#"{"id": 1, "seed": "s", "last_updated": "2024-05-01T12:00:00Z"}"#;
        let world: WorldData = serde_json::from_str(json).unwrap();
        assert!(world.changes.is_empty());
    }
}
