//! An in-process world store.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use super::{PersistenceClient, WorldData};
use crate::engine_state::{error::PersistenceError, voxels::change_log::PersistedChange};

/// Keeps worlds in memory. Ids start at 1.
///
/// Can be switched offline to exercise sync retries.
#[derive(Debug)]
pub struct InMemoryPersistence {
    worlds: Mutex<BTreeMap<u64, WorldData>>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        InMemoryPersistence {
            worlds: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            offline: AtomicBool::new(false),
        }
    }
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every request fails with [`PersistenceError::Rejected`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn worlds(&self) -> Result<MutexGuard<'_, BTreeMap<u64, WorldData>>, PersistenceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected("store is offline".into()));
        }
        Ok(self.worlds.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl PersistenceClient for InMemoryPersistence {
    fn create_world(&self, seed: &str) -> Result<WorldData, PersistenceError> {
        let mut worlds = self.worlds()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let world = WorldData::new(id, seed);
        worlds.insert(id, world.clone());
        Ok(world)
    }

    fn get_world(&self, id: u64) -> Result<WorldData, PersistenceError> {
        self.worlds()?
            .get(&id)
            .cloned()
            .ok_or(PersistenceError::WorldNotFound(id))
    }

    fn update_world_changes(
        &self,
        id: u64,
        changes: &[PersistedChange],
    ) -> Result<WorldData, PersistenceError> {
        let mut worlds = self.worlds()?;
        let world = worlds
            .get_mut(&id)
            .ok_or(PersistenceError::WorldNotFound(id))?;
        world.append_changes(changes);
        Ok(world.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::change_log::ChangeAction;

    fn change(y: i32) -> PersistedChange {
        PersistedChange {
            x: 0,
            y,
            z: 0,
            block_type: "dirt".into(),
            action: ChangeAction::Place,
        }
    }

    #[test]
    fn updates_append() {
        let store = InMemoryPersistence::new();
        let world = store.create_world("abc").unwrap();
        assert_eq!(world.id, 1);
        assert!(world.changes.is_empty());

        store.update_world_changes(world.id, &[change(1)]).unwrap();
        let updated = store.update_world_changes(world.id, &[change(2), change(3)]).unwrap();
        let ys: Vec<i32> = updated.changes.iter().map(|c| c.y).collect();
        assert_eq!(ys, vec![1, 2, 3]);
        assert!(updated.last_updated >= world.last_updated);
        assert_eq!(store.get_world(world.id).unwrap(), updated);
    }

    #[test]
    fn unknown_worlds_and_outages_fail() {
        let store = InMemoryPersistence::new();
        assert!(matches!(store.get_world(9), Err(PersistenceError::WorldNotFound(9))));

        let world = store.create_world("abc").unwrap();
        store.set_offline(true);
        assert!(matches!(
            store.update_world_changes(world.id, &[change(1)]),
            Err(PersistenceError::Rejected(_))
        ));
        store.set_offline(false);
        assert!(store.get_world(world.id).unwrap().changes.is_empty());
    }
}
