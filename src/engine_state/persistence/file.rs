//! # File Persistence
//!
//! Stores each world as `world-<id>.json` in a data directory. Ids are allocated
//! sequentially from the highest id already on disk. Writes go to a temporary
//! file first and are renamed into place.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use super::{PersistenceClient, WorldData};
use crate::engine_state::{error::PersistenceError, voxels::change_log::PersistedChange};

const FILE_PREFIX: &str = "world-";
const FILE_SUFFIX: &str = ".json";

/// One JSON document per world.
#[derive(Debug)]
pub struct JsonFilePersistence {
    directory: PathBuf,
    /// Serializes read-modify-write cycles between the main timeline and the sync thread
    write_lock: Mutex<()>,
}

impl JsonFilePersistence {
    /// Opens a data directory, creating it if needed.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(JsonFilePersistence {
            directory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_of(&self, id: u64) -> PathBuf {
        self.directory.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }

    /// Ids of every world file in the directory.
    fn stored_ids(&self) -> Result<Vec<u64>, PersistenceError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|name| name.strip_prefix(FILE_PREFIX))
                .and_then(|name| name.strip_suffix(FILE_SUFFIX))
                .and_then(|id| id.parse().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn read(&self, id: u64) -> Result<WorldData, PersistenceError> {
        let json = match fs::read_to_string(self.path_of(id)) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::WorldNotFound(id))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    fn write(&self, world: &WorldData) -> Result<(), PersistenceError> {
        let path = self.path_of(world.id);
        let temporary = path.with_extension("json.tmp");
        fs::write(&temporary, serde_json::to_vec_pretty(world)?)?;
        fs::rename(&temporary, &path)?;
        Ok(())
    }
}

impl PersistenceClient for JsonFilePersistence {
    fn create_world(&self, seed: &str) -> Result<WorldData, PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let id = self.stored_ids()?.into_iter().max().unwrap_or(0) + 1;
        let world = WorldData::new(id, seed);
        self.write(&world)?;
        log::info!("Created world {id} in {}", self.directory.display());
        Ok(world)
    }

    fn get_world(&self, id: u64) -> Result<WorldData, PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read(id)
    }

    fn update_world_changes(
        &self,
        id: u64,
        changes: &[PersistedChange],
    ) -> Result<WorldData, PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut world = self.read(id)?;
        world.append_changes(changes);
        self.write(&world)?;
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::change_log::ChangeAction;

    #[test]
    fn worlds_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let change = PersistedChange {
            x: 2,
            y: 11,
            z: 2,
            block_type: "stone".into(),
            action: ChangeAction::Place,
        };

        let id = {
            let store = JsonFilePersistence::open(dir.path()).unwrap();
            let world = store.create_world("abc").unwrap();
            store.update_world_changes(world.id, &[change.clone()]).unwrap();
            world.id
        };

        let store = JsonFilePersistence::open(dir.path()).unwrap();
        let world = store.get_world(id).unwrap();
        assert_eq!(world.seed, "abc");
        assert_eq!(world.changes, vec![change]);
    }

    #[test]
    fn ids_are_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::open(dir.path().join("worlds")).unwrap();
        assert_eq!(store.create_world("a").unwrap().id, 1);
        assert_eq!(store.create_world("b").unwrap().id, 2);
        fs::write(dir.path().join("worlds").join("notes.txt"), "ignored").unwrap();
        assert_eq!(store.create_world("c").unwrap().id, 3);
    }

    #[test]
    fn missing_and_corrupt_worlds_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::open(dir.path()).unwrap();
        assert!(matches!(store.get_world(4), Err(PersistenceError::WorldNotFound(4))));

        fs::write(dir.path().join("world-5.json"), "{ not json").unwrap();
        assert!(matches!(store.get_world(5), Err(PersistenceError::Serialization(_))));
    }
}
