// Chain persistence using sled

use crate::chain::ChainSnapshot;
use crate::error::StorageError;
use parking_lot::Mutex;
use sled::Db;
use std::path::Path;

/// Load/save collaborator for the chain state
pub trait ChainStore {
    /// The stored snapshot, or `None` if nothing was saved yet
    fn load(&self) -> Result<Option<ChainSnapshot>, StorageError>;

    fn save(&self, snapshot: &ChainSnapshot) -> Result<(), StorageError>;
}

/// Store that keeps the snapshot in memory (for testing)
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<ChainSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for MemoryStore {
    fn load(&self) -> Result<Option<ChainSnapshot>, StorageError> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &ChainSnapshot) -> Result<(), StorageError> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }
}

/// Key holding the JSON-encoded snapshot
const SNAPSHOT_KEY: &[u8] = b"snapshot";

/// Sled-backed store
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open (or create) a database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Create a temporary database (for testing)
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl ChainStore for SledStore {
    fn load(&self) -> Result<Option<ChainSnapshot>, StorageError> {
        match self.db.get(SNAPSHOT_KEY)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &ChainSnapshot) -> Result<(), StorageError> {
        let data = serde_json::to_vec(snapshot)?;
        self.db.insert(SNAPSHOT_KEY, data)?;
        self.db.flush()?;
        log::debug!("Saved chain with {} blocks", snapshot.blocks.len());
        Ok(())
    }
}
