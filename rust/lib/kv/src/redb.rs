use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};
use tracing::debug;

use crate::error::KVError;
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// RedbStore is a KVStore implementation backed by redb, a pure-Rust embedded
/// key-value database.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists so first reads do not fail.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        debug!("opened redb store at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        match table.get(key) {
            Ok(Some(val)) => Ok(Some(val.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(storage(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.insert(key, value).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        let existed;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            existed = table.remove(key).map_err(storage)?.is_some();
        }
        write_txn.commit().map_err(storage)?;
        Ok(existed)
    }

    fn batch_delete(&self, keys: &[&str]) -> Result<usize, KVError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let write_txn = self.db.begin_write().map_err(storage)?;
        let mut removed = 0;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            for key in keys {
                if table.remove(*key).map_err(storage)?.is_some() {
                    removed += 1;
                }
            }
        }
        write_txn.commit().map_err(storage)?;
        Ok(removed)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        let iter = table.range(prefix..).map_err(storage)?;

        for entry in iter {
            let entry = entry.map_err(storage)?;
            let key = entry.0.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key, entry.1.value().to_vec()));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("kv.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_set_get_delete() {
        let (_dir, store) = open();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", b"1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_scan_stops_at_prefix_boundary() {
        let (_dir, store) = open();
        store.set("cache:alice", b"1").unwrap();
        store.set("cache:bob", b"2").unwrap();
        store.set("cachf:zed", b"3").unwrap();
        store.set("other", b"4").unwrap();

        let entries = store.scan("cache:").unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["cache:alice", "cache:bob"]);
    }

    #[test]
    fn test_batch_delete_counts_existing() {
        let (_dir, store) = open();
        store.set("k1", b"1").unwrap();
        store.set("k2", b"2").unwrap();
        assert_eq!(store.batch_delete(&["k1", "k2", "k3"]).unwrap(), 2);
        assert!(store.scan("k").unwrap().is_empty());
    }
}
