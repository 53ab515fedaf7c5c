use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use stride_types::SyncError;

use crate::SnapshotStore;

/// SQLite-backed snapshot store. One table, key → blob; the engine writes a
/// single serialized directory under a fixed key.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrate(&conn)?;

        info!("Snapshot store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, SyncError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SyncError::CacheFault(format!("store lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| SyncError::CacheFault(e.to_string()))
    }
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS snapshots (
            key         TEXT PRIMARY KEY,
            value       BLOB NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

impl SnapshotStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM snapshots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SyncError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (key, value, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, bytes],
            )?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<(), SyncError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM snapshots WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("directory").unwrap(), None);

        store.put("directory", b"[1,2,3]").unwrap();
        assert_eq!(store.get("directory").unwrap(), Some(b"[1,2,3]".to_vec()));

        store.delete("directory").unwrap();
        assert_eq!(store.get("directory").unwrap(), None);
    }

    #[test]
    fn put_overwrites_wholesale() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("directory", b"old").unwrap();
        store.put("directory", b"new").unwrap();
        assert_eq!(store.get("directory").unwrap(), Some(b"new".to_vec()));
    }
}
