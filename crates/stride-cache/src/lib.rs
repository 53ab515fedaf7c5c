pub mod sqlite;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use stride_types::models::ConversationWithDetails;
use stride_types::SyncError;

pub use sqlite::SqliteStore;

/// Durable local store collaborator: an opaque key → blob map. The engine
/// only ever stores a single serialized directory snapshot in it.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError>;
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SyncError>;
    fn delete(&self, key: &str) -> Result<(), SyncError>;
}

const DIRECTORY_KEY: &str = "directory";

/// Write-through mirror of the last successful directory pull, plus the
/// connectivity flag the read path consults before attempting a live pull.
///
/// Every storage fault is logged and swallowed here: a broken cache must
/// degrade to "no cached data", never fail a live read or write.
pub struct OfflineCache<S> {
    store: S,
    online: AtomicBool,
}

impl<S: SnapshotStore> OfflineCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            online: AtomicBool::new(true),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    /// Overwrite the snapshot wholesale. Never read-modify-written.
    pub fn put_directory(&self, conversations: &[ConversationWithDetails]) {
        let bytes = match serde_json::to_vec(conversations) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to serialize directory snapshot: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.put(DIRECTORY_KEY, &bytes) {
            warn!("failed to persist directory snapshot: {}", e);
        }
    }

    /// Last successfully cached snapshot, or `None` if absent or unreadable.
    pub fn get_directory(&self) -> Option<Vec<ConversationWithDetails>> {
        let bytes = match self.store.get(DIRECTORY_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read directory snapshot: {}", e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(conversations) => Some(conversations),
            Err(e) => {
                warn!("corrupt directory snapshot, discarding: {}", e);
                if let Err(e) = self.store.delete(DIRECTORY_KEY) {
                    warn!("failed to discard corrupt snapshot: {}", e);
                }
                None
            }
        }
    }
}
