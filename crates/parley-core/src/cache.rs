use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use parley_types::models::ThreadNode;

use crate::error::Result;
use crate::thread::ThreadAssembler;

struct CacheEntry {
    tree: Arc<ThreadNode>,
    expires_at: Instant,
}

/// Process-wide memo of assembled threads, keyed by root id.
///
/// Entries only ever expire by age: sends and edits do not invalidate them, so a cached
/// thread can lag behind the store by up to its ttl. Concurrent misses on the same root
/// may each build the tree; the last one stored wins.
#[derive(Default)]
pub struct ThreadCache {
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl ThreadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tree for `root_id`, assembling and storing it on a miss.
    pub fn get_or_build(&self, threads: &ThreadAssembler, root_id: Uuid, ttl: Duration) -> Result<Arc<ThreadNode>> {
        self.get_or_insert_with(root_id, ttl, || threads.build_tree(root_id))
    }

    /// Like [`get_or_build`](Self::get_or_build) with a caller-supplied builder.
    /// Build errors are returned as-is and nothing is stored.
    pub fn get_or_insert_with<F>(&self, root_id: Uuid, ttl: Duration, build: F) -> Result<Arc<ThreadNode>>
    where
        F: FnOnce() -> Result<ThreadNode>,
    {
        match self.entries.read() {
            Ok(entries) => {
                if let Some(entry) = entries.get(&root_id) {
                    if entry.expires_at > Instant::now() {
                        debug!(%root_id, "Thread cache hit");
                        return Ok(entry.tree.clone());
                    }
                }
            }
            Err(e) => warn!("Thread cache unreadable, building uncached: {}", e),
        }

        debug!(%root_id, "Thread cache miss");
        let tree = Arc::new(build()?);

        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            warn!(%root_id, ?ttl, "Thread cache ttl out of range, serving uncached");
            return Ok(tree);
        };

        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(
                    root_id,
                    CacheEntry {
                        tree: tree.clone(),
                        expires_at,
                    },
                );
            }
            Err(e) => warn!("Thread cache unwritable, serving uncached: {}", e),
        }

        Ok(tree)
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, entry| entry.expires_at > now);
                before - entries.len()
            }
            Err(e) => {
                warn!("Thread cache purge skipped: {}", e);
                0
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
