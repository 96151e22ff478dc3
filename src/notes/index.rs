//! Note index cache
//!
//! Holds the scanned note list as an immutable snapshot behind a lock.
//! `get()` probes the staleness token on every call and only re-walks the
//! tree when the token has advanced, so new or removed notes show up without
//! a restart while the common case stays a cheap directory-mtime probe.
//!
//! Snapshots are swapped atomically: readers always see either the previous
//! complete list or the new complete list, never a partially built one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::AppError;
use crate::notes::scanner;

/// Immutable snapshot of the scanned notes tree
#[derive(Debug)]
pub struct NoteIndex {
    /// Note ids in ascending lexicographic order
    ids: Vec<String>,
    /// Staleness token the snapshot was built against
    token: SystemTime,
}

impl NoteIndex {
    /// All note ids in order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Whether the id is part of this snapshot
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Previous and next ids in the ordering, absent at the boundaries
    pub fn neighbors(&self, id: &str) -> Result<(Option<&str>, Option<&str>), AppError> {
        let pos = self
            .position(id)
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))?;
        let prev = pos.checked_sub(1).map(|p| self.ids[p].as_str());
        let next = self.ids.get(pos + 1).map(String::as_str);
        Ok((prev, next))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.ids.binary_search_by(|probe| probe.as_str().cmp(id)).ok()
    }
}

/// Cached note index with staleness-based revalidation
pub struct NoteIndexCache {
    /// Root directory of the notes tree
    root: PathBuf,
    /// Current snapshot; None means unbuilt
    snapshot: RwLock<Option<Arc<NoteIndex>>>,
    /// Calls served from the cached snapshot
    hits: AtomicU64,
    /// Full scanner runs (initial builds and stale rebuilds)
    rebuilds: AtomicU64,
}

impl NoteIndexCache {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            snapshot: RwLock::new(None),
            hits: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Get the current index, rebuilding if unbuilt or stale
    pub fn get(&self) -> Arc<NoteIndex> {
        let current = scanner::scan_token(&self.root);

        {
            let guard = self.snapshot.read().unwrap();
            if let Some(index) = guard.as_ref() {
                if current <= index.token {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Arc::clone(index);
                }
            }
        }

        let mut guard = self.snapshot.write().unwrap();
        // Re-check under the write lock: a concurrent stale detection may
        // have already rebuilt while this caller waited.
        if let Some(index) = guard.as_ref() {
            if current <= index.token {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(index);
            }
        }

        let scan = scanner::scan(&self.root);
        let index = Arc::new(NoteIndex {
            ids: scan.ids,
            token: scan.token,
        });
        *guard = Some(Arc::clone(&index));
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        info!(notes = index.ids.len(), "Rebuilt note index");
        index
    }

    /// Drop the cached snapshot; the next `get()` performs a full rebuild.
    ///
    /// Administrative hook for callers who know content changed through a
    /// side channel.
    pub fn invalidate(&self) {
        *self.snapshot.write().unwrap() = None;
        debug!("Note index invalidated");
    }

    /// Read a note's content through an index snapshot already in hand.
    ///
    /// Callers that also need nav links or the taxonomy should pass the
    /// snapshot they hold so content and links come from the same build,
    /// and the staleness probe runs once per request.
    pub fn read_from(&self, index: &NoteIndex, id: &str) -> Result<String, AppError> {
        read_note(&self.root, index, id)
    }

    /// (hits, rebuilds)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.rebuilds.load(Ordering::Relaxed),
        )
    }
}

/// Read one note from disk, distinguishing a lookup miss from a file that
/// vanished after the snapshot was built.
///
/// The membership check doubles as path containment: only ids derived from
/// real files under the root are ever readable, so traversal segments in a
/// caller-supplied id can never reach outside the tree.
fn read_note(root: &Path, index: &NoteIndex, id: &str) -> Result<String, AppError> {
    if !index.contains(id) {
        return Err(AppError::NoteNotFound(id.to_string()));
    }

    let mut path = root.to_path_buf();
    for segment in id.split('/') {
        path.push(segment);
    }
    path.as_mut_os_string().push(".html");

    std::fs::read_to_string(&path).map_err(|e| {
        debug!(id = id, error = %e, "Indexed note unreadable");
        AppError::ContentMissing(id.to_string())
    })
}
