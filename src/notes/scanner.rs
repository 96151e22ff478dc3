//! Directory scanner for the notes tree
//!
//! Walks the notes root, turning every `.html` file into a note id (relative
//! path, `/`-separated, extension stripped) and computing a staleness token
//! from directory mtimes. Directory mtimes are a deliberate cheap heuristic:
//! adding, removing or renaming a file bumps its parent directory's mtime, so
//! structural change is visible without stat-ing every file.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// File extension that marks a note
const NOTE_EXTENSION: &str = ".html";

/// Staleness token for a missing or unreadable root
pub const EMPTY_TOKEN: SystemTime = UNIX_EPOCH;

/// Result of a full scan: sorted note ids plus the staleness token
#[derive(Debug, Clone)]
pub struct Scan {
    /// Note ids in ascending lexicographic order
    pub ids: Vec<String>,
    /// Maximum directory mtime observed during the walk
    pub token: SystemTime,
}

/// Walk the root and collect note ids and the staleness token
///
/// A missing root is not an error: it yields an empty id list and the
/// sentinel token.
pub fn scan(root: &Path) -> Scan {
    let mut ids = Vec::new();
    let mut token = EMPTY_TOKEN;

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Missing root lands here on the first entry; partial
                // permission failures deeper in the tree are skipped.
                debug!(root = %root.display(), error = %e, "Scan skipped entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            match entry.metadata().ok().and_then(|m| m.modified().ok()) {
                Some(mtime) => token = token.max(mtime),
                None => warn!(path = %entry.path().display(), "No mtime for directory"),
            }
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(id) = note_id(root, entry.path()) {
            ids.push(id);
        }
    }

    ids.sort();
    debug!(root = %root.display(), notes = ids.len(), "Scanned notes tree");
    Scan { ids, token }
}

/// Recompute only the staleness token (cheap probe, no file handling)
pub fn scan_token(root: &Path) -> SystemTime {
    let mut token = EMPTY_TOKEN;
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(mtime) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
            token = token.max(mtime);
        }
    }
    token
}

/// Derive the note id for a file, or None if it is not a note
fn note_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined.strip_suffix(NOTE_EXTENSION).map(str::to_string)
}
