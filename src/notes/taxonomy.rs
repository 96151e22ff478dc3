//! Folder taxonomy derived from note ids
//!
//! Pure function over the current id list; recomputed per request so it can
//! never drift from the index snapshot the caller holds.

use std::collections::BTreeSet;

/// Top-level folders and second-level subfolders, deduplicated and sorted
pub fn derive_taxonomy(ids: &[String]) -> (Vec<String>, Vec<String>) {
    let mut folders = BTreeSet::new();
    let mut subfolders = BTreeSet::new();

    for id in ids {
        let mut parts = id.split('/');
        if let Some(folder) = parts.next() {
            folders.insert(folder.to_string());
        }
        if let Some(sub) = parts.next() {
            subfolders.insert(sub.to_string());
        }
    }

    (folders.into_iter().collect(), subfolders.into_iter().collect())
}
