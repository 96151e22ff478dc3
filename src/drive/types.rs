//! Listing model for externally hosted documents

use serde::{Deserialize, Serialize};

/// One external file reference within a category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Display name of the document
    pub name: String,
    /// Provider-side identifier used to build the document link
    pub link_id: String,
    /// Which provider the entry came from, when known
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub provider: Option<String>,
    /// Drive identifier for providers that scope items to a drive
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub drive_id: Option<String>,
}

/// A named collection of external file references for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub category: String,
    pub files: Vec<FileEntry>,
}

impl Listing {
    /// Synthetic listing shown when the provider failed for this category.
    ///
    /// One bad category must never block the others, so the failure becomes
    /// a single human-readable entry instead of an error.
    pub fn error_entry(category: &str, message: &str) -> Self {
        Self {
            category: category.to_string(),
            files: vec![FileEntry {
                name: format!("Error: {message}"),
                link_id: "error".to_string(),
                provider: None,
                drive_id: None,
            }],
        }
    }

    /// Whether this is a synthetic error listing
    pub fn is_error(&self) -> bool {
        self.files.len() == 1 && self.files[0].link_id == "error"
    }
}
