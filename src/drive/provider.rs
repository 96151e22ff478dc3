//! Listing providers
//!
//! The cache only depends on the `ListingProvider` trait; the production
//! implementation queries the Google Drive v3 `files.list` endpoint with an
//! API key. Failures are typed so the cache can turn them into error-entry
//! listings per category.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::types::{FileEntry, Listing};

/// Drive API base URL
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// HTTP timeout for listing calls
const LISTING_TIMEOUT: Duration = Duration::from_secs(20);

/// Listing provider failure
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API credentials")]
    MissingCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error ({0}): {1}")]
    Status(u16, String),

    #[error("Malformed provider response: {0}")]
    Decode(String),
}

/// Source of categorized external file listings
#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Fetch the listing for one category from the folder it maps to
    async fn fetch(&self, category: &str, folder_id: &str) -> Result<Listing, ProviderError>;
}

/// Response from the Drive v3 files.list API
#[derive(Debug, Deserialize)]
struct FilesListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

/// Google Drive listing provider (API-key access to public folders)
pub struct DriveProvider {
    http_client: Client,
    api_key: Option<String>,
}

impl DriveProvider {
    pub fn new(api_key: Option<String>) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(LISTING_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if api_key.is_none() {
            info!("No Drive API key configured; listings will show an error entry");
        }

        Ok(Self { http_client, api_key })
    }
}

#[async_trait]
impl ListingProvider for DriveProvider {
    async fn fetch(&self, category: &str, folder_id: &str) -> Result<Listing, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials)?;

        let query = format!("'{folder_id}' in parents and trashed=false");
        let url = format!(
            "{DRIVE_FILES_URL}?q={}&fields=files(id,name)&key={}",
            urlencoding::encode(&query),
            urlencoding::encode(api_key),
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status(status, body));
        }

        let listing: FilesListResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let mut files: Vec<FileEntry> = listing
            .files
            .into_iter()
            .map(|f| FileEntry {
                name: f.name,
                link_id: f.id,
                provider: Some("google".to_string()),
                drive_id: None,
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(category = category, files = files.len(), "Fetched drive listing");
        Ok(Listing {
            category: category.to_string(),
            files,
        })
    }
}
