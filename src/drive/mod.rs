//! Drive listings: provider interface, Google Drive client, TTL cache

pub mod cache;
pub mod provider;
pub mod types;

pub use cache::ListingCache;
pub use provider::{DriveProvider, ListingProvider, ProviderError};
pub use types::{FileEntry, Listing};
