//! Directory listing cache
//!
//! Read-through TTL cache in front of the listing provider, one entry per
//! configured category. A provider failure never propagates: the failed
//! category gets a synthetic error-entry listing and the rest populate
//! normally. Concurrent callers across a TTL expiry may both refetch; the
//! provider calls are idempotent reads so that only costs redundant work.

use std::collections::BTreeMap;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, warn};

use crate::config::CategoryConfig;
use crate::error::AppError;

use super::provider::ListingProvider;
use super::types::Listing;

/// TTL cache of per-category listings
pub struct ListingCache {
    provider: Box<dyn ListingProvider>,
    categories: Vec<CategoryConfig>,
    cache: Cache<String, Listing>,
}

impl ListingCache {
    pub fn new(
        provider: Box<dyn ListingProvider>,
        categories: Vec<CategoryConfig>,
        ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .name("listing_cache")
            .build();
        Self {
            provider,
            categories,
            cache,
        }
    }

    /// All configured categories, served from cache or fetched on expiry
    pub async fn get_listings(&self) -> BTreeMap<String, Listing> {
        let mut listings = BTreeMap::new();
        for config in &self.categories {
            let listing = match self.cache.get(&config.category) {
                Some(listing) => {
                    debug!(category = %config.category, "Listing cache HIT");
                    listing
                }
                None => self.fetch_one(config).await,
            };
            listings.insert(config.category.clone(), listing);
        }
        listings
    }

    /// One category's listing, or `CategoryNotFound` if it is not configured
    pub async fn category(&self, name: &str) -> Result<Listing, AppError> {
        let config = self
            .categories
            .iter()
            .find(|c| c.category == name)
            .ok_or_else(|| AppError::CategoryNotFound(name.to_string()))?;

        match self.cache.get(&config.category) {
            Some(listing) => Ok(listing),
            None => Ok(self.fetch_one(config).await),
        }
    }

    /// Drop all cached listings; the next call refetches regardless of TTL
    pub fn refresh(&self) {
        self.cache.invalidate_all();
        debug!("Listing cache cleared");
    }

    async fn fetch_one(&self, config: &CategoryConfig) -> Listing {
        let listing = match self.provider.fetch(&config.category, &config.folder_id).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(category = %config.category, error = %e, "Listing fetch failed");
                Listing::error_entry(&config.category, &e.to_string())
            }
        };
        self.cache.insert(config.category.clone(), listing.clone());
        listing
    }
}
