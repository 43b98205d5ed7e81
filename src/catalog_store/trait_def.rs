//! CatalogStore trait definition.
//!
//! The server only talks to this trait, so the SQLite store, the JSON dump
//! store and the fallback composite of the two are interchangeable.

use super::models::{
    CatalogCounts, CatalogItemUpdate, ItemQuery, NewCatalogItem, Page, PageRequest,
    RawCatalogRecord,
};
use anyhow::Result;

/// Trait for catalog storage backends.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Retrieval
    // =========================================================================

    /// List items matching `query`, one page at a time.
    fn list_items(&self, query: &ItemQuery, page: PageRequest) -> Result<Page<RawCatalogRecord>>;

    /// Get an item by its numeric id.
    fn get_item(&self, id: i64) -> Result<Option<RawCatalogRecord>>;

    /// Get an item by its unique URL.
    fn get_item_by_url(&self, url: &str) -> Result<Option<RawCatalogRecord>>;

    /// Number of mods and tracks.
    fn get_counts(&self) -> Result<CatalogCounts>;

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create a new item. Fails with a `ValidationError` on invalid input or
    /// when the URL is already taken.
    fn create_item(&self, item: NewCatalogItem) -> Result<RawCatalogRecord>;

    /// Replace the given fields of an item. `Ok(None)` if the id is unknown.
    fn update_item(&self, id: i64, update: CatalogItemUpdate) -> Result<Option<RawCatalogRecord>>;

    /// Delete a whole item. Returns false if the id is unknown.
    fn delete_item(&self, id: i64) -> Result<bool>;

    /// Bump the download counter, returning the new value.
    fn increment_download_count(&self, id: i64) -> Result<Option<u64>>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Cheap liveness probe of the underlying storage.
    fn is_available(&self) -> bool;

    /// Whether reads are currently served from a secondary source.
    fn is_using_fallback(&self) -> bool {
        false
    }
}
