//! Composite store that serves from the JSON dumps when the database fails.

use super::models::*;
use super::trait_def::CatalogStore;
use super::validation::ValidationError;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub struct FallbackCatalogStore {
    primary: Arc<dyn CatalogStore>,
    fallback: Arc<dyn CatalogStore>,
    using_fallback: AtomicBool,
}

impl FallbackCatalogStore {
    pub fn new(primary: Arc<dyn CatalogStore>, fallback: Arc<dyn CatalogStore>) -> Self {
        FallbackCatalogStore {
            primary,
            fallback,
            using_fallback: AtomicBool::new(false),
        }
    }

    /// Runs `op` on the database, then on the dumps if the database failed.
    /// Validation errors are answers, not failures, and are returned as is.
    fn run<T>(&self, name: &str, op: impl Fn(&dyn CatalogStore) -> Result<T>) -> Result<T> {
        match op(self.primary.as_ref()) {
            Ok(value) => {
                if self.using_fallback.swap(false, Ordering::SeqCst) {
                    info!("Database is serving again, leaving JSON fallback");
                }
                Ok(value)
            }
            Err(err) if err.downcast_ref::<ValidationError>().is_some() => Err(err),
            Err(err) => {
                warn!("Database {} failed, using JSON fallback: {:#}", name, err);
                self.using_fallback.store(true, Ordering::SeqCst);
                op(self.fallback.as_ref())
            }
        }
    }
}

impl CatalogStore for FallbackCatalogStore {
    fn list_items(&self, query: &ItemQuery, page: PageRequest) -> Result<Page<RawCatalogRecord>> {
        self.run("list_items", |store| store.list_items(query, page))
    }

    fn get_item(&self, id: i64) -> Result<Option<RawCatalogRecord>> {
        self.run("get_item", |store| store.get_item(id))
    }

    fn get_item_by_url(&self, url: &str) -> Result<Option<RawCatalogRecord>> {
        self.run("get_item_by_url", |store| store.get_item_by_url(url))
    }

    fn get_counts(&self) -> Result<CatalogCounts> {
        self.run("get_counts", |store| store.get_counts())
    }

    fn create_item(&self, item: NewCatalogItem) -> Result<RawCatalogRecord> {
        self.run("create_item", |store| store.create_item(item.clone()))
    }

    fn update_item(&self, id: i64, update: CatalogItemUpdate) -> Result<Option<RawCatalogRecord>> {
        self.run("update_item", |store| store.update_item(id, update.clone()))
    }

    fn delete_item(&self, id: i64) -> Result<bool> {
        self.run("delete_item", |store| store.delete_item(id))
    }

    fn increment_download_count(&self, id: i64) -> Result<Option<u64>> {
        self.run("increment_download_count", |store| {
            store.increment_download_count(id)
        })
    }

    fn is_available(&self) -> bool {
        self.primary.is_available() || self.fallback.is_available()
    }

    fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }
}
