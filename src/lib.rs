//! Mods and tracks catalog server library.
//!
//! Exposes the download link normalization core, the catalog stores and the
//! HTTP server for the binaries and the end-to-end tests.

pub mod catalog_store;
pub mod config;
pub mod downloads;
pub mod ingestion;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{
    format_record, CatalogItem, CatalogStore, FallbackCatalogStore, JsonFileCatalogStore,
    SqliteCatalogStore,
};
pub use downloads::{parse_legacy_downloads, CanonicalDownloads, DownloadHost};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
