//! Ingestion of scraped catalog dumps.
//!
//! Dumps come from the site scrapers in a few historical layouts. Each record
//! is converted into a `NewCatalogItem` before it reaches a store.

mod converter;
mod dump;
mod import;

pub use converter::{convert_record, ConversionError, ConversionOptions, UNKNOWN_CREATOR};
pub use dump::{dump_entries, load_dump_file, DumpEntry};
pub use import::{export_catalog, import_dump, verify_dump, ImportStats, VerifyReport};
