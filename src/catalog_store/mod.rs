mod fallback;
mod file_store;
mod format;
mod models;
mod schema;
mod store;
mod trait_def;
mod validation;

pub use fallback::FallbackCatalogStore;
pub use file_store::JsonFileCatalogStore;
pub use format::{format_record, CatalogItem, Images, ProductDownload, ProductSummary};
pub use models::*;
pub use store::SqliteCatalogStore;
pub use trait_def::CatalogStore;
pub use validation::{validate_new_item, validate_update, ValidationError, ValidationResult};
