//! Validation for catalog items.
//!
//! Provides validation functions to ensure data integrity before
//! inserting or updating items in a catalog store.

use super::models::{CatalogItemUpdate, NewCatalogItem};
use crate::downloads::is_download_url;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{field}' is required but was empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' must be an absolute http(s) URL, got '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Item with url '{url}' already exists")]
    DuplicateUrl { url: String },
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

pub fn validate_new_item(item: &NewCatalogItem) -> ValidationResult<()> {
    if item.url.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "url" });
    }
    if !is_download_url(&item.url) {
        return Err(ValidationError::InvalidUrl {
            field: "url",
            value: item.url.clone(),
        });
    }
    if item.title.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "title" });
    }
    Ok(())
}

pub fn validate_update(update: &CatalogItemUpdate) -> ValidationResult<()> {
    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "title" });
        }
    }
    Ok(())
}
