//! Moving dumps in and out of a catalog store.

use super::converter::{convert_record, ConversionOptions};
use super::dump::dump_entries;
use crate::catalog_store::{
    format_record, CatalogItem, CatalogStore, ItemType, Page, PageRequest, RawCatalogRecord,
    ValidationError,
};
use crate::downloads::parse_legacy_downloads;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Converts and stores every record of `dump`. Records whose URL is already
/// stored are skipped, records that cannot be converted are counted and
/// skipped. Store failures abort the import.
pub fn import_dump(
    store: &dyn CatalogStore,
    dump: &Value,
    item_type: ItemType,
    options: ConversionOptions,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for entry in dump_entries(dump) {
        let item = match convert_record(entry.value, item_type, entry.key, options) {
            Ok(item) => item,
            Err(err) => {
                warn!("Rejected record {:?}: {}", entry.key, err);
                stats.rejected += 1;
                continue;
            }
        };

        let url = item.url.clone();
        match store.create_item(item) {
            Ok(record) => {
                debug!("Imported {} as {}", url, record.id);
                stats.imported += 1;
            }
            Err(err) => match err.downcast_ref::<ValidationError>() {
                Some(ValidationError::DuplicateUrl { .. }) => {
                    debug!("Skipping already stored {}", url);
                    stats.duplicates += 1;
                }
                Some(validation) => {
                    warn!("Rejected record {}: {}", url, validation);
                    stats.rejected += 1;
                }
                None => return Err(err).with_context(|| format!("Failed to import {}", url)),
            },
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    pub missing: Vec<String>,
    pub link_mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.link_mismatches.is_empty()
    }
}

/// Checks that every record of `dump` is stored with the same canonical links.
pub fn verify_dump(
    store: &dyn CatalogStore,
    dump: &Value,
    item_type: ItemType,
    options: ConversionOptions,
) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    for entry in dump_entries(dump) {
        let Ok(item) = convert_record(entry.value, item_type, entry.key, options) else {
            continue;
        };
        report.checked += 1;

        let Some(stored) = store.get_item_by_url(&item.url)? else {
            report.missing.push(item.url);
            continue;
        };
        let expected = parse_legacy_downloads(item.downloads.as_ref()).links;
        if format_record(&stored).downloads.links != expected {
            report.link_mismatches.push(item.url);
        }
    }

    Ok(report)
}

fn export_page(records: &[RawCatalogRecord], item_type: ItemType) -> Page<CatalogItem> {
    let items: Vec<CatalogItem> = records
        .iter()
        .filter(|r| r.item_type == item_type)
        .map(format_record)
        .collect();
    let per_page = items.len().max(1);
    Page::slice(items, PageRequest { page: 1, per_page })
}

/// Writes `mods.json` and `tracks.json` into `out_dir` as single-page
/// listings of served records. Returns the written paths.
pub fn export_catalog(records: &[RawCatalogRecord], out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {:?}", out_dir))?;

    let mut written = Vec::new();
    for (item_type, file_name) in [(ItemType::Mod, "mods.json"), (ItemType::Track, "tracks.json")] {
        let path = out_dir.join(file_name);
        let content = serde_json::to_string_pretty(&export_page(records, item_type))?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        written.push(path);
    }
    Ok(written)
}
