//! Catalog store backed by the JSON dumps in a data directory.
//!
//! Used when the database cannot serve requests. `mods.json` and
//! `tracks.json` are preferred; the reduced `mods_min.json` and
//! `tracks_min.json` are read when a full dump is missing or unreadable.

use super::models::*;
use super::trait_def::CatalogStore;
use super::validation::{validate_new_item, validate_update, ValidationError};
use crate::downloads::parse_legacy_downloads;
use crate::ingestion::{convert_record, dump_entries, load_dump_file, ConversionOptions};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

fn dump_stem(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Mod => "mods",
        ItemType::Track => "tracks",
    }
}

pub struct JsonFileCatalogStore {
    data_dir: PathBuf,
    records: Mutex<Vec<RawCatalogRecord>>,
}

impl JsonFileCatalogStore {
    /// Loads both dumps from `data_dir`. Missing dumps give an empty catalog
    /// for that type.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let mut loaded = Vec::new();
        for item_type in [ItemType::Mod, ItemType::Track] {
            Self::load_type(&data_dir, item_type, &mut loaded);
        }
        let records = assign_ids(loaded);

        let counts = Self::count(&records);
        info!(
            "Loaded JSON catalog from {:?}: {} mods, {} tracks",
            data_dir, counts.mods, counts.tracks
        );

        Ok(JsonFileCatalogStore {
            data_dir,
            records: Mutex::new(records),
        })
    }

    /// Appends the records of one dump, each with the id it was exported
    /// with, if any. Ids are settled later by `assign_ids`.
    fn load_type(
        data_dir: &Path,
        item_type: ItemType,
        records: &mut Vec<(Option<i64>, RawCatalogRecord)>,
    ) {
        let stem = dump_stem(item_type);
        let candidates = [
            data_dir.join(format!("{}.json", stem)),
            data_dir.join(format!("{}_min.json", stem)),
        ];

        let dump = candidates.iter().find_map(|path| {
            if !path.exists() {
                debug!("No dump at {:?}", path);
                return None;
            }
            match load_dump_file(path) {
                Ok(dump) => Some(dump),
                Err(err) => {
                    warn!("Skipping unreadable dump: {:#}", err);
                    None
                }
            }
        });
        let Some(dump) = dump else {
            warn!("No usable {} dump in {:?}", stem, data_dir);
            return;
        };

        for entry in dump_entries(&dump) {
            let item = match convert_record(
                entry.value,
                item_type,
                entry.key,
                ConversionOptions::default(),
            ) {
                Ok(item) => item,
                Err(err) => {
                    warn!("Skipping {} record {:?}: {}", stem, entry.key, err);
                    continue;
                }
            };
            let int_field = |name: &str| entry.value.get(name).and_then(Value::as_i64);
            let stored_id = int_field("id").filter(|id| *id > 0);
            records.push((stored_id, RawCatalogRecord {
                id: 0,
                url: item.url,
                title: item.title,
                creator: item.creator,
                description: item.description,
                item_type,
                images: item.images,
                downloads: item.downloads,
                embedded_videos: item.embedded_videos,
                download_count: entry.value.get("download_count").and_then(Value::as_u64),
                created_at: int_field("created_at").unwrap_or(0),
                updated_at: int_field("updated_at").unwrap_or(0),
            }));
        }
    }

    fn count(records: &[RawCatalogRecord]) -> CatalogCounts {
        CatalogCounts {
            mods: records
                .iter()
                .filter(|r| r.item_type == ItemType::Mod)
                .count(),
            tracks: records
                .iter()
                .filter(|r| r.item_type == ItemType::Track)
                .count(),
            last_updated: records.iter().map(|r| r.updated_at).max(),
        }
    }

    /// Rewrites the full dump of `item_type`.
    fn save(&self, records: &[RawCatalogRecord], item_type: ItemType) -> Result<()> {
        let path = self
            .data_dir
            .join(format!("{}.json", dump_stem(item_type)));
        let of_type: Vec<&RawCatalogRecord> = records
            .iter()
            .filter(|r| r.item_type == item_type)
            .collect();
        let content = serde_json::to_string_pretty(&of_type)?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        debug!("Saved {} records to {:?}", of_type.len(), path);
        Ok(())
    }
}

/// Keeps the exported ids so an id means the same item in the database and in
/// the dumps. Records without one, or whose id was already taken by an
/// earlier record, get fresh ids above the largest kept one, in load order.
fn assign_ids(loaded: Vec<(Option<i64>, RawCatalogRecord)>) -> Vec<RawCatalogRecord> {
    let mut taken = HashSet::new();
    let kept: Vec<Option<i64>> = loaded
        .iter()
        .map(|(id, _)| id.filter(|id| taken.insert(*id)))
        .collect();

    let mut next_id = taken.iter().copied().max().unwrap_or(0) + 1;
    loaded
        .into_iter()
        .zip(kept)
        .map(|((stored, mut record), kept)| {
            record.id = match kept {
                Some(id) => id,
                None => {
                    if let Some(id) = stored {
                        warn!("Duplicate id {} for {}, assigning {}", id, record.url, next_id);
                    }
                    next_id += 1;
                    next_id - 1
                }
            };
            record
        })
        .collect()
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl CatalogStore for JsonFileCatalogStore {
    fn list_items(&self, query: &ItemQuery, page: PageRequest) -> Result<Page<RawCatalogRecord>> {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<RawCatalogRecord> = records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_records(&mut matching, query.sort);
        Ok(Page::slice(matching, page))
    }

    fn get_item(&self, id: i64) -> Result<Option<RawCatalogRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn get_item_by_url(&self, url: &str) -> Result<Option<RawCatalogRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| r.url == url).cloned())
    }

    fn get_counts(&self) -> Result<CatalogCounts> {
        let records = self.records.lock().unwrap();
        Ok(Self::count(&records))
    }

    fn create_item(&self, item: NewCatalogItem) -> Result<RawCatalogRecord> {
        validate_new_item(&item)?;
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.url == item.url) {
            return Err(ValidationError::DuplicateUrl { url: item.url }.into());
        }

        let timestamp = now();
        let record = RawCatalogRecord {
            id: records.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            url: item.url,
            title: item.title.trim().to_string(),
            creator: item.creator,
            description: item.description,
            item_type: item.item_type,
            images: item.images,
            downloads: item.downloads,
            embedded_videos: item.embedded_videos,
            download_count: Some(0),
            created_at: timestamp,
            updated_at: timestamp,
        };
        records.push(record.clone());
        self.save(&records, record.item_type)?;
        Ok(record)
    }

    fn update_item(&self, id: i64, update: CatalogItemUpdate) -> Result<Option<RawCatalogRecord>> {
        validate_update(&update)?;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(record.clone()));
        }
        update.apply_to(record);
        record.updated_at = now();
        let updated = record.clone();
        self.save(&records, updated.item_type)?;
        Ok(Some(updated))
    }

    fn delete_item(&self, id: i64) -> Result<bool> {
        let mut records = self.records.lock().unwrap();
        let Some(position) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = records.remove(position);
        self.save(&records, removed.item_type)?;
        Ok(true)
    }

    fn increment_download_count(&self, id: i64) -> Result<Option<u64>> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        let current = record
            .download_count
            .unwrap_or_else(|| parse_legacy_downloads(record.downloads.as_ref()).download_count);
        let count = current + 1;
        record.download_count = Some(count);
        let item_type = record.item_type;
        self.save(&records, item_type)?;
        Ok(Some(count))
    }

    fn is_available(&self) -> bool {
        self.data_dir.is_dir()
    }
}
