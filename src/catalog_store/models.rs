//! Catalog models.
//!
//! Stored records keep their `images` and `downloads` exactly as they were
//! written, legacy shapes included. The served shapes live in `format.rs`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Enumerations
// =============================================================================

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Mod,
    Track,
}

impl ItemType {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "mod" => Some(ItemType::Mod),
            "track" => Some(ItemType::Track),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ItemType::Mod => "mod",
            ItemType::Track => "track",
        }
    }

    /// Category label shown on product cards.
    pub fn category(&self) -> &'static str {
        match self {
            ItemType::Mod => "Mod",
            ItemType::Track => "Track",
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::from_db_str(&s.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown item type '{}', expected mod or track", s))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSort {
    #[default]
    Newest,
    Title,
    Popular,
}

// =============================================================================
// Records
// =============================================================================

/// A catalog item as persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawCatalogRecord {
    pub id: i64,
    /// Unique identifier of the item, the page it was published on.
    pub url: String,
    pub title: String,
    pub creator: Option<String>,
    pub description: Option<String>,
    pub item_type: ItemType,
    pub images: Option<Value>,
    pub downloads: Option<Value>,
    pub embedded_videos: Option<Value>,
    /// Authoritative counter. Legacy rows may also carry one inside `downloads`.
    pub download_count: Option<u64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payload for creating an item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub images: Option<Value>,
    #[serde(default)]
    pub downloads: Option<Value>,
    #[serde(default)]
    pub embedded_videos: Option<Value>,
}

/// Field replacement for an existing item. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItemUpdate {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub description: Option<String>,
    pub images: Option<Value>,
    pub downloads: Option<Value>,
    pub embedded_videos: Option<Value>,
}

impl CatalogItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.creator.is_none()
            && self.description.is_none()
            && self.images.is_none()
            && self.downloads.is_none()
            && self.embedded_videos.is_none()
    }

    pub fn apply_to(&self, record: &mut RawCatalogRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(creator) = &self.creator {
            record.creator = Some(creator.clone());
        }
        if let Some(description) = &self.description {
            record.description = Some(description.clone());
        }
        if let Some(images) = &self.images {
            record.images = Some(images.clone());
        }
        if let Some(downloads) = &self.downloads {
            record.downloads = Some(downloads.clone());
        }
        if let Some(embedded_videos) = &self.embedded_videos {
            record.embedded_videos = Some(embedded_videos.clone());
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub item_type: Option<ItemType>,
    /// Case-insensitive substring of the title or the description.
    pub search: Option<String>,
    pub sort: ItemSort,
}

impl ItemQuery {
    pub fn of_type(item_type: ItemType) -> Self {
        ItemQuery {
            item_type: Some(item_type),
            ..Default::default()
        }
    }

    /// Whether `record` passes the type and search filters.
    pub fn matches(&self, record: &RawCatalogRecord) -> bool {
        if let Some(item_type) = self.item_type {
            if record.item_type != item_type {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                record.title.to_lowercase().contains(&needle)
                    || record
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// 1-based page selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamps page to at least 1 and per_page into `1..=max_per_page`.
    pub fn new(page: Option<usize>, per_page: Option<usize>, max_per_page: usize) -> Self {
        let max_per_page = max_per_page.max(1);
        PageRequest {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PAGE_SIZE.min(max_per_page))
                .clamp(1, max_per_page),
        }
    }

    /// Number of items before this page. Saturates at `i64::MAX`, the
    /// largest OFFSET SQLite accepts, so huge page numbers give empty pages.
    pub fn offset(&self) -> usize {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.per_page)
            .min(i64::MAX as usize)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub pages: usize,
    pub current_page: usize,
    pub per_page: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        Page {
            items,
            total,
            pages: total.div_ceil(request.per_page),
            current_page: request.page,
            per_page: request.per_page,
        }
    }

    /// Cuts one page out of an already filtered and sorted list.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.per_page)
            .collect();
        Page::new(items, total, request)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pages: self.pages,
            current_page: self.current_page,
            per_page: self.per_page,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub mods: usize,
    pub tracks: usize,
    /// Unix seconds of the most recent write, if any item exists.
    pub last_updated: Option<i64>,
}

/// Orders records in place the way `sort` asks.
pub fn sort_records(records: &mut [RawCatalogRecord], sort: ItemSort) {
    match sort {
        ItemSort::Newest => {
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
        }
        ItemSort::Title => records.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.id.cmp(&b.id))
        }),
        ItemSort::Popular => records.sort_by(|a, b| {
            b.download_count
                .unwrap_or(0)
                .cmp(&a.download_count.unwrap_or(0))
                .then(a.id.cmp(&b.id))
        }),
    }
}
