//! Served shapes of catalog records.

use super::models::{ItemType, RawCatalogRecord};
use crate::downloads::{parse_legacy_downloads, parse_permissive, CanonicalDownloads};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Images {
    pub cover: Option<String>,
    pub additional: Vec<String>,
}

impl Images {
    /// Same permissive reading as downloads: anything that is not an object,
    /// or a string that does not decode to one, gives the default images.
    pub fn from_legacy(raw: Option<&Value>) -> Self {
        let Some(map) = parse_permissive(raw) else {
            return Images::default();
        };
        let cover = map
            .get("cover")
            .and_then(Value::as_str)
            .filter(|cover| !cover.is_empty())
            .map(str::to_string);
        let additional = match map.get("additional") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(Value::as_str)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Images { cover, additional }
    }
}

/// A catalog item as the API serves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub images: Images,
    pub downloads: CanonicalDownloads,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub download_count: u64,
}

/// Builds the served record. Pure, and never fails on malformed stored JSON.
///
/// The record's own counter wins over a counter found inside the legacy
/// downloads, and both served counters agree.
pub fn format_record(raw: &RawCatalogRecord) -> CatalogItem {
    let mut downloads = parse_legacy_downloads(raw.downloads.as_ref());
    let download_count = raw.download_count.unwrap_or(downloads.download_count);
    downloads.download_count = download_count;

    CatalogItem {
        id: raw.id,
        url: raw.url.clone(),
        title: raw.title.clone(),
        description: raw.description.clone(),
        creator: raw.creator.clone(),
        images: Images::from_legacy(raw.images.as_ref()),
        downloads,
        item_type: raw.item_type,
        download_count,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDownload {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Compact card used by the frontend listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub creator: Option<String>,
    pub category: String,
    pub thumbnail: Option<String>,
    pub downloads: Vec<ProductDownload>,
}

impl From<&CatalogItem> for ProductSummary {
    fn from(item: &CatalogItem) -> Self {
        ProductSummary {
            name: item.title.clone(),
            creator: item.creator.clone(),
            category: item.item_type.category().to_string(),
            thumbnail: item.images.cover.clone(),
            downloads: item
                .downloads
                .links
                .iter()
                .map(|url| ProductDownload {
                    url: url.clone(),
                    kind: "Download".to_string(),
                })
                .collect(),
        }
    }
}
