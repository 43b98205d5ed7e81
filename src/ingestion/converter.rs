//! Conversion of scraped mod and track records into catalog items.

use crate::catalog_store::{ItemType, NewCatalogItem};
use crate::downloads::{
    extract_description_links, is_download_url, parse_permissive, DownloadHost,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

pub const UNKNOWN_CREATOR: &str = "Unknown Creator";

/// Errors that reject a single scraped record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Record is not a JSON object")]
    NotAnObject,

    #[error("Record has no usable http(s) URL")]
    MissingUrl,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConversionOptions {
    /// Merge links found in the description into the canonical `links`.
    pub scan_descriptions: bool,
}

fn default_title(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Mod => "Unknown Mod",
        ItemType::Track => "Unknown Track",
    }
}

fn non_blank_str<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn present(record: &Map<String, Value>, key: &str) -> Option<Value> {
    record.get(key).filter(|v| !v.is_null()).cloned()
}

/// Track exports list their downloads as `[{url, type}]`. Regroups them the
/// way the catalog stores downloads: by lowercased type and by host.
fn group_download_list(entries: &[Value]) -> Value {
    let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut by_host: BTreeMap<DownloadHost, Vec<String>> = BTreeMap::new();

    for entry in entries {
        let (url, kind) = match entry {
            Value::String(url) => (url.as_str(), None),
            Value::Object(fields) => match fields.get("url").and_then(Value::as_str) {
                Some(url) => (url, fields.get("type").and_then(Value::as_str)),
                None => continue,
            },
            _ => continue,
        };
        if !is_download_url(url) {
            continue;
        }
        let kind = kind
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or("default")
            .to_lowercase();

        let typed = by_type.entry(kind).or_default();
        if !typed.iter().any(|u| u == url) {
            typed.push(url.to_string());
        }
        let hosted = by_host.entry(DownloadHost::classify(url)).or_default();
        if !hosted.iter().any(|u| u == url) {
            hosted.push(url.to_string());
        }
    }

    let by_host: Map<String, Value> = by_host
        .into_iter()
        .map(|(host, urls)| (host.as_str().to_string(), json!(urls)))
        .collect();
    json!({ "by_type": by_type, "by_host": by_host })
}

fn first_download_url(entries: &[Value]) -> Option<&str> {
    entries.iter().find_map(|entry| {
        let url = match entry {
            Value::String(url) => url.as_str(),
            Value::Object(fields) => fields.get("url").and_then(Value::as_str)?,
            _ => return None,
        };
        is_download_url(url).then_some(url)
    })
}

/// Adds description links to the `links` list of `downloads`. Unreadable
/// downloads are replaced by a fresh mapping.
fn merge_description_links(downloads: Option<Value>, description: &str) -> Option<Value> {
    let found = extract_description_links(description);
    if found.is_empty() {
        return downloads;
    }

    let mut mapping = parse_permissive(downloads.as_ref()).unwrap_or_default();
    let mut links: Vec<Value> = match mapping.remove("links") {
        Some(Value::Array(existing)) => existing,
        Some(Value::String(single)) => vec![Value::String(single)],
        _ => Vec::new(),
    };
    for link in found {
        if !links.iter().any(|l| l.as_str() == Some(link.url.as_str())) {
            links.push(Value::String(link.url));
        }
    }
    mapping.insert("links".to_string(), Value::Array(links));
    Some(Value::Object(mapping))
}

/// Converts one scraped record.
///
/// `key` is the mapping key the record was stored under, if any. Older mod
/// dumps are keyed by page URL.
pub fn convert_record(
    value: &Value,
    item_type: ItemType,
    key: Option<&str>,
    options: ConversionOptions,
) -> Result<NewCatalogItem, ConversionError> {
    let Value::Object(record) = value else {
        return Err(ConversionError::NotAnObject);
    };

    let download_list = match record.get("downloads") {
        Some(Value::Array(entries)) => Some(entries.as_slice()),
        _ => None,
    };

    let url = non_blank_str(record, "url")
        .filter(|u| is_download_url(u))
        .or_else(|| key.filter(|k| is_download_url(k)))
        .or_else(|| download_list.and_then(first_download_url))
        .ok_or(ConversionError::MissingUrl)?
        .to_string();

    let title = non_blank_str(record, "title")
        .or_else(|| non_blank_str(record, "name"))
        .unwrap_or(default_title(item_type))
        .to_string();
    let creator = non_blank_str(record, "creator")
        .unwrap_or(UNKNOWN_CREATOR)
        .to_string();
    let description = record
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let images = present(record, "images").or_else(|| {
        non_blank_str(record, "thumbnail").map(|cover| json!({"cover": cover, "additional": []}))
    });

    let mut downloads = match download_list {
        Some(entries) => Some(group_download_list(entries)),
        None => present(record, "downloads"),
    };
    if options.scan_descriptions {
        if let Some(description) = &description {
            downloads = merge_description_links(downloads, description);
        }
    }

    Ok(NewCatalogItem {
        url,
        title,
        creator: Some(creator),
        description,
        item_type,
        images,
        downloads,
        embedded_videos: present(record, "embedded_videos"),
    })
}
