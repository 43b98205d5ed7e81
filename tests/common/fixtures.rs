//! Test fixture creation for the catalog database and JSON dumps

use super::constants::*;
use anyhow::Result;
use mxcatalog_server::catalog_store::{CatalogStore, ItemType, NewCatalogItem, SqliteCatalogStore};
use rusqlite::{params, Connection};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a catalog database with two mods and two tracks, two of them
/// stored in legacy shapes the API never writes itself.
/// Returns (temp_dir, catalog_db_path)
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("catalog.db");

    let store = SqliteCatalogStore::new(&db_path, 1)?;
    store.create_item(NewCatalogItem {
        url: FOXHILL_URL.to_string(),
        title: FOXHILL_TITLE.to_string(),
        creator: Some("Rider".to_string()),
        description: Some("Hard pack with big doubles".to_string()),
        item_type: ItemType::Track,
        images: Some(json!({"cover": "https://img.mxbikes.net/foxhill.jpg", "additional": []})),
        downloads: Some(json!({"by_host": {"mega": [MEGA_LINK]}})),
        embedded_videos: None,
    })?;
    store.create_item(NewCatalogItem {
        url: FACTORY_PACK_URL.to_string(),
        title: FACTORY_PACK_TITLE.to_string(),
        creator: None,
        description: Some("Mirror on OneDrive".to_string()),
        item_type: ItemType::Mod,
        images: None,
        downloads: Some(json!({
            "by_type": {"default": [DRIVE_LINK]},
            "by_host": {"google_drive": [DRIVE_LINK], "onedrive": [ONEDRIVE_LINK]}
        })),
        embedded_videos: None,
    })?;
    drop(store);

    // Rows as the old scraper left them
    let conn = Connection::open(&db_path)?;
    let woodside_downloads = json!({
        "by_type": {"default": [MEDIAFIRE_LINK]},
        "download_count": WOODSIDE_DOWNLOAD_COUNT
    })
    .to_string();
    conn.execute(
        "INSERT INTO items (url, title, creator, description, item_type, images, downloads, download_count, created_at, updated_at)
         VALUES (?1, 'Woodside', NULL, 'Sand', 'track', 'not json', ?2, ?3, 100, 100)",
        params![WOODSIDE_URL, woodside_downloads, WOODSIDE_DOWNLOAD_COUNT as i64],
    )?;
    conn.execute(
        "INSERT INTO items (url, title, creator, description, item_type, images, downloads, created_at, updated_at)
         VALUES (?1, 'Broken', 'Someone', NULL, 'mod', NULL, '{by_host: oops', 50, 50)",
        params![BROKEN_MOD_URL],
    )?;

    Ok((dir, db_path))
}

/// Writes the static dumps the JSON fallback store reads.
pub fn create_test_dumps(dir: &TempDir) -> Result<PathBuf> {
    let data_dir = dir.path().join("data");
    fs::create_dir_all(&data_dir)?;
    fs::write(
        data_dir.join("tracks.json"),
        json!({
            "items": [
                {
                    "url": FOXHILL_URL,
                    "title": FOXHILL_TITLE,
                    "downloads": {"links": [MEGA_LINK], "download_count": 3}
                }
            ],
            "total": 1,
            "pages": 1,
            "current_page": 1
        })
        .to_string(),
    )?;
    fs::write(
        data_dir.join("mods_min.json"),
        json!([{"url": FACTORY_PACK_URL, "title": FACTORY_PACK_TITLE}]).to_string(),
    )?;
    Ok(data_dir)
}
