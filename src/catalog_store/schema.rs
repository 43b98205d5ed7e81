//! SQLite schema definitions for the mods and tracks catalog.
//!
//! Items are keyed by an integer rowid and looked up by their unique page
//! URL. `images`, `downloads` and `embedded_videos` hold JSON text exactly as
//! it was written, legacy shapes included.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use anyhow::Result;
use rusqlite::Connection;

/// Items table as first shipped, counters lived inside `downloads`.
const ITEMS_TABLE_V0: Table = Table {
    name: "items",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("creator", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("item_type", &SqlType::Text, non_null = true), // 'mod', 'track'
        sqlite_column!("images", &SqlType::Text),
        sqlite_column!("downloads", &SqlType::Text),
        sqlite_column!("embedded_videos", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_items_url", "url"), ("idx_items_type", "item_type")],
    unique_constraints: &[&["url"]],
};

const ITEMS_TABLE_V1: Table = Table {
    name: "items",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("creator", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("item_type", &SqlType::Text, non_null = true),
        sqlite_column!("images", &SqlType::Text),
        sqlite_column!("downloads", &SqlType::Text),
        sqlite_column!("embedded_videos", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        // Appended by the v1 migration, hence after the timestamps.
        sqlite_column!(
            "download_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_items_url", "url"),
        ("idx_items_type", "item_type"),
        ("idx_items_download_count", "download_count"),
    ],
    unique_constraints: &[&["url"]],
};

/// Moves counters out of the downloads JSON into their own column. Rows whose
/// downloads are not a JSON object, or carry no usable counter, start at 0.
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    conn.execute(
        "ALTER TABLE items ADD COLUMN download_count INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    conn.execute(
        "UPDATE items SET download_count = MAX(0, CAST(json_extract(downloads, '$.download_count') AS INTEGER))
         WHERE json_valid(downloads)
           AND json_type(downloads) = 'object'
           AND json_type(downloads, '$.download_count') = 'integer'",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_items_download_count ON items(download_count)",
        [],
    )?;
    Ok(())
}

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[ITEMS_TABLE_V0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[ITEMS_TABLE_V1],
        migration: Some(migrate_v0_to_v1),
    },
];
