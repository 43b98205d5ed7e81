//! SQLite-backed catalog store implementation.
//!
//! This module provides the `SqliteCatalogStore` which persists mods and
//! tracks in a single `items` table.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use super::validation::{validate_new_item, validate_update, ValidationError};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const ITEM_COLUMNS: &str = "rowid, url, title, creator, description, item_type, images, \
                            downloads, embedded_videos, download_count, created_at, updated_at";

/// SQLite-backed catalog store.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    // Databases written before versioning have user_version 0. Treat them as
    // v1 if the counter column is already there.
    let mut current_version = if db_version < BASE_DB_VERSION as i64 {
        let has_download_count = conn
            .query_row(
                "SELECT 1 FROM pragma_table_info('items') WHERE name = 'download_count'",
                [],
                |r| r.get::<_, i32>(0),
            )
            .ok()
            == Some(1);
        if has_download_count {
            1
        } else {
            0
        }
    } else {
        (db_version - BASE_DB_VERSION as i64) as usize
    };

    if current_version >= latest_version {
        latest_schema
            .validate(conn)
            .context("Catalog database does not match the expected schema")?;
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating catalog db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
            current_version = schema.version;
        }
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;

    let _ = conn.query_row(
        "PRAGMA wal_checkpoint(TRUNCATE)",
        [],
        |_: &rusqlite::Row| Ok(()),
    );
    Ok(())
}

impl FromSql for ItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        ItemType::from_db_str(s).ok_or(FromSqlError::InvalidType)
    }
}

/// Decodes a JSON text column. Text that is not JSON at all is kept as a
/// plain string so the permissive readers can still see it.
fn json_column(raw: Option<String>) -> Option<Value> {
    raw.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

fn json_text(value: &Option<Value>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to encode JSON column")
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl SqliteCatalogStore {
    /// Create a new SqliteCatalogStore.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file, created if missing
    /// * `read_pool_size` - Number of connections for concurrent read operations
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path_ref))?;

        migrate_if_needed(&mut write_conn)?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let counts = Self::counts_inner(&write_conn)?;
        info!(
            "Opened catalog: {} mods, {} tracks",
            counts.mods, counts.tracks
        );

        let read_pool_size = read_pool_size.max(1);
        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    // =========================================================================
    // Internal Helper Methods
    // =========================================================================

    fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<RawCatalogRecord> {
        let download_count: i64 = row.get(9)?;
        Ok(RawCatalogRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            creator: row.get(3)?,
            description: row.get(4)?,
            item_type: row.get(5)?,
            images: json_column(row.get(6)?),
            downloads: json_column(row.get(7)?),
            embedded_videos: json_column(row.get(8)?),
            download_count: Some(download_count.max(0) as u64),
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn get_item_inner(conn: &Connection, id: i64) -> Result<Option<RawCatalogRecord>> {
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {} FROM items WHERE rowid = ?1", ITEM_COLUMNS))?;
        Ok(stmt
            .query_row(params![id], Self::parse_item_row)
            .optional()?)
    }

    fn counts_inner(conn: &Connection) -> Result<CatalogCounts> {
        let mut counts = CatalogCounts::default();
        let mut stmt =
            conn.prepare_cached("SELECT item_type, COUNT(*) FROM items GROUP BY item_type")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (item_type, count) = row?;
            match ItemType::from_db_str(&item_type) {
                Some(ItemType::Mod) => counts.mods = count as usize,
                Some(ItemType::Track) => counts.tracks = count as usize,
                None => debug!("Ignoring {} items of unknown type '{}'", count, item_type),
            }
        }
        counts.last_updated = conn.query_row("SELECT MAX(updated_at) FROM items", [], |r| r.get(0))?;
        Ok(counts)
    }

    /// Runs `f` inside an immediate transaction on the write connection.
    fn with_write_tx<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        match f(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Every stored record in id order. Used by the export tooling.
    pub fn all_records(&self) -> Result<Vec<RawCatalogRecord>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM items ORDER BY rowid", ITEM_COLUMNS))?;
        let records = stmt
            .query_map([], Self::parse_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn list_items(&self, query: &ItemQuery, page: PageRequest) -> Result<Page<RawCatalogRecord>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(item_type) = query.item_type {
            conditions.push("item_type = ?");
            args.push(item_type.to_db_str().to_string());
        }
        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                conditions.push(
                    "(lower(title) LIKE lower(?) ESCAPE '\\' OR lower(description) LIKE lower(?) ESCAPE '\\')",
                );
                let pattern = escape_like(search);
                args.push(pattern.clone());
                args.push(pattern);
            }
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let order_clause = match query.sort {
            ItemSort::Newest => "created_at DESC, rowid DESC",
            ItemSort::Title => "lower(title) ASC, rowid ASC",
            ItemSort::Popular => "download_count DESC, rowid ASC",
        };

        let sql = format!(
            "SELECT {} FROM items {} ORDER BY {} LIMIT {} OFFSET {}",
            ITEM_COLUMNS,
            where_clause,
            order_clause,
            page.per_page,
            page.offset()
        );

        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM items {}", where_clause),
            params_from_iter(args.iter()),
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), Self::parse_item_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total as usize, page))
    }

    fn get_item(&self, id: i64) -> Result<Option<RawCatalogRecord>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Self::get_item_inner(&conn, id)
    }

    fn get_item_by_url(&self, url: &str) -> Result<Option<RawCatalogRecord>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {} FROM items WHERE url = ?1", ITEM_COLUMNS))?;
        Ok(stmt
            .query_row(params![url], Self::parse_item_row)
            .optional()?)
    }

    fn get_counts(&self) -> Result<CatalogCounts> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Self::counts_inner(&conn)
    }

    fn create_item(&self, item: NewCatalogItem) -> Result<RawCatalogRecord> {
        validate_new_item(&item)?;
        let images = json_text(&item.images)?;
        let downloads = json_text(&item.downloads)?;
        let embedded_videos = json_text(&item.embedded_videos)?;

        self.with_write_tx(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM items WHERE url = ?1)",
                params![&item.url],
                |r| r.get(0),
            )?;
            if exists {
                return Err(ValidationError::DuplicateUrl {
                    url: item.url.clone(),
                }
                .into());
            }

            conn.execute(
                "INSERT INTO items (url, title, creator, description, item_type, images, downloads, embedded_videos)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &item.url,
                    item.title.trim(),
                    &item.creator,
                    &item.description,
                    item.item_type.to_db_str(),
                    images,
                    downloads,
                    embedded_videos,
                ],
            )?;
            let rowid = conn.last_insert_rowid();
            Self::get_item_inner(conn, rowid)?
                .with_context(|| format!("Item {} vanished after insert", rowid))
        })
    }

    fn update_item(&self, id: i64, update: CatalogItemUpdate) -> Result<Option<RawCatalogRecord>> {
        validate_update(&update)?;

        self.with_write_tx(|conn| {
            let Some(mut record) = Self::get_item_inner(conn, id)? else {
                return Ok(None);
            };
            if update.is_empty() {
                return Ok(Some(record));
            }
            update.apply_to(&mut record);

            conn.execute(
                "UPDATE items SET title = ?1, creator = ?2, description = ?3, images = ?4,
                 downloads = ?5, embedded_videos = ?6, updated_at = cast(strftime('%s','now') as int)
                 WHERE rowid = ?7",
                params![
                    &record.title,
                    &record.creator,
                    &record.description,
                    json_text(&record.images)?,
                    json_text(&record.downloads)?,
                    json_text(&record.embedded_videos)?,
                    id,
                ],
            )?;
            Self::get_item_inner(conn, id)
        })
    }

    fn delete_item(&self, id: i64) -> Result<bool> {
        self.with_write_tx(|conn| {
            let deleted = conn.execute("DELETE FROM items WHERE rowid = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    fn increment_download_count(&self, id: i64) -> Result<Option<u64>> {
        self.with_write_tx(|conn| {
            let updated = conn.execute(
                "UPDATE items SET download_count = download_count + 1 WHERE rowid = ?1",
                params![id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            let count: i64 = conn.query_row(
                "SELECT download_count FROM items WHERE rowid = ?1",
                params![id],
                |r| r.get(0),
            )?;
            Ok(Some(count.max(0) as u64))
        })
    }

    fn is_available(&self) -> bool {
        let conn = self.get_read_conn();
        let Ok(conn) = conn.lock() else {
            return false;
        };
        conn.query_row("SELECT 1", [], |r| r.get::<_, i32>(0))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::format_record;
    use serde_json::json;
    use tempfile::TempDir;

    fn new_store() -> (TempDir, SqliteCatalogStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db"), 2).unwrap();
        (temp_dir, store)
    }

    fn new_item(url: &str, title: &str, item_type: ItemType) -> NewCatalogItem {
        NewCatalogItem {
            url: url.to_string(),
            title: title.to_string(),
            creator: Some("Rider".to_string()),
            description: None,
            item_type,
            images: None,
            downloads: None,
            embedded_videos: None,
        }
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, store) = new_store();
        let mut item = new_item("https://mxbikes.net/mods/pack", "Pack", ItemType::Mod);
        item.downloads = Some(json!({"by_host": {"mega": ["https://mega.nz/file/a"]}}));

        let created = store.create_item(item).unwrap();
        assert_eq!(created.download_count, Some(0));

        let fetched = store.get_item(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(
            fetched.downloads,
            Some(json!({"by_host": {"mega": ["https://mega.nz/file/a"]}}))
        );

        let by_url = store
            .get_item_by_url("https://mxbikes.net/mods/pack")
            .unwrap()
            .unwrap();
        assert_eq!(by_url.id, created.id);
        assert!(store.get_item(created.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_url_is_a_validation_error() {
        let (_dir, store) = new_store();
        store
            .create_item(new_item("https://mxbikes.net/a", "A", ItemType::Mod))
            .unwrap();
        let err = store
            .create_item(new_item("https://mxbikes.net/a", "Again", ItemType::Track))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::DuplicateUrl {
                url: "https://mxbikes.net/a".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_item_is_rejected() {
        let (_dir, store) = new_store();
        let err = store
            .create_item(new_item("ftp://mxbikes.net/a", "A", ItemType::Mod))
            .unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
        assert_eq!(store.get_counts().unwrap().mods, 0);
    }

    #[test]
    fn test_legacy_text_downloads_survive_storage() {
        let (_dir, store) = new_store();
        let created = store
            .create_item(new_item("https://mxbikes.net/a", "A", ItemType::Track))
            .unwrap();
        {
            let conn = store.write_conn.lock().unwrap();
            conn.execute(
                "UPDATE items SET downloads = 'not valid json{{' WHERE rowid = ?1",
                params![created.id],
            )
            .unwrap();
        }

        let record = store.get_item(created.id).unwrap().unwrap();
        assert_eq!(record.downloads, Some(json!("not valid json{{")));
        assert!(format_record(&record).downloads.is_empty());
    }

    #[test]
    fn test_list_filters_sorts_and_pages() {
        let (_dir, store) = new_store();
        for (i, title) in ["Charlie", "alpha", "Bravo"].iter().enumerate() {
            let mut item = new_item(
                &format!("https://mxbikes.net/track/{}", i),
                title,
                ItemType::Track,
            );
            item.description = Some(format!("{} 100% sand", title));
            store.create_item(item).unwrap();
        }
        store
            .create_item(new_item("https://mxbikes.net/mod/x", "Xmod", ItemType::Mod))
            .unwrap();

        let query = ItemQuery {
            item_type: Some(ItemType::Track),
            sort: ItemSort::Title,
            ..Default::default()
        };
        let page = store
            .list_items(&query, PageRequest { page: 1, per_page: 2 })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        let titles: Vec<_> = page.items.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "Bravo"]);

        let search = ItemQuery {
            search: Some("BRAVO".to_string()),
            ..Default::default()
        };
        let page = store.list_items(&search, PageRequest::default()).unwrap();
        assert_eq!(page.total, 1);

        let percent = ItemQuery {
            search: Some("100%".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list_items(&percent, PageRequest::default()).unwrap().total, 3);

        let literal = ItemQuery {
            search: Some("1_0".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list_items(&literal, PageRequest::default()).unwrap().total, 0);
    }

    #[test]
    fn test_huge_page_is_empty_and_keeps_pool_usable() {
        let (_dir, store) = new_store();
        store
            .create_item(new_item("https://mxbikes.net/track/a", "A", ItemType::Track))
            .unwrap();

        for _ in 0..2 {
            let page = store
                .list_items(
                    &ItemQuery::default(),
                    PageRequest::new(Some(usize::MAX), Some(50), 100),
                )
                .unwrap();
            assert!(page.items.is_empty());
            assert_eq!(page.total, 1);
        }

        // Every pooled connection still answers
        for _ in 0..2 {
            let page = store
                .list_items(&ItemQuery::default(), PageRequest::default())
                .unwrap();
            assert_eq!(page.items.len(), 1);
        }
    }

    #[test]
    fn test_update_delete_and_counter() {
        let (_dir, store) = new_store();
        let created = store
            .create_item(new_item("https://mxbikes.net/a", "A", ItemType::Mod))
            .unwrap();

        let updated = store
            .update_item(
                created.id,
                CatalogItemUpdate {
                    title: Some("Renamed".to_string()),
                    downloads: Some(json!({"links": ["https://mega.nz/file/z"]})),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.creator.as_deref(), Some("Rider"));

        assert_eq!(store.increment_download_count(created.id).unwrap(), Some(1));
        assert_eq!(store.increment_download_count(created.id).unwrap(), Some(2));
        assert_eq!(store.increment_download_count(9999).unwrap(), None);

        let popular = store
            .list_items(
                &ItemQuery {
                    sort: ItemSort::Popular,
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .unwrap();
        assert_eq!(popular.items[0].download_count, Some(2));

        assert!(store.update_item(9999, CatalogItemUpdate::default()).unwrap().is_none());
        assert!(store.delete_item(created.id).unwrap());
        assert!(!store.delete_item(created.id).unwrap());
        assert!(store.get_item(created.id).unwrap().is_none());
    }

    #[test]
    fn test_counts_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        {
            let store = SqliteCatalogStore::new(&db_path, 1).unwrap();
            store
                .create_item(new_item("https://mxbikes.net/a", "A", ItemType::Mod))
                .unwrap();
            store
                .create_item(new_item("https://mxbikes.net/b", "B", ItemType::Track))
                .unwrap();
        }

        let store = SqliteCatalogStore::new(&db_path, 1).unwrap();
        let counts = store.get_counts().unwrap();
        assert_eq!((counts.mods, counts.tracks), (1, 1));
        assert!(counts.last_updated.is_some());
        assert!(store.is_available());
        assert_eq!(store.all_records().unwrap().len(), 2);
    }

    #[test]
    fn test_opens_and_migrates_v0_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("legacy.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            CATALOG_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
            conn.execute(
                r#"INSERT INTO items (url, title, item_type, downloads)
                   VALUES ('https://mxbikes.net/a', 'A', 'mod', '{"download_count": 5}')"#,
                [],
            )
            .unwrap();
        }

        let store = SqliteCatalogStore::new(&db_path, 1).unwrap();
        let record = store
            .get_item_by_url("https://mxbikes.net/a")
            .unwrap()
            .unwrap();
        assert_eq!(record.download_count, Some(5));
    }

    #[tokio::test]
    async fn test_concurrent_reads_no_blocking() {
        let (_dir, store) = new_store();
        store
            .create_item(new_item("https://mxbikes.net/a", "A", ItemType::Mod))
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                tokio::spawn({
                    let store = store.clone();
                    async move {
                        for _ in 0..100 {
                            let _ = store.get_counts();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
