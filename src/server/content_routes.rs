//! Catalog content HTTP routes.
//!
//! Listing, lookup and download link endpoints for mods and tracks, plus the
//! write endpoints used by the admin tooling.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::catalog_store::{
    format_record, CatalogItem, CatalogItemUpdate, ItemQuery, ItemSort, ItemType,
    NewCatalogItem, PageRequest, ProductSummary, ValidationError,
};
use crate::downloads::HostedLink;
use crate::server::state::{GuardedCatalogStore, ServerState};
use crate::server::ServerConfig;

pub const DEFAULT_POPULAR_LIMIT: usize = 10;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub q: Option<String>,
    pub sort: Option<ItemSort>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DownloadStarted {
    pub download_count: u64,
    pub links: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogStats {
    pub total_mods: usize,
    pub total_tracks: usize,
    pub using_fallback: bool,
    /// RFC 3339 time of the most recent write.
    pub last_updated: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Maps a store failure onto a status code. Validation errors are the
/// caller's fault, anything else is ours.
fn store_error(operation: &str, err: anyhow::Error) -> Response {
    match err.downcast_ref::<ValidationError>() {
        Some(ValidationError::DuplicateUrl { .. }) => {
            error_body(StatusCode::CONFLICT, err.to_string())
        }
        Some(validation) => error_body(StatusCode::BAD_REQUEST, validation.to_string()),
        None => {
            error!("Failed to {}: {:#}", operation, err);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn not_found(id: i64) -> Response {
    error_body(StatusCode::NOT_FOUND, format!("Item {} not found", id))
}

fn page_request(config: &ServerConfig, query: &ListQuery) -> PageRequest {
    PageRequest::new(
        query.page,
        query.per_page.or(Some(config.default_per_page)),
        config.max_per_page,
    )
}

fn list(
    store: &GuardedCatalogStore,
    config: &ServerConfig,
    query: ListQuery,
    fixed_type: Option<ItemType>,
) -> Response {
    let page = page_request(config, &query);
    let item_query = ItemQuery {
        item_type: fixed_type.or(query.item_type),
        search: query.q,
        sort: query.sort.unwrap_or_default(),
    };

    match store.list_items(&item_query, page) {
        Ok(page) => Json(page.map(|raw| format_record(&raw))).into_response(),
        Err(err) => store_error("list items", err),
    }
}

// =============================================================================
// Read Routes
// =============================================================================

/// GET /items - Paged listing of all items
async fn get_items(
    State(store): State<GuardedCatalogStore>,
    State(config): State<ServerConfig>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&store, &config, query, None)
}

async fn get_mods(
    State(store): State<GuardedCatalogStore>,
    State(config): State<ServerConfig>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&store, &config, query, Some(ItemType::Mod))
}

async fn get_tracks(
    State(store): State<GuardedCatalogStore>,
    State(config): State<ServerConfig>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&store, &config, query, Some(ItemType::Track))
}

async fn get_item(State(store): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match store.get_item(id) {
        Ok(Some(raw)) => Json(format_record(&raw)).into_response(),
        Ok(None) => not_found(id),
        Err(err) => store_error("get item", err),
    }
}

/// GET /lookup?url= - Find an item by its page URL
async fn lookup_item(
    State(store): State<GuardedCatalogStore>,
    Query(query): Query<LookupQuery>,
) -> Response {
    match store.get_item_by_url(&query.url) {
        Ok(Some(raw)) => Json(format_record(&raw)).into_response(),
        Ok(None) => error_body(
            StatusCode::NOT_FOUND,
            format!("No item with url '{}'", query.url),
        ),
        Err(err) => store_error("look up item", err),
    }
}

/// GET /item/{id}/downloads - Canonical links with their hosting provider
async fn get_item_downloads(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.get_item(id) {
        Ok(Some(raw)) => {
            let links: Vec<HostedLink> = format_record(&raw).downloads.hosted_links();
            Json(links).into_response()
        }
        Ok(None) => not_found(id),
        Err(err) => store_error("get item downloads", err),
    }
}

/// GET /popular - Most downloaded items
async fn get_popular(
    State(store): State<GuardedCatalogStore>,
    State(config): State<ServerConfig>,
    Query(query): Query<PopularQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, config.max_per_page.max(1));
    let item_query = ItemQuery {
        item_type: query.item_type,
        search: None,
        sort: ItemSort::Popular,
    };

    match store.list_items(&item_query, PageRequest { page: 1, per_page: limit }) {
        Ok(page) => {
            let items: Vec<CatalogItem> = page.items.iter().map(format_record).collect();
            Json(items).into_response()
        }
        Err(err) => store_error("list popular items", err),
    }
}

async fn get_stats(State(store): State<GuardedCatalogStore>) -> Response {
    match store.get_counts() {
        Ok(counts) => Json(CatalogStats {
            total_mods: counts.mods,
            total_tracks: counts.tracks,
            using_fallback: store.is_using_fallback(),
            last_updated: counts
                .last_updated
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .map(|ts| ts.to_rfc3339()),
        })
        .into_response(),
        Err(err) => store_error("get stats", err),
    }
}

/// GET /products - Product cards for the frontend
async fn get_products(
    State(store): State<GuardedCatalogStore>,
    State(config): State<ServerConfig>,
    Query(query): Query<ListQuery>,
) -> Response {
    let page = page_request(&config, &query);
    let item_query = ItemQuery {
        item_type: query.item_type,
        search: query.q,
        sort: query.sort.unwrap_or_default(),
    };

    match store.list_items(&item_query, page) {
        Ok(page) => {
            let products: Vec<ProductSummary> = page
                .items
                .iter()
                .map(|raw| ProductSummary::from(&format_record(raw)))
                .collect();
            Json(products).into_response()
        }
        Err(err) => store_error("list products", err),
    }
}

// =============================================================================
// Write Routes
// =============================================================================

/// POST /item/{id}/download - Count a download and hand out the links
async fn start_download(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Response {
    let download_count = match store.increment_download_count(id) {
        Ok(Some(count)) => count,
        Ok(None) => return not_found(id),
        Err(err) => return store_error("count download", err),
    };
    debug!("Item {} downloaded, count is now {}", id, download_count);

    match store.get_item(id) {
        Ok(Some(raw)) => Json(DownloadStarted {
            download_count,
            links: format_record(&raw).downloads.links,
        })
        .into_response(),
        Ok(None) => not_found(id),
        Err(err) => store_error("get item", err),
    }
}

async fn create_item(
    State(store): State<GuardedCatalogStore>,
    Json(item): Json<NewCatalogItem>,
) -> Response {
    match store.create_item(item) {
        Ok(raw) => (StatusCode::CREATED, Json(format_record(&raw))).into_response(),
        Err(err) => store_error("create item", err),
    }
}

async fn update_item(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(update): Json<CatalogItemUpdate>,
) -> Response {
    match store.update_item(id, update) {
        Ok(Some(raw)) => Json(format_record(&raw)).into_response(),
        Ok(None) => not_found(id),
        Err(err) => store_error("update item", err),
    }
}

async fn delete_item(State(store): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match store.delete_item(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(id),
        Err(err) => store_error("delete item", err),
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Build the content routes, nested under `/v1/content`.
pub fn content_routes() -> Router<ServerState> {
    Router::new()
        .route("/items", get(get_items))
        .route("/mods", get(get_mods))
        .route("/tracks", get(get_tracks))
        .route("/item", post(create_item))
        .route(
            "/item/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/item/{id}/downloads", get(get_item_downloads))
        .route("/item/{id}/download", post(start_download))
        .route("/lookup", get(lookup_item))
        .route("/popular", get(get_popular))
        .route("/stats", get(get_stats))
        .route("/products", get(get_products))
}
