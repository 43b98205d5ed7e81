//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per catalog endpoint. When routes change,
//! update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn content_url(&self, path: &str) -> String {
        format!("{}/v1/content{}", self.base_url, path)
    }

    async fn get(&self, url: String) -> Response {
        self.client
            .get(url)
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Server Endpoints
    // ========================================================================

    pub async fn get_home(&self) -> Response {
        self.get(format!("{}/", self.base_url)).await
    }

    pub async fn get_health(&self) -> Response {
        self.get(format!("{}/v1/health", self.base_url)).await
    }

    // ========================================================================
    // Listing Endpoints
    // ========================================================================

    /// GET /v1/content/items with raw query pairs
    pub async fn list_items(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(self.content_url("/items"))
            .query(query)
            .send()
            .await
            .expect("List items request failed")
    }

    pub async fn list_mods(&self) -> Response {
        self.get(self.content_url("/mods")).await
    }

    pub async fn list_tracks(&self) -> Response {
        self.get(self.content_url("/tracks")).await
    }

    pub async fn get_popular(&self, limit: usize) -> Response {
        self.get(self.content_url(&format!("/popular?limit={}", limit)))
            .await
    }

    pub async fn get_stats(&self) -> Response {
        self.get(self.content_url("/stats")).await
    }

    pub async fn get_products(&self) -> Response {
        self.get(self.content_url("/products")).await
    }

    // ========================================================================
    // Item Endpoints
    // ========================================================================

    pub async fn get_item(&self, id: i64) -> Response {
        self.get(self.content_url(&format!("/item/{}", id))).await
    }

    pub async fn lookup(&self, url: &str) -> Response {
        self.client
            .get(self.content_url("/lookup"))
            .query(&[("url", url)])
            .send()
            .await
            .expect("Lookup request failed")
    }

    /// Looks an item up by URL and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the item does not exist.
    pub async fn id_of(&self, url: &str) -> i64 {
        let response = self.lookup(url).await;
        assert!(
            response.status().is_success(),
            "Lookup of {} failed",
            url
        );
        let item: Value = response.json().await.expect("Invalid item json");
        item["id"].as_i64().expect("Item without id")
    }

    pub async fn get_item_downloads(&self, id: i64) -> Response {
        self.get(self.content_url(&format!("/item/{}/downloads", id)))
            .await
    }

    pub async fn start_download(&self, id: i64) -> Response {
        self.client
            .post(self.content_url(&format!("/item/{}/download", id)))
            .send()
            .await
            .expect("Download request failed")
    }

    pub async fn create_item(&self, body: &Value) -> Response {
        self.client
            .post(self.content_url("/item"))
            .json(body)
            .send()
            .await
            .expect("Create request failed")
    }

    pub async fn update_item(&self, id: i64, body: &Value) -> Response {
        self.client
            .put(self.content_url(&format!("/item/{}", id)))
            .json(body)
            .send()
            .await
            .expect("Update request failed")
    }

    pub async fn delete_item(&self, id: i64) -> Response {
        self.client
            .delete(self.content_url(&format!("/item/{}", id)))
            .send()
            .await
            .expect("Delete request failed")
    }
}
