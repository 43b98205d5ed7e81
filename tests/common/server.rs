//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own catalog database.

use super::constants::*;
use super::fixtures::{create_test_catalog, create_test_dumps};
use mxcatalog_server::catalog_store::{
    CatalogStore, FallbackCatalogStore, JsonFileCatalogStore, SqliteCatalogStore,
};
use mxcatalog_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated catalog
///
/// When dropped, the server shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    pub port: u16,

    /// The SQLite file behind the server, for direct manipulation in tests
    pub db_path: PathBuf,

    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server backed by the seeded SQLite catalog only.
    pub async fn spawn() -> Self {
        Self::spawn_inner(false).await
    }

    /// Spawns a server that falls back to JSON dumps when the database fails.
    pub async fn spawn_with_fallback() -> Self {
        Self::spawn_inner(true).await
    }

    async fn spawn_inner(with_fallback: bool) -> Self {
        let (temp_dir, db_path) = create_test_catalog().expect("Failed to create test catalog");

        let sqlite_store = Arc::new(
            SqliteCatalogStore::new(&db_path, 2).expect("Failed to open catalog store"),
        );
        let catalog_store: Arc<dyn CatalogStore> = if with_fallback {
            let data_dir = create_test_dumps(&temp_dir).expect("Failed to write test dumps");
            let json_store =
                JsonFileCatalogStore::new(&data_dir).expect("Failed to open JSON store");
            Arc::new(FallbackCatalogStore::new(sqlite_store, Arc::new(json_store)))
        } else {
            sqlite_store
        };

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let app = make_app(config, catalog_store).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            db_path,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    /// Makes every following database query fail.
    pub fn break_database(&self) {
        let conn = rusqlite::Connection::open(&self.db_path).expect("Failed to open database");
        conn.execute_batch("DROP TABLE items")
            .expect("Failed to drop items table");
    }

    /// Waits for the server to become ready by polling `/`
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
