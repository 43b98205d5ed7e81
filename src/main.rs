use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mxcatalog_server::catalog_store::{CatalogStore, SqliteCatalogStore};
#[cfg(not(feature = "no_fallback"))]
use mxcatalog_server::catalog_store::{FallbackCatalogStore, JsonFileCatalogStore};
use mxcatalog_server::config::{AppConfig, CliConfig, FileConfig};
use mxcatalog_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding catalog.db. Created databases are initialized on startup.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory with the mods.json and tracks.json dumps served when the database fails.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Number of read connections to the catalog database.
    #[clap(long)]
    pub read_pool_size: Option<usize>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            data_dir: self.data_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            read_pool_size: self.read_pool_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let db_path = config.catalog_db_path();
    info!("Opening SQLite catalog database at {:?}...", db_path);
    let sqlite_store: Arc<dyn CatalogStore> =
        Arc::new(SqliteCatalogStore::new(&db_path, config.read_pool_size)?);

    #[cfg(not(feature = "no_fallback"))]
    let catalog_store: Arc<dyn CatalogStore> = match &config.data_dir {
        Some(data_dir) => {
            info!("JSON fallback enabled from {:?}", data_dir);
            let json_store = Arc::new(JsonFileCatalogStore::new(data_dir)?);
            Arc::new(FallbackCatalogStore::new(sqlite_store, json_store))
        }
        None => sqlite_store,
    };

    #[cfg(feature = "no_fallback")]
    let catalog_store: Arc<dyn CatalogStore> = sqlite_store;

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level,
        port: config.port,
        frontend_dir_path: config.frontend_dir_path,
        default_per_page: config.pagination.default_per_page,
        max_per_page: config.pagination.max_per_page,
    };

    info!("Ready to serve at port {}!", server_config.port);
    run_server(server_config, catalog_store).await
}
