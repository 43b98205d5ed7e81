mod file_config;

pub use file_config::{FileConfig, PaginationConfig};

use crate::catalog_store::DEFAULT_PAGE_SIZE;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_MAX_PER_PAGE: usize = 100;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub read_pool_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    /// Directory holding the JSON dumps served when the database fails.
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub read_pool_size: usize,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSettings {
    pub default_per_page: usize,
    pub max_per_page: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PAGE_SIZE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone());
        if let Some(data_dir) = &data_dir {
            if !data_dir.is_dir() {
                bail!("data_dir is not a directory: {:?}", data_dir);
            }
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let read_pool_size = file
            .read_pool_size
            .or(cli.read_pool_size)
            .unwrap_or(DEFAULT_READ_POOL_SIZE);
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        let pagination_file = file.pagination.unwrap_or_default();
        let defaults = PaginationSettings::default();
        let max_per_page = pagination_file
            .max_per_page
            .unwrap_or(defaults.max_per_page);
        let default_per_page = pagination_file
            .default_per_page
            .unwrap_or(defaults.default_per_page);
        if max_per_page == 0 || default_per_page == 0 {
            bail!("Page sizes must be at least 1");
        }
        if default_per_page > max_per_page {
            bail!(
                "default_per_page ({}) is larger than max_per_page ({})",
                default_per_page,
                max_per_page
            );
        }

        Ok(Self {
            db_dir,
            data_dir,
            port,
            logging_level,
            frontend_dir_path,
            read_pool_size,
            pagination: PaginationSettings {
                default_per_page,
                max_per_page,
            },
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
