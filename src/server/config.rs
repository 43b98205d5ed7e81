use super::RequestsLoggingLevel;
use crate::catalog_store::DEFAULT_PAGE_SIZE;
use crate::config::DEFAULT_MAX_PER_PAGE;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Page size used when a listing request does not ask for one.
    pub default_per_page: usize,
    pub max_per_page: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            default_per_page: DEFAULT_PAGE_SIZE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }
}
