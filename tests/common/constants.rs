//! Shared constants for end-to-end tests
//!
//! When the seeded catalog changes, update only this file.

// ============================================================================
// Seeded Catalog
// ============================================================================

/// Track whose downloads are stored as a proper mapping
pub const FOXHILL_URL: &str = "https://mxbikes.net/tracks/foxhill";
pub const FOXHILL_TITLE: &str = "Foxhill";

/// Track whose downloads are stored as JSON-encoded text with a legacy counter
pub const WOODSIDE_URL: &str = "https://mxbikes.net/tracks/woodside";
pub const WOODSIDE_DOWNLOAD_COUNT: u64 = 12;

/// Mod whose downloads column holds undecodable text
pub const BROKEN_MOD_URL: &str = "https://mxbikes.net/mods/broken";

/// Mod with links grouped by host and by type
pub const FACTORY_PACK_URL: &str = "https://mxbikes.net/mods/factory-pack";
pub const FACTORY_PACK_TITLE: &str = "Factory Pack";

pub const SEEDED_MODS: usize = 2;
pub const SEEDED_TRACKS: usize = 2;

pub const MEGA_LINK: &str = "https://mega.nz/file/foxhill";
pub const MEDIAFIRE_LINK: &str = "https://www.mediafire.com/file/woodside";
pub const DRIVE_LINK: &str = "https://drive.google.com/file/d/factory";
pub const ONEDRIVE_LINK: &str = "https://1drv.ms/u/s!factory";

// ============================================================================
// Timing
// ============================================================================

/// Maximum time to wait for the server to accept requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout for a single request
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
