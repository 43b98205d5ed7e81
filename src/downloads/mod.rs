//! Download link handling.
//!
//! Catalog items carry a `downloads` JSON fragment whose shape changed several
//! times over the life of the catalog. Everything in here is pure: it takes
//! whatever was stored and turns it into the canonical `{links, download_count}`
//! shape without ever failing.

mod description;
mod extract;
mod host;
mod legacy;
mod normalize;

pub use description::{extract_description_links, DescribedLink};
pub use extract::{collect_links, extract_links, is_download_url};
pub use host::DownloadHost;
pub use legacy::{parse_permissive, LegacyValue};
pub use normalize::{parse_legacy_downloads, CanonicalDownloads, HostedLink};
