use super::legacy::LegacyValue;
use serde_json::Value;
use std::collections::BTreeSet;
use url::Url;

/// Same nesting limit serde_json enforces when parsing, so only hand-built
/// values can ever reach it.
const MAX_DEPTH: usize = 128;

/// Whether `candidate` is an absolute http(s) URL with a host.
pub fn is_download_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Collects every valid download URL found anywhere inside `value`.
pub fn extract_links(value: &Value) -> BTreeSet<String> {
    let mut links = BTreeSet::new();
    collect_links(value, &mut links);
    links
}

/// Like [`extract_links`] but accumulates into an existing set.
pub fn collect_links(value: &Value, links: &mut BTreeSet<String>) {
    collect_at_depth(value, links, 0);
}

fn collect_at_depth(value: &Value, links: &mut BTreeSet<String>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match LegacyValue::of(Some(value)) {
        LegacyValue::Mapping(map) => {
            for child in map.values() {
                collect_at_depth(child, links, depth + 1);
            }
        }
        LegacyValue::Sequence(items) => {
            for child in items {
                collect_at_depth(child, links, depth + 1);
            }
        }
        LegacyValue::Text(text) => {
            if is_download_url(text) {
                links.insert(text.to_string());
            }
        }
        LegacyValue::Scalar(_) | LegacyValue::Absent => {}
    }
}
