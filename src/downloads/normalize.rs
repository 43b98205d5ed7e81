use super::extract::collect_links;
use super::host::DownloadHost;
use super::legacy::{parse_permissive, LegacyValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The one downloads shape the API serves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDownloads {
    /// Sorted, no duplicates.
    pub links: Vec<String>,
    pub download_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedLink {
    pub url: String,
    pub host: DownloadHost,
}

impl CanonicalDownloads {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn hosted_links(&self) -> Vec<HostedLink> {
        self.links
            .iter()
            .map(|url| HostedLink {
                url: url.clone(),
                host: DownloadHost::classify(url),
            })
            .collect()
    }

    pub fn by_host(&self) -> BTreeMap<DownloadHost, Vec<String>> {
        let mut grouped: BTreeMap<DownloadHost, Vec<String>> = BTreeMap::new();
        for url in &self.links {
            grouped
                .entry(DownloadHost::classify(url))
                .or_default()
                .push(url.clone());
        }
        grouped
    }
}

/// Normalizes a stored `downloads` field of any historical shape.
///
/// Never fails: absent fields, undecodable strings and values that are not
/// objects all come back as the empty canonical value.
pub fn parse_legacy_downloads(raw: Option<&Value>) -> CanonicalDownloads {
    match parse_permissive(raw) {
        Some(map) => normalize_mapping(&map),
        None => CanonicalDownloads::empty(),
    }
}

fn normalize_mapping(map: &Map<String, Value>) -> CanonicalDownloads {
    let mut links = BTreeSet::new();

    for grouping in ["by_type", "by_host"] {
        if let LegacyValue::Mapping(groups) = LegacyValue::of(map.get(grouping)) {
            for group in groups.values() {
                collect_links(group, &mut links);
            }
        }
    }
    for flat in ["links", "link"] {
        if let Some(value) = map.get(flat) {
            collect_links(value, &mut links);
        }
    }

    let download_count = map
        .get("download_count")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    CanonicalDownloads {
        links: links.into_iter().collect(),
        download_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> CanonicalDownloads {
        parse_legacy_downloads(Some(&value))
    }

    #[test]
    fn merges_groupings_into_one_sorted_list() {
        let result = normalize(json!({
            "by_type": {"mod": ["http://a.com/x.zip"]},
            "by_host": {"mediafire": ["http://a.com/x.zip", "http://b.com/y.zip"]}
        }));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"links": ["http://a.com/x.zip", "http://b.com/y.zip"], "download_count": 0})
        );
    }

    #[test]
    fn absent_input_is_empty() {
        assert_eq!(parse_legacy_downloads(None), CanonicalDownloads::empty());
        assert_eq!(normalize(Value::Null), CanonicalDownloads::empty());
    }

    #[test]
    fn malformed_json_string_is_empty() {
        assert_eq!(
            serde_json::to_value(normalize(json!("not valid json{{"))).unwrap(),
            json!({"links": [], "download_count": 0})
        );
    }

    #[test]
    fn decoded_non_objects_are_empty() {
        assert!(normalize(json!("[\"https://a.com/x\"]")).is_empty());
        assert!(normalize(json!(["https://a.com/x"])).is_empty());
        assert!(normalize(json!(7)).is_empty());
    }

    #[test]
    fn rejects_non_http_schemes() {
        let result = normalize(json!({
            "link": "ftp://bad.com/x",
            "links": ["https://good.com/y"]
        }));
        assert_eq!(result.links, vec!["https://good.com/y".to_string()]);
    }

    #[test]
    fn reads_json_encoded_strings() {
        let encoded = json!({"links": ["https://a.com/1"], "download_count": 12}).to_string();
        let result = normalize(Value::String(encoded));
        assert_eq!(result.links, vec!["https://a.com/1".to_string()]);
        assert_eq!(result.download_count, 12);
    }

    #[test]
    fn every_url_appears_exactly_once() {
        let url = "https://www.mediafire.com/file/abc/track.zip";
        let result = normalize(json!({
            "by_type": {"default": [url], "other": [url, null, 3, ""]},
            "by_host": {"mediafire": [url]},
            "links": [url, url],
            "link": url,
        }));
        assert_eq!(result.links.iter().filter(|l| *l == url).count(), 1);
        assert_eq!(result.links.len(), 1);
    }

    #[test]
    fn host_counts_contribute_nothing() {
        // Some migrations stored host -> number of links instead of host -> links.
        let result = normalize(json!({
            "by_type": {"default": ["https://mega.nz/file/a"]},
            "by_host": {"mega": 1},
            "download_count": 0
        }));
        assert_eq!(result.links, vec!["https://mega.nz/file/a".to_string()]);
    }

    #[test]
    fn groupings_that_are_not_mappings_are_ignored() {
        let result = normalize(json!({
            "by_type": ["https://a.com/ignored"],
            "links": ["https://b.com/kept"]
        }));
        assert_eq!(result.links, vec!["https://b.com/kept".to_string()]);
    }

    #[test]
    fn download_count_must_be_a_non_negative_integer() {
        assert_eq!(normalize(json!({"download_count": 5})).download_count, 5);
        assert_eq!(normalize(json!({"download_count": -3})).download_count, 0);
        assert_eq!(normalize(json!({"download_count": "5"})).download_count, 0);
        assert_eq!(normalize(json!({"download_count": 2.5})).download_count, 0);
    }

    #[test]
    fn normalizing_canonical_output_is_idempotent() {
        let first = normalize(json!({
            "by_type": {"default": ["https://b.com/2", "https://a.com/1"]},
            "link": "https://c.com/3",
            "download_count": 9
        }));
        let second = normalize(serde_json::to_value(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn output_is_deterministic() {
        let input = json!({
            "by_host": {"z": ["https://z.com/z"], "a": ["https://a.com/a"]},
            "links": ["https://m.com/m"]
        });
        assert_eq!(normalize(input.clone()), normalize(input));
    }

    #[test]
    fn groups_links_by_host() {
        let downloads = normalize(json!({
            "links": [
                "https://www.mediafire.com/file/1",
                "https://mega.nz/file/2",
                "https://example.com/3"
            ]
        }));
        let grouped = downloads.by_host();
        assert_eq!(grouped[&DownloadHost::Mediafire].len(), 1);
        assert_eq!(grouped[&DownloadHost::Mega].len(), 1);
        assert_eq!(grouped[&DownloadHost::Other].len(), 1);
        assert!(!grouped.contains_key(&DownloadHost::GoogleDrive));

        let hosted = downloads.hosted_links();
        assert_eq!(hosted[0].url, "https://example.com/3");
        assert_eq!(hosted[0].host, DownloadHost::Other);
    }
}
