//! Download links mentioned in an item's free-text description.

use super::extract::is_download_url;
use super::host::DownloadHost;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(r#"https?://[^\s<>"']+"#).unwrap();
}

/// Words that turn a short line into the label of the links below it.
const LABEL_INDICATORS: &[&str] = &["default", "recommended", "mirror", "alternative"];

/// Longer lines mentioning an indicator are prose, not labels.
const MAX_LABEL_LINE_LEN: usize = 50;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png", ".gif", ".webp"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DescribedLink {
    pub url: String,
    pub host: DownloadHost,
    pub label: Option<String>,
}

fn label_of(line: &str) -> Option<String> {
    if line.chars().count() >= MAX_LABEL_LINE_LEN {
        return None;
    }
    let lowered = line.to_lowercase();
    LABEL_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
        .then(|| line.trim().to_string())
}

fn is_image(url: &str) -> bool {
    let lowered = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.contains(ext))
}

/// Scans a description line by line for download links.
///
/// The most recent label line applies to every link that follows it. A link
/// seen twice is reported once; if only the later occurrence had a label, the
/// label is kept.
pub fn extract_description_links(description: &str) -> Vec<DescribedLink> {
    let mut found: Vec<DescribedLink> = Vec::new();
    let mut current_label: Option<String> = None;

    for line in description.lines() {
        if let Some(label) = label_of(line) {
            current_label = Some(label);
        }

        for candidate in URL_PATTERN.find_iter(line) {
            let url = candidate.as_str();
            if is_image(url) || !is_download_url(url) {
                continue;
            }

            match found.iter_mut().find(|link| link.url == url) {
                Some(existing) => {
                    if existing.label.is_none() && current_label.is_some() {
                        existing.label = current_label.clone();
                    }
                }
                None => found.push(DescribedLink {
                    url: url.to_string(),
                    host: DownloadHost::classify(url),
                    label: current_label.clone(),
                }),
            }
        }
    }

    found
}
