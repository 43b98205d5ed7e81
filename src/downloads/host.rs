use serde::{Deserialize, Serialize};

/// Coarse file hosting provider of a download link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadHost {
    Mediafire,
    Mega,
    GoogleDrive,
    #[serde(rename = "onedrive")]
    OneDrive,
    Other,
}

/// Checked in order, first match wins.
const HOST_FRAGMENTS: &[(&str, DownloadHost)] = &[
    ("mediafire.com", DownloadHost::Mediafire),
    ("mega.nz", DownloadHost::Mega),
    ("drive.google.com", DownloadHost::GoogleDrive),
    ("1drv.ms", DownloadHost::OneDrive),
];

impl DownloadHost {
    pub fn classify(url: &str) -> Self {
        let url = url.to_lowercase();
        HOST_FRAGMENTS
            .iter()
            .find(|(fragment, _)| url.contains(fragment))
            .map(|(_, host)| *host)
            .unwrap_or(DownloadHost::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadHost::Mediafire => "mediafire",
            DownloadHost::Mega => "mega",
            DownloadHost::GoogleDrive => "google_drive",
            DownloadHost::OneDrive => "onedrive",
            DownloadHost::Other => "other",
        }
    }
}

impl std::fmt::Display for DownloadHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
