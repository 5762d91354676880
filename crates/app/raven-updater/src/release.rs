use serde::Deserialize;

use crate::version::{is_file_safe, is_newer, normalize_tag};

/// The parts of a GitHub `releases/latest` document the updater reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Result of one release check. Replaced wholesale by the next check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub artifact_url: Option<String>,
    pub artifact_name: Option<String>,
    pub notes: Option<String>,
    pub is_newer_than_current: bool,
}

impl ReleaseInfo {
    /// Pick the first asset ending in `package_extension` and compare the tag
    /// against `current_version`.
    pub fn from_release(
        release: &GitHubRelease,
        current_version: &str,
        package_extension: &str,
    ) -> Self {
        let version = normalize_tag(release.tag_name.trim()).to_string();
        let artifact = release
            .assets
            .iter()
            .find(|asset| asset.name.ends_with(package_extension));

        Self {
            is_newer_than_current: is_newer(&version, current_version),
            version,
            artifact_url: artifact.map(|asset| asset.browser_download_url.clone()),
            artifact_name: artifact.map(|asset| asset.name.clone()),
            notes: release.body.clone().filter(|notes| !notes.trim().is_empty()),
        }
    }

    /// Newer than what is running, downloadable, and with a version that can
    /// name a file in the install directory.
    pub fn is_actionable(&self) -> bool {
        self.is_newer_than_current && self.artifact_url.is_some() && self.has_usable_version()
    }

    /// The version goes into staged and installed file names, so it must not
    /// contain path separators or `..`.
    pub fn has_usable_version(&self) -> bool {
        is_file_safe(&self.version)
    }
}
