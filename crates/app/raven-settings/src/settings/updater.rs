use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterSettings {
    /// Repository base URL; `releases/latest` is appended to it.
    pub releases_endpoint: String,
    /// Overrides the version compiled into the client.
    pub current_version: Option<String>,
    pub artifact_prefix: String,
    pub package_extension: String,
    pub staging_suffix: String,
    pub rename_marker: String,
    pub auto_check: bool,
    pub sweep_orphaned_staging: bool,
    /// Host ticks to wait after joining a world before announcing an update.
    pub notify_delay_ticks: u32,
}
