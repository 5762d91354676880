use serde::{Deserialize, Serialize};

mod error;
mod json;
mod persistence;
mod settings;

pub use error::{Error, Result};
pub use persistence::{SETTINGS_FILE, default_config_path};
pub use settings::{LicenseSettings, NetworkSettings, PathSettings, UpdaterSettings};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    pub license: LicenseSettings,
    pub updater: UpdaterSettings,
    pub network: NetworkSettings,
    pub paths: PathSettings,
}

impl ClientSettings {
    /// Reject settings that would make the gate or updater misbehave at
    /// runtime rather than fail loudly at startup.
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("license.endpoint", &self.license.endpoint),
            ("updater.releasesEndpoint", &self.updater.releases_endpoint),
        ] {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Invalid(format!("{name} is not a valid URL: {e}")))?;
        }

        if self.license.credential_file.trim().is_empty() {
            return Err(Error::Invalid("license.credentialFile is empty".into()));
        }
        if !self.updater.package_extension.starts_with('.') {
            return Err(Error::Invalid(
                "updater.packageExtension must start with '.'".into(),
            ));
        }
        if self.updater.staging_suffix.is_empty() || self.updater.rename_marker.is_empty() {
            return Err(Error::Invalid(
                "updater.stagingSuffix and updater.renameMarker must not be empty".into(),
            ));
        }
        if self.updater.artifact_prefix.trim().is_empty() {
            return Err(Error::Invalid("updater.artifactPrefix is empty".into()));
        }

        self.network.validate()
    }
}
