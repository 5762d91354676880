use std::path::{Path, PathBuf};

use raven_staging::StagingMarkers;

/// Naming conventions for package files in the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub install_dir: PathBuf,
    pub artifact_prefix: String,
    pub package_extension: String,
    pub staging_suffix: String,
    pub rename_marker: String,
}

impl InstallLayout {
    /// `<prefix>-<version><ext>`
    pub fn artifact_file_name(&self, version: &str) -> String {
        format!("{}-{}{}", self.artifact_prefix, version, self.package_extension)
    }

    pub fn final_path(&self, version: &str) -> PathBuf {
        self.install_dir.join(self.artifact_file_name(version))
    }

    /// Where a download lands until the next start installs it.
    pub fn staged_path(&self, version: &str) -> PathBuf {
        self.install_dir.join(format!(
            "{}{}",
            self.artifact_file_name(version),
            self.staging_suffix
        ))
    }

    /// Whether `file_name` is an installed package of this application: it
    /// contains the prefix (any case) and ends with the package extension.
    pub fn is_own_artifact(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.package_extension)
            && file_name
                .to_lowercase()
                .contains(&self.artifact_prefix.to_lowercase())
    }

    pub fn markers(&self) -> StagingMarkers {
        StagingMarkers::new(&self.install_dir, &self.rename_marker)
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }
}
