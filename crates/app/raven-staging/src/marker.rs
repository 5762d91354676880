use std::path::{Path, PathBuf};

use crate::{Result, StagingError};

pub const DELETE_SUFFIX: &str = ".delete";

/// Zero-byte `<target>.delete` file; the target sits next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMarker {
    pub marker: PathBuf,
    pub target: PathBuf,
}

impl DeleteMarker {
    /// Interpret `marker` as a delete marker, or `None` if the name does not
    /// carry the suffix.
    pub fn from_marker_path(marker: &Path) -> Option<Self> {
        let name = marker.file_name()?.to_str()?;
        let target_name = name.strip_suffix(DELETE_SUFFIX)?;
        if target_name.is_empty() {
            return None;
        }
        Some(Self {
            marker: marker.to_path_buf(),
            target: marker.with_file_name(target_name),
        })
    }
}

/// Two-line file: staged absolute path, then final absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameMarker {
    pub marker: PathBuf,
    pub staged: PathBuf,
    pub destination: PathBuf,
}

impl RenameMarker {
    pub(crate) fn parse(marker: &Path, contents: &str) -> Result<Self> {
        let mut lines = contents.lines().map(|line| line.trim_end_matches('\r'));
        let malformed = || StagingError::MalformedMarker {
            path: marker.to_path_buf(),
        };

        let staged = lines.next().filter(|l| !l.is_empty()).ok_or_else(malformed)?;
        let destination = lines.next().filter(|l| !l.is_empty()).ok_or_else(malformed)?;

        Ok(Self {
            marker: marker.to_path_buf(),
            staged: PathBuf::from(staged),
            destination: PathBuf::from(destination),
        })
    }

    pub(crate) fn render(&self) -> String {
        format!(
            "{}\n{}\n",
            self.staged.display(),
            self.destination.display()
        )
    }
}
