use std::path::PathBuf;

use crate::ReleaseInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Idle,
    Checking,
    UpToDate,
    UpdateAvailable,
    Downloading,
    Staged,
    DownloadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadState {
    pub status: DownloadStatus,
    pub bytes_total: Option<u64>,
    pub bytes_received: u64,
}

impl DownloadState {
    /// Integer percentage, clamped to 100. Unknown totals read as 0 until the
    /// download completes.
    pub fn percent(&self) -> u8 {
        if self.status == DownloadStatus::Complete {
            return 100;
        }
        match self.bytes_total {
            Some(total) if total > 0 => (self.bytes_received.saturating_mul(100) / total).min(100) as u8,
            _ => 0,
        }
    }
}

/// A download waiting for the next start to install it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpdate {
    pub version: String,
    pub staged_path: PathBuf,
    pub final_path: PathBuf,
    /// Installed artifacts marked for deletion.
    pub replaces: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSnapshot {
    pub status: UpdateStatus,
    pub release: Option<ReleaseInfo>,
    pub download: DownloadState,
    pub staged: Option<StagedUpdate>,
    pub check_complete: bool,
    pub last_error: Option<String>,
}

impl Default for UpdateSnapshot {
    fn default() -> Self {
        Self {
            status: UpdateStatus::Idle,
            release: None,
            download: DownloadState::default(),
            staged: None,
            check_complete: false,
            last_error: None,
        }
    }
}

impl UpdateSnapshot {
    pub fn is_update_available(&self) -> bool {
        matches!(
            self.status,
            UpdateStatus::UpdateAvailable | UpdateStatus::Downloading | UpdateStatus::DownloadFailed
        )
    }

    pub fn is_download_locked(&self) -> bool {
        matches!(self.status, UpdateStatus::Downloading | UpdateStatus::Staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(received: u64, total: Option<u64>) -> DownloadState {
        DownloadState {
            status: DownloadStatus::Running,
            bytes_total: total,
            bytes_received: received,
        }
    }

    #[test]
    fn percent_is_integer_and_clamped() {
        assert_eq!(running(0, Some(1000)).percent(), 0);
        assert_eq!(running(333, Some(1000)).percent(), 33);
        assert_eq!(running(1000, Some(1000)).percent(), 100);
        assert_eq!(running(1500, Some(1000)).percent(), 100);
    }

    #[test]
    fn unknown_total_reports_zero_until_complete() {
        assert_eq!(running(4096, None).percent(), 0);
        let done = DownloadState {
            status: DownloadStatus::Complete,
            ..running(4096, None)
        };
        assert_eq!(done.percent(), 100);
    }
}
