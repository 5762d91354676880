mod error;
mod layout;
mod release;
mod source;
mod state;
mod supervisor;
pub mod version;

pub use error::{Result, UpdateError};
pub use layout::InstallLayout;
pub use release::{GitHubAsset, GitHubRelease, ReleaseInfo};
pub use source::{HttpReleaseSource, ReleaseSource};
pub use state::{DownloadState, DownloadStatus, StagedUpdate, UpdateSnapshot, UpdateStatus};
pub use supervisor::{DownloadOutcome, UpdateSupervisor};
