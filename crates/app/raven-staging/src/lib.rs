//! Deferred file operations for replacing the client's own package files.
//!
//! A running client cannot replace the files it was loaded from, so an update
//! is written next to them and recorded with small marker files. The next
//! process start calls [`StagingMarkers::apply_pending`] before anything else
//! touches the install directory: delete markers first, then the single
//! rename marker. Every marker is consumed whether or not its operation
//! succeeded, so a poisoned marker can never cause a retry loop.

mod error;
mod marker;

pub use error::{Result, StagingError};
pub use marker::{DELETE_SUFFIX, DeleteMarker, RenameMarker};

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

/// Markers that are currently waiting for the next start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingMarkers {
    pub deletions: Vec<DeleteMarker>,
    pub rename: Option<RenameMarker>,
}

impl PendingMarkers {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.rename.is_none()
    }
}

/// What one [`StagingMarkers::apply_pending`] pass did.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub deleted: Vec<PathBuf>,
    pub installed: Option<PathBuf>,
    pub swept: Vec<PathBuf>,
    pub markers_consumed: usize,
    pub errors: Vec<StagingError>,
}

impl ApplyReport {
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty()
            && self.installed.is_none()
            && self.swept.is_empty()
            && self.markers_consumed == 0
            && self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StagingMarkers {
    dir: PathBuf,
    rename_marker: String,
    orphan_suffix: Option<String>,
}

impl StagingMarkers {
    /// Markers for files in `dir`; `rename_marker` is the file name of the
    /// single rename marker.
    pub fn new(dir: impl Into<PathBuf>, rename_marker: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            rename_marker: rename_marker.into(),
            orphan_suffix: None,
        }
    }

    /// After markers are applied, remove leftover files ending in
    /// `staging_suffix`. Such files were never paired with a rename marker
    /// (interrupted download) or their rename failed.
    pub fn with_orphan_sweep(mut self, staging_suffix: impl Into<String>) -> Self {
        self.orphan_suffix = Some(staging_suffix.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rename_marker_path(&self) -> PathBuf {
        self.dir.join(&self.rename_marker)
    }

    /// Record that `target` must be removed on the next start.
    pub fn mark_for_deletion(&self, target: &Path) -> Result<DeleteMarker> {
        let name = self.file_name_in_dir(target)?;
        let marker = self.dir.join(format!("{name}{DELETE_SUFFIX}"));

        raven_fs::create_dirs_then_write(&marker, b"")
            .map_err(|e| StagingError::io("write delete marker", &marker, e))?;

        debug!(path = %target.display(), "wrote delete marker");
        Ok(DeleteMarker {
            marker,
            target: self.dir.join(name),
        })
    }

    /// Record that `staged` must be moved to `destination` on the next start.
    /// Replaces any earlier rename marker.
    pub fn mark_for_rename(&self, staged: &Path, destination: &Path) -> Result<RenameMarker> {
        let marker = RenameMarker {
            marker: self.rename_marker_path(),
            staged: absolute(staged)?,
            destination: absolute(destination)?,
        };

        raven_fs::create_dirs_then_write(&marker.marker, marker.render())
            .map_err(|e| StagingError::io("write rename marker", &marker.marker, e))?;

        debug!(
            staged = %marker.staged.display(),
            destination = %marker.destination.display(),
            "wrote rename marker"
        );
        Ok(marker)
    }

    /// Remove a marker written earlier in this process.
    pub fn discard(&self, marker: &Path) -> Result<()> {
        raven_fs::remove_file_if_exists(marker)
            .map(|_| ())
            .map_err(|e| StagingError::io("remove marker", marker, e))
    }

    /// Read-only view of the markers on disk.
    pub fn pending(&self) -> Result<PendingMarkers> {
        let deletions = self
            .list(|name| name.ends_with(DELETE_SUFFIX))?
            .iter()
            .filter_map(|path| DeleteMarker::from_marker_path(path))
            .collect();

        let rename = self.read_rename_marker()?;

        Ok(PendingMarkers { deletions, rename })
    }

    /// Finish whatever a previous process staged. Never fails: problems are
    /// logged, collected in the report, and the marker is consumed anyway.
    pub fn apply_pending(&self) -> ApplyReport {
        let mut report = ApplyReport::default();

        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "no staging directory, nothing to apply");
            return report;
        }

        // Old artifacts go first so a crash before the rename never leaves two
        // versions installed side by side.
        match self.list(|name| name.ends_with(DELETE_SUFFIX)) {
            Ok(markers) => {
                for marker in markers.iter().filter_map(|p| DeleteMarker::from_marker_path(p)) {
                    self.apply_delete(&marker, &mut report);
                }
            }
            Err(err) => {
                error!("Failed to enumerate delete markers: {}", err);
                report.errors.push(err);
            }
        }

        self.apply_rename(&mut report);

        if let Some(suffix) = &self.orphan_suffix {
            self.sweep_orphans(suffix, &mut report);
        }

        if !report.is_noop() {
            info!(
                deleted = report.deleted.len(),
                installed = ?report.installed,
                swept = report.swept.len(),
                errors = report.errors.len(),
                "applied staged update operations"
            );
        }
        report
    }

    fn apply_delete(&self, marker: &DeleteMarker, report: &mut ApplyReport) {
        match raven_fs::remove_file_if_exists(&marker.target) {
            Ok(true) => {
                info!("Deleted old version: {}", marker.target.display());
                report.deleted.push(marker.target.clone());
            }
            Ok(false) => debug!(path = %marker.target.display(), "delete target already gone"),
            Err(e) => {
                error!("Failed to delete {}: {}", marker.target.display(), e);
                report
                    .errors
                    .push(StagingError::io("delete", &marker.target, e));
            }
        }
        self.consume(&marker.marker, report);
    }

    fn apply_rename(&self, report: &mut ApplyReport) {
        let marker_path = self.rename_marker_path();

        match self.read_rename_marker() {
            Ok(None) => return,
            Ok(Some(marker)) => {
                if marker.staged.exists() {
                    // Same-directory rename: the destination is either the old
                    // file or the complete new one, never a partial copy.
                    match fs::rename(&marker.staged, &marker.destination) {
                        Ok(()) => {
                            info!("Applied update: {}", marker.destination.display());
                            report.installed = Some(marker.destination.clone());
                        }
                        Err(e) => {
                            error!(
                                "Failed to move {} to {}: {}",
                                marker.staged.display(),
                                marker.destination.display(),
                                e
                            );
                            report
                                .errors
                                .push(StagingError::io("rename", &marker.staged, e));
                        }
                    }
                } else {
                    warn!(
                        "Staged update {} is missing, discarding rename marker",
                        marker.staged.display()
                    );
                }
            }
            Err(err) => {
                error!("Discarding unreadable rename marker: {}", err);
                report.errors.push(err);
            }
        }

        self.consume(&marker_path, report);
    }

    fn sweep_orphans(&self, suffix: &str, report: &mut ApplyReport) {
        let orphans = match self.list(|name| name.ends_with(suffix)) {
            Ok(orphans) => orphans,
            Err(err) => {
                error!("Failed to enumerate staged files: {}", err);
                report.errors.push(err);
                return;
            }
        };

        for orphan in orphans {
            match raven_fs::remove_file_if_exists(&orphan) {
                Ok(_) => {
                    info!("Removed orphaned staged file: {}", orphan.display());
                    report.swept.push(orphan);
                }
                Err(e) => {
                    warn!("Failed to remove orphaned staged file {}: {}", orphan.display(), e);
                    report.errors.push(StagingError::io("remove", &orphan, e));
                }
            }
        }
    }

    fn consume(&self, marker: &Path, report: &mut ApplyReport) {
        match raven_fs::remove_file_if_exists(marker) {
            Ok(_) => report.markers_consumed += 1,
            Err(e) => {
                error!("Failed to remove marker {}: {}", marker.display(), e);
                report
                    .errors
                    .push(StagingError::io("remove marker", marker, e));
            }
        }
    }

    fn read_rename_marker(&self) -> Result<Option<RenameMarker>> {
        let path = self.rename_marker_path();
        let contents = raven_fs::read_to_string_if_exists(&path).map_err(|e| {
            StagingError::List {
                dir: path.clone(),
                reason: format!("{e:#}"),
            }
        })?;

        contents
            .map(|contents| RenameMarker::parse(&path, &contents))
            .transpose()
    }

    fn list(&self, keep: impl FnMut(&str) -> bool) -> Result<Vec<PathBuf>> {
        raven_fs::list_files(&self.dir, false, keep).map_err(|e| StagingError::List {
            dir: self.dir.clone(),
            reason: format!("{e:#}"),
        })
    }

    fn file_name_in_dir<'a>(&self, target: &'a Path) -> Result<&'a str> {
        let outside = || StagingError::OutsideDirectory {
            path: target.to_path_buf(),
            dir: self.dir.clone(),
        };

        if target.parent() != Some(self.dir.as_path()) {
            return Err(outside());
        }
        target.file_name().and_then(|n| n.to_str()).ok_or_else(outside)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| StagingError::io("resolve", path, e))
}
