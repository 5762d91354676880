use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::StreamExt;
use raven_staging::DeleteMarker;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    DownloadState, DownloadStatus, InstallLayout, ReleaseInfo, ReleaseSource, Result,
    StagedUpdate, UpdateError, UpdateSnapshot, UpdateStatus,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Staged(StagedUpdate),
    /// Another download is in progress; this call did nothing.
    AlreadyRunning,
    /// An update is already staged for the next start.
    AlreadyStaged,
}

/// Checks for newer releases, downloads them and stages them for the next
/// start.
///
/// Overlapping checks are numbered; a result is applied only if no check that
/// started later has already been applied. Downloads are serialised by
/// `downloading`.
pub struct UpdateSupervisor {
    source: Arc<dyn ReleaseSource>,
    layout: InstallLayout,
    current_version: String,
    state_tx: watch::Sender<UpdateSnapshot>,
    check_seq: AtomicU64,
    applied_check: AtomicU64,
    downloading: AtomicBool,
}

struct DownloadGuard<'a>(&'a AtomicBool);

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UpdateSupervisor {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        layout: InstallLayout,
        current_version: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(UpdateSnapshot::default());
        Self {
            source,
            layout,
            current_version: current_version.into(),
            state_tx,
            check_seq: AtomicU64::new(0),
            applied_check: AtomicU64::new(0),
            downloading: AtomicBool::new(false),
        }
    }

    /// Ask the release service for the latest release.
    ///
    /// `Ok(None)` means nothing is published. Failures are recorded in the
    /// snapshot and leave the previous release untouched.
    #[instrument(skip(self), fields(current = %self.current_version))]
    pub async fn check_for_update(&self) -> Result<Option<ReleaseInfo>> {
        if self.state_tx.borrow().is_download_locked() {
            debug!("download in progress or staged, skipping release check");
            return Ok(self.release());
        }

        let seq = self.check_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state_tx.send_if_modified(|snapshot| {
            if snapshot.is_download_locked() {
                return false;
            }
            snapshot.status = UpdateStatus::Checking;
            true
        });

        info!("Checking for updates...");
        let fetched = self.source.latest_release().await;

        match fetched {
            Ok(release) => {
                let info = release.map(|release| {
                    ReleaseInfo::from_release(
                        &release,
                        &self.current_version,
                        &self.layout.package_extension,
                    )
                });
                let status = match &info {
                    Some(info) if info.is_actionable() => UpdateStatus::UpdateAvailable,
                    _ => UpdateStatus::UpToDate,
                };

                let applied = self.apply_check(seq, |snapshot| {
                    snapshot.status = status;
                    snapshot.release = info.clone();
                    snapshot.last_error = None;
                });

                if applied {
                    match &info {
                        Some(info) if status == UpdateStatus::UpdateAvailable => info!(
                            "Update available! Current: {}, Latest: {}",
                            self.current_version, info.version
                        ),
                        Some(info) if info.is_newer_than_current && !info.has_usable_version() => {
                            warn!("Ignoring release with unusable version {:?}", info.version)
                        }
                        Some(info) if info.is_newer_than_current => {
                            warn!("Release {} has no downloadable artifact", info.version)
                        }
                        Some(_) => info!(
                            "You are running the latest version ({})",
                            self.current_version
                        ),
                        None => info!("No releases published"),
                    }
                }
                Ok(info)
            }
            Err(err) => {
                let err = UpdateError::from(err);
                warn!("Error checking for updates: {}", err);
                let message = err.to_string();
                self.apply_check(seq, |snapshot| {
                    snapshot.status = match &snapshot.release {
                        Some(info) if info.is_actionable() => UpdateStatus::UpdateAvailable,
                        Some(_) => UpdateStatus::UpToDate,
                        None => UpdateStatus::Idle,
                    };
                    snapshot.last_error = Some(message);
                });
                Err(err)
            }
        }
    }

    fn apply_check(&self, seq: u64, update: impl FnOnce(&mut UpdateSnapshot)) -> bool {
        self.state_tx.send_if_modified(|snapshot| {
            if snapshot.is_download_locked() || self.applied_check.load(Ordering::SeqCst) > seq {
                debug!(seq, "discarding stale release check");
                return false;
            }
            self.applied_check.store(seq, Ordering::SeqCst);
            snapshot.check_complete = true;
            update(snapshot);
            true
        })
    }

    /// Download the latest release's artifact and stage it for the next start.
    #[instrument(skip(self))]
    pub async fn download_update(&self) -> Result<DownloadOutcome> {
        if self
            .downloading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("download already running");
            return Ok(DownloadOutcome::AlreadyRunning);
        }
        let _guard = DownloadGuard(&self.downloading);

        let target = {
            let snapshot = self.state_tx.borrow();
            if snapshot.status == UpdateStatus::Staged {
                return Ok(DownloadOutcome::AlreadyStaged);
            }
            snapshot
                .release
                .as_ref()
                .filter(|release| release.is_actionable())
                .and_then(|release| {
                    release
                        .artifact_url
                        .clone()
                        .map(|url| (release.version.clone(), url))
                })
        };
        let Some((version, url)) = target else {
            error!("No newer release with a download URL available");
            return Err(UpdateError::NoArtifact);
        };

        self.state_tx.send_modify(|snapshot| {
            snapshot.status = UpdateStatus::Downloading;
            snapshot.download = DownloadState {
                status: DownloadStatus::Running,
                bytes_total: None,
                bytes_received: 0,
            };
            snapshot.last_error = None;
        });

        match self.download_and_stage(&version, &url).await {
            Ok(staged) => {
                info!(
                    "Update {} downloaded successfully, restart to apply",
                    staged.version
                );
                self.state_tx.send_modify(|snapshot| {
                    snapshot.status = UpdateStatus::Staged;
                    snapshot.download.status = DownloadStatus::Complete;
                    snapshot.staged = Some(staged.clone());
                });
                Ok(DownloadOutcome::Staged(staged))
            }
            Err(err) => {
                error!("Error downloading update: {}", err);
                let message = err.to_string();
                self.state_tx.send_modify(|snapshot| {
                    snapshot.status = UpdateStatus::DownloadFailed;
                    snapshot.download.status = DownloadStatus::Failed;
                    snapshot.last_error = Some(message);
                });
                Err(err)
            }
        }
    }

    async fn download_and_stage(&self, version: &str, url: &str) -> Result<StagedUpdate> {
        let staged_path = self.layout.staged_path(version);
        let final_path = self.layout.final_path(version);

        info!("Downloading update from: {}", url);
        let stream = self.source.open_artifact(url).await?;
        let expected = stream.content_length;
        self.state_tx
            .send_modify(|snapshot| snapshot.download.bytes_total = expected);

        tokio::fs::create_dir_all(self.layout.install_dir())
            .await
            .map_err(|e| UpdateError::io("create", self.layout.install_dir(), e))?;
        let mut file = tokio::fs::File::create(&staged_path)
            .await
            .map_err(|e| UpdateError::io("create", &staged_path, e))?;

        let mut chunks = stream.chunks;
        let mut received: u64 = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::io("write", &staged_path, e))?;
            received += chunk.len() as u64;
            self.state_tx
                .send_modify(|snapshot| snapshot.download.bytes_received = received);
        }

        file.flush()
            .await
            .map_err(|e| UpdateError::io("flush", &staged_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| UpdateError::io("sync", &staged_path, e))?;
        drop(file);

        if let Some(expected) = expected
            && expected != received
        {
            return Err(UpdateError::PartialDownload { expected, received });
        }
        debug!(bytes = received, path = %staged_path.display(), "artifact downloaded");

        let replaces = self.write_markers(&staged_path, &final_path)?;

        Ok(StagedUpdate {
            version: version.to_string(),
            staged_path,
            final_path,
            replaces,
        })
    }

    /// Mark every installed artifact for deletion, then the staged file for
    /// installation. If the rename marker cannot be written the delete markers
    /// are withdrawn, so nothing is removed without a replacement.
    fn write_markers(&self, staged: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
        let markers = self.layout.markers();
        let installed = raven_fs::list_files(self.layout.install_dir(), false, |name| {
            self.layout.is_own_artifact(name)
        })
        .map_err(|e| UpdateError::Scan {
            dir: self.layout.install_dir().to_path_buf(),
            reason: format!("{e:#}"),
        })?;

        let mut written: Vec<DeleteMarker> = Vec::with_capacity(installed.len());
        let rollback = |written: &[DeleteMarker]| {
            for marker in written {
                if let Err(err) = markers.discard(&marker.marker) {
                    warn!("Failed to withdraw delete marker: {}", err);
                }
            }
        };

        for artifact in &installed {
            match markers.mark_for_deletion(artifact) {
                Ok(marker) => written.push(marker),
                Err(err) => {
                    rollback(&written);
                    return Err(err.into());
                }
            }
        }

        if let Err(err) = markers.mark_for_rename(staged, destination) {
            rollback(&written);
            return Err(err.into());
        }

        Ok(written.into_iter().map(|marker| marker.target).collect())
    }

    pub fn snapshot(&self) -> UpdateSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UpdateSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn status(&self) -> UpdateStatus {
        self.state_tx.borrow().status
    }

    pub fn is_update_available(&self) -> bool {
        self.state_tx.borrow().is_update_available()
    }

    pub fn is_check_complete(&self) -> bool {
        self.state_tx.borrow().check_complete
    }

    pub fn is_downloading(&self) -> bool {
        self.state_tx.borrow().status == UpdateStatus::Downloading
    }

    pub fn download_progress_percent(&self) -> u8 {
        self.state_tx.borrow().download.percent()
    }

    pub fn download_state(&self) -> DownloadState {
        self.state_tx.borrow().download.clone()
    }

    pub fn release(&self) -> Option<ReleaseInfo> {
        self.state_tx.borrow().release.clone()
    }

    pub fn latest_version(&self) -> Option<String> {
        self.state_tx
            .borrow()
            .release
            .as_ref()
            .map(|release| release.version.clone())
    }

    pub fn release_notes(&self) -> Option<String> {
        self.state_tx
            .borrow()
            .release
            .as_ref()
            .and_then(|release| release.notes.clone())
    }

    pub fn last_error(&self) -> Option<String> {
        self.state_tx.borrow().last_error.clone()
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::stream;
    use raven_http::{ByteStream, HttpError};
    use tokio::sync::{mpsc, oneshot};

    use super::*;
    use crate::{GitHubAsset, GitHubRelease};

    type Chunks = mpsc::UnboundedReceiver<std::result::Result<Vec<u8>, HttpError>>;

    /// Scripted releases; artifacts are fed chunk by chunk through a channel.
    #[derive(Default)]
    struct FakeSource {
        releases: Mutex<VecDeque<std::result::Result<Option<GitHubRelease>, HttpError>>>,
        artifact: Mutex<Option<(Option<u64>, Chunks)>>,
    }

    impl FakeSource {
        fn with_releases(
            releases: impl IntoIterator<Item = std::result::Result<Option<GitHubRelease>, HttpError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                releases: Mutex::new(releases.into_iter().collect()),
                artifact: Mutex::default(),
            })
        }

        fn feed(
            &self,
            content_length: Option<u64>,
        ) -> mpsc::UnboundedSender<std::result::Result<Vec<u8>, HttpError>> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.artifact.lock().unwrap() = Some((content_length, rx));
            tx
        }
    }

    #[async_trait]
    impl ReleaseSource for FakeSource {
        async fn latest_release(
            &self,
        ) -> std::result::Result<Option<GitHubRelease>, HttpError> {
            self.releases.lock().unwrap().pop_front().unwrap()
        }

        async fn open_artifact(&self, _url: &str) -> std::result::Result<ByteStream, HttpError> {
            let (content_length, rx) = self.artifact.lock().unwrap().take().unwrap();
            let chunks = stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            })
            .boxed();
            Ok(ByteStream {
                content_length,
                chunks,
            })
        }
    }

    /// Each `latest_release` call waits for the next sender handed out by
    /// `hold`, in call order.
    struct HeldSource {
        pending: Mutex<VecDeque<oneshot::Receiver<ReleaseReply>>>,
        calls: watch::Sender<usize>,
    }

    type ReleaseReply = std::result::Result<Option<GitHubRelease>, HttpError>;

    impl HeldSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                pending: Mutex::default(),
                calls: watch::channel(0).0,
            })
        }

        fn hold(&self) -> oneshot::Sender<ReleaseReply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push_back(rx);
            tx
        }

        async fn wait_for_calls(&self, count: usize) {
            self.calls
                .subscribe()
                .wait_for(|calls| *calls >= count)
                .await
                .unwrap();
        }
    }

    #[async_trait]
    impl ReleaseSource for HeldSource {
        async fn latest_release(&self) -> ReleaseReply {
            let reply = self.pending.lock().unwrap().pop_front().unwrap();
            self.calls.send_modify(|calls| *calls += 1);
            reply.await.unwrap()
        }

        async fn open_artifact(&self, _url: &str) -> std::result::Result<ByteStream, HttpError> {
            unreachable!("checks only")
        }
    }

    fn release(tag: &str) -> GitHubRelease {
        GitHubRelease {
            tag_name: tag.to_string(),
            body: Some("Bug fixes".to_string()),
            assets: vec![GitHubAsset {
                name: format!("RavenClient-{tag}.jar"),
                browser_download_url: "https://dl.example/RavenClient.jar".to_string(),
            }],
        }
    }

    fn layout(dir: &Path) -> InstallLayout {
        InstallLayout {
            install_dir: dir.to_path_buf(),
            artifact_prefix: "RavenClient".into(),
            package_extension: ".jar".into(),
            staging_suffix: ".update".into(),
            rename_marker: "ravenclient_update.marker".into(),
        }
    }

    fn status_error() -> HttpError {
        HttpError::Status {
            url: "https://api.example/releases/latest".into(),
            status: 500,
        }
    }

    #[tokio::test]
    async fn newer_tag_makes_an_update_available() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source, layout(dir.path()), "1.0");

        let info = supervisor.check_for_update().await.unwrap().unwrap();

        assert!(info.is_newer_than_current);
        assert!(supervisor.is_update_available());
        assert!(supervisor.is_check_complete());
        assert_eq!(supervisor.status(), UpdateStatus::UpdateAvailable);
        assert_eq!(supervisor.latest_version().as_deref(), Some("2.0"));
        assert_eq!(supervisor.release_notes().as_deref(), Some("Bug fixes"));
    }

    #[tokio::test]
    async fn missing_release_or_artifact_is_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut bare = release("v3.0");
        bare.assets.clear();
        let source = FakeSource::with_releases([Ok(None), Ok(Some(bare))]);
        let supervisor = UpdateSupervisor::new(source, layout(dir.path()), "1.0");

        assert_eq!(supervisor.check_for_update().await.unwrap(), None);
        assert_eq!(supervisor.status(), UpdateStatus::UpToDate);

        supervisor.check_for_update().await.unwrap();
        assert_eq!(supervisor.status(), UpdateStatus::UpToDate);
        assert!(!supervisor.is_update_available());
        assert_eq!(supervisor.last_error(), None);
    }

    #[tokio::test]
    async fn failed_check_keeps_the_previous_release() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::with_releases([Ok(Some(release("v2.0"))), Err(status_error())]);
        let supervisor = UpdateSupervisor::new(source, layout(dir.path()), "1.0");

        supervisor.check_for_update().await.unwrap();
        let err = supervisor.check_for_update().await.unwrap_err();

        assert!(matches!(err, UpdateError::Transport(_)));
        assert_eq!(supervisor.latest_version().as_deref(), Some("2.0"));
        assert!(supervisor.is_update_available());
        assert!(supervisor.last_error().is_some());
    }

    #[tokio::test]
    async fn download_without_artifact_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::with_releases([]);
        let supervisor = UpdateSupervisor::new(source, layout(dir.path()), "1.0");

        let err = supervisor.download_update().await.unwrap_err();

        assert!(matches!(err, UpdateError::NoArtifact));
        assert_eq!(supervisor.status(), UpdateStatus::Idle);
    }

    #[tokio::test]
    async fn download_reports_progress_and_stages_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("RavenClient-1.0.jar"), b"old").unwrap();
        std::fs::write(dir.path().join("OptiFine.jar"), b"other").unwrap();

        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = Arc::new(UpdateSupervisor::new(
            source.clone(),
            layout(dir.path()),
            "1.0",
        ));
        supervisor.check_for_update().await.unwrap();

        let tx = source.feed(Some(1000));
        let mut rx = supervisor.subscribe();
        let download = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.download_update().await }
        });

        let mut percentages = Vec::new();
        for step in 1..=4u64 {
            tx.send(Ok(vec![7u8; 250])).unwrap();
            let snapshot = rx
                .wait_for(|s| s.download.bytes_received == step * 250)
                .await
                .unwrap()
                .clone();
            percentages.push(snapshot.download.percent());
        }
        assert_eq!(percentages, vec![25, 50, 75, 100]);
        assert!(supervisor.is_downloading());
        assert_eq!(
            supervisor.download_update().await.unwrap(),
            DownloadOutcome::AlreadyRunning
        );
        drop(tx);

        let DownloadOutcome::Staged(staged) = download.await.unwrap().unwrap() else {
            panic!("expected a staged update");
        };

        assert_eq!(supervisor.status(), UpdateStatus::Staged);
        assert_eq!(supervisor.download_state().status, DownloadStatus::Complete);
        assert_eq!(std::fs::read(&staged.staged_path).unwrap().len(), 1000);
        assert_eq!(staged.final_path, dir.path().join("RavenClient-2.0.jar"));
        assert_eq!(staged.replaces, vec![dir.path().join("RavenClient-1.0.jar")]);

        assert!(dir.path().join("RavenClient-1.0.jar.delete").exists());
        assert!(!dir.path().join("OptiFine.jar.delete").exists());
        let marker =
            std::fs::read_to_string(dir.path().join("ravenclient_update.marker")).unwrap();
        let lines: Vec<&str> = marker.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("RavenClient-2.0.jar.update"));
        assert!(lines[1].ends_with("RavenClient-2.0.jar"));

        assert_eq!(
            supervisor.download_update().await.unwrap(),
            DownloadOutcome::AlreadyStaged
        );
    }

    #[tokio::test]
    async fn staged_update_is_installed_by_the_next_start() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("RavenClient-1.0.jar"), b"old").unwrap();

        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source.clone(), layout(dir.path()), "1.0");
        supervisor.check_for_update().await.unwrap();

        let tx = source.feed(None);
        tx.send(Ok(b"new".to_vec())).unwrap();
        drop(tx);
        supervisor.download_update().await.unwrap();

        let report = layout(dir.path()).markers().apply_pending();

        assert!(report.errors.is_empty());
        assert!(!dir.path().join("RavenClient-1.0.jar").exists());
        assert_eq!(
            std::fs::read(dir.path().join("RavenClient-2.0.jar")).unwrap(),
            b"new"
        );
    }

    #[tokio::test]
    async fn short_body_fails_without_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("RavenClient-1.0.jar"), b"old").unwrap();

        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source.clone(), layout(dir.path()), "1.0");
        supervisor.check_for_update().await.unwrap();

        let tx = source.feed(Some(1000));
        tx.send(Ok(vec![0u8; 400])).unwrap();
        drop(tx);

        let err = supervisor.download_update().await.unwrap_err();

        assert!(matches!(
            err,
            UpdateError::PartialDownload {
                expected: 1000,
                received: 400
            }
        ));
        assert_eq!(supervisor.status(), UpdateStatus::DownloadFailed);
        assert!(supervisor.is_update_available());
        assert!(supervisor.last_error().is_some());
        assert!(!dir.path().join("RavenClient-1.0.jar.delete").exists());
        assert!(!dir.path().join("ravenclient_update.marker").exists());
        assert!(dir.path().join("RavenClient-2.0.jar.update").exists());
    }

    #[tokio::test]
    async fn failed_download_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source.clone(), layout(dir.path()), "1.0");
        supervisor.check_for_update().await.unwrap();

        let tx = source.feed(None);
        tx.send(Err(status_error())).unwrap();
        drop(tx);
        supervisor.download_update().await.unwrap_err();
        assert_eq!(supervisor.download_state().status, DownloadStatus::Failed);

        let tx = source.feed(Some(3));
        tx.send(Ok(b"jar".to_vec())).unwrap();
        drop(tx);
        let outcome = supervisor.download_update().await.unwrap();

        assert!(matches!(outcome, DownloadOutcome::Staged(_)));
        assert_eq!(supervisor.download_progress_percent(), 100);
    }

    #[tokio::test]
    async fn rename_marker_failure_withdraws_delete_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("RavenClient-1.0.jar"), b"old").unwrap();
        // A directory where the rename marker belongs makes the write fail.
        std::fs::create_dir(dir.path().join("ravenclient_update.marker")).unwrap();

        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source.clone(), layout(dir.path()), "1.0");
        supervisor.check_for_update().await.unwrap();

        let tx = source.feed(None);
        tx.send(Ok(b"new".to_vec())).unwrap();
        drop(tx);
        let err = supervisor.download_update().await.unwrap_err();

        assert!(matches!(err, UpdateError::Staging(_)));
        assert!(!dir.path().join("RavenClient-1.0.jar.delete").exists());
        assert!(dir.path().join("RavenClient-1.0.jar").exists());
    }

    #[tokio::test]
    async fn checks_are_skipped_once_staged() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source.clone(), layout(dir.path()), "1.0");
        supervisor.check_for_update().await.unwrap();

        let tx = source.feed(None);
        drop(tx);
        supervisor.download_update().await.unwrap();

        // The script is exhausted, so a network call would panic.
        let info = supervisor.check_for_update().await.unwrap().unwrap();
        assert_eq!(info.version, "2.0");
        assert_eq!(supervisor.status(), UpdateStatus::Staged);
    }

    #[tokio::test]
    async fn older_release_is_never_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("RavenClient-3.0.jar"), b"current").unwrap();

        // No artifact is fed: opening one would panic.
        let source = FakeSource::with_releases([Ok(Some(release("v2.0")))]);
        let supervisor = UpdateSupervisor::new(source, layout(dir.path()), "3.0");
        supervisor.check_for_update().await.unwrap();
        assert_eq!(supervisor.status(), UpdateStatus::UpToDate);

        let err = supervisor.download_update().await.unwrap_err();

        assert!(matches!(err, UpdateError::NoArtifact));
        assert_eq!(supervisor.status(), UpdateStatus::UpToDate);
        assert!(dir.path().join("RavenClient-3.0.jar").exists());
        assert!(!dir.path().join("RavenClient-3.0.jar.delete").exists());
        assert!(!dir.path().join("ravenclient_update.marker").exists());
        assert!(!dir.path().join("RavenClient-2.0.jar.update").exists());
    }

    #[tokio::test]
    async fn tag_with_path_separator_is_not_offered() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::with_releases([Ok(Some(release("v2.0/hotfix")))]);
        let supervisor = UpdateSupervisor::new(source, layout(dir.path()), "1.0");

        let info = supervisor.check_for_update().await.unwrap().unwrap();

        assert!(!info.is_actionable());
        assert_eq!(supervisor.status(), UpdateStatus::UpToDate);
        assert!(!supervisor.is_update_available());
        assert!(matches!(
            supervisor.download_update().await.unwrap_err(),
            UpdateError::NoArtifact
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn newer_check_wins_when_it_finishes_first() {
        let dir = tempfile::tempdir().unwrap();
        let source = HeldSource::new();
        let first = source.hold();
        let second = source.hold();
        let supervisor = Arc::new(UpdateSupervisor::new(
            source.clone(),
            layout(dir.path()),
            "1.0",
        ));

        let older = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.check_for_update().await }
        });
        source.wait_for_calls(1).await;
        let newer = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.check_for_update().await }
        });
        source.wait_for_calls(2).await;

        second.send(Ok(Some(release("v3.0")))).unwrap();
        newer.await.unwrap().unwrap();
        first.send(Ok(Some(release("v2.0")))).unwrap();
        older.await.unwrap().unwrap();

        assert_eq!(supervisor.latest_version().as_deref(), Some("3.0"));
        assert_eq!(supervisor.status(), UpdateStatus::UpdateAvailable);
    }

    #[tokio::test]
    async fn newer_check_replaces_an_older_one_finishing_first() {
        let dir = tempfile::tempdir().unwrap();
        let source = HeldSource::new();
        let first = source.hold();
        let second = source.hold();
        let supervisor = Arc::new(UpdateSupervisor::new(
            source.clone(),
            layout(dir.path()),
            "1.0",
        ));

        let older = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.check_for_update().await }
        });
        source.wait_for_calls(1).await;
        let newer = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.check_for_update().await }
        });
        source.wait_for_calls(2).await;

        first.send(Ok(Some(release("v2.0")))).unwrap();
        older.await.unwrap().unwrap();
        assert_eq!(supervisor.status(), UpdateStatus::UpdateAvailable);

        second.send(Ok(Some(release("v1.0")))).unwrap();
        newer.await.unwrap().unwrap();

        assert_eq!(supervisor.latest_version().as_deref(), Some("1.0"));
        assert_eq!(supervisor.status(), UpdateStatus::UpToDate);
        assert!(!supervisor.is_update_available());
    }
}
