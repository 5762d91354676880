use std::sync::Arc;

use raven_http::{HttpConfig, HttpError, HttpJsonClient};
use raven_license::{
    CredentialStore, HttpLicenseAuthority, LicenseError, LicenseGate, LicenseGrant,
    SessionIdentity,
};
use raven_settings::{ClientSettings, NetworkSettings};
use raven_staging::ApplyReport;
use raven_updater::{
    DownloadOutcome, HttpReleaseSource, InstallLayout, ReleaseInfo, UpdateSupervisor,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{CLIENT_VERSION, CallbackSender};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid client settings")]
    Settings(#[from] raven_settings::Error),

    #[error("failed to set up the HTTP client")]
    Http(#[from] HttpError),
}

/// Completions delivered to the host through the callback queue.
#[derive(Debug)]
pub enum HostEvent {
    /// No key was stored, the gate waits for the player.
    NoStoredLicense,
    LicenseResolved(Result<LicenseGrant, LicenseError>),
    UpdateChecked(Result<Option<ReleaseInfo>, String>),
    DownloadFinished(Result<DownloadOutcome, String>),
}

pub struct Bootstrap {
    settings: ClientSettings,
    current_version: String,
}

impl Bootstrap {
    pub fn new(settings: ClientSettings) -> Self {
        let current_version = settings
            .updater
            .current_version
            .clone()
            .unwrap_or_else(|| CLIENT_VERSION.to_string());
        Self {
            settings,
            current_version,
        }
    }

    /// Finish the previous run's staged update, then build the gate and the
    /// supervisor and start their background work.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        self,
        session: SessionIdentity,
        events: CallbackSender<HostEvent>,
    ) -> Result<ClientCore, StartupError> {
        let settings = self.settings;
        let data_dir = settings.paths.resolve_data_dir()?;
        let auto_check = settings.updater.auto_check;
        let install_dir = settings.paths.resolve_install_dir()?;

        let layout = InstallLayout {
            install_dir: install_dir.clone(),
            artifact_prefix: settings.updater.artifact_prefix.clone(),
            package_extension: settings.updater.package_extension.clone(),
            staging_suffix: settings.updater.staging_suffix.clone(),
            rename_marker: settings.updater.rename_marker.clone(),
        };

        // Nothing else may touch the install directory before this.
        let mut markers = layout.markers();
        if settings.updater.sweep_orphaned_staging {
            markers = markers.with_orphan_sweep(&settings.updater.staging_suffix);
        }
        let applied = markers.apply_pending();

        let http = HttpJsonClient::new(&http_config(&settings.network))?;

        let gate = Arc::new(LicenseGate::new(
            Arc::new(HttpLicenseAuthority::new(
                http.clone(),
                &settings.license.endpoint,
            )?),
            CredentialStore::in_dir(&data_dir, &settings.license.credential_file),
            session,
        ));

        let updater = Arc::new(UpdateSupervisor::new(
            Arc::new(HttpReleaseSource::new(
                http,
                &settings.updater.releases_endpoint,
            )?),
            layout,
            self.current_version,
        ));

        info!(
            version = updater.current_version(),
            install_dir = %install_dir.display(),
            "Raven client starting"
        );

        let core = ClientCore {
            gate,
            updater,
            events,
            applied,
        };

        core.spawn_license_initialization();
        if auto_check {
            core.check_for_update();
        } else {
            debug!("automatic update check disabled");
        }

        Ok(core)
    }
}

fn http_config(network: &NetworkSettings) -> HttpConfig {
    HttpConfig {
        connect_timeout: network.connect_timeout,
        read_timeout: network.read_timeout,
        request_timeout: network.request_timeout,
        download_read_timeout: network.download_read_timeout,
        user_agent: network.user_agent.clone(),
    }
}

/// The running gate and supervisor, plus the host-facing operations that
/// start background work.
pub struct ClientCore {
    gate: Arc<LicenseGate>,
    updater: Arc<UpdateSupervisor>,
    events: CallbackSender<HostEvent>,
    applied: ApplyReport,
}

impl ClientCore {
    pub fn gate(&self) -> &Arc<LicenseGate> {
        &self.gate
    }

    pub fn updater(&self) -> &Arc<UpdateSupervisor> {
        &self.updater
    }

    /// What the start-up pass over the staging markers did.
    pub fn applied_update(&self) -> &ApplyReport {
        &self.applied
    }

    fn spawn_license_initialization(&self) {
        let gate = self.gate.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match gate.initialize().await {
                Some(outcome) => HostEvent::LicenseResolved(outcome),
                None => HostEvent::NoStoredLicense,
            };
            events.send(event);
        });
    }

    /// Validate a key typed by the player. The outcome arrives as
    /// [`HostEvent::LicenseResolved`].
    pub fn submit_key(&self, key: impl Into<String>) {
        let key = key.into();
        let gate = self.gate.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = gate.validate(&key).await;
            if matches!(outcome, Err(LicenseError::Superseded)) {
                return;
            }
            events.send(HostEvent::LicenseResolved(outcome));
        });
    }

    pub fn check_for_update(&self) {
        let updater = self.updater.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = updater
                .check_for_update()
                .await
                .map_err(|err| err.to_string());
            events.send(HostEvent::UpdateChecked(outcome));
        });
    }

    /// Start downloading the available update, as approved by the player.
    pub fn approve_download(&self) {
        let updater = self.updater.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = updater.download_update().await;
            if let Err(err) = &outcome {
                warn!("Update download failed: {}", err);
            }
            events.send(HostEvent::DownloadFinished(
                outcome.map_err(|err| err.to_string()),
            ));
        });
    }
}
