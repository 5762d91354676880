use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    CredentialError, CredentialStore, HardwareFingerprint, LicenseAuthority, LicenseError,
    ValidationRequest, ValidationResponse,
};

const DEFAULT_REJECTION: &str = "Invalid license key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unvalidated,
    Validating,
    Validated,
    Rejected,
}

/// Who is asking. Sent with every validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub display_name: String,
    pub fingerprint: HardwareFingerprint,
}

impl SessionIdentity {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            fingerprint: HardwareFingerprint::current(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseRecord {
    pub key: Option<String>,
    pub validated: bool,
    pub username: Option<String>,
    pub external_id: Option<String>,
    pub last_error: Option<String>,
}

/// What a successful validation hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseGrant {
    pub username: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub state: GateState,
    pub record: LicenseRecord,
    pub rejection: Option<LicenseError>,
}

impl Default for GateSnapshot {
    fn default() -> Self {
        Self {
            state: GateState::Unvalidated,
            record: LicenseRecord::default(),
            rejection: None,
        }
    }
}

impl GateSnapshot {
    fn grant(&self) -> Option<LicenseGrant> {
        (self.state == GateState::Validated).then(|| LicenseGrant {
            username: self.record.username.clone(),
            external_id: self.record.external_id.clone(),
        })
    }
}

/// Blocks normal startup until the license service confirms the key.
///
/// Every attempt takes a fresh number from `attempt`; only the newest attempt
/// may write state, and nothing may overwrite `Validated`.
pub struct LicenseGate {
    authority: Arc<dyn LicenseAuthority>,
    credentials: CredentialStore,
    identity: SessionIdentity,
    state_tx: watch::Sender<GateSnapshot>,
    attempt: AtomicU64,
}

impl LicenseGate {
    pub fn new(
        authority: Arc<dyn LicenseAuthority>,
        credentials: CredentialStore,
        identity: SessionIdentity,
    ) -> Self {
        let (state_tx, _) = watch::channel(GateSnapshot::default());
        Self {
            authority,
            credentials,
            identity,
            state_tx,
            attempt: AtomicU64::new(0),
        }
    }

    /// Validate the stored key, if there is one. `None` means no key was
    /// stored and the gate stays `Unvalidated`.
    pub async fn initialize(&self) -> Option<Result<LicenseGrant, LicenseError>> {
        let stored = match self.credentials.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!("Could not read stored license key: {}", err);
                None
            }
        };

        let Some(key) = stored else {
            debug!("No stored license key");
            return None;
        };

        info!("Found stored license key, validating");
        Some(self.validate(&key).await)
    }

    #[instrument(skip_all, fields(user = %self.identity.display_name))]
    pub async fn validate(&self, key: &str) -> Result<LicenseGrant, LicenseError> {
        if let Some(grant) = self.state_tx.borrow().grant() {
            return Ok(grant);
        }

        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let key = key.trim();

        if key.is_empty() {
            return self.reject(attempt, None, LicenseError::EmptyKey);
        }

        self.update_if_current(attempt, |snapshot| {
            snapshot.state = GateState::Validating;
            snapshot.record.key = Some(key.to_string());
            snapshot.record.validated = false;
            snapshot.record.last_error = None;
            snapshot.rejection = None;
        });

        let request = ValidationRequest {
            key: key.to_string(),
            username: self.identity.display_name.clone(),
            hwid: self.identity.fingerprint.to_string(),
        };

        match self.authority.validate(&request).await {
            Ok(response) if response.valid => self.accept(attempt, key, response),
            Ok(response) => {
                let reason = response
                    .error
                    .filter(|reason| !reason.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
                self.reject(attempt, Some(key), LicenseError::ServerRejected(reason))
            }
            Err(err) => {
                warn!("License validation request failed: {}", err);
                self.reject(attempt, Some(key), err.into())
            }
        }
    }

    fn accept(
        &self,
        attempt: u64,
        key: &str,
        response: ValidationResponse,
    ) -> Result<LicenseGrant, LicenseError> {
        let grant = LicenseGrant {
            username: response.username,
            external_id: response.discord_id,
        };

        let applied = self.update_if_current(attempt, |snapshot| {
            snapshot.state = GateState::Validated;
            snapshot.record = LicenseRecord {
                key: Some(key.to_string()),
                validated: true,
                username: grant.username.clone(),
                external_id: grant.external_id.clone(),
                last_error: None,
            };
            snapshot.rejection = None;
        });
        if !applied {
            debug!(attempt, "discarding superseded validation result");
            return Err(LicenseError::Superseded);
        }

        if let Err(err) = self.credentials.store(key) {
            warn!("License validated but the key could not be saved: {}", err);
        }
        info!(
            "License validated for: {}",
            grant.username.as_deref().unwrap_or("<unknown>")
        );
        Ok(grant)
    }

    fn reject(
        &self,
        attempt: u64,
        key: Option<&str>,
        err: LicenseError,
    ) -> Result<LicenseGrant, LicenseError> {
        let applied = self.update_if_current(attempt, |snapshot| {
            snapshot.state = GateState::Rejected;
            snapshot.record.key = key.map(str::to_owned);
            snapshot.record.validated = false;
            snapshot.record.last_error = Some(err.to_string());
            snapshot.rejection = Some(err.clone());
        });
        if !applied {
            debug!(attempt, "discarding superseded validation result");
            return Err(LicenseError::Superseded);
        }

        info!("License rejected: {}", err);
        Err(err)
    }

    /// Apply `update` unless a newer attempt has started or the gate is
    /// already validated. Returns whether it was applied.
    fn update_if_current(&self, attempt: u64, update: impl FnOnce(&mut GateSnapshot)) -> bool {
        self.state_tx.send_if_modified(|snapshot| {
            if snapshot.state == GateState::Validated
                || self.attempt.load(Ordering::SeqCst) != attempt
            {
                return false;
            }
            update(snapshot);
            true
        })
    }

    /// Remove the stored key from disk. A grant already held by this process
    /// stays in force.
    pub fn forget_stored_key(&self) -> Result<bool, CredentialError> {
        let removed = self.credentials.clear()?;
        if removed {
            info!("Stored license key removed");
        }
        Ok(removed)
    }

    pub fn is_validated(&self) -> bool {
        self.state_tx.borrow().state == GateState::Validated
    }

    /// Reason of the latest rejection, while the gate is rejected.
    pub fn rejection_reason(&self) -> Option<String> {
        let snapshot = self.state_tx.borrow();
        match snapshot.state {
            GateState::Rejected => snapshot.record.last_error.clone(),
            _ => None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state_tx.borrow().state
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn record(&self) -> LicenseRecord {
        self.state_tx.borrow().record.clone()
    }

    pub fn licensed_username(&self) -> Option<String> {
        self.state_tx.borrow().record.username.clone()
    }

    pub fn external_id(&self) -> Option<String> {
        self.state_tx.borrow().record.external_id.clone()
    }

    /// Key currently on disk, if any.
    pub fn stored_key(&self) -> Option<String> {
        self.credentials.load().ok().flatten()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.state_tx.subscribe()
    }
}
