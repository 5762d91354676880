mod authority;
mod credential;
mod error;
mod fingerprint;
mod gate;

pub use authority::{HttpLicenseAuthority, LicenseAuthority, ValidationRequest, ValidationResponse};
pub use credential::{CredentialError, CredentialStore};
pub use error::{LicenseError, RejectionKind};
pub use fingerprint::{HardwareFingerprint, MachineAttributes};
pub use gate::{GateSnapshot, GateState, LicenseGate, LicenseGrant, LicenseRecord, SessionIdentity};
