use std::fmt;

use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 16;

/// Machine attributes folded into the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineAttributes {
    pub platform: String,
    pub arch: String,
    pub account: String,
    pub home: String,
}

impl MachineAttributes {
    pub fn detect() -> Self {
        let account = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let home = dirs::home_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        Self {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            account,
            home,
        }
    }
}

/// Stable per-machine identifier: the first 16 uppercase hex characters of a
/// SHA-256 over the machine attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareFingerprint(String);

impl HardwareFingerprint {
    pub fn current() -> Self {
        Self::from_attributes(&MachineAttributes::detect())
    }

    pub fn from_attributes(attrs: &MachineAttributes) -> Self {
        let mut hasher = Sha256::new();
        for part in [&attrs.platform, &attrs.arch, &attrs.account, &attrs.home] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let mut digest = hex::encode_upper(hasher.finalize());
        digest.truncate(FINGERPRINT_LEN);
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HardwareFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
