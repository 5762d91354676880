use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Upper bound for a whole metadata or validation request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub download_read_timeout: Duration,
    pub user_agent: String,
}

impl NetworkSettings {
    pub(crate) fn validate(&self) -> Result<()> {
        let timeouts = [
            ("network.connectTimeout", self.connect_timeout),
            ("network.readTimeout", self.read_timeout),
            ("network.requestTimeout", self.request_timeout),
            ("network.downloadReadTimeout", self.download_read_timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(Error::Invalid(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}
