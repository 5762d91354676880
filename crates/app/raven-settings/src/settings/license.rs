use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSettings {
    /// Base URL of the license service; `validate` is appended to it.
    pub endpoint: String,
    /// File name of the stored key, relative to the data directory.
    pub credential_file: String,
}
