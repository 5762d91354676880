use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DATA_DIR_NAME: &str = "raven-client";
const INSTALL_DIR_NAME: &str = "mods";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PathSettings {
    pub data_dir: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
}

impl PathSettings {
    /// Writable directory for the credential file and logs.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(DATA_DIR_NAME))
            .ok_or(Error::NoConfigDir)
    }

    /// Directory holding the installed package files and staging markers.
    pub fn resolve_install_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.install_dir {
            return Ok(dir.clone());
        }
        Ok(self.resolve_data_dir()?.join(INSTALL_DIR_NAME))
    }
}
