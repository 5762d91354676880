use std::path::{Path, PathBuf};

use raven_fs::create_dirs_then_write;
use serde_json::json;
use serde_json_lenient::to_string_pretty;
use tracing::debug;

use crate::{
    ClientSettings, Error, Result,
    json::{json_difference, merge_non_null_json_value},
};

pub(crate) static DEFAULTS: &str = include_str!("../assets/defaults.jsonc");

pub const SETTINGS_FILE: &str = "settings.json";
const CONFIG_DIR_NAME: &str = "raven-client";

impl ClientSettings {
    /// Built-in defaults with no user customisation applied.
    pub fn defaults() -> Result<Self> {
        let settings: serde_json::Value = serde_json_lenient::from_str(DEFAULTS)?;
        Ok(serde_json::from_value(settings)?)
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Like [`ClientSettings::load`] but with an explicit environment lookup.
    pub fn load_with_env(
        config_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if !config_path.exists() {
            create_dirs_then_write(config_path, "{}\n").map_err(|source| Error::Write {
                path: config_path.to_path_buf(),
                source,
            })?;
        }

        let customizations: serde_json::Value =
            serde_json_lenient::from_str(&read_config(config_path)?)?;
        let mut settings: serde_json::Value = serde_json_lenient::from_str(DEFAULTS)?;

        merge_non_null_json_value(customizations, &mut settings);

        let mut client_settings: ClientSettings = serde_json::from_value(settings)?;
        client_settings.apply_env_overrides(env);
        client_settings.validate()?;

        debug!(path = %config_path.display(), "loaded client settings");
        Ok(client_settings)
    }

    pub fn load_from_default_path_creating() -> Result<Self> {
        Self::load(&default_config_path()?)
    }

    /// Save only values that differ from defaults to the config file.
    pub fn save(&self, config_path: &Path) -> Result<()> {
        let current = serde_json::to_value(ClientSettings::load_with_env(config_path, |_| None)?)?;
        let update = serde_json::to_value(self)?;
        let diff = json_difference(current, &update);

        if diff == json!({}) {
            return Ok(());
        }

        let mut customizations: serde_json::Value =
            serde_json_lenient::from_str(&read_config(config_path)?)?;

        merge_non_null_json_value(diff, &mut customizations);
        create_dirs_then_write(config_path, to_string_pretty(&customizations)?).map_err(
            |source| Error::Write {
                path: config_path.to_path_buf(),
                source,
            },
        )?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(url) = env("RAVEN_LICENSE_URL") {
            self.license.endpoint = url;
        }
        if let Some(url) = env("RAVEN_RELEASES_URL") {
            self.updater.releases_endpoint = url;
        }
        if let Some(dir) = env("RAVEN_DATA_DIR") {
            self.paths.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = env("RAVEN_INSTALL_DIR") {
            self.paths.install_dir = Some(PathBuf::from(dir));
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(Error::NoConfigDir)?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE))
}

fn read_config(config_path: &Path) -> Result<String> {
    std::fs::read_to_string(config_path).map_err(|source| Error::Read {
        path: config_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn missing_file_is_created_and_defaults_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = ClientSettings::load_with_env(&path, |_| None).unwrap();

        assert!(path.exists());
        assert_eq!(settings, ClientSettings::defaults().unwrap());
        assert_eq!(settings.network.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.updater.package_extension, ".jar");
    }

    #[test]
    fn customizations_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(
            &path,
            r#"{
                // comments are allowed
                "updater": { "autoCheck": false },
                "network": { "readTimeout": "3s" }
            }"#,
        )
        .unwrap();

        let settings = ClientSettings::load_with_env(&path, |_| None).unwrap();

        assert!(!settings.updater.auto_check);
        assert_eq!(settings.network.read_timeout, Duration::from_secs(3));
        assert_eq!(settings.updater.artifact_prefix, "RavenClient");
    }

    #[test]
    fn environment_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let settings = ClientSettings::load_with_env(&path, |name| match name {
            "RAVEN_LICENSE_URL" => Some("http://127.0.0.1:9000/license".into()),
            "RAVEN_INSTALL_DIR" => Some("/opt/raven/mods".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.license.endpoint, "http://127.0.0.1:9000/license");
        assert_eq!(
            settings.paths.install_dir.as_deref(),
            Some(Path::new("/opt/raven/mods"))
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"network": {"connectTimeout": "0s"}}"#).unwrap();

        let err = ClientSettings::load_with_env(&path, |_| None).unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn save_writes_only_changed_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let mut settings = ClientSettings::load_with_env(&path, |_| None).unwrap();
        settings.updater.notify_delay_ticks = 40;
        settings.save(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"updater": {"notifyDelayTicks": 40}}));

        let reloaded = ClientSettings::load_with_env(&path, |_| None).unwrap();
        assert_eq!(reloaded.updater.notify_delay_ticks, 40);
    }
}
