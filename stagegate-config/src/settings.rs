use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stagegate_core::StageConfig;
use stagegate_core::infra::HttpLaunchInvoker;
use stagegate_core::infra::http_launcher::parse_endpoint;
use tracing::debug;

const CONFIG_PATH_VAR: &str = "STAGEGATE_CONFIG_PATH";

/// Checked in order when `$STAGEGATE_CONFIG_PATH` is unset.
const DEFAULT_FILES: [&str; 2] = ["stagegate.toml", "config/stagegate.toml"];

/// Where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StageConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    File(PathBuf),
}

impl StageConfigSource {
    /// `$STAGEGATE_CONFIG_PATH` when set, else the first default file that
    /// exists, else built-in defaults.
    pub fn locate() -> Self {
        if let Ok(path) = env::var(CONFIG_PATH_VAR)
            && !path.trim().is_empty()
        {
            return Self::EnvPath(PathBuf::from(path));
        }
        DEFAULT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
            .map_or(Self::Default, Self::File)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Default => None,
            Self::EnvPath(path) | Self::File(path) => Some(path),
        }
    }
}

/// Stage knobs plus host-only wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StageSettings {
    #[serde(flatten)]
    pub stage: StageConfig,
    /// Base URL of the HTTP gateway fronting the launcher function. Hosts
    /// that invoke the launcher another way leave it unset.
    pub launcher_endpoint: Option<String>,
}

/// Reads a single-key override, ignoring unset variables.
fn env_override(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    debug!(key, "applying environment override");
    Some(value)
}

impl StageSettings {
    /// Reads the TOML file picked by [`StageConfigSource::locate`], applies
    /// `STAGEGATE_*` single-key overrides, then validates the result.
    pub fn load_from_env() -> anyhow::Result<(Self, StageConfigSource)> {
        let source = StageConfigSource::locate();
        let mut settings = match source.path() {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides();
        settings.validate()?;
        debug!(?source, "stage settings loaded");
        Ok((settings, source))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read stage config from {}", path.display())
        })?;
        toml::from_str(&contents)
            .with_context(|| format!("invalid stage config {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_override("STAGEGATE_LOG_GROUP_NAME") {
            self.stage.log_group_name = value;
        }
        if let Some(value) = env_override("STAGEGATE_NOTIFICATION_TOPIC_NAME") {
            self.stage.notification_topic_name = value;
        }
        if let Some(value) = env_override("STAGEGATE_PRODUCT_NAMESPACE") {
            self.stage.product_namespace = value;
        }
        if let Some(value) = env_override("STAGEGATE_LAUNCHER_FUNCTION_NAME") {
            self.stage.launcher_function_name = value;
        }
        if let Some(value) = env_override("STAGEGATE_LAUNCHER_ENDPOINT") {
            self.launcher_endpoint = Some(value);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.stage.validate().context("invalid stage config")?;
        if let Some(endpoint) = &self.launcher_endpoint {
            parse_endpoint(endpoint)
                .with_context(|| format!("invalid launcher-endpoint {endpoint}"))?;
        }
        Ok(())
    }

    /// HTTP launcher client for `launcher-endpoint`, if one is configured.
    pub fn http_launcher(&self) -> anyhow::Result<Option<HttpLaunchInvoker>> {
        self.launcher_endpoint
            .as_deref()
            .map(|endpoint| {
                HttpLaunchInvoker::new(endpoint).with_context(|| {
                    format!("failed to build launcher client for {endpoint}")
                })
            })
            .transpose()
    }
}
