//! Configuration for the deployment hooks.

use std::num::NonZeroU16;
use std::path::PathBuf;

use config::{Config as ConfigLoader, Environment, File, FileFormat};
use fwdeploy_common::{DeploymentTarget, UploadProtocol, READINESS_PORT};
use serde::Deserialize;

/// Environment switch that disables compression when set to any non-empty value.
pub const LEGACY_DISABLE_GZIP_ENV: &str = "WORDCLOCK_DISABLE_GZIP";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Primary upload settings, as the orchestrator sees them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UploadConfig {
    /// Upload protocol identifier (e.g. "espota", "esptool").
    #[serde(default)]
    pub protocol: String,
    /// Device host for network uploads. Falls back to the built-in default.
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    /// Port probed once the device reboots (default: 80).
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe_port: default_probe_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// Project root; the asset root defaults to `<project_dir>/data`.
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
    /// Explicit asset root, overriding the project default.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Skip compression entirely.
    #[serde(default)]
    pub disable_gzip: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            data_dir: None,
            disable_gzip: false,
        }
    }
}

impl AssetsConfig {
    pub fn asset_root(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => self.project_dir.join(DEFAULT_DATA_SUBDIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Everything one hook invocation needs, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub target: DeploymentTarget,
    pub asset_root: PathBuf,
    pub disable_gzip: bool,
}

const DEFAULT_DATA_SUBDIR: &str = "data";
const DEFAULT_CONFIG_FILE: &str = "fwdeploy";

// Default values
fn default_probe_port() -> u16 {
    READINESS_PORT
}
fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (FWDEPLOY__SECTION__KEY format)
    /// 2. The given file, or fwdeploy.toml if present
    /// 3. Built-in defaults
    pub fn load(path: Option<&str>) -> crate::Result<Self> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = ConfigLoader::builder()
            .set_default("readiness.probe_port", default_probe_port() as i64)?
            .set_default("logging.level", default_log_level())?
            .add_source(file)
            .add_source(
                Environment::with_prefix("FWDEPLOY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.apply_legacy_env(std::env::var(LEGACY_DISABLE_GZIP_ENV).ok().as_deref());
        Ok(config)
    }

    /// Parse configuration from TOML text, without consulting the environment.
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Honor the legacy disable switch. Only a non-empty value counts.
    pub fn apply_legacy_env(&mut self, value: Option<&str>) {
        if value.is_some_and(|v| !v.is_empty()) {
            self.assets.disable_gzip = true;
        }
    }

    /// Resolve into the explicit context handed to the hooks.
    pub fn resolve(&self) -> crate::Result<HookContext> {
        let port = NonZeroU16::new(self.readiness.probe_port).ok_or_else(|| {
            crate::Error::InvalidConfig("readiness.probe_port must be positive".to_string())
        })?;

        Ok(HookContext {
            target: DeploymentTarget::new(
                UploadProtocol::parse(&self.upload.protocol),
                self.upload.host.as_deref(),
                port,
            ),
            asset_root: self.assets.asset_root(),
            disable_gzip: self.assets.disable_gzip,
        })
    }
}
