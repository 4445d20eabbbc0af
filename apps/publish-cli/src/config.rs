//! Publisher configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/bundlepub/publish.toml`
//! - Windows: `%APPDATA%/bundlepub/publish.toml`
//!
//! The upload password is never stored here; it comes from `--password`
//! or `BUNDLEPUB_PASSWORD`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bundlepub_protocol::constants::DEFAULT_BATCH_SIZE;
use bundlepub_publish::{CatalogOptions, FailurePolicy, PublishSettings, SchedulerConfig};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the source asset tree.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Parent of the per-platform output roots.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Source tree naming rules (`asset_dir`, `pack_dir`, `pack_marker`,
    /// `bundle_extension`).
    #[serde(flatten)]
    pub catalog: CatalogOptions,

    /// Maximum concurrent bundle uploads per platform.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Scheduler tick cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Per-request timeout for HTTP uploads, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Upload account name; `--user` overrides it.
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub servers: ServerPresets,
}

/// Named server presets selectable with `--server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPresets {
    #[serde(default = "default_development_url")]
    pub development: String,
    #[serde(default = "default_staging_url")]
    pub staging: String,
    #[serde(default = "default_production_url")]
    pub production: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ServerKind {
    #[default]
    Development,
    Staging,
    Production,
}

impl ServerPresets {
    pub fn url(&self, kind: ServerKind) -> &str {
        match kind {
            ServerKind::Development => &self.development,
            ServerKind::Staging => &self.staging,
            ServerKind::Production => &self.production,
        }
    }
}

impl Default for ServerPresets {
    fn default() -> Self {
        Self {
            development: default_development_url(),
            staging: default_staging_url(),
            production: default_production_url(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Output")
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_development_url() -> String {
    "https://dev.cdn.example.com/AssetBundles".into()
}

fn default_staging_url() -> String {
    "https://staging.cdn.example.com/AssetBundles".into()
}

fn default_production_url() -> String {
    "https://cdn.example.com/AssetBundles".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            catalog: CatalogOptions::default(),
            batch_size: default_batch_size(),
            tick_interval_ms: default_tick_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            failure_policy: FailurePolicy::default(),
            username: String::new(),
            servers: ServerPresets::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file is created
    /// with default values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    let config = Config::default();
                    config.save(&path)?;
                    config
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_size >= 1, "batch_size must be at least 1");
        anyhow::ensure!(self.tick_interval_ms >= 1, "tick_interval_ms must be at least 1");
        anyhow::ensure!(
            self.request_timeout_secs >= 1,
            "request_timeout_secs must be at least 1"
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn to_settings(&self) -> PublishSettings {
        PublishSettings {
            source_root: self.source_dir.clone(),
            output_dir: self.output_dir.clone(),
            catalog: self.catalog.clone(),
            scheduler: SchedulerConfig {
                batch_size: self.batch_size,
                failure_policy: self.failure_policy,
            },
            tick_interval: Duration::from_millis(self.tick_interval_ms),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("bundlepub")
            .join("publish.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("bundlepub").join("publish.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/bundlepub/publish.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("Output"));
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
        assert_eq!(config.catalog.pack_marker, "Pack_");
        assert!(config.username.is_empty());
    }

    #[test]
    fn config_partial_toml() {
        let toml_str = r#"
            batch_size = 3
            pack_marker = "Bundle_"
            failure_policy = "fail_fast"

            [servers]
            staging = "file:///srv/ab"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(config.batch_size, 3);
        assert_eq!(config.catalog.pack_marker, "Bundle_");
        assert_eq!(config.catalog.asset_dir, "Asset");
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.servers.url(ServerKind::Staging), "file:///srv/ab");
        assert_eq!(
            config.servers.url(ServerKind::Production),
            "https://cdn.example.com/AssetBundles"
        );
        assert_eq!(config.tick_interval_ms, 50);
    }

    #[test]
    fn config_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/publish.toml");

        let config = Config {
            username: "deploy".into(),
            batch_size: 8,
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded.username, "deploy");
        assert_eq!(loaded.batch_size, 8);
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(tmp.path().join("nope.toml").as_path())).is_err());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_carry_scheduler_options() {
        let config = Config {
            batch_size: 2,
            tick_interval_ms: 10,
            failure_policy: FailurePolicy::FailFast,
            ..Config::default()
        };
        let settings = config.to_settings();
        assert_eq!(settings.scheduler.batch_size, 2);
        assert_eq!(settings.scheduler.failure_policy, FailurePolicy::FailFast);
        assert_eq!(settings.tick_interval, Duration::from_millis(10));
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("bundlepub"));
    }
}
