//! Application configuration

use aether_lib::notifier::{ThresholdConfig, DEFAULT_CPU_THRESHOLD, DEFAULT_RAM_THRESHOLD};
use aether_lib::pipeline::PipelineConfig;
use aether_lib::predictor::{OutputConfig, DEFAULT_CPU_OFFSET, DEFAULT_RAM_OFFSET};
use aether_lib::users::DEFAULT_USERS_FILE;
use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding the model artifact files
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// JSON file backing sign-in/sign-up
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,

    /// Gauge refresh period in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_cpu_threshold")]
    pub cpu_threshold: f64,

    #[serde(default = "default_ram_threshold")]
    pub ram_threshold: f64,

    #[serde(default = "default_cpu_offset")]
    pub cpu_offset: f64,

    #[serde(default = "default_ram_offset")]
    pub ram_offset: f64,

    /// Gauge views require a registered email
    #[serde(default)]
    pub require_sign_in: bool,

    /// Optional application icon shown in the gauge header
    #[serde(default)]
    pub icon_path: Option<PathBuf>,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("Model")
}

fn default_users_file() -> PathBuf {
    PathBuf::from(DEFAULT_USERS_FILE)
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_cpu_threshold() -> f64 {
    DEFAULT_CPU_THRESHOLD
}

fn default_ram_threshold() -> f64 {
    DEFAULT_RAM_THRESHOLD
}

fn default_cpu_offset() -> f64 {
    DEFAULT_CPU_OFFSET
}

fn default_ram_offset() -> f64 {
    DEFAULT_RAM_OFFSET
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            users_file: default_users_file(),
            tick_interval_ms: default_tick_interval(),
            cpu_threshold: default_cpu_threshold(),
            ram_threshold: default_ram_threshold(),
            cpu_offset: default_cpu_offset(),
            ram_offset: default_ram_offset(),
            require_sign_in: false,
            icon_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file and `AETHER_*` environment variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("AETHER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            AppConfig::default()
        }))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            tick_interval: self.tick_interval(),
            thresholds: ThresholdConfig {
                cpu_threshold: self.cpu_threshold,
                ram_threshold: self.ram_threshold,
            },
            output: OutputConfig {
                cpu_offset: self.cpu_offset,
                ram_offset: self.ram_offset,
            },
        }
    }

    /// The icon path, only when the file is actually present
    pub fn icon(&self) -> Option<&Path> {
        self.icon_path.as_deref().filter(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = AppConfig::default();
        let pipeline = config.pipeline();
        assert_eq!(pipeline, PipelineConfig::default());
        assert_eq!(config.users_file, PathBuf::from("users.json"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "tick_interval_ms = 250\nrequire_sign_in = true\ncpu_threshold = 7.5").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert!(config.require_sign_in);
        assert_eq!(config.cpu_threshold, 7.5);
        assert_eq!(config.ram_threshold, DEFAULT_RAM_THRESHOLD);
    }

    #[test]
    fn test_missing_required_file_is_error() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/aether.toml"))).is_err());
    }

    #[test]
    fn test_icon_requires_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = AppConfig {
            icon_path: Some(file.path().to_path_buf()),
            ..AppConfig::default()
        };
        assert_eq!(config.icon(), Some(file.path()));

        config.icon_path = Some(PathBuf::from("/nonexistent/logo.png"));
        assert_eq!(config.icon(), None);
    }
}
