//! Run configuration.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the workspace-level configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "datagate.toml";

/// Top-level configuration for a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Schema definition file.
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
    /// Root directory for per-run validation outputs.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Directory for the per-run log file.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Row-level check settings.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Drift detection settings.
    #[serde(default)]
    pub drift: DriftConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            schema_path: default_schema_path(),
            artifact_dir: default_artifact_dir(),
            log_dir: default_log_dir(),
            validation: ValidationConfig::default(),
            drift: DriftConfig::default(),
        }
    }
}

impl GateConfig {
    /// Reject thresholds outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("validation.missing_threshold", self.validation.missing_threshold)?;
        check_unit_interval("drift.threshold", self.drift.threshold)?;
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!(
            "{field} must be within [0, 1], got {value}"
        )))
    }
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("data_schema").join("schema.yaml")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Row-level check configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum tolerated fraction of nulls per column; strictly above fails.
    #[serde(default = "default_missing_threshold")]
    pub missing_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            missing_threshold: default_missing_threshold(),
        }
    }
}

fn default_missing_threshold() -> f64 {
    0.05
}

/// Drift detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Significance level; a column drifts when its p-value is below it.
    #[serde(default = "default_drift_threshold")]
    pub threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: default_drift_threshold(),
        }
    }
}

fn default_drift_threshold() -> f64 {
    0.05
}

/// Load configuration from all layers.
///
/// `explicit` is a config file named on the command line; unlike the
/// discovered files it must exist.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<GateConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(GateConfig::default()));

    // User-level config
    if let Some(dirs) = directories::ProjectDirs::from("dev", "datagate", "datagate") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (DATAGATE_SCHEMA_PATH, DATAGATE_DRIFT__THRESHOLD, ...)
    figment = figment.merge(Env::prefixed("DATAGATE_").split("__"));

    let config: GateConfig = figment
        .extract()
        .map_err(|e| ConfigError::parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
