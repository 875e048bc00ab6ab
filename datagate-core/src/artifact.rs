//! Artifacts exchanged with the stages around validation.

use crate::error::DataAccessError;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory-name timestamp format for a run (`10_18_2026_14_03_59`).
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

const VALIDATION_DIR: &str = "data_validation";
const VALID_DIR: &str = "validated";
const INVALID_DIR: &str = "invalid";
const DRIFT_REPORT_DIR: &str = "drift_report";
const DRIFT_REPORT_FILE: &str = "report.yaml";
const TRAIN_FILE: &str = "train.csv";
const TEST_FILE: &str = "test.csv";

/// Output of the ingestion stage: where the raw train/test splits live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub trained_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

impl IngestionArtifact {
    pub fn new(trained_file_path: impl Into<PathBuf>, test_file_path: impl Into<PathBuf>) -> Self {
        Self {
            trained_file_path: trained_file_path.into(),
            test_file_path: test_file_path.into(),
        }
    }

    /// Read an ingestion artifact serialized as JSON.
    pub fn from_json_file(path: &Path) -> Result<Self, DataAccessError> {
        let content = std::fs::read_to_string(path).map_err(|e| DataAccessError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| DataAccessError::Malformed {
            location: path.to_path_buf(),
            line: e.line(),
            message: e.to_string(),
        })
    }
}

/// Where a validation run writes its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub valid_train: PathBuf,
    pub valid_test: PathBuf,
    pub invalid_train: PathBuf,
    pub invalid_test: PathBuf,
    pub drift_report: PathBuf,
}

impl OutputLayout {
    /// Standard layout below `root`:
    /// `data_validation/{validated,invalid}/{train,test}.csv` and
    /// `data_validation/drift_report/report.yaml`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let base = root.as_ref().join(VALIDATION_DIR);
        let valid = base.join(VALID_DIR);
        let invalid = base.join(INVALID_DIR);
        Self {
            valid_train: valid.join(TRAIN_FILE),
            valid_test: valid.join(TEST_FILE),
            invalid_train: invalid.join(TRAIN_FILE),
            invalid_test: invalid.join(TEST_FILE),
            drift_report: base.join(DRIFT_REPORT_DIR).join(DRIFT_REPORT_FILE),
        }
    }

    /// Standard layout inside a per-run directory named after `started_at`.
    pub fn timestamped<Tz: TimeZone>(artifact_dir: impl AsRef<Path>, started_at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let run_dir = artifact_dir
            .as_ref()
            .join(started_at.format(TIMESTAMP_FORMAT).to_string());
        Self::under(run_dir)
    }
}

/// Terminal output of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    /// True iff both datasets passed validation.
    pub validation_status: bool,
    /// Set only when the training dataset is valid.
    pub valid_train_file_path: Option<PathBuf>,
    /// Set only when the test dataset is valid.
    pub valid_test_file_path: Option<PathBuf>,
    pub invalid_train_file_path: PathBuf,
    pub invalid_test_file_path: PathBuf,
    /// Set only when drift detection ran.
    pub drift_report_file_path: Option<PathBuf>,
    /// True iff drift detection ran and found no drifted column.
    pub drift_status: bool,
    #[serde(default)]
    pub train_diagnostics: Vec<String>,
    #[serde(default)]
    pub test_diagnostics: Vec<String>,
}
