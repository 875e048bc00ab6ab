//! Error types for the datagate core library.
//!
//! Uses `thiserror` for structured error variants covering configuration,
//! data access and drift computation. Data-quality failures are not errors:
//! they are modeled as [`crate::validate::DatasetVerdict`] diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Pipeline stage in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Validate,
    Route,
    Drift,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Validate => "validate",
            Stage::Route => "route",
            Stage::Drift => "drift",
        };
        f.write_str(name)
    }
}

/// Top-level error type returned by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} stage failed for '{dataset}': {source}")]
    DataAccess {
        stage: Stage,
        dataset: String,
        #[source]
        source: DataAccessError,
    },

    #[error("drift stage failed: {0}")]
    Drift(#[from] DriftError),
}

impl GateError {
    pub fn data_access(stage: Stage, dataset: impl Into<String>, source: DataAccessError) -> Self {
        Self::DataAccess {
            stage,
            dataset: dataset.into(),
            source,
        }
    }

    /// Stage that raised the error, if it came from a pipeline run.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Config(_) => None,
            Self::DataAccess { stage, .. } => Some(*stage),
            Self::Drift(_) => Some(Stage::Drift),
        }
    }

    /// Logical dataset name involved in the failure.
    pub fn dataset(&self) -> Option<&str> {
        match self {
            Self::DataAccess { dataset, .. } => Some(dataset),
            _ => None,
        }
    }

    /// Column involved in the failure.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Config(err) => err.column(),
            Self::DataAccess { source, .. } => source.column(),
            Self::Drift(err) => Some(err.column()),
        }
    }
}

/// Errors from loading configuration or the schema definition.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {message}")]
    Parse { message: String },

    #[error("Section '{section}' must be a mapping")]
    NotAMapping { section: String },

    #[error("Column '{column}' declares unknown type '{tag}'")]
    UnknownType { column: String, tag: String },

    #[error("Section '{section}' references column '{column}' which is not declared in 'columns'")]
    UnknownColumn { section: String, column: String },

    #[error("Invalid numeric limits for column '{column}': {reason}")]
    InvalidLimits { column: String, reason: String },

    #[error("Invalid allowed values for column '{column}': {reason}")]
    InvalidCategories { column: String, reason: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Self::UnknownType { column, .. }
            | Self::UnknownColumn { column, .. }
            | Self::InvalidLimits { column, .. }
            | Self::InvalidCategories { column, .. } => Some(column),
            _ => None,
        }
    }
}

/// Errors from reading or writing datasets and reports.
#[derive(Debug, thiserror::Error)]
pub enum DataAccessError {
    #[error("I/O failure at {}: {source}", location.display())]
    Io {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data in {} at line {line}: {message}", location.display())]
    Malformed {
        location: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Column '{column}' has {found} rows, expected {expected}")]
    Ragged {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Cannot serialize to {}: {message}", location.display())]
    Serialize { location: PathBuf, message: String },
}

impl DataAccessError {
    pub fn io(location: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Ragged { column, .. } => Some(column),
            _ => None,
        }
    }
}

/// A statistical drift test could not be computed for a column.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    #[error("Column '{column}' is missing from the candidate dataset")]
    MissingColumn { column: String },

    #[error(
        "Column '{column}' has too few values for a two-sample test (baseline: {baseline}, candidate: {candidate})"
    )]
    InsufficientData {
        column: String,
        baseline: usize,
        candidate: usize,
    },

    #[error("Column '{column}' is declared numeric but holds non-numeric values")]
    NonNumeric { column: String },
}

impl DriftError {
    pub fn column(&self) -> &str {
        match self {
            Self::MissingColumn { column }
            | Self::InsufficientData { column, .. }
            | Self::NonNumeric { column } => column,
        }
    }
}

/// A type alias for results using the top-level `GateError`.
pub type Result<T> = std::result::Result<T, GateError>;
