//! # datagate-core: pre-training data gate
//!
//! Certifies that a training dataset and a test dataset conform to a declared
//! schema, enforces data-quality thresholds, separates conforming from
//! non-conforming data, and detects distributional drift between the two.
//!
//! ## Pipeline
//!
//! 1. **Schema**: [`SchemaRegistry`] loads the column/type/bounds/domain declaration.
//! 2. **Validation**: [`validate::validate_dataset`] runs the row-level checks.
//! 3. **Routing**: [`ValidationOrchestrator`] writes each dataset to its
//!    conforming or quarantine location.
//! 4. **Drift**: [`DriftDetector`] compares train and test column by column
//!    (Kolmogorov–Smirnov for numeric columns, chi-square for categorical ones).

// Foundation
pub mod config;
pub mod error;
pub mod observe;

// Data model and persistence
pub mod dataset;
pub mod schema;
pub mod storage;

// Checks and statistics
pub mod drift;
pub mod stats;
pub mod validate;

// Run
pub mod artifact;
pub mod orchestrator;

// Re-exports
pub use artifact::{IngestionArtifact, OutputLayout, ValidationArtifact};
pub use config::{GateConfig, load_config};
pub use dataset::{Column, Dataset, Value};
pub use drift::{ColumnDrift, DriftDetector, DriftReport, DriftTest};
pub use error::{ConfigError, DataAccessError, DriftError, GateError, Stage};
pub use observe::{MemorySink, ObservationSink, TracingSink};
pub use orchestrator::ValidationOrchestrator;
pub use schema::{ColumnKind, ColumnType, SchemaDefinition, SchemaRegistry};
pub use storage::{CsvStore, DatasetReader, DatasetWriter, ReportWriter, YamlReportWriter};
pub use validate::{DatasetVerdict, Diagnostic, ValidationVerdict};
