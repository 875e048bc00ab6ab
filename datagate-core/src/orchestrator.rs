//! Validation run: load, validate, route, then (conditionally) drift.

use crate::artifact::{IngestionArtifact, OutputLayout, ValidationArtifact};
use crate::config::GateConfig;
use crate::dataset::Dataset;
use crate::drift::DriftDetector;
use crate::error::{GateError, Stage};
use crate::observe::{ObservationSink, TracingSink};
use crate::schema::SchemaDefinition;
use crate::storage::{CsvStore, DatasetReader, DatasetWriter, ReportWriter, YamlReportWriter};
use crate::validate::{DatasetVerdict, TESTING_DATA, TRAINING_DATA, validate_dataset};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs one (training, test) pair through validation.
///
/// Collaborators default to CSV datasets, YAML reports and a `tracing`
/// observation sink; each can be replaced with the `with_*` builders.
pub struct ValidationOrchestrator {
    schema: Arc<SchemaDefinition>,
    config: GateConfig,
    layout: OutputLayout,
    reader: Box<dyn DatasetReader>,
    writer: Box<dyn DatasetWriter>,
    reports: Box<dyn ReportWriter>,
    sink: Arc<dyn ObservationSink>,
}

impl ValidationOrchestrator {
    pub fn new(schema: Arc<SchemaDefinition>, config: GateConfig, layout: OutputLayout) -> Self {
        Self {
            schema,
            config,
            layout,
            reader: Box::new(CsvStore::default()),
            writer: Box::new(CsvStore::default()),
            reports: Box::new(YamlReportWriter),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_reader(mut self, reader: impl DatasetReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_writer(mut self, writer: impl DatasetWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn with_report_writer(mut self, reports: impl ReportWriter + 'static) -> Self {
        self.reports = Box::new(reports);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Execute the run and return the artifact, or the first fatal error.
    ///
    /// Invalid datasets are not errors: they are quarantined and reported in
    /// the artifact. Outputs already routed before a failure are left in place.
    pub fn run(&self, ingestion: &IngestionArtifact) -> Result<ValidationArtifact, GateError> {
        self.sink.stage_started(Stage::Load);
        let train = self.load(&ingestion.trained_file_path, TRAINING_DATA)?;
        let test = self.load(&ingestion.test_file_path, TESTING_DATA)?;

        self.sink.stage_started(Stage::Validate);
        let validation = &self.config.validation;
        let train_verdict = validate_dataset(&train, TRAINING_DATA, &self.schema, validation);
        let test_verdict = validate_dataset(&test, TESTING_DATA, &self.schema, validation);

        self.sink.stage_started(Stage::Route);
        let valid_train_file_path = self.route(
            &train,
            &train_verdict,
            &self.layout.valid_train,
            &self.layout.invalid_train,
        )?;
        let valid_test_file_path = self.route(
            &test,
            &test_verdict,
            &self.layout.valid_test,
            &self.layout.invalid_test,
        )?;

        let validation_status = train_verdict.passed && test_verdict.passed;
        let (drift_status, drift_report_file_path) = if validation_status {
            self.sink.stage_started(Stage::Drift);
            let detector = DriftDetector::for_schema(&self.schema, self.config.drift.threshold);
            let (report, no_drift) =
                detector.detect(&train, &test, self.reports.as_ref(), &self.layout.drift_report)?;
            if no_drift {
                self.sink.info(&format!(
                    "No drift detected across {} columns",
                    report.len()
                ));
            } else {
                self.sink.warn(&format!(
                    "Drift detected in columns: {:?}",
                    report.drifted_columns()
                ));
            }
            (no_drift, Some(self.layout.drift_report.clone()))
        } else {
            self.sink
                .info("Skipping drift detection: at least one dataset is invalid");
            (false, None)
        };

        Ok(ValidationArtifact {
            validation_status,
            valid_train_file_path,
            valid_test_file_path,
            invalid_train_file_path: self.layout.invalid_train.clone(),
            invalid_test_file_path: self.layout.invalid_test.clone(),
            drift_report_file_path,
            drift_status,
            train_diagnostics: train_verdict.messages(),
            test_diagnostics: test_verdict.messages(),
        })
    }

    fn load(&self, location: &Path, dataset: &str) -> Result<Dataset, GateError> {
        self.reader
            .read(location)
            .map_err(|e| GateError::data_access(Stage::Load, dataset, e))
    }

    /// Write the dataset to exactly one of its two locations. Returns the
    /// conforming location when the dataset is valid.
    fn route(
        &self,
        dataset: &Dataset,
        verdict: &DatasetVerdict,
        valid_location: &Path,
        invalid_location: &Path,
    ) -> Result<Option<PathBuf>, GateError> {
        let target = if verdict.passed {
            valid_location
        } else {
            invalid_location
        };
        self.writer
            .write(target, dataset)
            .map_err(|e| GateError::data_access(Stage::Route, &verdict.dataset, e))?;

        if verdict.passed {
            self.sink.info(&format!(
                "{} is valid, written to {}",
                verdict.dataset,
                target.display()
            ));
            Ok(Some(target.to_path_buf()))
        } else {
            self.sink.warn(&format!(
                "{} invalid, quarantined to {}: {:?}",
                verdict.dataset,
                target.display(),
                verdict.messages()
            ));
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, Value};
    use crate::error::DataAccessError;
    use crate::observe::MemorySink;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves datasets from memory.
    #[derive(Default)]
    struct MemoryStore {
        inputs: HashMap<PathBuf, Dataset>,
    }

    impl DatasetReader for MemoryStore {
        fn read(&self, location: &Path) -> Result<Dataset, DataAccessError> {
            self.inputs.get(location).cloned().ok_or_else(|| {
                DataAccessError::io(
                    location,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such dataset"),
                )
            })
        }
    }

    struct RecordingWriter(Arc<Mutex<Vec<PathBuf>>>);

    impl DatasetWriter for RecordingWriter {
        fn write(&self, location: &Path, _dataset: &Dataset) -> Result<(), DataAccessError> {
            self.0.lock().unwrap().push(location.to_path_buf());
            Ok(())
        }
    }

    struct NullReports;

    impl ReportWriter for NullReports {
        fn write_report(
            &self,
            _location: &Path,
            _report: &crate::drift::DriftReport,
        ) -> Result<(), DataAccessError> {
            Ok(())
        }
    }

    fn schema() -> Arc<SchemaDefinition> {
        Arc::new(
            SchemaDefinition::from_yaml_str("columns:\n  x: float\n  c: str\n").unwrap(),
        )
    }

    fn good() -> Dataset {
        Dataset::new(vec![
            Column::new("x", (0..30).map(|i| Value::Float(i as f64))),
            Column::new("c", (0..30).map(|i| if i % 2 == 0 { "a" } else { "b" })),
        ])
        .unwrap()
    }

    type Written = Arc<Mutex<Vec<PathBuf>>>;

    fn orchestrator(train: Dataset, test: Dataset) -> (ValidationOrchestrator, Written, Arc<MemorySink>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut store = MemoryStore::default();
        store.inputs.insert(PathBuf::from("train.csv"), train);
        store.inputs.insert(PathBuf::from("test.csv"), test);
        let sink = Arc::new(MemorySink::new());
        let orch = ValidationOrchestrator::new(
            schema(),
            GateConfig::default(),
            OutputLayout::under("out"),
        )
        .with_reader(store)
        .with_writer(RecordingWriter(Arc::clone(&written)))
        .with_report_writer(NullReports)
        .with_sink(sink.clone());
        (orch, written, sink)
    }

    #[test]
    fn test_both_valid_runs_drift() {
        let (orch, written, sink) = orchestrator(good(), good());
        let artifact = orch.run(&IngestionArtifact::new("train.csv", "test.csv")).unwrap();

        assert!(artifact.validation_status);
        assert!(artifact.drift_status);
        assert_eq!(artifact.drift_report_file_path, Some(orch.layout().drift_report.clone()));
        assert_eq!(
            *written.lock().unwrap(),
            vec![orch.layout().valid_train.clone(), orch.layout().valid_test.clone()]
        );
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_invalid_test_is_quarantined_and_drift_skipped() {
        let bad = Dataset::new(vec![Column::new("x", [1.0f64])]).unwrap();
        let (orch, written, sink) = orchestrator(good(), bad);
        let artifact = orch.run(&IngestionArtifact::new("train.csv", "test.csv")).unwrap();

        assert!(!artifact.validation_status);
        assert!(!artifact.drift_status);
        assert!(artifact.valid_train_file_path.is_some());
        assert!(artifact.valid_test_file_path.is_none());
        assert!(artifact.drift_report_file_path.is_none());
        assert_eq!(
            *written.lock().unwrap(),
            vec![orch.layout().valid_train.clone(), orch.layout().invalid_test.clone()]
        );
        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("testing_data invalid"));
        assert!(artifact.test_diagnostics[0].starts_with("[testing_data] columns_and_types"));
    }

    #[test]
    fn test_missing_input_is_load_error() {
        let (orch, written, _) = orchestrator(good(), good());
        let err = orch
            .run(&IngestionArtifact::new("train.csv", "elsewhere.csv"))
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Load));
        assert_eq!(err.dataset(), Some(TESTING_DATA));
        assert!(written.lock().unwrap().is_empty());
    }
}
