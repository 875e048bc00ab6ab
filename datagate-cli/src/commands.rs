//! CLI subcommand handlers.

use crate::Commands;
use chrono::{DateTime, Local};
use datagate_core::{
    CsvStore, DatasetReader, DriftDetector, DriftReport, GateConfig, IngestionArtifact,
    OutputLayout, ReportWriter, SchemaRegistry, ValidationArtifact, ValidationOrchestrator,
    YamlReportWriter,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Everything a subcommand needs from process startup.
pub struct Context {
    pub workspace: PathBuf,
    pub config: GateConfig,
    pub started_at: DateTime<Local>,
}

impl Context {
    /// Resolve a configured path against the workspace.
    fn resolve(&self, path: &Path) -> PathBuf {
        self.workspace.join(path)
    }
}

/// Handle a CLI subcommand.
///
/// Exits with failure when a validation run does not pass cleanly or a
/// drift comparison finds drift.
pub fn handle_command(command: Commands, ctx: &Context) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Validate {
            train,
            test,
            ingestion,
            schema,
            artifact_dir,
        } => {
            let ingestion = match (train, test, ingestion) {
                (Some(train), Some(test), _) => IngestionArtifact::new(train, test),
                (_, _, Some(path)) => IngestionArtifact::from_json_file(&path)?,
                _ => anyhow::bail!("either --train and --test, or --ingestion, is required"),
            };
            let artifact =
                run_validation(ctx, &ingestion, schema.as_deref(), artifact_dir.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(exit_code(artifact.validation_status && artifact.drift_status))
        }
        Commands::Drift {
            baseline,
            candidate,
            schema,
            threshold,
            report,
        } => {
            let drift = run_drift(
                ctx,
                &baseline,
                &candidate,
                schema.as_deref(),
                threshold,
                report.as_deref(),
            )?;
            println!("{}", serde_json::to_string_pretty(&drift)?);
            Ok(exit_code(drift.no_drift()))
        }
        Commands::Schema { path } => {
            print!("{}", describe_schema(&path)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&ctx.config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_validation(
    ctx: &Context,
    ingestion: &IngestionArtifact,
    schema: Option<&Path>,
    artifact_dir: Option<&Path>,
) -> anyhow::Result<ValidationArtifact> {
    let schema_path = schema
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.resolve(&ctx.config.schema_path));
    let registry = SchemaRegistry::load(&schema_path)?;

    let artifact_dir = artifact_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.resolve(&ctx.config.artifact_dir));
    let layout = OutputLayout::timestamped(&artifact_dir, &ctx.started_at);
    tracing::info!(
        train = %ingestion.trained_file_path.display(),
        test = %ingestion.test_file_path.display(),
        artifact_dir = %artifact_dir.display(),
        "Starting data validation"
    );

    let orchestrator = ValidationOrchestrator::new(registry.shared(), ctx.config.clone(), layout);
    let artifact = orchestrator.run(ingestion)?;
    tracing::info!(
        validation_status = artifact.validation_status,
        drift_status = artifact.drift_status,
        "Data validation finished"
    );
    Ok(artifact)
}

fn run_drift(
    ctx: &Context,
    baseline: &Path,
    candidate: &Path,
    schema: Option<&Path>,
    threshold: Option<f64>,
    report: Option<&Path>,
) -> anyhow::Result<DriftReport> {
    let threshold = threshold.unwrap_or(ctx.config.drift.threshold);
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "--threshold must be within [0, 1], got {threshold}"
    );

    let store = CsvStore::default();
    let base = store.read(baseline)?;
    let current = store.read(candidate)?;

    let detector = match schema {
        Some(path) => DriftDetector::for_schema(SchemaRegistry::load(path)?.schema(), threshold),
        None => DriftDetector::new(threshold),
    };
    let drift = detector.compare(&base, &current)?;

    if let Some(path) = report {
        YamlReportWriter.write_report(path, &drift)?;
        tracing::info!(path = %path.display(), "Drift report written");
    }
    if !drift.no_drift() {
        tracing::warn!(columns = ?drift.drifted_columns(), "Drift detected");
    }
    Ok(drift)
}

fn describe_schema(path: &Path) -> anyhow::Result<String> {
    let registry = SchemaRegistry::load(path)?;
    let schema = registry.schema();

    let mut out = String::new();
    writeln!(out, "Schema: {}", path.display())?;
    writeln!(out, "Columns ({}):", schema.columns().len())?;
    for column in schema.columns() {
        writeln!(out, "  {:<24} {}", column.name, column.dtype)?;
    }
    if !schema.numeric_limits().is_empty() {
        writeln!(out, "Numeric limits:")?;
        for limit in schema.numeric_limits() {
            writeln!(out, "  {:<24} [{}, {}]", limit.column, limit.min, limit.max)?;
        }
    }
    if !schema.categorical_values().is_empty() {
        writeln!(out, "Categorical values:")?;
        for domain in schema.categorical_values() {
            let allowed: Vec<&str> = domain.allowed.iter().map(String::as_str).collect();
            writeln!(out, "  {:<24} {}", domain.column, allowed.join(", "))?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SCHEMA: &str = "columns:\n  age: int\n  plan: str\nnumeric_limits:\n  age: [0, 120]\ncategorical_values:\n  plan: [free, pro]\n";

    fn context(dir: &TempDir) -> Context {
        Context {
            workspace: dir.path().to_path_buf(),
            config: GateConfig::default(),
            started_at: Local::now(),
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn rows(ages: impl Iterator<Item = i64>) -> String {
        let mut csv = String::from("age,plan\n");
        for (i, age) in ages.enumerate() {
            let plan = if i % 2 == 0 { "free" } else { "pro" };
            csv.push_str(&format!("{age},{plan}\n"));
        }
        csv
    }

    #[test]
    fn test_validation_uses_configured_schema_and_artifact_dir() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        write(&dir, "data_schema/schema.yaml", SCHEMA);
        let train = write(&dir, "train.csv", &rows(0..60));
        let test = write(&dir, "test.csv", &rows(10..70));

        let artifact = run_validation(&ctx, &IngestionArtifact::new(train, test), None, None).unwrap();

        assert!(artifact.validation_status);
        let valid_train = artifact.valid_train_file_path.unwrap();
        assert!(valid_train.starts_with(dir.path().join("artifacts")));
        assert!(valid_train.exists());
        assert!(artifact.drift_report_file_path.unwrap().exists());
    }

    #[test]
    fn test_validation_quarantines_out_of_range_rows() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let schema = write(&dir, "custom.yaml", SCHEMA);
        let train = write(&dir, "train.csv", &rows(0..60));
        let test = write(&dir, "test.csv", &rows(100..160));
        let out = dir.path().join("out");

        let artifact = run_validation(
            &ctx,
            &IngestionArtifact::new(train, test),
            Some(&schema),
            Some(&out),
        )
        .unwrap();

        assert!(!artifact.validation_status);
        assert!(artifact.valid_test_file_path.is_none());
        assert!(artifact.invalid_test_file_path.starts_with(&out));
        assert!(artifact.invalid_test_file_path.exists());
        assert!(artifact.test_diagnostics[0].contains("out of range [0, 120]"));
    }

    #[test]
    fn test_missing_schema_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let ingestion = IngestionArtifact::new("train.csv", "test.csv");
        assert!(run_validation(&ctx, &ingestion, None, None).is_err());
    }

    #[test]
    fn test_drift_writes_report() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let base = write(&dir, "base.csv", &rows(0..80));
        let shifted = write(&dir, "new.csv", &rows(500..580));
        let report = dir.path().join("reports").join("drift.yaml");

        let drift = run_drift(&ctx, &base, &shifted, None, None, Some(&report)).unwrap();

        assert_eq!(drift.drifted_columns(), vec!["age"]);
        let saved = datagate_core::storage::read_report(&report).unwrap();
        assert_eq!(saved, drift);
    }

    #[test]
    fn test_drift_rejects_threshold_outside_unit_interval() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let base = write(&dir, "base.csv", &rows(0..10));
        let err = run_drift(&ctx, &base, &base, None, Some(1.5), None).unwrap_err();
        assert!(err.to_string().contains("--threshold"));
    }

    #[test]
    fn test_describe_schema() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "schema.yaml", SCHEMA);
        let summary = describe_schema(&path).unwrap();

        assert!(summary.contains("Columns (2):"));
        assert!(summary.contains("age"));
        assert!(summary.contains("[0, 120]"));
        assert!(summary.contains("free, pro"));
    }
}
