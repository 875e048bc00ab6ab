//! Column-by-column distribution drift between a baseline and a candidate dataset.

use crate::dataset::{Column, Dataset};
use crate::error::{DriftError, GateError, Stage};
use crate::schema::{ColumnKind, SchemaDefinition};
use crate::stats;
use crate::storage::ReportWriter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Default significance level.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// Statistical test applied to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftTest {
    KolmogorovSmirnov,
    ChiSquare,
}

/// Drift result for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: f64,
    /// True when `p_value` is below the threshold.
    pub drift_status: bool,
    pub test: DriftTest,
    pub statistic: f64,
}

/// Per-column drift results keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport {
    columns: BTreeMap<String, ColumnDrift>,
}

impl DriftReport {
    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDrift)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True iff no column drifted.
    pub fn no_drift(&self) -> bool {
        self.columns.values().all(|c| !c.drift_status)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.drift_status)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl FromIterator<(String, ColumnDrift)> for DriftReport {
    fn from_iter<I: IntoIterator<Item = (String, ColumnDrift)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Compares two datasets column by column.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    threshold: f64,
    kinds: HashMap<String, ColumnKind>,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_THRESHOLD)
    }
}

impl DriftDetector {
    /// A detector with no schema; column kinds are taken from observed types.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            kinds: HashMap::new(),
        }
    }

    /// A detector whose column kinds are fixed by the schema's declared types.
    pub fn for_schema(schema: &SchemaDefinition, threshold: f64) -> Self {
        let kinds = schema
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.dtype.kind()))
            .collect();
        Self { threshold, kinds }
    }

    fn kind_of(&self, column: &Column) -> ColumnKind {
        match self.kinds.get(&column.name) {
            Some(kind) => *kind,
            None => match column.dtype() {
                Some(dtype) => dtype.kind(),
                None => ColumnKind::Categorical,
            },
        }
    }

    /// Test every baseline column against the same-named candidate column.
    pub fn compare(&self, baseline: &Dataset, candidate: &Dataset) -> Result<DriftReport, DriftError> {
        baseline
            .columns()
            .iter()
            .map(|base| {
                let current = candidate
                    .column(&base.name)
                    .ok_or_else(|| DriftError::MissingColumn {
                        column: base.name.clone(),
                    })?;
                let result = self.compare_column(base, current)?;
                tracing::debug!(
                    column = %base.name,
                    test = ?result.test,
                    p_value = result.p_value,
                    drift = result.drift_status,
                    "Column drift computed"
                );
                Ok((base.name.clone(), result))
            })
            .collect()
    }

    fn compare_column(&self, base: &Column, current: &Column) -> Result<ColumnDrift, DriftError> {
        let insufficient = |baseline: usize, candidate: usize| DriftError::InsufficientData {
            column: base.name.clone(),
            baseline,
            candidate,
        };

        let (test, statistic, p_value) = match self.kind_of(base) {
            ColumnKind::Numeric => {
                let a = numeric_sample(base)?;
                let b = numeric_sample(current)?;
                let ks = stats::ks_2samp(&a, &b).ok_or_else(|| insufficient(a.len(), b.len()))?;
                (DriftTest::KolmogorovSmirnov, ks.statistic, ks.p_value)
            }
            ColumnKind::Categorical => {
                let (a, b) = frequency_table(base, current);
                let chi = stats::chi2_contingency(&a, &b).ok_or_else(|| {
                    insufficient(a.iter().sum::<f64>() as usize, b.iter().sum::<f64>() as usize)
                })?;
                (DriftTest::ChiSquare, chi.statistic, chi.p_value)
            }
        };

        Ok(ColumnDrift {
            p_value,
            drift_status: p_value < self.threshold,
            test,
            statistic,
        })
    }

    /// Compute the report, persist it at `location`, and return it together
    /// with the overall flag (true iff no column drifted).
    pub fn detect(
        &self,
        baseline: &Dataset,
        candidate: &Dataset,
        writer: &dyn ReportWriter,
        location: &Path,
    ) -> Result<(DriftReport, bool), GateError> {
        let report = self.compare(baseline, candidate)?;
        writer
            .write_report(location, &report)
            .map_err(|e| GateError::data_access(Stage::Drift, "drift_report", e))?;

        let no_drift = report.no_drift();
        if !no_drift {
            tracing::warn!(columns = ?report.drifted_columns(), "Drift detected");
        }
        Ok((report, no_drift))
    }
}

fn numeric_sample(column: &Column) -> Result<Vec<f64>, DriftError> {
    column
        .non_null()
        .map(|v| {
            v.as_f64().ok_or_else(|| DriftError::NonNumeric {
                column: column.name.clone(),
            })
        })
        .collect()
}

/// Counts per distinct value over the union of both columns. A value seen on
/// only one side gets a zero count on the other.
fn frequency_table(base: &Column, current: &Column) -> (Vec<f64>, Vec<f64>) {
    let mut counts: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for lit in base.non_null().filter_map(|v| v.literal()) {
        counts.entry(lit).or_default().0 += 1.0;
    }
    for lit in current.non_null().filter_map(|v| v.literal()) {
        counts.entry(lit).or_default().1 += 1.0;
    }
    counts.into_values().unzip()
}
