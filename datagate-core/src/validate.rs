//! Row-level data quality checks.
//!
//! Every check is a pure function of a dataset (and the schema where needed)
//! returning a [`ValidationVerdict`]. [`validate_dataset`] runs them in order
//! and folds the results into one [`DatasetVerdict`].

use crate::config::ValidationConfig;
use crate::dataset::{Dataset, Value};
use crate::schema::SchemaDefinition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Logical name of the training dataset in diagnostics.
pub const TRAINING_DATA: &str = "training_data";
/// Logical name of the test dataset in diagnostics.
pub const TESTING_DATA: &str = "testing_data";

/// The individual quality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    ColumnsAndTypes,
    MissingValues,
    NumericRanges,
    CategoricalValues,
    Duplicates,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Check::ColumnsAndTypes => "columns_and_types",
            Check::MissingValues => "missing_values",
            Check::NumericRanges => "numeric_ranges",
            Check::CategoricalValues => "categorical_values",
            Check::Duplicates => "duplicates",
        };
        f.write_str(name)
    }
}

/// One finding from one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub check: Check,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl Diagnostic {
    fn new(check: Check, column: Option<&str>, message: String) -> Self {
        Self {
            check,
            column: column.map(str::to_string),
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.message)
    }
}

/// Result of a single check. `passed` holds iff there are no diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationVerdict {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            passed: diagnostics.is_empty(),
            diagnostics,
        }
    }
}

/// Aggregated verdict for one named dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVerdict {
    pub dataset: String,
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl DatasetVerdict {
    fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            passed: true,
            diagnostics: Vec::new(),
        }
    }

    fn absorb(&mut self, verdict: ValidationVerdict) {
        self.passed &= verdict.passed;
        self.diagnostics.extend(verdict.diagnostics);
    }

    /// Diagnostics prefixed with the dataset name, e.g.
    /// `[training_data] missing_values: Column 'age' has ...`.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| format!("[{}] {d}", self.dataset))
            .collect()
    }
}

/// Strict positional column match plus per-column type conformance.
pub fn validate_columns_and_types(dataset: &Dataset, schema: &SchemaDefinition) -> ValidationVerdict {
    let mut diagnostics = Vec::new();

    let expected = schema.column_names();
    let found = dataset.column_names();
    if expected != found {
        diagnostics.push(Diagnostic::new(
            Check::ColumnsAndTypes,
            None,
            format!("Columns mismatch. Expected {expected:?}, found {found:?}"),
        ));
    }

    for declared in schema.columns() {
        let Some(column) = dataset.column(&declared.name) else {
            continue;
        };
        // An all-null column has no observable type; the missing-value check reports it.
        if let Some(observed) = column.dtype()
            && !declared.dtype.accepts(observed)
        {
            diagnostics.push(Diagnostic::new(
                Check::ColumnsAndTypes,
                Some(&declared.name),
                format!(
                    "Column '{}' expected type {}, found {observed}",
                    declared.name, declared.dtype
                ),
            ));
        }
    }

    ValidationVerdict::from_diagnostics(diagnostics)
}

/// Fails each column whose null fraction is strictly above `threshold`.
pub fn validate_missing_values(dataset: &Dataset, threshold: f64) -> ValidationVerdict {
    let rows = dataset.row_count();
    if rows == 0 {
        return ValidationVerdict::from_diagnostics(Vec::new());
    }

    let diagnostics = dataset
        .columns()
        .iter()
        .filter_map(|column| {
            let fraction = column.null_count() as f64 / rows as f64;
            (fraction > threshold).then(|| {
                Diagnostic::new(
                    Check::MissingValues,
                    Some(&column.name),
                    format!(
                        "Column '{}' has {:.2}% missing values > allowed {:.2}%",
                        column.name,
                        fraction * 100.0,
                        threshold * 100.0
                    ),
                )
            })
        })
        .collect();

    ValidationVerdict::from_diagnostics(diagnostics)
}

/// Checks observed min/max against each declared inclusive bound.
pub fn validate_numeric_ranges(dataset: &Dataset, schema: &SchemaDefinition) -> ValidationVerdict {
    let mut diagnostics = Vec::new();

    for limit in schema.numeric_limits() {
        let Some(column) = dataset.column(&limit.column) else {
            continue;
        };
        let observed = column
            .values
            .iter()
            .filter_map(|v| v.as_f64())
            .fold(None, |acc: Option<(f64, f64)>, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
            });
        let Some((min, max)) = observed else {
            continue;
        };
        if min < limit.min || max > limit.max {
            diagnostics.push(Diagnostic::new(
                Check::NumericRanges,
                Some(&limit.column),
                format!(
                    "Column '{}' out of range [{}, {}]: observed min {min}, max {max}",
                    limit.column, limit.min, limit.max
                ),
            ));
        }
    }

    ValidationVerdict::from_diagnostics(diagnostics)
}

/// Fails each constrained column holding a non-null value outside its domain.
pub fn validate_categorical_values(
    dataset: &Dataset,
    schema: &SchemaDefinition,
) -> ValidationVerdict {
    let mut diagnostics = Vec::new();

    for domain in schema.categorical_values() {
        let Some(column) = dataset.column(&domain.column) else {
            continue;
        };
        let invalid: BTreeSet<String> = column
            .non_null()
            .filter_map(|v| v.literal())
            .filter(|lit| !domain.allowed.contains(lit))
            .collect();
        if !invalid.is_empty() {
            let invalid: Vec<_> = invalid.into_iter().collect();
            diagnostics.push(Diagnostic::new(
                Check::CategoricalValues,
                Some(&domain.column),
                format!("Column '{}' has invalid values: {invalid:?}", domain.column),
            ));
        }
    }

    ValidationVerdict::from_diagnostics(diagnostics)
}

/// Hashable identity of a cell for duplicate detection.
///
/// Numbers compare by value, so `1` and `1.0` are equal, and every kind of
/// missing value (null or NaN) is the same key.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Null,
    Number(u64),
    /// Integers beyond ±2^53, where f64 would merge neighbours.
    WideInteger(i64),
    Boolean(bool),
    Text(&'a str),
}

impl<'a> CellKey<'a> {
    fn of(value: &'a Value) -> Self {
        if value.is_null() {
            return CellKey::Null;
        }
        match value {
            Value::Integer(i) if i.unsigned_abs() > 1 << 53 => CellKey::WideInteger(*i),
            Value::Integer(i) => Self::number(*i as f64),
            Value::Float(f) => Self::number(*f),
            Value::Boolean(b) => CellKey::Boolean(*b),
            Value::Text(s) => CellKey::Text(s),
            Value::Null => CellKey::Null,
        }
    }

    fn number(f: f64) -> Self {
        // -0.0 == 0.0
        let f = if f == 0.0 { 0.0 } else { f };
        CellKey::Number(f.to_bits())
    }
}

/// Fails if any two rows are identical across all columns.
pub fn validate_duplicates(dataset: &Dataset) -> ValidationVerdict {
    let mut seen = HashSet::new();
    let mut duplicate_rows = 0;
    for row in dataset.rows() {
        let key: Vec<CellKey<'_>> = row.into_iter().map(CellKey::of).collect();
        if !seen.insert(key) {
            duplicate_rows += 1;
        }
    }

    let diagnostics = if duplicate_rows > 0 {
        vec![Diagnostic::new(
            Check::Duplicates,
            None,
            format!("Data has {duplicate_rows} duplicate rows"),
        )]
    } else {
        Vec::new()
    };
    ValidationVerdict::from_diagnostics(diagnostics)
}

/// Run every check against one dataset.
///
/// The column/type check gates the rest: when it fails, only its diagnostics
/// are returned. Otherwise the remaining checks all run and each failing
/// check contributes its own diagnostics.
pub fn validate_dataset(
    dataset: &Dataset,
    name: &str,
    schema: &SchemaDefinition,
    config: &ValidationConfig,
) -> DatasetVerdict {
    let mut verdict = DatasetVerdict::new(name);

    let structure = validate_columns_and_types(dataset, schema);
    if !structure.passed {
        verdict.absorb(structure);
        tracing::debug!(dataset = name, "Schema mismatch, skipping row-level checks");
        return verdict;
    }

    verdict.absorb(validate_missing_values(dataset, config.missing_threshold));
    verdict.absorb(validate_numeric_ranges(dataset, schema));
    verdict.absorb(validate_categorical_values(dataset, schema));
    verdict.absorb(validate_duplicates(dataset));

    tracing::debug!(
        dataset = name,
        passed = verdict.passed,
        diagnostics = verdict.diagnostics.len(),
        "Dataset validated"
    );
    verdict
}
