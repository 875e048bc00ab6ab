//! Dataset and report persistence.
//!
//! The validation core only sees the [`DatasetReader`], [`DatasetWriter`] and
//! [`ReportWriter`] traits. [`CsvStore`] and [`YamlReportWriter`] are the
//! file-backed implementations used by the CLI.

use crate::dataset::{Column, Dataset, Value};
use crate::drift::DriftReport;
use crate::error::DataAccessError;
use std::io;
use std::path::Path;

/// Reads a complete dataset from a location. No partial reads.
pub trait DatasetReader: Send + Sync {
    fn read(&self, location: &Path) -> Result<Dataset, DataAccessError>;
}

/// Persists a dataset, overwriting any existing content at the location.
pub trait DatasetWriter: Send + Sync {
    fn write(&self, location: &Path, dataset: &Dataset) -> Result<(), DataAccessError>;
}

/// Persists a drift report in a structured serialization.
pub trait ReportWriter: Send + Sync {
    fn write_report(&self, location: &Path, report: &DriftReport) -> Result<(), DataAccessError>;
}

/// Atomically write raw bytes to a file.
///
/// Writes to a `.tmp` sibling file, then renames to the target path.
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CsvStore
// ---------------------------------------------------------------------------

/// CSV file reader and writer.
#[derive(Debug, Clone)]
pub struct CsvStore {
    pub delimiter: char,
}

impl Default for CsvStore {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvStore {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Parse CSV text into a dataset. `location` is only used in errors.
    pub fn parse(&self, content: &str, location: &Path) -> Result<Dataset, DataAccessError> {
        let malformed = |line: usize, message: String| DataAccessError::Malformed {
            location: location.to_path_buf(),
            line,
            message,
        };

        let mut records = split_records(content, self.delimiter)
            .map_err(|(line, message)| malformed(line, message))?
            .into_iter();

        let (_, header) = records
            .next()
            .ok_or_else(|| malformed(1, "missing header row".into()))?;
        let mut columns: Vec<Column> = header
            .iter()
            .map(|name| Column {
                name: name.trim().to_string(),
                values: Vec::new(),
            })
            .collect();

        for (line, record) in records {
            if record.len() != columns.len() {
                return Err(malformed(
                    line,
                    format!("expected {} fields, found {}", columns.len(), record.len()),
                ));
            }
            for (column, raw) in columns.iter_mut().zip(&record) {
                column.values.push(Value::parse_cell(raw));
            }
        }

        Dataset::new(columns)
    }

    /// Render a dataset as CSV text.
    pub fn render(&self, dataset: &Dataset) -> String {
        let mut out = String::new();
        let header: Vec<String> = dataset
            .columns()
            .iter()
            .map(|c| self.escape(&c.name))
            .collect();
        out.push_str(&header.join(&self.delimiter.to_string()));
        out.push('\n');

        for row in dataset.rows() {
            let fields: Vec<String> = row.iter().map(|v| self.format_cell(v)).collect();
            out.push_str(&fields.join(&self.delimiter.to_string()));
            out.push('\n');
        }
        out
    }

    fn format_cell(&self, value: &Value) -> String {
        if value.is_null() {
            return String::new();
        }
        match value {
            Value::Integer(i) => i.to_string(),
            // Debug keeps a decimal point so the value reads back as a float.
            Value::Float(f) => format!("{f:?}"),
            Value::Boolean(b) => b.to_string(),
            Value::Text(s) => self.escape(s),
            Value::Null => String::new(),
        }
    }

    fn escape(&self, field: &str) -> String {
        let needs_quotes = field.contains(self.delimiter)
            || field.contains(['"', '\n', '\r'])
            || field.trim() != field;
        if needs_quotes {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl DatasetReader for CsvStore {
    fn read(&self, location: &Path) -> Result<Dataset, DataAccessError> {
        tracing::info!(path = %location.display(), "Reading dataset");
        let content = std::fs::read_to_string(location)
            .map_err(|e| DataAccessError::io(location, e))?;
        let dataset = self.parse(&content, location)?;
        tracing::debug!(
            path = %location.display(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Dataset loaded"
        );
        Ok(dataset)
    }
}

impl DatasetWriter for CsvStore {
    fn write(&self, location: &Path, dataset: &Dataset) -> Result<(), DataAccessError> {
        atomic_write(location, self.render(dataset).as_bytes())
            .map_err(|e| DataAccessError::io(location, e))?;
        tracing::debug!(path = %location.display(), rows = dataset.row_count(), "Dataset written");
        Ok(())
    }
}

/// Split CSV text into records, tracking the line each record starts on.
///
/// Handles quoted fields (embedded delimiters, newlines and doubled quotes),
/// CRLF line endings and blank lines.
fn split_records(
    content: &str,
    delimiter: char,
) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() && !quoted => {
                field.clear();
                in_quotes = true;
                quoted = true;
            }
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                let blank = record.len() == 1 && record[0].trim().is_empty() && !quoted;
                if blank {
                    record.clear();
                } else {
                    records.push((record_line, std::mem::take(&mut record)));
                }
                quoted = false;
                line += 1;
                record_line = line;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                quoted = false;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err((record_line, "unterminated quoted field".into()));
    }
    if !record.is_empty() || !field.trim().is_empty() || quoted {
        record.push(field);
        records.push((record_line, record));
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// YamlReportWriter
// ---------------------------------------------------------------------------

/// Writes drift reports as YAML.
#[derive(Debug, Clone, Default)]
pub struct YamlReportWriter;

impl ReportWriter for YamlReportWriter {
    fn write_report(&self, location: &Path, report: &DriftReport) -> Result<(), DataAccessError> {
        let yaml = serde_yaml::to_string(report).map_err(|e| DataAccessError::Serialize {
            location: location.to_path_buf(),
            message: e.to_string(),
        })?;
        atomic_write(location, yaml.as_bytes()).map_err(|e| DataAccessError::io(location, e))?;
        tracing::info!(path = %location.display(), columns = report.len(), "Drift report written");
        Ok(())
    }
}

/// Load a drift report previously written by [`YamlReportWriter`].
pub fn read_report(location: &Path) -> Result<DriftReport, DataAccessError> {
    let content =
        std::fs::read_to_string(location).map_err(|e| DataAccessError::io(location, e))?;
    serde_yaml::from_str(&content).map_err(|e| DataAccessError::Malformed {
        location: location.to_path_buf(),
        line: e.location().map_or(0, |l| l.line()),
        message: e.to_string(),
    })
}
