//! In-memory tabular datasets and cell-level type inference.

use crate::error::DataAccessError;
use crate::schema::ColumnType;
use serde::{Deserialize, Serialize};

/// Markers read as missing values, in addition to the empty string.
const NA_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Parse a raw text cell, inferring the narrowest type.
    pub fn parse_cell(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || NA_MARKERS.contains(&s) {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return if f.is_nan() {
                Value::Null
            } else {
                Value::Float(f)
            };
        }
        match s {
            "true" | "True" | "TRUE" => Value::Boolean(true),
            "false" | "False" | "FALSE" => Value::Boolean(false),
            _ => Value::Text(s.to_string()),
        }
    }

    /// NaN floats count as missing.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Runtime type of a non-null value.
    pub fn dtype(&self) -> Option<ColumnType> {
        if self.is_null() {
            return None;
        }
        Some(match self {
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::String,
            Value::Null => return None,
        })
    }

    /// Canonical literal used for categorical comparisons and frequency counts.
    pub fn literal(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        match self {
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Null => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Infer a column's runtime type from its non-null values.
///
/// Any text makes the column a string column, as does mixing booleans with
/// numbers. Integers widen to float when both appear. Returns `None` when the
/// column holds no non-null value.
pub fn infer_column_type(values: &[Value]) -> Option<ColumnType> {
    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;

    for v in values {
        match v.dtype() {
            Some(ColumnType::String) => return Some(ColumnType::String),
            Some(ColumnType::Float) => has_float = true,
            Some(ColumnType::Integer) => has_int = true,
            Some(ColumnType::Boolean) => has_bool = true,
            None => {}
        }
    }

    if has_bool && (has_int || has_float) {
        return Some(ColumnType::String);
    }
    if has_float {
        return Some(ColumnType::Float);
    }
    if has_int {
        return Some(ColumnType::Integer);
    }
    has_bool.then_some(ColumnType::Boolean)
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new<V: Into<Value>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dtype(&self) -> Option<ColumnType> {
        infer_column_type(&self.values)
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    pub fn non_null(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_null())
    }
}

/// An ordered set of equal-length columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset, rejecting columns of unequal length.
    pub fn new(columns: Vec<Column>) -> Result<Self, DataAccessError> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(DataAccessError::Ragged {
                column: bad.name.clone(),
                expected: row_count,
                found: bad.values.len(),
            });
        }
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Borrow row `index` across all columns.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        (index < self.row_count).then(|| self.columns.iter().map(|c| &c.values[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count).map(|i| self.columns.iter().map(|c| &c.values[i]).collect())
    }
}
