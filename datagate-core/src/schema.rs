//! Schema definition and the registry that loads it.
//!
//! A schema is a YAML mapping with an ordered `columns` section (name to type
//! tag) and optional `numeric_limits` and `categorical_values` sections. It is
//! loaded once per run and shared read-only.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as Yaml};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Declared primitive type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
}

impl ColumnType {
    /// Resolve a type tag. Accepts the numpy-style spellings (`int64`,
    /// `float64`, `object`) as well as the plain names.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "int" | "int32" | "int64" | "integer" => Some(Self::Integer),
            "float" | "float32" | "float64" | "double" => Some(Self::Float),
            "str" | "string" | "object" | "category" => Some(Self::String),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Whether values of the `observed` type satisfy this declared type.
    ///
    /// A float column accepts integers; an integer column does not accept floats.
    pub fn accepts(self, observed: ColumnType) -> bool {
        self == observed || (self == Self::Float && observed == Self::Integer)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Statistical treatment of the column in drift detection.
    pub fn kind(self) -> ColumnKind {
        if self.is_numeric() {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Numeric columns are compared by distribution, everything else by frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Inclusive bounds for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericLimit {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// Allowed literal values for a categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalDomain {
    pub column: String,
    pub allowed: BTreeSet<String>,
}

/// Immutable schema definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefinition {
    columns: Vec<ColumnSchema>,
    numeric_limits: Vec<NumericLimit>,
    categorical_values: Vec<CategoricalDomain>,
}

impl SchemaDefinition {
    /// Build a schema, enforcing that every constrained column is declared.
    pub fn new(
        columns: Vec<ColumnSchema>,
        numeric_limits: Vec<NumericLimit>,
        categorical_values: Vec<CategoricalDomain>,
    ) -> Result<Self, ConfigError> {
        if columns.is_empty() {
            return Err(ConfigError::invalid(
                "schema must declare at least one column",
            ));
        }

        for limit in &numeric_limits {
            let declared = columns
                .iter()
                .find(|c| c.name == limit.column)
                .ok_or_else(|| ConfigError::UnknownColumn {
                    section: "numeric_limits".into(),
                    column: limit.column.clone(),
                })?;
            if !declared.dtype.is_numeric() {
                return Err(ConfigError::InvalidLimits {
                    column: limit.column.clone(),
                    reason: format!("declared type {} is not numeric", declared.dtype),
                });
            }
            if limit.min.is_nan() || limit.max.is_nan() || limit.min > limit.max {
                return Err(ConfigError::InvalidLimits {
                    column: limit.column.clone(),
                    reason: format!("min {} must not exceed max {}", limit.min, limit.max),
                });
            }
        }

        for domain in &categorical_values {
            if !columns.iter().any(|c| c.name == domain.column) {
                return Err(ConfigError::UnknownColumn {
                    section: "categorical_values".into(),
                    column: domain.column.clone(),
                });
            }
        }

        Ok(Self {
            columns,
            numeric_limits,
            categorical_values,
        })
    }

    /// Parse a schema from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let root: Yaml =
            serde_yaml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))?;
        let root = root.as_mapping().ok_or_else(|| ConfigError::NotAMapping {
            section: "<root>".into(),
        })?;

        let columns = match root.get("columns") {
            Some(section) => parse_columns(section)?,
            None => {
                return Err(ConfigError::invalid(
                    "missing required section 'columns'",
                ));
            }
        };
        let numeric_limits = match root.get("numeric_limits") {
            Some(section) => parse_numeric_limits(section)?,
            None => Vec::new(),
        };
        let categorical_values = match root.get("categorical_values") {
            Some(section) => parse_categorical_values(section)?,
            None => Vec::new(),
        };

        Self::new(columns, numeric_limits, categorical_values)
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn numeric_limits(&self) -> &[NumericLimit] {
        &self.numeric_limits
    }

    pub fn categorical_values(&self) -> &[CategoricalDomain] {
        &self.categorical_values
    }
}

/// Section entries may be null in hand-written YAML (`numeric_limits:`).
fn section_mapping<'a>(section: &'a Yaml, name: &str) -> Result<Option<&'a Mapping>, ConfigError> {
    match section {
        Yaml::Null => Ok(None),
        Yaml::Mapping(m) => Ok(Some(m)),
        _ => Err(ConfigError::NotAMapping {
            section: name.into(),
        }),
    }
}

fn key_name(key: &Yaml, section: &str) -> Result<String, ConfigError> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        _ => Err(ConfigError::parse(format!(
            "non-scalar column name in section '{section}'"
        ))),
    }
}

fn parse_columns(section: &Yaml) -> Result<Vec<ColumnSchema>, ConfigError> {
    let Some(mapping) = section_mapping(section, "columns")? else {
        return Ok(Vec::new());
    };
    mapping
        .iter()
        .map(|(key, tag)| {
            let name = key_name(key, "columns")?;
            let tag = tag.as_str().ok_or_else(|| ConfigError::UnknownType {
                column: name.clone(),
                tag: format!("{tag:?}"),
            })?;
            let dtype = ColumnType::from_tag(tag).ok_or_else(|| ConfigError::UnknownType {
                column: name.clone(),
                tag: tag.to_string(),
            })?;
            Ok(ColumnSchema { name, dtype })
        })
        .collect()
}

fn parse_numeric_limits(section: &Yaml) -> Result<Vec<NumericLimit>, ConfigError> {
    let Some(mapping) = section_mapping(section, "numeric_limits")? else {
        return Ok(Vec::new());
    };
    mapping
        .iter()
        .map(|(key, bounds)| {
            let column = key_name(key, "numeric_limits")?;
            let invalid = |reason: &str| ConfigError::InvalidLimits {
                column: column.clone(),
                reason: reason.to_string(),
            };
            let seq = bounds
                .as_sequence()
                .ok_or_else(|| invalid("expected a [min, max] list"))?;
            let [lo, hi] = seq.as_slice() else {
                return Err(invalid("expected exactly two bounds"));
            };
            let min = lo.as_f64().ok_or_else(|| invalid("lower bound is not a number"))?;
            let max = hi.as_f64().ok_or_else(|| invalid("upper bound is not a number"))?;
            Ok(NumericLimit { column, min, max })
        })
        .collect()
}

fn parse_categorical_values(section: &Yaml) -> Result<Vec<CategoricalDomain>, ConfigError> {
    let Some(mapping) = section_mapping(section, "categorical_values")? else {
        return Ok(Vec::new());
    };
    mapping
        .iter()
        .map(|(key, values)| {
            let column = key_name(key, "categorical_values")?;
            let invalid = |reason: String| ConfigError::InvalidCategories {
                column: column.clone(),
                reason,
            };
            let seq = values
                .as_sequence()
                .ok_or_else(|| invalid("expected a list of allowed values".into()))?;
            let allowed = seq
                .iter()
                .map(|v| scalar_literal(v).ok_or_else(|| invalid(format!("{v:?} is not a scalar"))))
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(CategoricalDomain { column, allowed })
        })
        .collect()
}

/// Canonical literal for a YAML scalar, matching [`crate::dataset::Value::literal`].
fn scalar_literal(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| f.to_string()),
        },
        _ => None,
    }
}

/// Loads a schema definition once and hands out shared read-only access.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    path: PathBuf,
    schema: Arc<SchemaDefinition>,
}

impl SchemaRegistry {
    /// Load and validate the schema file at `path`. Errors are not retried.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let schema = SchemaDefinition::from_yaml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            columns = schema.columns().len(),
            numeric_limits = schema.numeric_limits().len(),
            categorical_values = schema.categorical_values().len(),
            "Loaded schema definition"
        );
        Ok(Self {
            path,
            schema: Arc::new(schema),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn shared(&self) -> Arc<SchemaDefinition> {
        Arc::clone(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
columns:
  age: int64
  income: float64
  segment: object
  active: bool
numeric_limits:
  age: [0, 120]
  income: [0.0, 1000000.5]
categorical_values:
  segment: [retail, corporate]
  active: [true, false]
"#;

    #[test]
    fn test_parse_schema_preserves_order() {
        let schema = SchemaDefinition::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(
            schema.column_names(),
            vec!["age", "income", "segment", "active"]
        );
        assert_eq!(schema.column("income").unwrap().dtype, ColumnType::Float);
        assert_eq!(schema.column("segment").unwrap().dtype, ColumnType::String);
        assert_eq!(
            schema.numeric_limits()[0],
            NumericLimit {
                column: "age".into(),
                min: 0.0,
                max: 120.0
            }
        );
        let active = &schema.categorical_values()[1];
        assert!(active.allowed.contains("true"));
        assert!(active.allowed.contains("false"));
    }

    #[test]
    fn test_type_acceptance() {
        assert!(ColumnType::Float.accepts(ColumnType::Integer));
        assert!(!ColumnType::Integer.accepts(ColumnType::Float));
        assert!(!ColumnType::String.accepts(ColumnType::Integer));
        assert!(ColumnType::Boolean.accepts(ColumnType::Boolean));
        assert_eq!(ColumnType::Integer.kind(), ColumnKind::Numeric);
        assert_eq!(ColumnType::Boolean.kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_cross_reference_violation() {
        let yaml = "columns:\n  a: int\nnumeric_limits:\n  b: [0, 1]\n";
        let err = SchemaDefinition::from_yaml_str(yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::UnknownColumn { ref section, ref column } if section == "numeric_limits" && column == "b")
        );

        let yaml = "columns:\n  a: int\ncategorical_values:\n  z: [x]\n";
        let err = SchemaDefinition::from_yaml_str(yaml).unwrap_err();
        assert_eq!(err.column(), Some("z"));
    }

    #[test]
    fn test_not_a_mapping() {
        let err = SchemaDefinition::from_yaml_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { .. }));

        let err = SchemaDefinition::from_yaml_str("columns: [a, b]\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { ref section } if section == "columns"));
    }

    #[test]
    fn test_unknown_type_tag() {
        let err = SchemaDefinition::from_yaml_str("columns:\n  a: complex128\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType { ref tag, .. } if tag == "complex128"));
    }

    #[test]
    fn test_invalid_limits() {
        let inverted = "columns:\n  a: float\nnumeric_limits:\n  a: [5, 1]\n";
        assert!(matches!(
            SchemaDefinition::from_yaml_str(inverted).unwrap_err(),
            ConfigError::InvalidLimits { .. }
        ));

        let short = "columns:\n  a: float\nnumeric_limits:\n  a: [5]\n";
        assert!(matches!(
            SchemaDefinition::from_yaml_str(short).unwrap_err(),
            ConfigError::InvalidLimits { .. }
        ));

        let on_text = "columns:\n  a: str\nnumeric_limits:\n  a: [0, 1]\n";
        assert!(matches!(
            SchemaDefinition::from_yaml_str(on_text).unwrap_err(),
            ConfigError::InvalidLimits { .. }
        ));
    }

    #[test]
    fn test_missing_columns_section() {
        let err = SchemaDefinition::from_yaml_str("numeric_limits: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_registry_load_missing_file() {
        let err = SchemaRegistry::load("/nonexistent/schema.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_registry_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, SCHEMA).unwrap();

        let registry = SchemaRegistry::load(&path).unwrap();
        assert_eq!(registry.path(), path.as_path());
        assert_eq!(registry.schema().columns().len(), 4);
        let shared = registry.shared();
        assert_eq!(shared.column_names(), registry.schema().column_names());
    }
}
