use crate::{BowError, Result};
use arrow_schema::{DataType, Field, SchemaRef, TimeUnit};
use indexmap::IndexMap;
use std::str::FromStr;
use std::sync::Arc;

/// Core schema representation: ordered, uniquely named, typed columns
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
}

/// A single named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Column types that delimited text can be coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    // Integer types
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // Floating point types
    Float32,
    Float64,

    // Other basic types
    Boolean,
    String,

    // Date/Time types
    Date32,
    TimestampSecond,
    TimestampMillis,
    TimestampMicros,
    TimestampNanos,
}

/// Declared column types for text input, keyed by column name
pub type ColumnTypes = IndexMap<String, PrimitiveType>;

impl Column {
    pub fn new<S: Into<String>>(name: S, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    fn to_arrow(&self) -> Field {
        Field::new(&self.name, self.data_type.clone(), self.nullable)
    }
}

impl Schema {
    /// Build a schema, rejecting duplicate column names
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(BowError::schema(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Derive a schema from the top-level fields of an Arrow schema
    pub fn from_arrow(schema: &arrow_schema::Schema) -> Result<Self> {
        Self::try_new(
            schema
                .fields()
                .iter()
                .map(|f| Column {
                    name: f.name().clone(),
                    data_type: f.data_type().clone(),
                    nullable: f.is_nullable(),
                })
                .collect(),
        )
    }

    pub fn to_arrow(&self) -> SchemaRef {
        Arc::new(arrow_schema::Schema::new(
            self.columns.iter().map(Column::to_arrow).collect::<Vec<_>>(),
        ))
    }

    /// The same columns, all nullable
    pub fn into_nullable(mut self) -> Self {
        for column in &mut self.columns {
            column.nullable = true;
        }
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check that `other` has the same column names, order and types.
    ///
    /// Nullability is not compared: text input is always nullable while
    /// files written by other tools may mark columns required.
    pub fn check_conforms(&self, other: &Schema) -> Result<()> {
        if self.columns.len() != other.columns.len() {
            return Err(BowError::schema_mismatch(format!(
                "expected {} columns [{}], got {} columns [{}]",
                self.columns.len(),
                self.names().join(", "),
                other.columns.len(),
                other.names().join(", ")
            )));
        }

        for (idx, (expected, actual)) in self.columns.iter().zip(&other.columns).enumerate() {
            if expected.name != actual.name {
                return Err(BowError::schema_mismatch(format!(
                    "column {} is named '{}', expected '{}'",
                    idx, actual.name, expected.name
                )));
            }
            if expected.data_type != actual.data_type {
                return Err(BowError::schema_mismatch(format!(
                    "column '{}' has type {}, expected {}",
                    actual.name, actual.data_type, expected.data_type
                )));
            }
        }
        Ok(())
    }
}

/// Builder for constructing schemas column by column
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column<S: Into<String>>(mut self, name: S, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    pub fn with_required_column<S: Into<String>>(mut self, name: S, data_type: DataType) -> Self {
        let mut column = Column::new(name, data_type);
        column.nullable = false;
        self.columns.push(column);
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::try_new(self.columns)
    }
}

impl PrimitiveType {
    /// Convert to the Arrow type text columns are stored as
    pub fn to_arrow(&self) -> DataType {
        match self {
            PrimitiveType::Int8 => DataType::Int8,
            PrimitiveType::Int16 => DataType::Int16,
            PrimitiveType::Int32 => DataType::Int32,
            PrimitiveType::Int64 => DataType::Int64,
            PrimitiveType::UInt8 => DataType::UInt8,
            PrimitiveType::UInt16 => DataType::UInt16,
            PrimitiveType::UInt32 => DataType::UInt32,
            PrimitiveType::UInt64 => DataType::UInt64,
            PrimitiveType::Float32 => DataType::Float32,
            PrimitiveType::Float64 => DataType::Float64,
            PrimitiveType::Boolean => DataType::Boolean,
            PrimitiveType::String => DataType::Utf8,
            PrimitiveType::Date32 => DataType::Date32,
            PrimitiveType::TimestampSecond => DataType::Timestamp(TimeUnit::Second, None),
            PrimitiveType::TimestampMillis => DataType::Timestamp(TimeUnit::Millisecond, None),
            PrimitiveType::TimestampMicros => DataType::Timestamp(TimeUnit::Microsecond, None),
            PrimitiveType::TimestampNanos => DataType::Timestamp(TimeUnit::Nanosecond, None),
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = BowError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => PrimitiveType::Boolean,
            "int8" => PrimitiveType::Int8,
            "int16" => PrimitiveType::Int16,
            "int32" => PrimitiveType::Int32,
            "int64" | "int" => PrimitiveType::Int64,
            "uint8" => PrimitiveType::UInt8,
            "uint16" => PrimitiveType::UInt16,
            "uint32" => PrimitiveType::UInt32,
            "uint64" => PrimitiveType::UInt64,
            "float32" => PrimitiveType::Float32,
            "float64" | "float" | "double" => PrimitiveType::Float64,
            "str" | "string" | "object" | "unicode" | "utf8" | "category" => {
                PrimitiveType::String
            }
            "date" | "date32" => PrimitiveType::Date32,
            "datetime64[s]" | "timestamp[s]" => PrimitiveType::TimestampSecond,
            "datetime64[ms]" | "timestamp[ms]" => PrimitiveType::TimestampMillis,
            "datetime64[us]" | "timestamp[us]" => PrimitiveType::TimestampMicros,
            "datetime64[ns]" | "timestamp[ns]" | "datetime64" | "datetime" | "timestamp" => {
                PrimitiveType::TimestampNanos
            }
            other => {
                return Err(BowError::invalid_argument(format!(
                    "unknown column type '{}'",
                    other
                )))
            }
        })
    }
}

/// Parse a flat JSON object of column name to type name
pub fn parse_column_types(json: &str) -> Result<ColumnTypes> {
    let raw: IndexMap<String, String> = serde_json::from_str(json)
        .map_err(|e| BowError::invalid_argument(format!("invalid schema JSON: {}", e)))?;

    raw.into_iter()
        .map(|(name, type_name)| Ok((name, type_name.parse()?)))
        .collect()
}
