//! File-level metadata and its human-readable rendering

use crate::{Result, Schema};
use arrow_schema::{DataType, TimeUnit};
use parquet::file::metadata::{KeyValue, ParquetMetaData};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Key-value metadata entry written by pandas and by this crate
pub const PANDAS_METADATA_KEY: &str = "pandas";

/// Read-only summary of a Parquet footer
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub created_by: Option<String>,
    pub format_version: i32,
    pub num_rows: i64,
    pub num_columns: usize,
    pub row_groups: Vec<RowGroupStats>,
    pub key_value: Vec<(String, Option<String>)>,
}

/// Byte and row statistics for one row group
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroupStats {
    pub num_rows: i64,
    pub num_columns: usize,
    pub total_byte_size: i64,
    pub compressed_size: i64,
}

impl FileMetadata {
    pub fn from_parquet(metadata: &ParquetMetaData) -> Self {
        let file_metadata = metadata.file_metadata();
        let row_groups = metadata
            .row_groups()
            .iter()
            .map(|rg| RowGroupStats {
                num_rows: rg.num_rows(),
                num_columns: rg.num_columns(),
                total_byte_size: rg.total_byte_size(),
                compressed_size: rg.compressed_size(),
            })
            .collect();

        let key_value = file_metadata
            .key_value_metadata()
            .map(|kvs| {
                kvs.iter()
                    .map(|kv| (kv.key.clone(), kv.value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            created_by: file_metadata.created_by().map(str::to_string),
            format_version: file_metadata.version(),
            num_rows: file_metadata.num_rows(),
            num_columns: file_metadata.schema_descr().num_columns(),
            row_groups,
            key_value,
        }
    }

    pub fn num_row_groups(&self) -> usize {
        self.row_groups.len()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.key_value
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Index column names recorded in the pandas metadata entry
    pub fn index_columns(&self) -> Vec<String> {
        self.value(PANDAS_METADATA_KEY)
            .map(index_columns_from_pandas)
            .unwrap_or_default()
    }
}

impl fmt::Display for FileMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<FileMetaData>")?;
        writeln!(
            f,
            "  created_by: {}",
            self.created_by.as_deref().unwrap_or("unknown")
        )?;
        writeln!(f, "  num_columns: {}", self.num_columns)?;
        writeln!(f, "  num_rows: {}", self.num_rows)?;
        writeln!(f, "  num_row_groups: {}", self.row_groups.len())?;
        write!(f, "  format_version: {}", format_version(self.format_version))?;
        for (ordinal, rg) in self.row_groups.iter().enumerate() {
            write!(
                f,
                "\n  row_group {}: num_rows={} total_byte_size={} compressed_size={}",
                ordinal, rg.num_rows, rg.total_byte_size, rg.compressed_size
            )?;
        }
        Ok(())
    }
}

fn format_version(version: i32) -> &'static str {
    match version {
        1 => "1.0",
        2 => "2.6",
        _ => "unknown",
    }
}

/// Renders a schema one `name: type` line per column, followed by the
/// schema-level key-value metadata keys
pub struct SchemaDisplay<'a> {
    schema: &'a Schema,
    metadata: &'a FileMetadata,
}

impl fmt::Display for SchemaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::with_capacity(self.schema.len());
        for column in self.schema.columns() {
            let mut line = format!("{}: {}", column.name, type_name(&column.data_type));
            if !column.nullable {
                line.push_str(" not null");
            }
            lines.push(line);
        }
        write!(f, "{}", lines.join("\n"))?;

        if !self.metadata.key_value.is_empty() {
            write!(f, "\n-- schema metadata --")?;
            for (key, value) in &self.metadata.key_value {
                let len = value.as_ref().map_or(0, String::len);
                write!(f, "\n{}: {} bytes", key, len)?;
            }
        }
        Ok(())
    }
}

pub fn format_metadata(metadata: &FileMetadata) -> String {
    metadata.to_string()
}

pub fn format_schema(schema: &Schema, metadata: &FileMetadata) -> String {
    SchemaDisplay { schema, metadata }.to_string()
}

/// Display name for an Arrow type, using the short lowercase spellings
pub fn type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Boolean => "bool".to_string(),
        DataType::Int8 => "int8".to_string(),
        DataType::Int16 => "int16".to_string(),
        DataType::Int32 => "int32".to_string(),
        DataType::Int64 => "int64".to_string(),
        DataType::UInt8 => "uint8".to_string(),
        DataType::UInt16 => "uint16".to_string(),
        DataType::UInt32 => "uint32".to_string(),
        DataType::UInt64 => "uint64".to_string(),
        DataType::Float16 => "halffloat".to_string(),
        DataType::Float32 => "float".to_string(),
        DataType::Float64 => "double".to_string(),
        DataType::Utf8 => "string".to_string(),
        DataType::LargeUtf8 => "large_string".to_string(),
        DataType::Binary => "binary".to_string(),
        DataType::LargeBinary => "large_binary".to_string(),
        DataType::Date32 => "date32[day]".to_string(),
        DataType::Date64 => "date64[ms]".to_string(),
        DataType::Timestamp(unit, tz) => {
            let unit = match unit {
                TimeUnit::Second => "s",
                TimeUnit::Millisecond => "ms",
                TimeUnit::Microsecond => "us",
                TimeUnit::Nanosecond => "ns",
            };
            match tz {
                Some(tz) => format!("timestamp[{}, tz={}]", unit, tz),
                None => format!("timestamp[{}]", unit),
            }
        }
        DataType::Decimal128(precision, scale) => format!("decimal128({}, {})", precision, scale),
        DataType::List(item) => format!("list<item: {}>", type_name(item.data_type())),
        other => other.to_string(),
    }
}

// The subset of the pandas entry this crate writes
#[derive(Debug, Serialize)]
struct PandasMetadata {
    index_columns: Vec<String>,
    column_indexes: Vec<Value>,
    columns: Vec<PandasColumn>,
    creator: Value,
}

#[derive(Debug, Serialize)]
struct PandasColumn {
    name: Option<String>,
    field_name: String,
    pandas_type: String,
    numpy_type: String,
    metadata: Option<Value>,
}

/// Extract named index columns from a pandas metadata entry.
///
/// Range indexes are stored as objects rather than names and are skipped,
/// as is an entry that does not parse.
pub fn index_columns_from_pandas(json: &str) -> Vec<String> {
    let meta: Value = match serde_json::from_str(json) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!("ignoring unparseable pandas metadata: {}", e);
            return Vec::new();
        }
    };

    meta.get("index_columns")
        .and_then(Value::as_array)
        .map(|columns| {
            columns
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Build the pandas metadata entry recording `index_columns` for `schema`
pub fn pandas_metadata(schema: &Schema, index_columns: &[String]) -> Result<KeyValue> {
    let columns = schema
        .columns()
        .iter()
        .map(|column| {
            let (pandas_type, numpy_type) = pandas_types(&column.data_type);
            PandasColumn {
                name: Some(column.name.clone()),
                field_name: column.name.clone(),
                pandas_type: pandas_type.to_string(),
                numpy_type: numpy_type.to_string(),
                metadata: None,
            }
        })
        .collect();

    let meta = PandasMetadata {
        index_columns: index_columns.to_vec(),
        column_indexes: Vec::new(),
        columns,
        creator: serde_json::json!({
            "library": "bow",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    };

    let value = serde_json::to_string(&meta)
        .map_err(|e| crate::BowError::format(format!("cannot encode pandas metadata: {}", e)))?;
    Ok(KeyValue::new(PANDAS_METADATA_KEY.to_string(), value))
}

fn pandas_types(data_type: &DataType) -> (&'static str, &'static str) {
    match data_type {
        DataType::Boolean => ("bool", "bool"),
        DataType::Int8 => ("int8", "int8"),
        DataType::Int16 => ("int16", "int16"),
        DataType::Int32 => ("int32", "int32"),
        DataType::Int64 => ("int64", "int64"),
        DataType::UInt8 => ("uint8", "uint8"),
        DataType::UInt16 => ("uint16", "uint16"),
        DataType::UInt32 => ("uint32", "uint32"),
        DataType::UInt64 => ("uint64", "uint64"),
        DataType::Float32 => ("float32", "float32"),
        DataType::Float64 => ("float64", "float64"),
        DataType::Utf8 | DataType::LargeUtf8 => ("unicode", "object"),
        DataType::Date32 | DataType::Date64 => ("date", "object"),
        DataType::Timestamp(unit, _) => (
            "datetime",
            match unit {
                TimeUnit::Second => "datetime64[s]",
                TimeUnit::Millisecond => "datetime64[ms]",
                TimeUnit::Microsecond => "datetime64[us]",
                TimeUnit::Nanosecond => "datetime64[ns]",
            },
        ),
        _ => ("object", "object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SchemaBuilder;

    #[test]
    fn test_index_columns_from_pandas() {
        let json = r#"{"index_columns": ["id", {"kind": "range", "start": 0}], "columns": []}"#;
        assert_eq!(index_columns_from_pandas(json), vec!["id".to_string()]);
        assert!(index_columns_from_pandas("not json").is_empty());
    }

    #[test]
    fn test_pandas_metadata_round_trip() {
        let schema = SchemaBuilder::new()
            .with_column("id", DataType::Int64)
            .with_column("name", DataType::Utf8)
            .build()
            .unwrap();
        let kv = pandas_metadata(&schema, &["id".to_string()]).unwrap();
        assert_eq!(kv.key, PANDAS_METADATA_KEY);
        let value = kv.value.unwrap();
        assert_eq!(index_columns_from_pandas(&value), vec!["id".to_string()]);
        assert!(value.contains("\"numpy_type\":\"object\""));
    }

    #[test]
    fn test_pandas_timestamp_types_follow_unit() {
        let schema = SchemaBuilder::new()
            .with_column("at", DataType::Timestamp(TimeUnit::Millisecond, None))
            .build()
            .unwrap();
        let value = pandas_metadata(&schema, &[]).unwrap().value.unwrap();
        assert!(value.contains("\"numpy_type\":\"datetime64[ms]\""));

        assert_eq!(
            pandas_types(&DataType::Timestamp(TimeUnit::Second, None)).1,
            "datetime64[s]"
        );
        assert_eq!(
            pandas_types(&DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into()))).1,
            "datetime64[ns]"
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&DataType::Utf8), "string");
        assert_eq!(
            type_name(&DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))),
            "timestamp[ms, tz=UTC]"
        );
    }

    #[test]
    fn test_format_schema() {
        let schema = SchemaBuilder::new()
            .with_column("a", DataType::Int64)
            .with_required_column("b", DataType::Utf8)
            .build()
            .unwrap();
        let metadata = FileMetadata {
            created_by: None,
            format_version: 1,
            num_rows: 0,
            num_columns: 2,
            row_groups: Vec::new(),
            key_value: vec![("pandas".to_string(), Some("{}".to_string()))],
        };
        assert_eq!(
            format_schema(&schema, &metadata),
            "a: int64\nb: string not null\n-- schema metadata --\npandas: 2 bytes"
        );
        assert!(format_metadata(&metadata).contains("num_row_groups: 0"));
    }
}
