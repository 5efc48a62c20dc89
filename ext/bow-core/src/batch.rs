//! The unit of transfer between pipeline stages

use crate::{Result, Schema};
use arrow::record_batch::RecordBatch;
use arrow_array::ArrayRef;
use arrow_schema::SchemaRef;
use std::sync::Arc;

/// An immutable batch of rows across named, typed columns.
///
/// Wraps an Arrow [`RecordBatch`] together with the names of columns that
/// carry the stored index marker.
#[derive(Debug, Clone)]
pub struct RowBatch {
    inner: RecordBatch,
    index_columns: Arc<[String]>,
}

impl RowBatch {
    pub fn new(inner: RecordBatch) -> Self {
        Self {
            inner,
            index_columns: Arc::from(Vec::new()),
        }
    }

    /// Attach index column names, keeping only those present in the batch
    pub fn with_index_columns(mut self, index_columns: Arc<[String]>) -> Self {
        let schema = self.inner.schema_ref();
        self.index_columns = index_columns
            .iter()
            .filter(|name| schema.index_of(name).is_ok())
            .cloned()
            .collect();
        self
    }

    pub fn num_rows(&self) -> usize {
        self.inner.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.inner.num_columns()
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        self.inner.schema()
    }

    pub fn schema(&self) -> Result<Schema> {
        Schema::from_arrow(&self.inner.schema())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.inner
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn column(&self, idx: usize) -> &ArrayRef {
        self.inner.column(idx)
    }

    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.inner
    }
}

impl From<RecordBatch> for RowBatch {
    fn from(inner: RecordBatch) -> Self {
        RowBatch::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Int64Array, StringArray};

    fn sample() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_index_columns_filtered_to_batch() {
        let batch = RowBatch::new(sample())
            .with_index_columns(Arc::from(vec!["id".to_string(), "gone".to_string()]));
        assert_eq!(batch.index_columns(), ["id".to_string()]);
        assert_eq!(batch.column_names(), vec!["id", "name"]);
        assert_eq!(batch.num_rows(), 2);
    }
}
