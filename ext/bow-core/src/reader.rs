//! Row-group-at-a-time Parquet reading

use crate::{BowError, FileMetadata, Result, RowBatch, Schema};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use arrow_schema::{ArrowError, SchemaRef};
use bytes::Bytes;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder,
};
use parquet::arrow::ProjectionMask;
use parquet::file::reader::{ChunkReader, Length};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Random-access input shared by every row-group read of a [`Reader`]
///
/// Either a file opened once, or a stream read fully into memory since the
/// footer sits at the end of the input.
#[derive(Clone)]
pub enum InputSource {
    File(Arc<File>),
    Memory(Bytes),
}

impl InputSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BowError::open_failed(path, e))?;
        Ok(InputSource::File(Arc::new(file)))
    }

    /// Buffer an entire stream, such as standard input
    pub fn from_reader<R: Read>(mut input: R) -> Result<Self> {
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer)?;
        Ok(InputSource::Memory(Bytes::from(buffer)))
    }
}

impl Length for InputSource {
    fn len(&self) -> u64 {
        match self {
            InputSource::File(file) => file.as_ref().len(),
            InputSource::Memory(bytes) => bytes.len() as u64,
        }
    }
}

impl ChunkReader for InputSource {
    type T = Box<dyn Read + Send>;

    fn get_read(&self, start: u64) -> parquet::errors::Result<Self::T> {
        Ok(match self {
            InputSource::File(file) => Box::new(file.as_ref().get_read(start)?),
            InputSource::Memory(bytes) => Box::new(bytes.get_read(start)?),
        })
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        match self {
            InputSource::File(file) => file.as_ref().get_bytes(start, length),
            InputSource::Memory(bytes) => bytes.get_bytes(start, length),
        }
    }
}

/// Parquet reader exposing the footer and a lazy sequence of row groups
///
/// The footer is parsed once in [`Reader::new`]; metadata and schema
/// access never touch the input again.
pub struct Reader<R> {
    input: R,
    arrow_metadata: ArrowReaderMetadata,
    metadata: FileMetadata,
    schema: Schema,
    index_columns: Arc<[String]>,
}

impl Reader<InputSource> {
    /// Open a Parquet file by path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Reader::new(InputSource::open(path)?)
    }

    /// Read a whole stream into memory and parse it
    pub fn from_stream<S: Read>(input: S) -> Result<Self> {
        Reader::new(InputSource::from_reader(input)?)
    }
}

impl<R> Reader<R>
where
    R: ChunkReader + Clone + 'static,
{
    /// Create a reader over any source, parsing the footer
    pub fn new(input: R) -> Result<Self> {
        let arrow_metadata = ArrowReaderMetadata::load(&input, ArrowReaderOptions::new())
            .map_err(|e| BowError::format(format!("cannot read Parquet footer: {}", e)))?;

        let metadata = FileMetadata::from_parquet(arrow_metadata.metadata());
        let schema = Schema::from_arrow(arrow_metadata.schema())?;
        let index_columns: Arc<[String]> = metadata
            .index_columns()
            .into_iter()
            .filter(|name| schema.index_of(name).is_some())
            .collect();

        tracing::debug!(
            row_groups = metadata.num_row_groups(),
            rows = metadata.num_rows,
            columns = schema.len(),
            "opened parquet input"
        );

        Ok(Self {
            input,
            arrow_metadata,
            metadata,
            schema,
            index_columns,
        })
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.num_row_groups()
    }

    /// Stored index columns named by the file's pandas metadata
    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    /// Iterate over all columns, one batch per row group
    ///
    /// Each call starts again from the first row group.
    pub fn iterate(&mut self) -> RowGroupCursor<'_, R> {
        let projected = Arc::clone(self.arrow_metadata.schema());
        self.cursor(ProjectionMask::all(), projected)
    }

    /// Iterate over a subset of columns, one batch per row group
    ///
    /// Batches hold the requested columns in schema order.
    pub fn iterate_columns(&mut self, columns: &[&str]) -> Result<RowGroupCursor<'_, R>> {
        let mut indices = Vec::with_capacity(columns.len());
        for name in columns {
            let idx = self
                .schema
                .index_of(name)
                .ok_or_else(|| BowError::ColumnNotFound(name.to_string()))?;
            indices.push(idx);
        }
        indices.sort_unstable();
        indices.dedup();

        let projected = Arc::new(self.arrow_metadata.schema().project(&indices)?);
        let mask = ProjectionMask::roots(self.arrow_metadata.parquet_schema(), indices);
        Ok(self.cursor(mask, projected))
    }

    fn cursor(&mut self, projection: ProjectionMask, schema: SchemaRef) -> RowGroupCursor<'_, R> {
        RowGroupCursor {
            total: self.num_row_groups(),
            next: 0,
            reader: &*self,
            projection,
            schema,
        }
    }
}

/// Position of one traversal over the row groups of a [`Reader`]
pub struct RowGroupCursor<'a, R> {
    reader: &'a Reader<R>,
    projection: ProjectionMask,
    schema: SchemaRef,
    next: usize,
    total: usize,
}

impl<R> RowGroupCursor<'_, R>
where
    R: ChunkReader + Clone + 'static,
{
    /// Index of the row group the next call to `next` reads
    pub fn position(&self) -> usize {
        self.next
    }

    fn read_row_group(&self, idx: usize) -> Result<RecordBatch> {
        let rows = self.reader.metadata.row_groups[idx].num_rows.max(0) as usize;

        let mut batches = ParquetRecordBatchReaderBuilder::new_with_metadata(
            self.reader.input.clone(),
            self.reader.arrow_metadata.clone(),
        )
        .with_row_groups(vec![idx])
        .with_projection(self.projection.clone())
        .with_batch_size(rows.max(1))
        .build()?
        .collect::<std::result::Result<Vec<_>, ArrowError>>()?;

        tracing::debug!(row_group = idx, rows, "read row group");

        Ok(match batches.len() {
            0 => RecordBatch::new_empty(Arc::clone(&self.schema)),
            1 => batches.remove(0),
            _ => concat_batches(&batches[0].schema(), &batches)?,
        })
    }
}

impl<R> Iterator for RowGroupCursor<'_, R>
where
    R: ChunkReader + Clone + 'static,
{
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }

        let idx = self.next;
        self.next += 1;
        match self.read_row_group(idx) {
            Ok(batch) => Some(Ok(RowBatch::new(batch)
                .with_index_columns(Arc::clone(&self.reader.index_columns)))),
            Err(e) => {
                self.next = self.total;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl<R> ExactSizeIterator for RowGroupCursor<'_, R> where R: ChunkReader + Clone + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_rejects_garbage() {
        let bytes = Bytes::from(vec![0u8; 1024]);
        let result = Reader::new(bytes);
        assert!(matches!(result, Err(BowError::Format(_))));
    }

    #[test]
    fn test_reader_rejects_short_input() {
        let result = Reader::new(Bytes::from_static(b"PAR1"));
        assert!(matches!(result, Err(BowError::Format(_))));
    }

    #[test]
    fn test_stream_input_rejects_garbage() {
        let result = Reader::from_stream(&b"not parquet at all"[..]);
        assert!(matches!(result, Err(BowError::Format(_))));
    }

    #[test]
    fn test_open_missing_file() {
        let result = Reader::open("/definitely/not/here.parquet");
        assert!(matches!(result, Err(BowError::NotFound(_))));
    }
}
