//! Incremental Parquet writing with a fixed session schema

use crate::metadata::pandas_metadata;
use crate::{BowError, Result, RowBatch, Schema};
use arrow::record_batch::RecordBatch;
use arrow_schema::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

// Default configuration constants
pub const DEFAULT_ROW_GROUP_SIZE: usize = 1_000_000;
pub const DEFAULT_COMPRESSION: Compression = Compression::SNAPPY;

/// Builder for creating a configured Writer
#[derive(Debug, Clone)]
pub struct WriterBuilder {
    compression: Compression,
    row_group_size: usize,
    schema: Option<Schema>,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            schema: None,
        }
    }
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression applied to every column of the file
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the target row count per row group (0 = one row group per batch)
    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.row_group_size = rows;
        self
    }

    /// Fix the session schema up front instead of taking it from the first batch
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Build a Writer over any sink
    pub fn build<W: Write + Send>(self, sink: W) -> Result<Writer<W>> {
        let mut writer = Writer {
            sink: Some(sink),
            session: None,
            compression: self.compression,
            row_group_size: self.row_group_size,
        };
        if let Some(schema) = self.schema {
            writer.ensure_schema(&schema, &[])?;
        }
        Ok(writer)
    }

    /// Create (or truncate) `path` and build a Writer over it
    pub fn create<P: AsRef<Path>>(self, path: P) -> Result<Writer<File>> {
        let file = File::create(path.as_ref())?;
        self.build(file)
    }
}

/// State owned between the first batch and `close`
struct WriterSession<W: Write + Send> {
    arrow_writer: ArrowWriter<W>,
    schema: Schema,
    arrow_schema: SchemaRef,
    rows_in_group: usize,
    rows_written: u64,
    row_groups: usize,
}

/// Totals reported by [`Writer::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    pub rows: u64,
    pub row_groups: usize,
}

/// Parquet writer that fixes its schema from the first batch written
///
/// `close` must be called to write the footer. A writer dropped without
/// `close` still finishes the file and releases the sink.
pub struct Writer<W: Write + Send> {
    sink: Option<W>,
    session: Option<WriterSession<W>>,
    compression: Compression,
    row_group_size: usize,
}

impl<W> Writer<W>
where
    W: Write + Send,
{
    /// Create a new writer with default settings
    pub fn new(sink: W) -> Result<Self> {
        WriterBuilder::new().build(sink)
    }

    /// The session schema, once fixed
    pub fn schema(&self) -> Option<&Schema> {
        self.session.as_ref().map(|s| &s.schema)
    }

    pub fn rows_written(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.rows_written)
    }

    /// Row groups flushed so far, not counting buffered rows
    pub fn row_groups_written(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.row_groups)
    }

    /// Fix the session schema if it is not fixed yet, otherwise check `schema`
    /// against it
    pub fn ensure_schema(&mut self, schema: &Schema, index_columns: &[String]) -> Result<()> {
        if let Some(session) = &self.session {
            return session.schema.check_conforms(schema);
        }

        let sink = self
            .sink
            .take()
            .ok_or_else(|| BowError::Io(std::io::Error::other("writer sink is no longer available")))?;

        let mut props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(usize::MAX);
        if !index_columns.is_empty() {
            props = props.set_key_value_metadata(Some(vec![pandas_metadata(
                schema,
                index_columns,
            )?]));
        }

        let arrow_schema = schema.to_arrow();
        let arrow_writer = ArrowWriter::try_new(sink, Arc::clone(&arrow_schema), Some(props.build()))?;

        tracing::debug!(
            columns = schema.len(),
            compression = ?self.compression,
            row_group_size = self.row_group_size,
            "opened writer session"
        );

        self.session = Some(WriterSession {
            arrow_writer,
            schema: schema.clone(),
            arrow_schema,
            rows_in_group: 0,
            rows_written: 0,
            row_groups: 0,
        });
        Ok(())
    }

    /// Write one batch.
    ///
    /// The first batch fixes the session schema; later batches must match it
    /// in column names, order and types. Columns of a schema fixed this way
    /// are nullable.
    pub fn write(&mut self, batch: &RowBatch) -> Result<()> {
        let schema = batch.schema()?.into_nullable();
        self.ensure_schema(&schema, batch.index_columns())?;

        let row_group_size = self.row_group_size;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BowError::Io(std::io::Error::other("writer session is not open")))?;

        if batch.num_rows() == 0 {
            return Ok(());
        }

        // Rebind the columns to the session schema so nullability and
        // field metadata match what the file declares
        let batch = RecordBatch::try_new(
            Arc::clone(&session.arrow_schema),
            batch.record_batch().columns().to_vec(),
        )?;

        if row_group_size == 0 {
            session.arrow_writer.write(&batch)?;
            session.rows_in_group += batch.num_rows();
            session.flush_row_group()?;
        } else {
            let mut offset = 0;
            while offset < batch.num_rows() {
                let room = row_group_size - session.rows_in_group;
                let take = room.min(batch.num_rows() - offset);
                session.arrow_writer.write(&batch.slice(offset, take))?;
                session.rows_in_group += take;
                offset += take;

                if session.rows_in_group >= row_group_size {
                    session.flush_row_group()?;
                }
            }
        }

        session.rows_written += batch.num_rows() as u64;
        Ok(())
    }

    /// Flush buffered rows as a final row group, write the footer and
    /// release the sink
    pub fn close(mut self) -> Result<WriteSummary> {
        self.sink.take();
        match self.session.take() {
            Some(session) => session.finish(),
            None => Ok(WriteSummary::default()),
        }
    }
}

impl<W> WriterSession<W>
where
    W: Write + Send,
{
    fn flush_row_group(&mut self) -> Result<()> {
        if self.rows_in_group == 0 {
            return Ok(());
        }
        self.arrow_writer.flush()?;
        tracing::debug!(
            row_group = self.row_groups,
            rows = self.rows_in_group,
            "flushed row group"
        );
        self.row_groups += 1;
        self.rows_in_group = 0;
        Ok(())
    }

    fn finish(mut self) -> Result<WriteSummary> {
        let flushed = self.flush_row_group();
        // The footer is attempted even when the last flush failed so the
        // sink is always consumed
        let closed = self.arrow_writer.close();
        flushed?;
        closed?;

        tracing::debug!(
            rows = self.rows_written,
            row_groups = self.row_groups,
            "closed writer session"
        );
        Ok(WriteSummary {
            rows: self.rows_written,
            row_groups: self.row_groups,
        })
    }
}

impl<W> Drop for Writer<W>
where
    W: Write + Send,
{
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::warn!("parquet writer dropped without close; finishing file");
            if let Err(e) = session.finish() {
                tracing::warn!("failed to finish parquet file on drop: {}", e);
            }
        }
    }
}
