//! Chunked reading of delimited text into row batches

use crate::convert::{infer_text_type, na_to_none, text_column_to_arrow};
use crate::{BowError, ColumnTypes, PrimitiveType, Result, RowBatch, Schema, SchemaBuilder};
use arrow::record_batch::RecordBatch;
use arrow_schema::Field;
use csv::StringRecord;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;

// Default configuration constants
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_SEPARATOR: u8 = b'\t';
pub const DEFAULT_TYPE_LOOKAHEAD: usize = 1024 * 1024;

/// Options for reading delimited text
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Field separator byte
    pub separator: u8,
    /// Whether the first line holds column names
    pub header: bool,
    /// Approximate number of input bytes parsed per batch
    pub chunk_size: usize,
    /// Declared types; other columns are inferred from the leading input
    pub column_types: ColumnTypes,
    /// Mark the first column as the index
    pub index_column: bool,
    /// Input bytes buffered before inferred types are fixed (at least one chunk)
    pub type_lookahead: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            header: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            column_types: ColumnTypes::new(),
            index_column: false,
            type_lookahead: DEFAULT_TYPE_LOOKAHEAD,
        }
    }
}

/// Parse a separator argument: a single ASCII character or the escape `\t`
pub fn parse_separator(value: &str) -> Result<u8> {
    match value {
        "\\t" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        other => Err(BowError::invalid_argument(format!(
            "separator must be a single ASCII character, got '{}'",
            other
        ))),
    }
}

/// Lazily reads delimited text from a stream, one bounded chunk per batch.
///
/// Before the first batch the source buffers chunks until `type_lookahead`
/// bytes have been read, then fixes column types: declared types where given,
/// otherwise inferred over every buffered row. Buffered chunks are then
/// yielded one by one and later chunks are coerced to the fixed types.
pub struct ChunkedTextSource<R: Read> {
    reader: csv::Reader<R>,
    options: TextOptions,
    names: Vec<String>,
    schema: Option<Schema>,
    index_columns: Arc<[String]>,
    pending: Option<StringRecord>,
    queued: VecDeque<Chunk>,
    done: bool,
}

/// Parsed rows of one chunk with the input line of each row
struct Chunk {
    rows: Vec<StringRecord>,
    lines: Vec<u64>,
}

impl<R: Read> ChunkedTextSource<R> {
    /// Open a source, reading the header line (or the first row, to learn
    /// the column count) immediately
    pub fn open(input: R, options: TextOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.separator)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut first = StringRecord::new();
        let has_first = reader.read_record(&mut first).map_err(csv_error)?;

        let (names, pending) = match (has_first, options.header) {
            (false, _) => (Vec::new(), None),
            (true, true) => (dedupe_names(first.iter()), None),
            (true, false) => ((0..first.len()).map(|i| i.to_string()).collect(), Some(first)),
        };

        let index_columns: Arc<[String]> = match names.first() {
            Some(name) if options.index_column => Arc::from(vec![name.clone()]),
            _ => Arc::from(Vec::new()),
        };

        tracing::debug!(columns = names.len(), header = options.header, "opened text source");

        Ok(Self {
            reader,
            options,
            done: names.is_empty(),
            names,
            schema: None,
            index_columns,
            pending,
            queued: VecDeque::new(),
        })
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    /// The schema batches conform to.
    ///
    /// Before the first batch this is derived from the column names and the
    /// declared types, with undeclared columns as strings. `None` when the
    /// input has no columns at all.
    pub fn schema(&self) -> Option<Schema> {
        if let Some(schema) = &self.schema {
            return Some(schema.clone());
        }
        if self.names.is_empty() {
            return None;
        }

        let mut builder = SchemaBuilder::new();
        for name in &self.names {
            let declared = self
                .options
                .column_types
                .get(name)
                .copied()
                .unwrap_or(PrimitiveType::String);
            builder = builder.with_column(name.clone(), declared.to_arrow());
        }
        builder.build().ok()
    }

    /// Buffer chunks up to the lookahead and fix the column types from them
    fn resolve_schema(&mut self) -> Result<Schema> {
        let lookahead = self.options.type_lookahead as u64;
        let start = self.reader.position().byte();
        loop {
            let chunk = self.read_chunk()?;
            if chunk.rows.is_empty() {
                break;
            }
            self.queued.push_back(chunk);
            if self.reader.position().byte() - start >= lookahead {
                break;
            }
        }

        let mut builder = SchemaBuilder::new();
        for (idx, name) in self.names.iter().enumerate() {
            let data_type = match self.options.column_types.get(name) {
                Some(declared) => declared.to_arrow(),
                None => {
                    let values: Vec<Option<&str>> = self
                        .queued
                        .iter()
                        .flat_map(|chunk| chunk.rows.iter())
                        .map(|row| na_to_none(&row[idx]))
                        .collect();
                    infer_text_type(&values).to_arrow()
                }
            };
            builder = builder.with_column(name.clone(), data_type);
        }
        let schema = builder.build()?;

        tracing::debug!(
            chunks = self.queued.len(),
            bytes = self.reader.position().byte() - start,
            "fixed text column types"
        );
        Ok(schema)
    }

    fn read_chunk(&mut self) -> Result<Chunk> {
        let chunk_size = self.options.chunk_size.max(1) as u64;
        let start = self.reader.position().byte();

        let mut rows = Vec::new();
        if let Some(first) = self.pending.take() {
            rows.push(first);
        }

        loop {
            if !rows.is_empty() && self.reader.position().byte() - start >= chunk_size {
                break;
            }
            let mut record = StringRecord::new();
            if !self.reader.read_record(&mut record).map_err(csv_error)? {
                break;
            }
            rows.push(record);
        }

        let width = self.names.len();
        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let line = row.position().map_or(0, |p| p.line());
            if row.len() != width {
                return Err(BowError::parse(
                    line,
                    format!("expected {} fields, found {}", width, row.len()),
                ));
            }
            lines.push(line);
        }
        Ok(Chunk { rows, lines })
    }

    fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        let schema = match &self.schema {
            Some(schema) => schema.clone(),
            None => {
                let schema = self.resolve_schema()?;
                self.schema = Some(schema.clone());
                schema
            }
        };

        let chunk = match self.queued.pop_front() {
            Some(chunk) => chunk,
            None => self.read_chunk()?,
        };
        if chunk.rows.is_empty() {
            return Ok(None);
        }

        let mut fields = Vec::with_capacity(self.names.len());
        let mut arrays = Vec::with_capacity(self.names.len());
        for (idx, column) in schema.columns().iter().enumerate() {
            let values: Vec<Option<&str>> =
                chunk.rows.iter().map(|row| na_to_none(&row[idx])).collect();
            arrays.push(text_column_to_arrow(
                &column.name,
                &values,
                &chunk.lines,
                &column.data_type,
            )?);
            fields.push(Field::new(&column.name, column.data_type.clone(), true));
        }

        let batch = RecordBatch::try_new(Arc::new(arrow_schema::Schema::new(fields)), arrays)?;

        tracing::debug!(rows = batch.num_rows(), "parsed text chunk");
        Ok(Some(
            RowBatch::new(batch).with_index_columns(Arc::clone(&self.index_columns)),
        ))
    }
}

impl<R: Read> Iterator for ChunkedTextSource<R> {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Make header names unique the way pandas does: `a`, `a.1`, `a.2`
fn dedupe_names<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw {
        let mut candidate = name.to_string();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{}.{}", name, suffix);
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

fn csv_error(err: csv::Error) -> BowError {
    let line = err.position().map_or(0, |p| p.line());
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => BowError::Io(e),
        _ => BowError::parse(line, message),
    }
}
