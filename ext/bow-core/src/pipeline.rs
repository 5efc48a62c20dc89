//! Source-to-sink conversion drivers
//!
//! Both directions share one synchronous loop: pull a batch from the
//! source, push it into the sink, repeat. Batch `n + 1` is not produced
//! until the sink has consumed batch `n`. Resources owned by the pipeline
//! are released before an error is returned.

use crate::{
    BowError, ChunkedTextSource, Reader, Result, RowBatch, TextOutputOptions, TextRenderer, Writer,
};
use parquet::file::reader::ChunkReader;
use std::io::{Read, Write};

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Iterating,
    Done,
    Failed,
}

/// Totals for a completed text to Parquet conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionSummary {
    pub batches: usize,
    pub rows: u64,
    pub row_groups: usize,
}

struct Run {
    name: &'static str,
    state: PipelineState,
}

impl Run {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            state: PipelineState::Idle,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(pipeline = self.name, from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }
}

fn drive<I, F>(name: &'static str, source: I, mut sink: F) -> Result<ConversionSummary>
where
    I: Iterator<Item = Result<RowBatch>>,
    F: FnMut(&RowBatch) -> Result<()>,
{
    let mut run = Run::new(name);
    let mut summary = ConversionSummary::default();

    run.transition(PipelineState::Iterating);
    for batch in source {
        let step = batch.and_then(|batch| {
            sink(&batch)?;
            Ok(batch.num_rows())
        });
        match step {
            Ok(rows) => {
                summary.batches += 1;
                summary.rows += rows as u64;
            }
            Err(e) => {
                run.transition(PipelineState::Failed);
                return Err(e);
            }
        }
    }
    run.transition(PipelineState::Done);
    Ok(summary)
}

/// Render every row group of `reader` as delimited text.
///
/// `sink` is called once per row group with that group's text block; the
/// header, when requested, precedes the first block only. `columns`
/// restricts output to the named columns. Returns the number of rows
/// rendered.
pub fn parquet_to_text<R, F>(
    reader: &mut Reader<R>,
    columns: Option<&[&str]>,
    options: TextOutputOptions,
    mut sink: F,
) -> Result<u64>
where
    R: ChunkReader + Clone + 'static,
    F: FnMut(&str) -> Result<()>,
{
    let mut renderer = TextRenderer::new(options);
    let include_header = renderer.includes_header();

    let cursor = match columns {
        Some(columns) => reader.iterate_columns(columns)?,
        None => reader.iterate(),
    };
    let summary = drive("parquet_to_text", cursor, |batch| {
        let block = renderer.render(batch)?;
        sink(&block)
    })?;

    // A file with no row groups still gets its header line
    if include_header && summary.batches == 0 {
        let names: Vec<&str> = reader
            .schema()
            .names()
            .into_iter()
            .filter(|name| columns.map_or(true, |columns| columns.contains(name)))
            .collect();
        let header = renderer.render_header(&names, reader.index_columns())?;
        sink(&header)?;
    }

    tracing::info!(rows = summary.rows, row_groups = summary.batches, "rendered parquet as text");
    Ok(summary.rows)
}

/// Write every batch of `source` to `writer`, then close the writer.
///
/// The first batch fixes the output schema. The writer is closed on both
/// success and failure; a source or sink error is returned in preference
/// to a close error.
pub fn text_to_parquet<R, W>(
    mut source: ChunkedTextSource<R>,
    mut writer: Writer<W>,
) -> Result<ConversionSummary>
where
    R: Read,
    W: Write + Send,
{
    let driven = drive("text_to_parquet", source.by_ref(), |batch| writer.write(batch));
    let mut summary = match driven {
        Ok(summary) => summary,
        Err(e) => {
            if let Err(close_err) = writer.close() {
                tracing::warn!("closing parquet output after failure: {}", close_err);
            }
            return Err(e);
        }
    };

    if summary.batches == 0 {
        match source.schema() {
            Some(schema) => {
                let index_columns = source.index_columns().to_vec();
                writer.ensure_schema(&schema, &index_columns)?;
            }
            None => {
                writer.close()?;
                return Err(BowError::format(
                    "no columns could be inferred from empty input",
                ));
            }
        }
    }

    let written = writer.close()?;
    summary.row_groups = written.row_groups;

    tracing::info!(
        rows = summary.rows,
        batches = summary.batches,
        row_groups = summary.row_groups,
        "converted text to parquet"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextOptions;

    #[test]
    fn test_drive_stops_at_first_error() {
        let source = vec![
            Ok(RowBatch::new(arrow::record_batch::RecordBatch::new_empty(
                std::sync::Arc::new(arrow_schema::Schema::empty()),
            ))),
            Err(BowError::parse(2, "bad")),
            Err(BowError::parse(3, "never reached")),
        ];
        let mut seen = 0;
        let err = drive("test", source.into_iter(), |_| {
            seen += 1;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(seen, 1);
        assert!(matches!(err, BowError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_text_to_parquet_reports_totals() {
        let source = ChunkedTextSource::open(
            "a\tb\n1\tx\n2\ty\n3\tz\n".as_bytes(),
            TextOptions {
                header: true,
                chunk_size: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let mut buffer = Vec::new();
        let writer = crate::WriterBuilder::new()
            .with_row_group_size(2)
            .build(&mut buffer)
            .unwrap();
        let summary = text_to_parquet(source, writer).unwrap();
        assert_eq!(
            summary,
            ConversionSummary {
                batches: 3,
                rows: 3,
                row_groups: 2,
            }
        );
        assert!(buffer.starts_with(b"PAR1"));
    }

    #[test]
    fn test_empty_input_is_a_format_error() {
        let source = ChunkedTextSource::open("".as_bytes(), TextOptions::default()).unwrap();
        let mut buffer = Vec::new();
        let writer = Writer::new(&mut buffer).unwrap();
        let err = text_to_parquet(source, writer).unwrap_err();
        assert!(matches!(err, BowError::Format(_)));
    }
}
