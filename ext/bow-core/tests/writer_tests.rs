use arrow::record_batch::RecordBatch;
use arrow_array::{Array, ArrayRef, Int64Array, StringArray};
use bow_core::*;
use bytes::Bytes;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use test_helpers::*;

/// Sink that starts failing once `fail` is set and records when it is dropped
struct FailingSink {
    buffer: Vec<u8>,
    fail: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full"));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full"));
        }
        Ok(())
    }
}

impl Drop for FailingSink {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

fn failing_sink() -> (FailingSink, Arc<AtomicBool>, Arc<AtomicBool>) {
    let fail = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicBool::new(false));
    let sink = FailingSink {
        buffer: Vec::new(),
        fail: Arc::clone(&fail),
        dropped: Arc::clone(&dropped),
    };
    (sink, fail, dropped)
}

// =============================================================================
// Schema enforcement
// =============================================================================

#[test]
fn test_second_batch_with_other_columns_is_rejected() {
    let mut buffer = Vec::new();
    let mut writer = Writer::new(&mut buffer).unwrap();
    writer.write(&sample_batch(0..4)).unwrap();

    let other = RowBatch::new(
        RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(vec![9])) as ArrayRef),
            ("label", Arc::new(StringArray::from(vec!["x"])) as ArrayRef),
        ])
        .unwrap(),
    );
    assert!(matches!(
        writer.write(&other),
        Err(BowError::SchemaMismatch(_))
    ));
    writer.close().unwrap();

    // The first batch survives intact
    let read = read_all(Bytes::from(buffer));
    assert_same_rows(&concat(&read), sample_batch(0..4).record_batch());
}

#[test]
fn test_reordered_columns_are_rejected() {
    let mut buffer = Vec::new();
    let mut writer = Writer::new(&mut buffer).unwrap();
    let first = RecordBatch::try_from_iter(vec![
        ("a", Arc::new(Int64Array::from(vec![1])) as ArrayRef),
        ("b", Arc::new(Int64Array::from(vec![2])) as ArrayRef),
    ])
    .unwrap();
    let swapped = RecordBatch::try_from_iter(vec![
        ("b", Arc::new(Int64Array::from(vec![2])) as ArrayRef),
        ("a", Arc::new(Int64Array::from(vec![1])) as ArrayRef),
    ])
    .unwrap();

    writer.write(&first.into()).unwrap();
    assert!(matches!(
        writer.write(&swapped.into()),
        Err(BowError::SchemaMismatch(_))
    ));
    writer.close().unwrap();
}

#[test]
fn test_nulls_after_a_null_free_first_batch() {
    // sample_batch(1..5) has no null names, 5..10 has one
    let batches = vec![sample_batch(1..5), sample_batch(5..10)];
    let read = read_all(write_batches(&batches, 0));
    assert_eq!(read.len(), 2);
    assert_eq!(read[1].column(1).null_count(), 1);
}

#[test]
fn test_prefixed_schema_rejects_other_first_batch() {
    let schema = SchemaBuilder::new()
        .with_column("id", arrow_schema::DataType::Int32)
        .build()
        .unwrap();
    let mut buffer = Vec::new();
    let mut writer = WriterBuilder::new()
        .with_schema(schema)
        .build(&mut buffer)
        .unwrap();
    assert!(matches!(
        writer.write(&sample_batch(0..2)),
        Err(BowError::SchemaMismatch(_))
    ));
    writer.close().unwrap();

    let reader = Reader::new(Bytes::from(buffer)).unwrap();
    assert_eq!(reader.schema().names(), vec!["id"]);
    assert_eq!(reader.num_row_groups(), 0);
}

// =============================================================================
// Resource release
// =============================================================================

#[test]
fn test_sink_released_when_close_fails() {
    let (sink, fail, dropped) = failing_sink();
    let mut writer = WriterBuilder::new()
        .with_row_group_size(3)
        .build(sink)
        .unwrap();
    writer.write(&sample_batch(0..2)).unwrap();

    fail.store(true, Ordering::SeqCst);
    let _ = writer.write(&sample_batch(2..4));
    assert!(writer.close().is_err());
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_sink_released_when_writes_fail() {
    let (sink, fail, dropped) = failing_sink();
    let mut writer = WriterBuilder::new()
        .with_compression(parse_compression("none").unwrap())
        .with_row_group_size(1_000)
        .build(sink)
        .unwrap();
    writer.write(&sample_batch(0..10)).unwrap();
    fail.store(true, Ordering::SeqCst);

    let mut results = Vec::new();
    for start in (10..20_000).step_by(1_000) {
        results.push(writer.write(&sample_batch(start..start + 1_000)));
    }
    results.push(writer.close().map(|_| ()));

    assert!(results.iter().any(|r| r.is_err()));
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_sink_released_on_drop_without_close() {
    let (sink, _fail, dropped) = failing_sink();
    {
        let mut writer = Writer::new(sink).unwrap();
        writer.write(&sample_batch(0..3)).unwrap();
    }
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_failed_conversion_releases_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.parquet");

    let text = "n\n1\n2\nthree\n4\n";
    let options = TextOptions {
        type_lookahead: 1,
        ..header_options(1)
    };
    let source = ChunkedTextSource::open(text.as_bytes(), options).unwrap();
    let writer = WriterBuilder::new()
        .with_row_group_size(1)
        .create(&path)
        .unwrap();

    match text_to_parquet(source, writer) {
        Err(BowError::Parse { line, .. }) => assert_eq!(line, 4),
        other => panic!("expected parse error, got {:?}", other),
    }

    // Rows flushed before the failure are readable, and the handle is gone
    let reader = Reader::open(&path).unwrap();
    assert_eq!(reader.metadata().num_rows, 2);
    drop(reader);
    std::fs::remove_file(&path).unwrap();
    assert!(!path.exists());
}

// =============================================================================
// Compression
// =============================================================================

#[test]
fn test_compression_codecs_roundtrip() {
    let batches = vec![sample_batch(0..100)];
    let expected = concat(&batches);

    for name in ["none", "snappy", "gzip", "lz4", "lz4_raw", "zstd", "brotli"] {
        let mut buffer = Vec::new();
        let mut writer = WriterBuilder::new()
            .with_compression(parse_compression(name).unwrap())
            .build(&mut buffer)
            .unwrap();
        writer.write(&batches[0]).unwrap();
        writer.close().unwrap();

        let read = read_all(Bytes::from(buffer));
        assert_same_rows(&concat(&read), &expected);
    }
}

#[test]
fn test_default_compression_is_snappy() {
    let bytes = write_batches(&[sample_batch(0..10)], 0);
    let reader = SerializedFileReader::new(bytes).unwrap();
    let column = reader.metadata().row_group(0).column(0).compression();
    assert_eq!(column, parquet::basic::Compression::SNAPPY);
}
