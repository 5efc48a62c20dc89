use bow_core::*;

use test_helpers::*;

#[test]
fn test_projection_returns_requested_columns() {
    let bytes = write_batches(&[sample_batch(0..20)], 10);
    let mut reader = Reader::new(bytes).unwrap();

    let batches: Vec<RowBatch> = reader
        .iterate_columns(&["value", "id"])
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(batches.len(), 2);
    for batch in &batches {
        // Schema order, not request order
        assert_eq!(batch.column_names(), vec!["id", "value"]);
    }

    let full = sample_batch(0..20);
    let projected = concat(&batches);
    assert_eq!(projected.column(0), full.column(0));
    assert_eq!(projected.column(1), full.column(2));
}

#[test]
fn test_projection_of_every_subset() {
    let bytes = write_batches(&[sample_batch(0..5)], 0);
    let mut reader = Reader::new(bytes).unwrap();
    let names = ["id", "name", "value", "active"];

    for mask in 1u32..(1 << names.len()) {
        let subset: Vec<&str> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, n)| *n)
            .collect();
        let batches: Vec<RowBatch> = reader
            .iterate_columns(&subset)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(batches[0].column_names(), subset);
    }
}

#[test]
fn test_projection_unknown_column() {
    let bytes = write_batches(&[sample_batch(0..5)], 0);
    let mut reader = Reader::new(bytes).unwrap();

    match reader.iterate_columns(&["id", "missing"]) {
        Err(BowError::ColumnNotFound(name)) => assert_eq!(name, "missing"),
        Err(other) => panic!("expected ColumnNotFound, got {:?}", other),
        Ok(_) => panic!("expected ColumnNotFound"),
    }
}

#[test]
fn test_projection_duplicates_collapse() {
    let bytes = write_batches(&[sample_batch(0..5)], 0);
    let mut reader = Reader::new(bytes).unwrap();

    let batches: Vec<RowBatch> = reader
        .iterate_columns(&["name", "name"])
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(batches[0].column_names(), vec!["name"]);
}

#[test]
fn test_projection_renders_as_text() {
    let bytes = write_batches(&[sample_batch(1..3)], 0);
    let text = render(
        bytes,
        Some(&["active", "id"]),
        TextOutputOptions {
            include_header: true,
            ..Default::default()
        },
    );
    assert_eq!(text, "id\tactive\n1\tfalse\n2\ttrue\n");
}
