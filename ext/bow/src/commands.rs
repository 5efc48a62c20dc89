use crate::cli::{CatArgs, InfoArgs, Txt2parArgs};
use anyhow::{Context, Result};
use bow_core::{
    format_metadata, format_schema, parquet_to_text, parse_column_types, parse_compression,
    parse_separator, text_to_parquet, BowError, ChunkedTextSource, ColumnTypes, ConversionSummary,
    InputSource, Reader, TextOptions, TextOutputOptions, WriterBuilder,
};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn open_reader(path: &Path) -> Result<Reader<InputSource>> {
    if is_stdin(path) {
        Reader::from_stream(io::stdin().lock()).context("reading Parquet from standard input")
    } else {
        Reader::open(path).with_context(|| format!("opening {}", path.display()))
    }
}

pub fn info(args: InfoArgs) -> Result<()> {
    let reader = open_reader(&args.path)?;
    let text = if args.schema {
        format_schema(reader.schema(), reader.metadata())
    } else {
        format_metadata(reader.metadata())
    };

    let mut out = io::stdout().lock();
    writeln!(out, "{}", text)?;
    Ok(())
}

pub fn cat(args: CatArgs) -> Result<()> {
    let options = TextOutputOptions {
        separator: parse_separator(&args.sep)?,
        include_header: args.header,
        include_index: args.index,
    };
    let mut reader = open_reader(&args.path)?;
    let columns: Option<Vec<&str>> = args
        .columns
        .as_ref()
        .map(|columns| columns.iter().map(String::as_str).collect());

    let mut out = BufWriter::new(io::stdout().lock());
    let rows = parquet_to_text(&mut reader, columns.as_deref(), options, |block| {
        out.write_all(block.as_bytes())?;
        Ok(())
    })
    .with_context(|| format!("printing {}", args.path.display()))?;
    out.flush()?;

    tracing::debug!(rows, "printed rows");
    Ok(())
}

pub fn txt2par(args: Txt2parArgs) -> Result<()> {
    let column_types = match &args.schema {
        Some(json) => parse_column_types(json).context("parsing --schema")?,
        None => ColumnTypes::new(),
    };
    let options = TextOptions {
        separator: parse_separator(&args.sep)?,
        header: args.header,
        chunk_size: args.input_chunksize,
        column_types,
        index_column: args.index,
        ..Default::default()
    };
    let builder = WriterBuilder::new()
        .with_compression(parse_compression(&args.compression)?)
        .with_row_group_size(args.output_chunksize);

    let summary = if is_stdin(&args.path) {
        convert(io::stdin().lock(), options, builder, &args.outpath)
    } else {
        let file = File::open(&args.path).map_err(|e| BowError::open_failed(&args.path, e))?;
        convert(file, options, builder, &args.outpath)
    }
    .with_context(|| {
        format!(
            "converting {} to {}",
            args.path.display(),
            args.outpath.display()
        )
    })?;

    tracing::debug!(
        rows = summary.rows,
        row_groups = summary.row_groups,
        "wrote {}",
        args.outpath.display()
    );
    Ok(())
}

// The output is only created once the input has been opened and its
// header read
fn convert<R: Read>(
    input: R,
    options: TextOptions,
    builder: WriterBuilder,
    outpath: &Path,
) -> bow_core::Result<ConversionSummary> {
    let source = ChunkedTextSource::open(input, options)?;
    let writer = builder.create(outpath)?;
    text_to_parquet(source, writer)
}
