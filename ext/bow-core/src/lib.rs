//! Streaming conversion between Parquet files and delimited text
//!
//! `bow-core` holds everything the `bow` command line tool does, behind a
//! small library API. It wraps the Apache arrow-rs `parquet` crate with a
//! row-group-at-a-time read path and a batch-at-a-time write path.
//!
//! # Key Components
//!
//! - **Reader**: Parquet reader that parses the footer once
//!   - One [`RowBatch`] per row group through [`reader::RowGroupCursor`]
//!   - Column projection by name
//!   - Uses `parquet::file::reader::ChunkReader` for flexible input sources
//!
//! - **Writer**: Incremental Parquet writer
//!   - The first batch written fixes the file schema
//!   - Configurable compression and row-group size
//!   - Uses `std::io::Write + Send` for output flexibility
//!
//! - **Text**: Chunked delimited-text source
//!   - Bounded chunks of input bytes per batch
//!   - Declared or inferred column types
//!
//! - **Pipeline**: Drivers composing a source with a sink
//!   - [`pipeline::parquet_to_text`] and [`pipeline::text_to_parquet`]
//!
//! - **Metadata**: Human-readable footer and schema summaries
//!
//! # Data Flow
//!
//! ```text
//! file        -> Reader            -> RowBatch -> TextRenderer -> sink
//! text stream -> ChunkedTextSource -> RowBatch -> Writer       -> file
//! ```

pub mod batch;
pub mod compression;
pub mod convert;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod text;
pub mod writer;

pub use batch::RowBatch;
pub use compression::parse_compression;
pub use convert::{TextOutputOptions, TextRenderer};
pub use error::{BowError, Result};
pub use metadata::{format_metadata, format_schema, FileMetadata, RowGroupStats};
pub use pipeline::{parquet_to_text, text_to_parquet, ConversionSummary, PipelineState};
pub use reader::{InputSource, Reader, RowGroupCursor};
pub use schema::{parse_column_types, Column, ColumnTypes, PrimitiveType, Schema, SchemaBuilder};
pub use text::{parse_separator, ChunkedTextSource, TextOptions};
pub use writer::{WriteSummary, Writer, WriterBuilder};
