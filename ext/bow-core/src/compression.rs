use crate::{BowError, Result};
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};

/// Parse a codec name into the compression applied to the whole file.
///
/// Names are case-insensitive; codecs with levels use the library default level.
pub fn parse_compression(name: &str) -> Result<Compression> {
    Ok(match name.trim().to_ascii_lowercase().as_str() {
        "none" | "uncompressed" => Compression::UNCOMPRESSED,
        "snappy" => Compression::SNAPPY,
        "gzip" => Compression::GZIP(GzipLevel::default()),
        "lz4" => Compression::LZ4,
        "lz4_raw" => Compression::LZ4_RAW,
        "zstd" => Compression::ZSTD(ZstdLevel::default()),
        "brotli" => Compression::BROTLI(BrotliLevel::default()),
        other => {
            return Err(BowError::invalid_argument(format!(
                "unknown compression codec '{}'",
                other
            )))
        }
    })
}
