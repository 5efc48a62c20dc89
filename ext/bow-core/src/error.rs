use std::path::Path;
use thiserror::Error;

/// Core error type for reading, writing and converting columnar files
#[derive(Error, Debug)]
pub enum BowError {
    /// IO errors from the underlying file or stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow errors from batch construction and casting
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Parquet errors raised while decoding or encoding row groups
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The input path does not resolve
    #[error("No such file: {0}")]
    NotFound(String),

    /// The footer or metadata could not be parsed as a Parquet file
    #[error("Format error: {0}")]
    Format(String),

    /// A projection named a column the file does not have
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A batch does not match the schema fixed for the writer session
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A delimited text row could not be parsed or coerced
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Invalid schema definitions
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for bow operations
pub type Result<T> = std::result::Result<T, BowError>;

impl BowError {
    /// Map an IO error from opening `path`, keeping "not found" distinct
    pub fn open_failed(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BowError::NotFound(path.display().to_string())
        } else {
            BowError::Io(err)
        }
    }

    /// Create a new format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        BowError::Format(msg.into())
    }

    /// Create a new schema mismatch error
    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        BowError::SchemaMismatch(msg.into())
    }

    /// Create a new parse error for an input line
    pub fn parse<S: Into<String>>(line: u64, msg: S) -> Self {
        BowError::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a new schema error
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        BowError::Schema(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        BowError::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BowError::schema("duplicate column name 'a'");
        assert_eq!(err.to_string(), "Schema error: duplicate column name 'a'");

        let err = BowError::parse(7, "expected 2 fields, found 3");
        assert_eq!(
            err.to_string(),
            "Parse error at line 7: expected 2 fields, found 3"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BowError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_open_failed_distinguishes_not_found() {
        let path = Path::new("missing.parquet");
        let err = BowError::open_failed(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, BowError::NotFound(ref p) if p == "missing.parquet"));

        let err = BowError::open_failed(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, BowError::Io(_)));
    }
}
