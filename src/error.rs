//! Fatal error types for the import engine.
//!
//! Data-quality problems never surface here: they are reported per row or
//! group through [`crate::report::RowError`]. Only I/O failures, unreadable
//! headers and registration defects abort a file.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors that abort processing of a whole file.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input is not valid UTF-8
    #[error("input is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Input contains no non-blank line to use as a header
    #[error("input contains no header line")]
    EmptyInput,

    /// No registered format matched the header under any delimiter
    #[error("unknown header: no registered format matches '{header}'")]
    UnknownHeader { header: String },

    /// More than one format matched the same header
    #[error("ambiguous format: header '{header}' matches {formats:?}")]
    AmbiguousFormat {
        header: String,
        formats: Vec<&'static str>,
    },

    /// A format registration is malformed (bad pattern, duplicate id)
    #[error("invalid format registration '{format}': {message}")]
    Registration {
        format: &'static str,
        message: String,
    },

    /// Command-line argument could not be interpreted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
