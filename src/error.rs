//! Error types for warehouse-extract.
//!
//! Defines the main error enum used by both binaries.

use thiserror::Error;

/// Main error type for extract operations.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No credential source found, or a source is missing required fields.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Malformed configuration (unreadable YAML, bad env file, bad URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, read timeout, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// External process errors (vsql or gzip missing or exiting non-zero).
    #[error("Process error: {0}")]
    Process(String),

    /// Serialization errors while writing or reading an export artifact.
    #[error("Export error: {0}")]
    Export(String),

    /// File system errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Creates a credentials error with the given message.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a process error with the given message.
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    /// Creates an export error with the given message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "Credentials Error",
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Process(_) => "Process Error",
            Self::Export(_) => "Export Error",
            Self::Io(_) => "I/O Error",
        }
    }
}

impl From<arrow::error::ArrowError> for ExtractError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for ExtractError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias using ExtractError.
pub type Result<T> = std::result::Result<T, ExtractError>;
