use thiserror::Error;

/// Errors produced by the data pipeline.
#[derive(Debug, Error)]
pub enum DataError {
    /// Caller passed a value outside the supported set
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No cached file matches the requested ticker and data kind
    #[error("no {kind} data found for {ticker}")]
    NotFound { ticker: String, kind: String },

    /// Remote fetch completed but returned zero usable rows
    #[error("no data returned for {0}")]
    NoData(String),

    /// Data violates the table schema
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// HTTP transport or decode failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a stored file
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
