//! Errors raised while reading or writing a data source.

use std::io;

use thiserror::Error;

use crate::compression::PayloadError;

use super::DataSourceFormat;

/// Failure reading, writing or repairing a [`DataSource`](super::DataSource).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataSourceError {
    /// The format cannot be handled locally.
    #[error("{format} data sources cannot be {operation} locally")]
    UnsupportedFormat {
        format: DataSourceFormat,
        operation: &'static str,
    },
    /// Reading the input failed.
    #[error("failed to read data source: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
    /// Writing the output failed.
    #[error("failed to write data source: {source}")]
    Write {
        #[source]
        source: io::Error,
    },
    /// The zip container could not be opened.
    #[error("failed to unpack zipped data source: {source}")]
    Archive {
        #[source]
        source: zip::result::ZipError,
    },
    /// The zip container was empty.
    #[error("zipped data source contains no entries")]
    EmptyArchive,
    /// The XML document was malformed.
    #[error("malformed XML data source: {source}")]
    Xml {
        #[source]
        source: quick_xml::Error,
    },
    /// The input was not UTF-8.
    #[error("data source is not valid UTF-8: {source}")]
    Encoding {
        #[source]
        source: std::str::Utf8Error,
    },
    /// The schema block or header was missing or malformed.
    #[error("invalid data schema: {message}")]
    Schema { message: String },
    /// A column carries the default key name without being flagged as key.
    #[error(
        "no primary key column is flagged, but a column named '{name}' already exists; \
         flag it as the primary key or rename it"
    )]
    AmbiguousPrimaryKey { name: String },
}

impl From<PayloadError> for DataSourceError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Read { source } => Self::Read { source },
            PayloadError::Archive { source } => Self::Archive { source },
            PayloadError::EmptyArchive => Self::EmptyArchive,
        }
    }
}
