//! Errors raised while reading or writing a geocode feed.

use std::io;

use thiserror::Error;

use crate::{compression::PayloadError, data_source::DataSourceFormat};

/// Failure reading or writing a [`GeocodeFeed`](super::GeocodeFeed).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedError {
    /// Geocode feeds are not exchanged in this format.
    #[error("geocode feeds cannot be {operation} as {format}")]
    UnsupportedFormat {
        format: DataSourceFormat,
        operation: &'static str,
    },
    /// The schema marker named a version this crate does not know.
    #[error("unsupported geocode feed version '{version}'")]
    UnsupportedVersion { version: String },
    /// Reading the input failed.
    #[error("failed to read geocode feed: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
    /// Writing the output failed.
    #[error("failed to write geocode feed: {source}")]
    Write {
        #[source]
        source: io::Error,
    },
    /// The zip container could not be opened.
    #[error("failed to unpack zipped geocode feed: {source}")]
    Archive {
        #[source]
        source: zip::result::ZipError,
    },
    /// The zip container was empty.
    #[error("zipped geocode feed contains no entries")]
    EmptyArchive,
    /// The XML document was malformed.
    #[error("malformed geocode feed XML: {source}")]
    Xml {
        #[source]
        source: quick_xml::Error,
    },
    /// The input was not UTF-8.
    #[error("geocode feed is not valid UTF-8: {source}")]
    Encoding {
        #[source]
        source: std::str::Utf8Error,
    },
    /// The document did not have the expected shape.
    #[error("invalid geocode feed: {message}")]
    Schema { message: String },
}

impl From<PayloadError> for FeedError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Read { source } => Self::Read { source },
            PayloadError::Archive { source } => Self::Archive { source },
            PayloadError::EmptyArchive => Self::EmptyArchive,
        }
    }
}
