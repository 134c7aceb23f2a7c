//! Error types produced by dataflow jobs.

use std::io;

use geodata_core::{DataSourceError, FeedError};
use thiserror::Error;

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request timed out.
    #[error("request to {url} timed out")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
}

/// Failure to construct the HTTP transport.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {source}")]
pub struct TransportBuildError {
    #[from]
    source: reqwest::Error,
}

/// Errors produced while creating, polling, or consuming a dataflow job.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataflowError {
    /// No access key was configured for the job.
    #[error("a key is required for {operation}")]
    MissingKey {
        /// Operation that needed the key.
        operation: &'static str,
    },
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service answered with an error status.
    #[error("service returned status {status}: {details}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Error detail lines joined with `; `.
        details: String,
    },
    /// An endpoint URL could not be built.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// A job was created but the response had no status URL.
    #[error("job created at {url} did not return a Location header")]
    MissingLocation {
        /// Creation URL.
        url: String,
    },
    /// A status document could not be decoded.
    #[error("failed to parse job status: {message}")]
    ParseStatus {
        /// Description of the problem.
        message: String,
    },
    /// The service reported a status this client does not know.
    #[error("unrecognised job status '{status}'")]
    UnexpectedStatus {
        /// Status text as received.
        status: String,
    },
    /// The service aborted the job.
    #[error("job aborted: {message}")]
    JobAborted {
        /// Error details reported with the job.
        message: String,
    },
    /// Polling gave up before the job finished.
    #[error("job status unknown: {message}")]
    JobUnknown {
        /// Last failure seen while polling.
        message: String,
    },
    /// A completed job lacked the expected output link.
    #[error("completed job has no '{role}/{name}' link")]
    MissingOutputLink {
        /// Link role.
        role: String,
        /// Link name.
        name: String,
    },
    /// Compressing a request body failed.
    #[error("failed to compress request body: {source}")]
    Compress {
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A data source could not be serialised or parsed.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    /// A geocode feed could not be serialised or parsed.
    #[error(transparent)]
    Feed(#[from] FeedError),
    /// The data source has no column holding address text.
    #[error(
        "no address columns found; expected one of the address line, locality, admin district, postal code or country columns"
    )]
    NoAddressColumns,
}
