//! The asynchronous dataflow job protocol.
//!
//! Every long-running operation on the platform is a *dataflow job*: a
//! creation request answers `201 Created` with a `Location` header, the
//! status URL is polled until the job completes or aborts, and completed
//! jobs expose their results as `(role, name, url)` links.
//!
//! Network access goes through [`DataflowTransport`]. [`HttpTransport`]
//! talks to the live service; `test_support::ScriptedTransport` replays
//! canned responses.

mod config;
mod endpoints;
mod error;
mod http;
mod job;
mod poller;
mod status;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

use std::io::Write;

use flate2::{Compression, write::GzEncoder};

pub use config::{DEFAULT_BASE_URL, DEFAULT_CLIENT_VERSION, DEFAULT_USER_AGENT, DataflowConfig};
pub use endpoints::{JobKind, LoadOperation};
pub use error::{DataflowError, TransportBuildError, TransportError};
pub use http::HttpTransport;
pub use job::{DataflowJob, JobStatus, Link, error_details, parse_job};
pub use poller::JobPoller;
pub use status::StatusSink;
pub use transport::{DataflowTransport, Method, TransportRequest, TransportResponse};

pub(crate) use status::notify;

/// Gzip `bytes` for upload.
pub(crate) fn gzip(bytes: &[u8]) -> Result<Vec<u8>, DataflowError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|source| DataflowError::Compress { source })?;
    encoder
        .finish()
        .map_err(|source| DataflowError::Compress { source })
}
