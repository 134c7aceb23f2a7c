//! Asynchronous client for the spatial data platform's dataflow jobs.
//!
//! Builds on the models in `geodata-core`: [`BatchGeocoder`] runs batch
//! geocode jobs for feeds and data sources, and [`DataSourceManager`]
//! uploads, downloads, and administers stored data sources. Both drive the
//! shared [`JobPoller`] over a [`DataflowTransport`].

pub mod dataflow;
pub mod geocode;
pub mod manager;

pub use dataflow::{
    DataflowConfig, DataflowError, DataflowJob, DataflowTransport, HttpTransport, JobKind,
    JobPoller, JobStatus, LoadOperation, Link, Method, StatusSink, TransportBuildError,
    TransportError, TransportRequest, TransportResponse,
};
pub use geocode::{BatchGeocoder, DataSourceGeocodeOutcome, GeocodeOutcome};
pub use manager::{DataSourceManager, UploadOptions};
