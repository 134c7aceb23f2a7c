//! Facade crate for the geodata spatial data platform SDK.
//!
//! This crate re-exports the data source and geocode feed models and, behind
//! the `client` feature, the dataflow job client.

#![forbid(unsafe_code)]

pub use geodata_core::{
    Address, BoundingBox, Column, ColumnNameError, Coordinate, DataSource, DataSourceDetails,
    DataSourceError, DataSourceFormat, FeedError, GeocodeEntity, GeocodeFeed, Geography,
    SemanticType, ValidationReport, Value,
};

#[cfg(feature = "client")]
pub use geodata_client::{
    BatchGeocoder, DataSourceGeocodeOutcome, DataSourceManager, DataflowConfig, DataflowError,
    DataflowJob, DataflowTransport, GeocodeOutcome, HttpTransport, JobPoller, JobStatus,
    StatusSink, UploadOptions,
};
