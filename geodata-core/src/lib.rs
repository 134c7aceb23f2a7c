//! Tabular data source and geocode feed models for the spatial data platform.
//!
//! This crate is synchronous and performs no network I/O. It parses and
//! serialises data sources in the delimited and XML encodings the platform
//! accepts, validates them against the service limits, and models the batch
//! geocode feed exchanged with the geocode job. The job protocol itself lives
//! in `geodata-client`.

pub mod column;
pub mod compression;
pub mod data_source;
pub mod geocode;
pub mod geography;
pub mod tokenizer;
pub mod value;
mod xml;

pub use column::{Column, ColumnNameError, SemanticType};
pub use data_source::{
    DataSource, DataSourceDetails, DataSourceError, DataSourceFormat, ValidationReport,
};
pub use geocode::{Address, FeedError, GeocodeEntity, GeocodeFeed};
pub use geography::{BoundingBox, Coordinate, Geography};
pub use value::Value;
