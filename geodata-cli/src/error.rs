//! Error types emitted by the geodata CLI.
//!
//! Library errors are boxed where they are large so that
//! `Result<_, CliError>` stays within `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use geodata_client::{DataflowError, TransportBuildError};
use geodata_core::{DataSourceError, data_source::UnknownFormat};
use thiserror::Error;

/// Errors emitted by the geodata CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A format name or file extension was not recognised.
    #[error("cannot determine the format of {path:?}; pass --format")]
    UnknownFormat { path: Utf8PathBuf },
    /// A format flag named no known format.
    #[error(transparent)]
    BadFormat(#[from] UnknownFormat),
    /// Reading an input file failed.
    #[error("failed to read {path:?}: {source}")]
    ReadInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing an output file failed.
    #[error("failed to write {path:?}: {source}")]
    WriteOutput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Parsing or serialising a data source failed.
    #[error("data source {path:?}: {source}")]
    DataSource {
        path: Utf8PathBuf,
        #[source]
        source: Box<DataSourceError>,
    },
    /// The data source failed validation.
    #[error("{path:?} failed validation with {errors} error(s)")]
    Invalid { path: Utf8PathBuf, errors: usize },
    /// Starting the async runtime failed.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Building the HTTP transport failed.
    #[error(transparent)]
    Transport(#[from] TransportBuildError),
    /// A dataflow job failed.
    #[error("{operation} failed: {source}")]
    Dataflow {
        operation: &'static str,
        #[source]
        source: Box<DataflowError>,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing to stdout failed.
    #[error("failed to write output: {0}")]
    WriteStdout(#[source] std::io::Error),
}
