//! Command-line interface for validating, converting, geocoding, and
//! managing spatial data sources.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod local;
mod service;

pub use error::CliError;

use local::{ConvertArgs, ValidateArgs};
use service::{DownloadArgs, GeocodeArgs, ManageAction, ManageArgs, UploadArgs};

const ARG_KEY: &str = "key";
const ARG_NAME: &str = "name";
const ARG_ACCESS_ID: &str = "access-id";
const ARG_INPUT: &str = "input";
const ARG_OUTPUT: &str = "output";
const ARG_PUBLIC: &str = "public";
const ENV_GEOCODE_KEY: &str = "GEODATA_CMDS_GEOCODE_KEY";
const ENV_GEOCODE_INPUT: &str = "GEODATA_CMDS_GEOCODE_INPUT";
const ENV_GEOCODE_OUTPUT: &str = "GEODATA_CMDS_GEOCODE_OUTPUT";
const ENV_UPLOAD_KEY: &str = "GEODATA_CMDS_UPLOAD_KEY";
const ENV_UPLOAD_INPUT: &str = "GEODATA_CMDS_UPLOAD_INPUT";
const ENV_UPLOAD_NAME: &str = "GEODATA_CMDS_UPLOAD_NAME";
const ENV_DOWNLOAD_KEY: &str = "GEODATA_CMDS_DOWNLOAD_KEY";
const ENV_DOWNLOAD_ACCESS_ID: &str = "GEODATA_CMDS_DOWNLOAD_ACCESS_ID";
const ENV_DOWNLOAD_NAME: &str = "GEODATA_CMDS_DOWNLOAD_NAME";
const ENV_DOWNLOAD_OUTPUT: &str = "GEODATA_CMDS_DOWNLOAD_OUTPUT";
const ENV_MANAGE_KEY: &str = "GEODATA_CMDS_MANAGE_KEY";
const ENV_MANAGE_ACCESS_ID: &str = "GEODATA_CMDS_MANAGE_ACCESS_ID";
const ENV_MANAGE_NAME: &str = "GEODATA_CMDS_MANAGE_NAME";
const ENV_MANAGE_PUBLIC: &str = "GEODATA_CMDS_MANAGE_PUBLIC";

/// Parsed command line, kept apart from [`Cli::run`] so `main` can configure
/// logging from `--verbose` before anything else happens.
#[derive(Debug, Parser)]
#[command(
    name = "geodata",
    about = "Validate, convert, geocode, and publish spatial data sources",
    long_about = None,
    version
)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a data source against the platform's limits.
    Validate(ValidateArgs),
    /// Re-encode a data source in another format.
    Convert(ConvertArgs),
    /// Fill missing coordinates through the batch geocode service.
    Geocode(GeocodeArgs),
    /// Upload a data source.
    Upload(UploadArgs),
    /// Download a stored data source.
    Download(DownloadArgs),
    /// Publish the staged version of a data source.
    Publish(ManageArgs),
    /// Roll a data source back to its previous version.
    Rollback(ManageArgs),
    /// Make a data source public or private.
    Visibility(ManageArgs),
}

impl Cli {
    /// Parse the process arguments.
    pub fn parse_args() -> Result<Self, CliError> {
        Self::try_parse().map_err(CliError::ArgumentParsing)
    }

    /// Execute the parsed command, writing reports to stdout.
    pub fn run(self) -> Result<(), CliError> {
        let mut stdout = std::io::stdout().lock();
        self.run_with(&mut stdout)
    }

    fn run_with(self, writer: &mut dyn Write) -> Result<(), CliError> {
        match self.command {
            Command::Validate(args) => local::run_validate(args, writer),
            Command::Convert(args) => local::run_convert(&args, writer),
            Command::Geocode(args) => service::run_geocode(args, writer),
            Command::Upload(args) => service::run_upload(args, writer),
            Command::Download(args) => service::run_download(args, writer),
            Command::Publish(args) => service::run_manage(args, ManageAction::Publish, writer),
            Command::Rollback(args) => service::run_manage(args, ManageAction::Rollback, writer),
            Command::Visibility(args) => {
                service::run_manage(args, ManageAction::Visibility, writer)
            }
        }
    }
}

/// Write `value` as pretty JSON followed by a newline.
fn write_json<T: serde::Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .map_err(CliError::WriteStdout)
}

#[cfg(test)]
mod tests;
