//! Commands that work on local files only.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use geodata_core::{DataSource, DataSourceFormat, ValidationReport};
use log::info;
use serde::Serialize;

use crate::{CliError, fs, write_json};

/// Arguments for `validate`.
#[derive(Debug, Clone, Args)]
pub(crate) struct ValidateArgs {
    /// Data source file to check.
    #[arg(value_name = "path")]
    pub(crate) path: Utf8PathBuf,
    /// Input format; inferred from the file extension when omitted.
    #[arg(long, value_name = "format")]
    pub(crate) format: Option<DataSourceFormat>,
    /// Data source name for files that do not carry one; defaults to the
    /// file stem.
    #[arg(long, value_name = "name")]
    pub(crate) name: Option<String>,
}

/// Arguments for `convert`.
#[derive(Debug, Clone, Args)]
pub(crate) struct ConvertArgs {
    /// Data source file to read.
    #[arg(value_name = "input")]
    pub(crate) input: Utf8PathBuf,
    /// File to write.
    #[arg(value_name = "output")]
    pub(crate) output: Utf8PathBuf,
    /// Input format; inferred from the input extension when omitted.
    #[arg(long, value_name = "format")]
    pub(crate) from: Option<DataSourceFormat>,
    /// Output format; inferred from the output extension when omitted.
    #[arg(long, value_name = "format")]
    pub(crate) to: Option<DataSourceFormat>,
    /// Leave out rows that have neither coordinates nor a geography.
    #[arg(long)]
    pub(crate) skip_empty_locations: bool,
}

#[derive(Debug, Serialize)]
struct ValidateOutput<'a> {
    path: &'a Utf8Path,
    rows: usize,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

pub(crate) fn run_validate(args: ValidateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let format = resolve_format(&args.path, args.format)?;
    let mut source = load_source(&args.path, format)?;
    let details = source.details_mut();
    if let Some(name) = args.name {
        details.name = name;
    } else if details.name.is_empty()
        && let Some(stem) = args.path.file_stem()
    {
        stem.clone_into(&mut details.name);
    }
    let report = source.validate();
    write_json(
        writer,
        &ValidateOutput {
            path: &args.path,
            rows: source.rows().len(),
            report: &report,
        },
    )?;
    if report.is_valid() {
        Ok(())
    } else {
        Err(CliError::Invalid {
            path: args.path,
            errors: report.errors.len(),
        })
    }
}

pub(crate) fn run_convert(args: &ConvertArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let from = resolve_format(&args.input, args.from)?;
    let to = resolve_format(&args.output, args.to)?;
    let source = load_source(&args.input, from)?;
    save_source(&source, &args.output, to, args.skip_empty_locations)?;
    info!(
        "converted {} ({from}) to {} ({to})",
        args.input, args.output
    );
    writeln!(writer, "{}", args.output).map_err(CliError::WriteStdout)
}

/// Use `explicit` when given, else infer the format from the extension.
pub(crate) fn resolve_format(
    path: &Utf8Path,
    explicit: Option<DataSourceFormat>,
) -> Result<DataSourceFormat, CliError> {
    explicit
        .or_else(|| path.extension().and_then(DataSourceFormat::from_extension))
        .ok_or_else(|| CliError::UnknownFormat {
            path: path.to_path_buf(),
        })
}

pub(crate) fn load_source(
    path: &Utf8Path,
    format: DataSourceFormat,
) -> Result<DataSource, CliError> {
    let bytes = fs::read_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    DataSource::read(bytes.as_slice(), format).map_err(|source| CliError::DataSource {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

pub(crate) fn save_source(
    source: &DataSource,
    path: &Utf8Path,
    format: DataSourceFormat,
    skip_empty_locations: bool,
) -> Result<(), CliError> {
    let bytes = source
        .to_bytes(format, skip_empty_locations)
        .map_err(|error| CliError::DataSource {
            path: path.to_path_buf(),
            source: Box::new(error),
        })?;
    fs::write_file(path, &bytes).map_err(|source| CliError::WriteOutput {
        path: path.to_path_buf(),
        source,
    })
}
