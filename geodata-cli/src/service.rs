//! Commands that run dataflow jobs against the spatial data service.
//!
//! Every service command accepts its options from CLI flags, configuration
//! files, or `GEODATA_CMDS_<COMMAND>_<FIELD>` environment variables, merged
//! by `ortho_config` before the resolved configuration is checked.

use std::{future::Future, io::Write, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geodata_client::{
    BatchGeocoder, DataSourceManager, DataflowConfig, DataflowError, DataflowJob,
    DataflowTransport, HttpTransport, LoadOperation, UploadOptions, dataflow::DEFAULT_BASE_URL,
};
use geodata_core::{DataSourceDetails, DataSourceFormat, geocode::DEFAULT_CULTURE};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_ACCESS_ID, ARG_INPUT, ARG_KEY, ARG_NAME, ARG_OUTPUT, ARG_PUBLIC, CliError,
    ENV_DOWNLOAD_ACCESS_ID, ENV_DOWNLOAD_KEY, ENV_DOWNLOAD_NAME, ENV_DOWNLOAD_OUTPUT,
    ENV_GEOCODE_INPUT, ENV_GEOCODE_KEY, ENV_GEOCODE_OUTPUT, ENV_MANAGE_ACCESS_ID,
    ENV_MANAGE_KEY, ENV_MANAGE_NAME, ENV_MANAGE_PUBLIC, ENV_UPLOAD_INPUT, ENV_UPLOAD_KEY,
    ENV_UPLOAD_NAME, fs,
    local::{load_source, resolve_format, save_source},
    write_json,
};

/// Connection settings shared by every service command.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServiceSettings {
    pub(crate) key: String,
    pub(crate) dataflow: DataflowConfig,
}

impl ServiceSettings {
    fn resolve(
        key: Option<String>,
        key_env: &'static str,
        base_url: Option<String>,
        poll_interval_ms: Option<u64>,
        client_version: Option<String>,
    ) -> Result<Self, CliError> {
        let key = key
            .filter(|key| !key.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_KEY,
                env: key_env,
            })?;
        let mut dataflow = DataflowConfig::new(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        if let Some(millis) = poll_interval_ms {
            dataflow = dataflow.with_poll_interval(Duration::from_millis(millis));
        }
        if let Some(version) = client_version {
            dataflow = dataflow.with_client_version(version);
        }
        Ok(Self { key, dataflow })
    }

    fn details(&self, access_id: String, name: String) -> DataSourceDetails {
        DataSourceDetails {
            access_id,
            name,
            master_key: self.key.clone(),
            ..DataSourceDetails::default()
        }
    }
}

/// CLI arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "geocode",
    about = "Geocode rows that have an address but no coordinates",
    long_about = "Read a data source, submit every distinct address that \
                 lacks coordinates to the batch geocode service, and write \
                 the data source back with Latitude and Longitude filled in."
)]
#[ortho_config(prefix = "GEODATA")]
pub(crate) struct GeocodeArgs {
    /// Data source to geocode.
    #[arg(long = ARG_INPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Where to write the geocoded data source.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Input format; inferred from the input extension when omitted.
    #[arg(long, value_name = "format")]
    #[serde(default)]
    pub(crate) format: Option<String>,
    /// Culture sent with each geocode request.
    #[arg(long, value_name = "culture")]
    #[serde(default)]
    pub(crate) culture: Option<String>,
    /// Service key used to run the geocode job.
    #[arg(long = ARG_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) key: Option<String>,
    /// Dataflow service root.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Milliseconds between job status checks.
    #[arg(long, value_name = "ms")]
    #[serde(default)]
    pub(crate) poll_interval_ms: Option<u64>,
    /// Client version reported to the service.
    #[arg(long, value_name = "version")]
    #[serde(default)]
    pub(crate) client_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GeocodeConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) format: DataSourceFormat,
    pub(crate) culture: String,
    pub(crate) service: ServiceSettings,
}

impl GeocodeArgs {
    fn into_config(self) -> Result<GeocodeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        GeocodeConfig::try_from(merged)
    }
}

impl TryFrom<GeocodeArgs> for GeocodeConfig {
    type Error = CliError;

    fn try_from(args: GeocodeArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_GEOCODE_INPUT,
        })?;
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_GEOCODE_OUTPUT,
        })?;
        let format = parse_format(&input, args.format.as_deref())?;
        let service = ServiceSettings::resolve(
            args.key,
            ENV_GEOCODE_KEY,
            args.base_url,
            args.poll_interval_ms,
            args.client_version,
        )?;
        Ok(Self {
            input,
            output,
            format,
            culture: args.culture.unwrap_or_else(|| DEFAULT_CULTURE.to_owned()),
            service,
        })
    }
}

/// CLI arguments for the `upload` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "upload", about = "Upload a data source to the service")]
#[ortho_config(prefix = "GEODATA")]
pub(crate) struct UploadArgs {
    /// Data source file to upload.
    #[arg(long = ARG_INPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Data source name; defaults to the name stored in the file.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Payload format; inferred from the input extension when omitted.
    #[arg(long, value_name = "format")]
    #[serde(default)]
    pub(crate) format: Option<String>,
    /// Merge with the stored entities instead of replacing them.
    #[arg(long)]
    #[serde(default)]
    pub(crate) incremental: Option<bool>,
    /// Make the data source publicly queryable.
    #[arg(long = ARG_PUBLIC)]
    #[serde(default)]
    pub(crate) public: Option<bool>,
    /// Master key of the data source.
    #[arg(long = ARG_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) key: Option<String>,
    /// Dataflow service root.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Milliseconds between job status checks.
    #[arg(long, value_name = "ms")]
    #[serde(default)]
    pub(crate) poll_interval_ms: Option<u64>,
    /// Client version reported to the service.
    #[arg(long, value_name = "version")]
    #[serde(default)]
    pub(crate) client_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UploadConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) name: Option<String>,
    pub(crate) options: UploadOptions,
    pub(crate) service: ServiceSettings,
}

impl UploadArgs {
    fn into_config(self) -> Result<UploadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        UploadConfig::try_from(merged)
    }
}

impl TryFrom<UploadArgs> for UploadConfig {
    type Error = CliError;

    fn try_from(args: UploadArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_UPLOAD_INPUT,
        })?;
        let format = parse_format(&input, args.format.as_deref())?;
        let service = ServiceSettings::resolve(
            args.key,
            ENV_UPLOAD_KEY,
            args.base_url,
            args.poll_interval_ms,
            args.client_version,
        )?;
        let operation = if args.incremental.unwrap_or(false) {
            LoadOperation::Incremental
        } else {
            LoadOperation::Complete
        };
        Ok(Self {
            input,
            name: args.name.filter(|name| !name.trim().is_empty()),
            options: UploadOptions {
                format,
                operation,
                set_public: args.public.unwrap_or(false),
                ..UploadOptions::default()
            },
            service,
        })
    }
}

/// CLI arguments for the `download` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "download", about = "Download a stored data source")]
#[ortho_config(prefix = "GEODATA")]
pub(crate) struct DownloadArgs {
    /// Access id of the data source.
    #[arg(long = ARG_ACCESS_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) access_id: Option<String>,
    /// Data source name.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Where to write the data source.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Output format; inferred from the output extension when omitted.
    #[arg(long, value_name = "format")]
    #[serde(default)]
    pub(crate) format: Option<String>,
    /// Master key of the data source.
    #[arg(long = ARG_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) key: Option<String>,
    /// Dataflow service root.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Milliseconds between job status checks.
    #[arg(long, value_name = "ms")]
    #[serde(default)]
    pub(crate) poll_interval_ms: Option<u64>,
    /// Client version reported to the service.
    #[arg(long, value_name = "version")]
    #[serde(default)]
    pub(crate) client_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DownloadConfig {
    pub(crate) details: DataSourceDetails,
    pub(crate) output: Utf8PathBuf,
    pub(crate) format: DataSourceFormat,
    pub(crate) service: ServiceSettings,
}

impl DownloadArgs {
    fn into_config(self) -> Result<DownloadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DownloadConfig::try_from(merged)
    }
}

impl TryFrom<DownloadArgs> for DownloadConfig {
    type Error = CliError;

    fn try_from(args: DownloadArgs) -> Result<Self, Self::Error> {
        let access_id = args.access_id.ok_or(CliError::MissingArgument {
            field: ARG_ACCESS_ID,
            env: ENV_DOWNLOAD_ACCESS_ID,
        })?;
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_DOWNLOAD_NAME,
        })?;
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_DOWNLOAD_OUTPUT,
        })?;
        let format = parse_format(&output, args.format.as_deref())?;
        let service = ServiceSettings::resolve(
            args.key,
            ENV_DOWNLOAD_KEY,
            args.base_url,
            args.poll_interval_ms,
            args.client_version,
        )?;
        Ok(Self {
            details: service.details(access_id, name),
            output,
            format,
            service,
        })
    }
}

/// CLI arguments shared by `publish`, `rollback`, and `visibility`.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "manage", about = "Administer a stored data source")]
#[ortho_config(prefix = "GEODATA")]
pub(crate) struct ManageArgs {
    /// Access id of the data source.
    #[arg(long = ARG_ACCESS_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) access_id: Option<String>,
    /// Data source name.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Whether the data source should be public; `visibility` only.
    #[arg(long = ARG_PUBLIC, value_name = "bool")]
    #[serde(default)]
    pub(crate) public: Option<bool>,
    /// Master key of the data source.
    #[arg(long = ARG_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) key: Option<String>,
    /// Dataflow service root.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Milliseconds between job status checks.
    #[arg(long, value_name = "ms")]
    #[serde(default)]
    pub(crate) poll_interval_ms: Option<u64>,
    /// Client version reported to the service.
    #[arg(long, value_name = "version")]
    #[serde(default)]
    pub(crate) client_version: Option<String>,
}

impl ManageArgs {
    fn into_config(self, action: ManageAction) -> Result<ManageConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ManageConfig::resolve(merged, action)
    }
}

/// Administrative job selected by the subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ManageAction {
    Publish,
    Rollback,
    Visibility,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ManageConfig {
    pub(crate) details: DataSourceDetails,
    pub(crate) job: ManageJob,
    pub(crate) service: ServiceSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ManageJob {
    Publish,
    Rollback,
    Visibility { public: bool },
}

impl ManageConfig {
    pub(crate) fn resolve(args: ManageArgs, action: ManageAction) -> Result<Self, CliError> {
        let access_id = args.access_id.ok_or(CliError::MissingArgument {
            field: ARG_ACCESS_ID,
            env: ENV_MANAGE_ACCESS_ID,
        })?;
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_MANAGE_NAME,
        })?;
        let job = match action {
            ManageAction::Publish => ManageJob::Publish,
            ManageAction::Rollback => ManageJob::Rollback,
            ManageAction::Visibility => ManageJob::Visibility {
                public: args.public.ok_or(CliError::MissingArgument {
                    field: ARG_PUBLIC,
                    env: ENV_MANAGE_PUBLIC,
                })?,
            },
        };
        let service = ServiceSettings::resolve(
            args.key,
            ENV_MANAGE_KEY,
            args.base_url,
            args.poll_interval_ms,
            args.client_version,
        )?;
        Ok(Self {
            details: service.details(access_id, name),
            job,
            service,
        })
    }
}

/// Job summary printed once a service command finishes.
#[derive(Debug, Serialize)]
pub(crate) struct JobSummary {
    pub(crate) id: String,
    pub(crate) status: String,
    pub(crate) total_entities: u64,
    pub(crate) processed_entities: u64,
    pub(crate) failed_entities: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) error_message: String,
}

impl From<&DataflowJob> for JobSummary {
    fn from(job: &DataflowJob) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status.to_string(),
            total_entities: job.total_entity_count,
            processed_entities: job.processed_entity_count,
            failed_entities: job.failed_entity_count,
            error_message: job.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GeocodeSummary<'a> {
    output: &'a Utf8Path,
    geocoded_rows: usize,
    failed_rows: &'a [String],
}

#[derive(Debug, Serialize)]
struct DownloadSummary<'a> {
    output: &'a Utf8Path,
    entity_type: &'a str,
    rows: usize,
}

pub(crate) fn run_geocode(args: GeocodeArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let transport = HttpTransport::new(&config.service.dataflow)?;
    block_on(geocode(&config, transport, writer))
}

pub(crate) fn run_upload(args: UploadArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let transport = HttpTransport::new(&config.service.dataflow)?;
    block_on(upload(&config, transport, writer))
}

pub(crate) fn run_download(args: DownloadArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let transport = HttpTransport::new(&config.service.dataflow)?;
    block_on(download(&config, transport, writer))
}

pub(crate) fn run_manage(
    args: ManageArgs,
    action: ManageAction,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config(action)?;
    let transport = HttpTransport::new(&config.service.dataflow)?;
    block_on(manage(&config, transport, writer))
}

/// Geocode the input and write the result to the output path.
pub(crate) async fn geocode<T: DataflowTransport>(
    config: &GeocodeConfig,
    transport: T,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let mut source = load_source(&config.input, config.format)?;
    let geocoder = BatchGeocoder::new(transport, config.service.dataflow.clone());
    let outcome = geocoder
        .geocode_data_source(&mut source, &config.service.key, &config.culture)
        .await;
    if let Some(error) = outcome.error {
        return Err(dataflow_error("geocode", error));
    }
    let output_format = resolve_format(&config.output, None).unwrap_or(config.format);
    save_source(&source, &config.output, output_format, false)?;
    info!(
        "geocoded {} row(s) of {}; {} failed",
        outcome.geocoded_rows,
        config.input,
        outcome.failed_rows.len()
    );
    write_json(
        writer,
        &GeocodeSummary {
            output: &config.output,
            geocoded_rows: outcome.geocoded_rows,
            failed_rows: &outcome.failed_rows,
        },
    )
}

/// Upload the input file. KML and shapefile payloads are sent as read.
pub(crate) async fn upload<T: DataflowTransport>(
    config: &UploadConfig,
    transport: T,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let manager = DataSourceManager::new(transport, config.service.dataflow.clone());
    let result = if config.options.format.is_parsable() {
        let mut source = load_source(&config.input, config.options.format)?;
        let details = source.details_mut();
        if let Some(name) = &config.name {
            details.name.clone_from(name);
        }
        details.master_key.clone_from(&config.service.key);
        require_name(&details.name)?;
        manager.upload(&source, config.options).await
    } else {
        let name = config.name.clone().unwrap_or_default();
        require_name(&name)?;
        let payload = fs::read_file(&config.input).map_err(|source| CliError::ReadInput {
            path: config.input.clone(),
            source,
        })?;
        let details = config.service.details(String::new(), name);
        manager.upload_bytes(&details, payload, config.options).await
    };
    let job = result.map_err(|error| dataflow_error("upload", error))?;
    write_json(writer, &JobSummary::from(&job))
}

/// Download a data source and write it to the output path.
pub(crate) async fn download<T: DataflowTransport>(
    config: &DownloadConfig,
    transport: T,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let manager = DataSourceManager::new(transport, config.service.dataflow.clone());
    let source = manager
        .download(&config.details)
        .await
        .map_err(|error| dataflow_error("download", error))?;
    save_source(&source, &config.output, config.format, false)?;
    write_json(
        writer,
        &DownloadSummary {
            output: &config.output,
            entity_type: &source.details().entity_type_name,
            rows: source.rows().len(),
        },
    )
}

/// Run a publish, rollback, or visibility job.
pub(crate) async fn manage<T: DataflowTransport>(
    config: &ManageConfig,
    transport: T,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let manager = DataSourceManager::new(transport, config.service.dataflow.clone());
    let (operation, result) = match config.job {
        ManageJob::Publish => ("publish", manager.publish_staging(&config.details).await),
        ManageJob::Rollback => ("rollback", manager.rollback(&config.details).await),
        ManageJob::Visibility { public } => (
            "visibility",
            manager.set_visibility(&config.details, public).await,
        ),
    };
    let job = result.map_err(|error| dataflow_error(operation, error))?;
    write_json(writer, &JobSummary::from(&job))
}

fn parse_format(path: &Utf8Path, explicit: Option<&str>) -> Result<DataSourceFormat, CliError> {
    let explicit = explicit.map(str::parse).transpose()?;
    resolve_format(path, explicit)
}

fn require_name(name: &str) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_UPLOAD_NAME,
        });
    }
    Ok(())
}

fn dataflow_error(operation: &'static str, error: DataflowError) -> CliError {
    CliError::Dataflow {
        operation,
        source: Box::new(error),
    }
}

fn block_on<F: Future<Output = Result<(), CliError>>>(future: F) -> Result<(), CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?
        .block_on(future)
}
