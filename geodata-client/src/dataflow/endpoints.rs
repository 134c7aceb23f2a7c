//! URLs of the dataflow job endpoints.

use std::fmt;

use geodata_core::DataSourceFormat;
use url::Url;

use super::{DataflowConfig, DataflowError, Method};

/// How an upload combines with the data already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOperation {
    /// Replace every entity.
    #[default]
    Complete,
    /// Add, update, or delete the uploaded entities only.
    Incremental,
}

impl LoadOperation {
    /// Query parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incremental => "incremental",
        }
    }
}

/// A job the service can run, together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind<'a> {
    /// Batch geocode of an uploaded feed.
    Geocode,
    /// Upload of a data source.
    Load {
        /// Target data source name.
        data_source_name: &'a str,
        /// Upload mode.
        operation: LoadOperation,
        /// Payload encoding.
        format: DataSourceFormat,
        /// Whether the data source becomes publicly queryable.
        set_public: bool,
    },
    /// Export of a stored data source.
    Download {
        /// Service-assigned access id.
        access_id: &'a str,
        /// Data source name.
        data_source_name: &'a str,
    },
    /// Promotion of the staged version.
    PublishStaging {
        /// Service-assigned access id.
        access_id: &'a str,
        /// Data source name.
        data_source_name: &'a str,
    },
    /// Return to the previous published version.
    Rollback {
        /// Service-assigned access id.
        access_id: &'a str,
        /// Data source name.
        data_source_name: &'a str,
    },
    /// Make a data source public or private.
    Visibility {
        /// Service-assigned access id.
        access_id: &'a str,
        /// Data source name.
        data_source_name: &'a str,
        /// Desired visibility.
        public: bool,
    },
}

impl JobKind<'_> {
    /// Verb used to create the job.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Geocode | Self::Load { .. } => Method::Post,
            Self::Download { .. }
            | Self::PublishStaging { .. }
            | Self::Rollback { .. }
            | Self::Visibility { .. } => Method::Get,
        }
    }

    /// Creation URL carrying `key` and the configured client version.
    ///
    /// # Examples
    /// ```
    /// use geodata_client::{DataflowConfig, JobKind};
    ///
    /// let config = DataflowConfig::new("https://example.org/REST/v1")
    ///     .with_client_version("test-1");
    /// let url = JobKind::Geocode.create_url(&config, "abc")?;
    /// assert_eq!(
    ///     url,
    ///     "https://example.org/REST/v1/Dataflows/Geocode?input=xml&output=json&key=abc&clientApi=test-1"
    /// );
    /// # Ok::<(), geodata_client::DataflowError>(())
    /// ```
    pub fn create_url(&self, config: &DataflowConfig, key: &str) -> Result<String, DataflowError> {
        let base = config.base_url.trim_end_matches('/');
        let (path, mut params): (String, Vec<(&str, String)>) = match *self {
            Self::Geocode => (
                "Dataflows/Geocode".to_owned(),
                vec![("input", "xml".to_owned())],
            ),
            Self::Load {
                data_source_name,
                operation,
                format,
                set_public,
            } => (
                "Dataflows/LoadDataSource".to_owned(),
                vec![
                    ("dataSourceName", data_source_name.to_owned()),
                    ("loadOperation", operation.as_str().to_owned()),
                    ("input", format.as_str().to_owned()),
                    ("setPublic", flag(set_public).to_owned()),
                ],
            ),
            Self::Download {
                access_id,
                data_source_name,
            } => (
                format!("Dataflows/DataSourceDownload/{access_id}/{data_source_name}"),
                Vec::new(),
            ),
            Self::PublishStaging {
                access_id,
                data_source_name,
            } => (
                format!("Dataflows/DataSourcePublish/{access_id}/{data_source_name}"),
                Vec::new(),
            ),
            Self::Rollback {
                access_id,
                data_source_name,
            } => (
                format!("Dataflows/DataSourceRollback/{access_id}/{data_source_name}"),
                Vec::new(),
            ),
            Self::Visibility {
                access_id,
                data_source_name,
                public,
            } => (
                format!("Dataflows/DataSourceVisibility/{access_id}/{data_source_name}"),
                vec![("setPublic", flag(public).to_owned())],
            ),
        };
        params.push(("output", "json".to_owned()));
        let raw = format!("{base}/{path}");
        let mut url = parse(&raw)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(name, value)| (*name, value.as_str())));
        sign(url, key, &config.client_version)
    }
}

impl fmt::Display for JobKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Geocode => "geocode",
            Self::Load { .. } => "upload",
            Self::Download { .. } => "download",
            Self::PublishStaging { .. } => "publish",
            Self::Rollback { .. } => "rollback",
            Self::Visibility { .. } => "visibility",
        })
    }
}

/// Status URL for a `Location` returned at job creation.
pub(crate) fn status_url(
    location: &str,
    key: &str,
    config: &DataflowConfig,
) -> Result<String, DataflowError> {
    let mut url = parse(location)?;
    if !has_param(&url, "output") {
        url.query_pairs_mut().append_pair("output", "json");
    }
    sign(url, key, &config.client_version)
}

/// Add the access key and client version to a service URL unless present.
pub(crate) fn signed_url(
    raw: &str,
    key: &str,
    config: &DataflowConfig,
) -> Result<String, DataflowError> {
    sign(parse(raw)?, key, &config.client_version)
}

fn sign(mut url: Url, key: &str, client_version: &str) -> Result<String, DataflowError> {
    if !has_param(&url, "key") {
        url.query_pairs_mut().append_pair("key", key);
    }
    if !client_version.is_empty() && !has_param(&url, "clientApi") {
        url.query_pairs_mut().append_pair("clientApi", client_version);
    }
    Ok(url.into())
}

fn parse(raw: &str) -> Result<Url, DataflowError> {
    Url::parse(raw).map_err(|source| DataflowError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })
}

fn has_param(url: &Url, name: &str) -> bool {
    url.query_pairs()
        .any(|(param, _)| param.eq_ignore_ascii_case(name))
}

const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
