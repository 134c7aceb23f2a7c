//! Uploading, downloading, and administering stored data sources.

use geodata_core::{DataSource, DataSourceDetails, DataSourceFormat};

use crate::dataflow::{
    DataflowConfig, DataflowError, DataflowJob, DataflowTransport, JobKind, JobPoller,
    LoadOperation, StatusSink, TransportRequest, gzip, notify,
};

/// How [`DataSourceManager::upload`] sends a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Payload encoding.
    pub format: DataSourceFormat,
    /// Replace or merge with the stored entities.
    pub operation: LoadOperation,
    /// Make the data source publicly queryable.
    pub set_public: bool,
    /// Leave out rows with neither coordinates nor a geography.
    pub skip_empty_locations: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            format: DataSourceFormat::Xml,
            operation: LoadOperation::Complete,
            set_public: false,
            skip_empty_locations: true,
        }
    }
}

/// Runs data source management jobs. Every job authenticates with the
/// master key held in the data source details.
pub struct DataSourceManager<T> {
    transport: T,
    config: DataflowConfig,
    sink: Option<Box<dyn StatusSink>>,
}

impl<T: DataflowTransport> DataSourceManager<T> {
    /// Manager sending requests through `transport`.
    #[must_use]
    pub const fn new(transport: T, config: DataflowConfig) -> Self {
        Self {
            transport,
            config,
            sink: None,
        }
    }

    /// Report progress to `sink`.
    #[must_use]
    pub fn with_status_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Serialise `source` and upload it under its own name.
    pub async fn upload(
        &self,
        source: &DataSource,
        options: UploadOptions,
    ) -> Result<DataflowJob, DataflowError> {
        let payload = source.to_bytes(options.format, options.skip_empty_locations)?;
        self.upload_bytes(source.details(), payload, options).await
    }

    /// Upload an already encoded payload. This is the only way to send KML
    /// and shapefile data, which are never parsed locally.
    pub async fn upload_bytes(
        &self,
        details: &DataSourceDetails,
        payload: Vec<u8>,
        options: UploadOptions,
    ) -> Result<DataflowJob, DataflowError> {
        let key = master_key(details, "uploading")?;
        let kind = JobKind::Load {
            data_source_name: &details.name,
            operation: options.operation,
            format: options.format,
            set_public: options.set_public,
        };
        let url = kind.create_url(&self.config, key)?;
        notify(self.sink.as_deref(), "Uploading data source.");
        let request =
            TransportRequest::post_gzip(url, content_type(options.format), gzip(&payload)?);
        self.poller().run(request, key).await?.into_completed()
    }

    /// Export a stored data source and parse it.
    ///
    /// The returned data source keeps the keys and access id of `details`.
    pub async fn download(&self, details: &DataSourceDetails) -> Result<DataSource, DataflowError> {
        let key = master_key(details, "downloading")?;
        let kind = JobKind::Download {
            access_id: &details.access_id,
            data_source_name: &details.name,
        };
        let poller = self.poller();
        let job = self.start(&poller, kind, key).await?;
        let link = job.require_link("output", None)?;
        notify(self.sink.as_deref(), "Downloading data source.");
        let bytes = poller.fetch(&link.url, key).await?;
        let mut source = DataSource::read(bytes.as_slice(), DataSourceFormat::Xml)?;
        let downloaded = source.details_mut();
        let entity_type_name = std::mem::take(&mut downloaded.entity_type_name);
        *downloaded = DataSourceDetails {
            entity_type_name: if entity_type_name.is_empty() {
                details.entity_type_name.clone()
            } else {
                entity_type_name
            },
            ..details.clone()
        };
        Ok(source)
    }

    /// Promote the staged version of a data source.
    pub async fn publish_staging(
        &self,
        details: &DataSourceDetails,
    ) -> Result<DataflowJob, DataflowError> {
        let key = master_key(details, "publishing")?;
        let kind = JobKind::PublishStaging {
            access_id: &details.access_id,
            data_source_name: &details.name,
        };
        self.start(&self.poller(), kind, key).await
    }

    /// Return a data source to its previous published version.
    pub async fn rollback(
        &self,
        details: &DataSourceDetails,
    ) -> Result<DataflowJob, DataflowError> {
        let key = master_key(details, "rolling back")?;
        let kind = JobKind::Rollback {
            access_id: &details.access_id,
            data_source_name: &details.name,
        };
        self.start(&self.poller(), kind, key).await
    }

    /// Make a data source public or private.
    pub async fn set_visibility(
        &self,
        details: &DataSourceDetails,
        public: bool,
    ) -> Result<DataflowJob, DataflowError> {
        let key = master_key(details, "changing visibility")?;
        let kind = JobKind::Visibility {
            access_id: &details.access_id,
            data_source_name: &details.name,
            public,
        };
        self.start(&self.poller(), kind, key).await
    }

    /// Run a body-less job to completion.
    async fn start(
        &self,
        poller: &JobPoller<'_, T>,
        kind: JobKind<'_>,
        key: &str,
    ) -> Result<DataflowJob, DataflowError> {
        let url = kind.create_url(&self.config, key)?;
        notify(self.sink.as_deref(), &format!("Starting {kind} job."));
        poller
            .run(TransportRequest::get(url), key)
            .await?
            .into_completed()
    }

    fn poller(&self) -> JobPoller<'_, T> {
        JobPoller::new(&self.transport, &self.config).with_sink(self.sink.as_deref())
    }
}

fn master_key<'a>(
    details: &'a DataSourceDetails,
    operation: &'static str,
) -> Result<&'a str, DataflowError> {
    let key = details.master_key.trim();
    if key.is_empty() {
        return Err(DataflowError::MissingKey { operation });
    }
    Ok(key)
}

const fn content_type(format: DataSourceFormat) -> &'static str {
    match format {
        DataSourceFormat::Xml => "application/xml",
        DataSourceFormat::Kml => "application/vnd.google-earth.kml+xml",
        DataSourceFormat::Shp => "application/octet-stream",
        DataSourceFormat::Csv | DataSourceFormat::Tab | DataSourceFormat::Pipe => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Read, time::Duration};

    use flate2::read::GzDecoder;
    use geodata_core::{Column, SemanticType, Value};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::dataflow::test_support::{ScriptedTransport, block_on_for_tests};

    const LOCATION: &str = "https://example.org/REST/v1/Dataflows/LoadDataSource/job-7";

    #[fixture]
    fn details() -> DataSourceDetails {
        DataSourceDetails {
            access_id: "a1b2".into(),
            name: "Shops".into(),
            entity_type_name: "Shop".into(),
            master_key: "master".into(),
            ..DataSourceDetails::default()
        }
    }

    #[fixture]
    fn config() -> DataflowConfig {
        DataflowConfig::new("https://example.org/REST/v1").with_poll_interval(Duration::ZERO)
    }

    fn shops(details: DataSourceDetails) -> DataSource {
        let mut source = DataSource::with_details(details);
        for (name, semantic_type, key) in [
            ("ShopId", SemanticType::String, true),
            ("Latitude", SemanticType::Double, false),
            ("Longitude", SemanticType::Double, false),
        ] {
            source.push_column(Column::new(name, semantic_type, key).expect("column"));
        }
        source.push_row(vec![
            Value::String("1".into()),
            Value::Double(47.6),
            Value::Double(-122.3),
        ]);
        source.push_row(vec![Value::String("2".into()), Value::Null, Value::Null]);
        source
    }

    #[rstest]
    fn upload_sends_compressed_located_rows(details: DataSourceDetails, config: DataflowConfig) {
        let transport = ScriptedTransport::new();
        transport.push_created(LOCATION);
        transport.push_job("Completed", &[]);
        let manager = DataSourceManager::new(&transport, config);
        let source = shops(details);
        let options = UploadOptions {
            format: DataSourceFormat::Csv,
            ..UploadOptions::default()
        };

        let job = block_on_for_tests(manager.upload(&source, options)).expect("upload");
        assert_eq!(job.status, crate::JobStatus::Completed);

        let request = &transport.requests()[0];
        assert!(request.url.contains("dataSourceName=Shops"));
        assert!(request.url.contains("input=csv"));
        assert_eq!(request.content_type, Some("text/plain"));
        let mut text = String::new();
        GzDecoder::new(request.body.as_slice())
            .read_to_string(&mut text)
            .expect("gunzip");
        let uploaded =
            DataSource::parse(&text, DataSourceFormat::Csv).expect("uploaded payload parses");
        assert_eq!(uploaded.rows().len(), 1);
    }

    #[rstest]
    fn upload_requires_master_key(config: DataflowConfig) {
        let transport = ScriptedTransport::new();
        let manager = DataSourceManager::new(&transport, config);
        let result = block_on_for_tests(manager.upload_bytes(
            &DataSourceDetails::default(),
            b"kml".to_vec(),
            UploadOptions {
                format: DataSourceFormat::Kml,
                ..UploadOptions::default()
            },
        ));
        assert!(matches!(result, Err(DataflowError::MissingKey { .. })));
        assert!(transport.requests().is_empty());
    }

    #[rstest]
    fn download_parses_output_and_keeps_identity(
        details: DataSourceDetails,
        config: DataflowConfig,
    ) {
        let exported = shops(DataSourceDetails {
            name: "Shops".into(),
            entity_type_name: "Shop".into(),
            ..DataSourceDetails::default()
        })
        .to_bytes(DataSourceFormat::Xml, false)
        .expect("xml export");
        let transport = ScriptedTransport::new();
        transport.push_created("https://example.org/REST/v1/Dataflows/DataSourceDownload/job-9");
        transport.push_job("Completed", &[("output", "", "https://example.org/out/shops.xml")]);
        transport.push_ok(exported);
        let manager = DataSourceManager::new(&transport, config);

        let source = block_on_for_tests(manager.download(&details)).expect("download");

        assert_eq!(source.rows().len(), 2);
        assert_eq!(source.details().master_key, "master");
        assert_eq!(source.details().entity_type_name, "Shop");
        let requests = transport.requests();
        assert!(requests[0].url.contains("/Dataflows/DataSourceDownload/a1b2/Shops?"));
        assert!(requests[2].url.starts_with("https://example.org/out/shops.xml?key=master"));
    }

    #[rstest]
    fn download_without_output_link_fails(details: DataSourceDetails, config: DataflowConfig) {
        let transport = ScriptedTransport::new();
        transport.push_created("https://example.org/jobs/9");
        transport.push_job("Completed", &[]);
        let manager = DataSourceManager::new(&transport, config);
        let result = block_on_for_tests(manager.download(&details));
        assert!(matches!(result, Err(DataflowError::MissingOutputLink { .. })));
    }

    #[rstest]
    #[case::publish("DataSourcePublish")]
    #[case::rollback("DataSourceRollback")]
    #[case::visibility("DataSourceVisibility")]
    fn administrative_jobs_poll_to_completion(
        details: DataSourceDetails,
        config: DataflowConfig,
        #[case] endpoint: &str,
    ) {
        let transport = ScriptedTransport::new();
        transport.push_created("https://example.org/jobs/3");
        transport.push_job("Pending", &[]);
        transport.push_job("Completed", &[]);
        let manager = DataSourceManager::new(&transport, config);
        let job = block_on_for_tests(async {
            match endpoint {
                "DataSourcePublish" => manager.publish_staging(&details).await,
                "DataSourceRollback" => manager.rollback(&details).await,
                _ => manager.set_visibility(&details, true).await,
            }
        })
        .expect("job");
        assert_eq!(job.status, crate::JobStatus::Completed);
        let created = &transport.requests()[0];
        assert_eq!(created.method, crate::Method::Get);
        assert!(created.url.contains(endpoint), "{}", created.url);
    }

    #[rstest]
    fn aborted_jobs_become_errors(details: DataSourceDetails, config: DataflowConfig) {
        let transport = ScriptedTransport::new();
        transport.push_created("https://example.org/jobs/4");
        transport.push_job("Aborted", &[]);
        let manager = DataSourceManager::new(&transport, config);
        let result = block_on_for_tests(manager.rollback(&details));
        assert!(matches!(result, Err(DataflowError::JobAborted { .. })));
    }
}
