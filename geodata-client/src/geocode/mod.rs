//! Batch geocoding through the dataflow job protocol.

mod data_source;

#[cfg(test)]
mod tests;

use geodata_core::{DataSourceFormat, GeocodeFeed};

use crate::dataflow::{
    DataflowConfig, DataflowError, DataflowJob, DataflowTransport, JobKind, JobPoller, StatusSink,
    TransportRequest, gzip, notify,
};

pub use data_source::DataSourceGeocodeOutcome;

const XML_CONTENT_TYPE: &str = "application/xml";

/// Result of a batch geocode job.
///
/// Failures are recorded in [`GeocodeOutcome::error`] rather than returned,
/// so whatever was learned before the failure stays inspectable.
#[derive(Debug, Default)]
pub struct GeocodeOutcome {
    /// Final job record, once polling finished.
    pub job: Option<DataflowJob>,
    /// Entities the service geocoded.
    pub succeeded: GeocodeFeed,
    /// Entities the service could not geocode.
    pub failed: GeocodeFeed,
    /// Why the job did not complete.
    pub error: Option<DataflowError>,
}

impl GeocodeOutcome {
    /// Whether the job completed and both outputs were read.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs geocode jobs against the batch geocode dataflow.
pub struct BatchGeocoder<T> {
    transport: T,
    config: DataflowConfig,
    sink: Option<Box<dyn StatusSink>>,
}

impl<T: DataflowTransport> BatchGeocoder<T> {
    /// Geocoder sending requests through `transport`.
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

    /// Transport in use.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &DataflowConfig {
        &self.config
    }

    /// Submit `feed`, wait for the job, and read back both output feeds.
    ///
    /// A completed job without a `failed` link simply had no failures.
    pub async fn geocode(&self, feed: &GeocodeFeed, key: &str) -> GeocodeOutcome {
        let mut outcome = GeocodeOutcome::default();
        if let Err(err) = self.run(feed, key, &mut outcome).await {
            log::warn!("geocode job failed: {err}");
            outcome.error = Some(err);
        }
        outcome
    }

    async fn run(
        &self,
        feed: &GeocodeFeed,
        key: &str,
        outcome: &mut GeocodeOutcome,
    ) -> Result<(), DataflowError> {
        if key.trim().is_empty() {
            return Err(DataflowError::MissingKey {
                operation: "geocoding",
            });
        }
        self.notify("Creating geocode job.");
        let body = gzip(&feed.to_bytes(DataSourceFormat::Xml)?)?;
        let url = JobKind::Geocode.create_url(&self.config, key)?;
        let request = TransportRequest::post_gzip(url, XML_CONTENT_TYPE, body);

        let poller = self.poller();
        let job = poller.run(request, key).await?;
        outcome.job = Some(job.clone());
        let job = job.into_completed()?;

        self.notify("Downloading geocode results.");
        if let Some(link) = job.link("output", Some("succeeded")) {
            let bytes = poller.fetch(&link.url, key).await?;
            outcome.succeeded = GeocodeFeed::read(bytes.as_slice(), DataSourceFormat::Xml)?;
        }
        if let Some(link) = job.link("output", Some("failed")) {
            let bytes = poller.fetch(&link.url, key).await?;
            outcome.failed = GeocodeFeed::read(bytes.as_slice(), DataSourceFormat::Xml)?;
        }
        log::info!(
            "geocode job {} returned {} succeeded and {} failed entities",
            job.id,
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(())
    }

    fn poller(&self) -> JobPoller<'_, T> {
        JobPoller::new(&self.transport, &self.config).with_sink(self.sink.as_deref())
    }

    fn notify(&self, message: &str) {
        notify(self.sink.as_deref(), message);
    }
}
