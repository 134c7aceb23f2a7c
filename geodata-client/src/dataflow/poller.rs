//! The create → poll → fetch state machine shared by every job.

use super::{
    DataflowConfig, DataflowError, DataflowJob, DataflowTransport, JobStatus, TransportRequest,
    endpoints::{signed_url, status_url},
    job::{error_details, parse_job},
    status::{StatusSink, notify},
};

/// Drives one job through its lifecycle.
///
/// Polling never loops forever: once more than
/// [`DataflowConfig::max_poll_failures`] consecutive status checks fail, the
/// job is reported as [`JobStatus::Unknown`]. A successful check resets the
/// count.
pub struct JobPoller<'a, T: ?Sized> {
    transport: &'a T,
    config: &'a DataflowConfig,
    sink: Option<&'a dyn StatusSink>,
}

impl<'a, T: DataflowTransport + ?Sized> JobPoller<'a, T> {
    /// Poller sending requests through `transport`.
    #[must_use]
    pub const fn new(transport: &'a T, config: &'a DataflowConfig) -> Self {
        Self {
            transport,
            config,
            sink: None,
        }
    }

    /// Report progress to `sink`.
    #[must_use]
    pub const fn with_sink(mut self, sink: Option<&'a dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Create a job and poll it to a final state.
    ///
    /// Aborted and unknown jobs are returned as `Ok`; use
    /// [`DataflowJob::into_completed`] to treat them as errors.
    pub async fn run(
        &self,
        request: TransportRequest,
        key: &str,
    ) -> Result<DataflowJob, DataflowError> {
        let status_url = self.create(request, key).await?;
        self.poll(&status_url).await
    }

    /// Create a job and return its signed status URL.
    pub async fn create(
        &self,
        request: TransportRequest,
        key: &str,
    ) -> Result<String, DataflowError> {
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(DataflowError::Service {
                status: response.status,
                details: error_details(&response.body),
            });
        }
        let location = response
            .location
            .ok_or(DataflowError::MissingLocation { url })?;
        notify(self.sink, "Job created.");
        status_url(&location, key, self.config)
    }

    /// Poll `status_url` until the job leaves [`JobStatus::Pending`].
    pub async fn poll(&self, status_url: &str) -> Result<DataflowJob, DataflowError> {
        let mut job = DataflowJob::pending(status_url);
        let mut failures = 0_u32;
        loop {
            match self.check_status(status_url).await {
                Ok(current) => {
                    failures = 0;
                    job = current;
                    match job.status {
                        JobStatus::Pending => notify(self.sink, "Job processing."),
                        JobStatus::Completed => notify(self.sink, "Job completed."),
                        JobStatus::Aborted => {
                            notify(self.sink, &format!("Job aborted: {}", job.error_message));
                        }
                        JobStatus::Unknown => {}
                    }
                    if job.status.is_terminal() {
                        return Ok(job);
                    }
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    log::warn!("status check {failures} for {status_url} failed: {err}");
                    if failures > self.config.max_poll_failures {
                        job.status = JobStatus::Unknown;
                        job.error_message = err.to_string();
                        notify(
                            self.sink,
                            &format!("Job status unknown after {failures} failed checks."),
                        );
                        return Ok(job);
                    }
                }
            }
            log::debug!("next status check in {:?}", self.config.poll_interval);
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Download the body behind an output link.
    pub async fn fetch(&self, url: &str, key: &str) -> Result<Vec<u8>, DataflowError> {
        let url = signed_url(url, key, self.config)?;
        let response = self.transport.send(TransportRequest::get(url)).await?;
        if !response.is_success() {
            return Err(DataflowError::Service {
                status: response.status,
                details: error_details(&response.body),
            });
        }
        Ok(response.body)
    }

    async fn check_status(&self, status_url: &str) -> Result<DataflowJob, DataflowError> {
        let response = self
            .transport
            .send(TransportRequest::get(status_url))
            .await?;
        if !response.is_success() {
            return Err(DataflowError::Service {
                status: response.status,
                details: error_details(&response.body),
            });
        }
        parse_job(&response.body, status_url)
    }
}
