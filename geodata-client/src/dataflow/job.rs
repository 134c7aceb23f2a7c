//! Job status records and the service's JSON envelope.

use std::fmt;

use serde::Deserialize;

use super::DataflowError;

/// Lifecycle state of a dataflow job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    /// Created and still running.
    #[default]
    Pending,
    /// Finished; output links are available.
    Completed,
    /// Stopped by the service.
    Aborted,
    /// Polling gave up before the job reached a final state.
    Unknown,
}

impl JobStatus {
    /// Parse a status reported by the service. `Unknown` is never reported
    /// by the service, so it is not accepted here.
    #[must_use]
    pub fn from_service(status: &str) -> Option<Self> {
        match status.trim() {
            s if s.eq_ignore_ascii_case("pending") => Some(Self::Pending),
            s if s.eq_ignore_ascii_case("completed") => Some(Self::Completed),
            s if s.eq_ignore_ascii_case("aborted") => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Whether polling should stop.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
            Self::Unknown => "Unknown",
        })
    }
}

/// A `(role, name, url)` link attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Link {
    /// Purpose of the link, such as `self` or `output`.
    #[serde(default)]
    pub role: String,
    /// Qualifier within the role, such as `succeeded` or `failed`.
    #[serde(default)]
    pub name: String,
    /// Target URL.
    pub url: String,
}

/// State of a dataflow job as last reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataflowJob {
    /// Service-assigned job id.
    pub id: String,
    /// URL polled for status.
    pub status_url: String,
    /// Current state.
    pub status: JobStatus,
    /// Links attached to the job.
    pub links: Vec<Link>,
    /// Error details reported with the job.
    pub error_message: String,
    /// Creation time as reported.
    pub created_date: String,
    /// Completion time as reported.
    pub completed_date: String,
    /// Entities submitted.
    pub total_entity_count: u64,
    /// Entities processed so far.
    pub processed_entity_count: u64,
    /// Entities that could not be processed.
    pub failed_entity_count: u64,
}

impl DataflowJob {
    /// A job known only by its status URL.
    #[must_use]
    pub fn pending(status_url: impl Into<String>) -> Self {
        Self {
            status_url: status_url.into(),
            ..Self::default()
        }
    }

    /// First link with `role` and, when given, `name`.
    #[must_use]
    pub fn link(&self, role: &str, name: Option<&str>) -> Option<&Link> {
        self.links.iter().find(|link| {
            link.role.eq_ignore_ascii_case(role)
                && name.is_none_or(|name| link.name.eq_ignore_ascii_case(name))
        })
    }

    /// Like [`DataflowJob::link`], failing when the link is absent.
    pub fn require_link(&self, role: &str, name: Option<&str>) -> Result<&Link, DataflowError> {
        self.link(role, name)
            .ok_or_else(|| DataflowError::MissingOutputLink {
                role: role.to_owned(),
                name: name.unwrap_or_default().to_owned(),
            })
    }

    /// Turn aborted and unknown jobs into errors.
    pub fn into_completed(self) -> Result<Self, DataflowError> {
        match self.status {
            JobStatus::Completed => Ok(self),
            JobStatus::Aborted => Err(DataflowError::JobAborted {
                message: self.error_message,
            }),
            JobStatus::Unknown | JobStatus::Pending => Err(DataflowError::JobUnknown {
                message: self.error_message,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    resource_sets: Vec<ResourceSet>,
    #[serde(default)]
    error_details: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceSet {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resource {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    created_date: String,
    #[serde(default)]
    completed_date: String,
    #[serde(default)]
    total_entity_count: u64,
    #[serde(default)]
    processed_entity_count: u64,
    #[serde(default)]
    failed_entity_count: u64,
}

/// Decode a status document into a job record.
///
/// Fails when the body is not the expected envelope, holds no resource, or
/// reports a status outside [`JobStatus::from_service`].
pub fn parse_job(body: &[u8], status_url: &str) -> Result<DataflowJob, DataflowError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|err| DataflowError::ParseStatus {
            message: err.to_string(),
        })?;
    let Envelope {
        resource_sets,
        error_details,
    } = envelope;
    let resource = resource_sets
        .into_iter()
        .flat_map(|set| set.resources)
        .next()
        .ok_or_else(|| DataflowError::ParseStatus {
            message: "status document holds no job resource".to_owned(),
        })?;
    let status = JobStatus::from_service(&resource.status).ok_or_else(|| {
        DataflowError::UnexpectedStatus {
            status: resource.status.clone(),
        }
    })?;

    let error_message = [resource.error_message]
        .into_iter()
        .chain(error_details)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    Ok(DataflowJob {
        id: resource.id,
        status_url: status_url.to_owned(),
        status,
        links: resource.links,
        error_message,
        created_date: resource.created_date,
        completed_date: resource.completed_date,
        total_entity_count: resource.total_entity_count,
        processed_entity_count: resource.processed_entity_count,
        failed_entity_count: resource.failed_entity_count,
    })
}

/// Human-readable details of an error response.
///
/// Uses the `errorDetails` lines of a JSON error envelope when present and
/// falls back to the raw body text.
#[must_use]
pub fn error_details(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<Envelope>(body)
        && !envelope.error_details.is_empty()
    {
        return envelope.error_details.join("; ");
    }
    String::from_utf8_lossy(body).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const COMPLETED: &str = r#"{
        "authenticationResultCode": "ValidCredentials",
        "resourceSets": [{
            "estimatedTotal": 1,
            "resources": [{
                "__type": "DataflowJob:http://schemas.microsoft.com/search/local/ws/rest/v1",
                "id": "5bf10c37df554d3587d86e4e9e5fb2e5",
                "links": [
                    {"role": "self", "url": "https://example.org/Dataflows/Geocode/5bf1"},
                    {"name": "succeeded", "role": "output", "url": "https://example.org/Dataflows/Geocode/5bf1/output/succeeded"}
                ],
                "completedDate": "Fri, 13 May 2011 19:38:42 GMT",
                "createdDate": "Fri, 13 May 2011 19:38:27 GMT",
                "failedEntityCount": 0,
                "processedEntityCount": 2,
                "status": "Completed",
                "totalEntityCount": 2
            }]
        }],
        "statusCode": 200
    }"#;

    #[rstest]
    fn parses_completed_job() {
        let job = parse_job(COMPLETED.as_bytes(), "status").expect("parse");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.id, "5bf10c37df554d3587d86e4e9e5fb2e5");
        assert_eq!(job.processed_entity_count, 2);
        assert_eq!(job.created_date, "Fri, 13 May 2011 19:38:27 GMT");
        let link = job.link("output", Some("succeeded")).expect("succeeded link");
        assert!(link.url.ends_with("/output/succeeded"));
        assert!(job.link("output", Some("failed")).is_none());
        assert!(job.link("output", None).is_some());
    }

    #[rstest]
    fn joins_error_lines_of_aborted_jobs() {
        let body = br#"{"resourceSets":[{"resources":[{"id":"j","status":"Aborted","errorMessage":"Bad feed"}]}],
                        "errorDetails":["Line 3 is malformed.","Line 9 is malformed."]}"#;
        let job = parse_job(body, "status").expect("parse");
        assert_eq!(job.status, JobStatus::Aborted);
        assert_eq!(
            job.error_message,
            "Bad feed; Line 3 is malformed.; Line 9 is malformed."
        );
        assert!(matches!(
            job.into_completed(),
            Err(DataflowError::JobAborted { message }) if message.starts_with("Bad feed")
        ));
    }

    #[rstest]
    #[case(br#"{"resourceSets":[{"resources":[{"status":"Exploded"}]}]}"#.as_slice())]
    #[case(br#"{"resourceSets":[]}"#.as_slice())]
    #[case(b"<html>gateway error</html>".as_slice())]
    fn rejects_unusable_status_documents(#[case] body: &[u8]) {
        assert!(parse_job(body, "status").is_err());
    }

    #[rstest]
    #[case(JobStatus::Pending, false)]
    #[case(JobStatus::Completed, true)]
    #[case(JobStatus::Aborted, true)]
    #[case(JobStatus::Unknown, true)]
    fn only_pending_jobs_keep_polling(#[case] status: JobStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    fn error_details_prefer_json_lines() {
        let body = br#"{"errorDetails":["Access was denied."],"statusCode":401}"#;
        assert_eq!(error_details(body), "Access was denied.");
        assert_eq!(error_details(b" Service Unavailable \n"), "Service Unavailable");
    }

    #[rstest]
    fn missing_links_are_reported() {
        let job = DataflowJob::pending("status");
        assert!(matches!(
            job.require_link("output", Some("succeeded")),
            Err(DataflowError::MissingOutputLink { role, name }) if role == "output" && name == "succeeded"
        ));
    }
}
