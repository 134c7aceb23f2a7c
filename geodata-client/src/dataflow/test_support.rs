//! In-memory transport and runtime helper for exercising dataflow jobs.

use std::{cell::RefCell, collections::VecDeque, future::Future, io};

use async_trait::async_trait;

use super::{DataflowTransport, TransportError, TransportRequest, TransportResponse};

/// Replays queued responses in order and records every request.
///
/// # Example
///
/// ```
/// use geodata_client::dataflow::test_support::{ScriptedTransport, block_on_for_tests};
/// use geodata_client::{DataflowTransport, TransportRequest};
///
/// let transport = ScriptedTransport::new();
/// transport.push_created("https://example.org/jobs/1");
/// let response = block_on_for_tests(transport.send(TransportRequest::get("https://example.org")))
///     .expect("scripted response");
/// assert_eq!(response.status, 201);
/// assert_eq!(transport.requests().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<TransportResponse, String>>>,
    requests: RefCell<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    /// A transport with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary response.
    pub fn push_response(&self, response: TransportResponse) {
        self.replies.borrow_mut().push_back(Ok(response));
    }

    /// Queue a `201 Created` pointing at `location`.
    pub fn push_created(&self, location: &str) {
        self.push_response(TransportResponse {
            status: 201,
            location: Some(location.to_owned()),
            body: Vec::new(),
        });
    }

    /// Queue a `200 OK` carrying `body`.
    pub fn push_ok(&self, body: impl Into<Vec<u8>>) {
        self.push_response(TransportResponse {
            status: 200,
            location: None,
            body: body.into(),
        });
    }

    /// Queue a status document for a job in `status` with `links`.
    pub fn push_job(&self, status: &str, links: &[(&str, &str, &str)]) {
        self.push_ok(job_status_json("job-1", status, links));
    }

    /// Queue a connection failure.
    pub fn push_network_failure(&self, message: &str) {
        self.replies.borrow_mut().push_back(Err(message.to_owned()));
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.borrow().clone()
    }

    /// Number of responses still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

#[async_trait(?Send)]
impl DataflowTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response left".to_owned()));
        reply.map_err(|message| TransportError::Network {
            url,
            source: io::Error::new(io::ErrorKind::ConnectionReset, message),
        })
    }
}

/// JSON status document for a job.
#[must_use]
pub fn job_status_json(id: &str, status: &str, links: &[(&str, &str, &str)]) -> String {
    let links: Vec<serde_json::Value> = links
        .iter()
        .map(|(role, name, url)| serde_json::json!({ "role": role, "name": name, "url": url }))
        .collect();
    serde_json::json!({
        "resourceSets": [{
            "resources": [{ "id": id, "status": status, "links": links }]
        }],
        "statusCode": 200
    })
    .to_string()
}

/// Run `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be created.
#[expect(
    clippy::expect_used,
    reason = "test helper has no caller to report runtime failures to"
)]
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("create Tokio runtime")
        .block_on(future)
}
