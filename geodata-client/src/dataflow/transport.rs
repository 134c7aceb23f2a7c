//! The seam between the job protocol and the network.

use async_trait::async_trait;

use super::TransportError;

/// HTTP verb of a dataflow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Status checks, downloads and jobs without a payload.
    Get,
    /// Job creation with an uploaded payload.
    Post,
}

/// A request handed to a [`DataflowTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: Method,
    /// Fully qualified URL including the query string.
    pub url: String,
    /// `Content-Type` of the body, if any.
    pub content_type: Option<&'static str>,
    /// Whether the body is gzip-compressed.
    pub gzip: bool,
    /// Request payload.
    pub body: Vec<u8>,
}

impl TransportRequest {
    /// A body-less GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            content_type: None,
            gzip: false,
            body: Vec::new(),
        }
    }

    /// A POST request carrying a gzip-compressed `body`.
    #[must_use]
    pub fn post_gzip(url: impl Into<String>, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            content_type: Some(content_type),
            gzip: true,
            body,
        }
    }
}

/// What came back from the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Location` header.
    pub location: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends dataflow requests. Implementations only report failures to reach
/// the service; HTTP error statuses are returned as ordinary responses.
#[async_trait(?Send)]
pub trait DataflowTransport {
    /// Issue `request` and collect the full response.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait(?Send)]
impl<T: DataflowTransport + ?Sized> DataflowTransport for &T {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}
