//! reqwest-backed [`DataflowTransport`].

use std::io;

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CONTENT_ENCODING, CONTENT_TYPE, LOCATION},
};

use super::{
    DataflowConfig, DataflowTransport, Method, TransportBuildError, TransportError,
    TransportRequest, TransportResponse,
};

/// HTTP transport talking to the live service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client honouring the timeout and user agent of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &DataflowConfig) -> Result<Self, TransportBuildError> {
        let client = Client::builder()
            .user_agent(format!("{} ({})", config.user_agent, config.client_version))
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl DataflowTransport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url;
        log::debug!("{:?} {url}", request.method);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).body(request.body),
        };
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if request.gzip {
            builder = builder.header(CONTENT_ENCODING, "gzip");
        }

        let response = builder
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, &url))?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, &url))?
            .to_vec();
        Ok(TransportResponse {
            status,
            location,
            body,
        })
    }
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout {
            url: url.to_owned(),
        };
    }
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::other(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builds_from_default_config() {
        let transport = HttpTransport::new(&DataflowConfig::default());
        assert!(transport.is_ok());
    }
}
