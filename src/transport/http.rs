//! HTTP transport: POST each element's bytes to a collector endpoint.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::element::SendElement;

use super::{Transport, TransportError};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Posts every element as one HTTP request body.
///
/// # Example
///
/// ```no_run
/// use forward_engine::HttpTransport;
///
/// let transport = HttpTransport::new("http://localhost:8081/ingest")
///     .with_basic_auth("admin", "admin")
///     .with_content_type("application/vnd.apache.arrow.stream");
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    content_type: String,
    basic_auth: Option<(String, String)>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            basic_auth: None,
        }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, element: &SendElement) -> Result<(), TransportError> {
        let payload = element.payload().await?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, &self.content_type)
            .body(payload.into_owned());
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!(
                "HTTP POST returned {status}: {body}"
            )));
        }

        debug!(url = %self.url, bytes = element.size_bytes(), status = %status, "payload posted");
        Ok(())
    }
}
