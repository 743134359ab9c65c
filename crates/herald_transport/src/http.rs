//! Production transport backed by `reqwest`.

use crate::{Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse};
use async_trait::async_trait;
use herald_error::{HeraldResult, HttpError};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default per-request timeout for webhook deliveries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// `reqwest`-backed [`Transport`].
///
/// The client is cheap to clone (connection pool is shared), so one
/// `HttpTransport` can serve many webhook handles.
///
/// # Example
/// ```no_run
/// use herald_transport::{HttpTransport, Transport, TransportRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new()?;
/// let request = TransportRequest::post_json(
///     "https://discord.com/api/webhooks/123/token",
///     r#"{"content":"hello"}"#,
/// );
/// let response = transport.execute(request).await?;
/// println!("status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport with the default timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying TLS backend cannot be initialized.
    #[instrument]
    pub fn new() -> HeraldResult<Self> {
        debug!("Building reqwest client for webhook transport");
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a transport from an existing `reqwest` client.
    ///
    /// Useful when the application already maintains a shared client with
    /// its own timeout and proxy settings.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Classify a `reqwest` error into the transport taxonomy.
    ///
    /// Builder and body errors mean the request never left this process;
    /// everything else is treated as a network-level failure.
    fn classify(err: &reqwest::Error) -> TransportErrorKind {
        if err.is_builder() || err.is_body() {
            TransportErrorKind::Malformed(err.to_string())
        } else {
            TransportErrorKind::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url: reqwest::Url = request.url.parse().map_err(|e| {
            warn!(error = %e, "Webhook URL failed to parse");
            TransportError::new(TransportErrorKind::Malformed(format!("Invalid URL: {}", e)))
        })?;

        let response = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Webhook request failed");
                TransportError::new(Self::classify(&e))
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "Failed to read webhook response body");
            TransportError::new(TransportErrorKind::Network(e.to_string()))
        })?;

        debug!(status = status.as_u16(), "Webhook request completed");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
