//! The externally visible webhook handle.

use crate::{SendOutcome, pipeline};
use herald_error::{HeraldResult, WebhookError, WebhookErrorKind};
use herald_rate_limit::{DispatchConfig, RateGate};
use herald_transport::{HttpTransport, Transport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

/// One configured webhook endpoint.
///
/// Bundles the endpoint URL with the rate limit gate and the invalidation
/// flag. Each handle's state is independent; two handles never share a rate
/// limit budget even when they point at the same URL.
///
/// The handle is cheap to share behind an `Arc`; concurrent sends against
/// the same handle serialize their state updates internally.
///
/// # Example
///
/// ```no_run
/// use herald::Webhook;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let webhook = Webhook::new("https://discord.com/api/webhooks/123/token")?;
/// let outcome = webhook.send(r#"{"content":"hello"}"#).await;
/// assert!(outcome.is_success() || outcome.failure().is_some());
/// # Ok(())
/// # }
/// ```
pub struct Webhook {
    /// Endpoint locator. Immutable after creation.
    url: String,
    /// Monotonic false-to-true; once set the handle refuses all sends.
    invalid: AtomicBool,
    gate: RateGate,
    transport: Arc<dyn Transport>,
    config: DispatchConfig,
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("url", &self.url)
            .field("invalid", &self.is_invalid())
            .finish_non_exhaustive()
    }
}

impl Webhook {
    /// Create a handle with the default transport and configuration.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot
    /// be built.
    #[instrument(skip(url))]
    pub fn new(url: impl Into<String>) -> HeraldResult<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::new_with_transport(url, transport, DispatchConfig::default())
    }

    /// Create a handle with custom dispatch constants.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot
    /// be built.
    #[instrument(skip(url))]
    pub fn new_with_config(url: impl Into<String>, config: DispatchConfig) -> HeraldResult<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::new_with_transport(url, transport, config)
    }

    /// Create a handle with a caller-supplied transport.
    ///
    /// This is the constructor tests use to substitute a scripted transport.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    #[instrument(skip(url, transport))]
    pub fn new_with_transport(
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: DispatchConfig,
    ) -> HeraldResult<Self> {
        let url = Self::validate_url(url.into())?;
        info!(url = %url, "Creating webhook handle");
        Ok(Self {
            url,
            invalid: AtomicBool::new(false),
            gate: RateGate::new(config),
            transport,
            config,
        })
    }

    /// Require an absolute http(s) URL up front so the failure surfaces at
    /// construction rather than as a malformed-request outcome later.
    fn validate_url(url: String) -> HeraldResult<String> {
        let parsed: reqwest::Url = url.parse().map_err(|e| {
            WebhookError::new(WebhookErrorKind::InvalidUrl(format!("{}: {}", url, e)))
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(url),
            other => Err(WebhookError::new(WebhookErrorKind::InvalidUrl(format!(
                "Unsupported scheme '{}'",
                other
            )))
            .into()),
        }
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the handle has been permanently invalidated.
    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    /// Permanently invalidate the handle.
    ///
    /// All queued senders are woken and will fail with `InvalidWebhook`;
    /// every subsequent send is refused without a network call. The flag
    /// never resets.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn invalidate(&self) {
        if !self.invalid.swap(true, Ordering::AcqRel) {
            warn!("Webhook handle invalidated");
            self.gate.drain_waiters().await;
        }
    }

    /// Deliver an already-serialized payload.
    ///
    /// Never returns an error; every failure mode is folded into the
    /// returned [`SendOutcome`].
    #[instrument(skip(self, body), fields(url = %self.url))]
    pub async fn send(&self, body: impl Into<String>) -> SendOutcome {
        pipeline::deliver(self, body.into()).await
    }

    /// Requests believed to remain in the current rate limit window.
    pub async fn remaining(&self) -> u32 {
        self.gate.remaining().await
    }

    /// Whether new sends would currently suspend behind the throttle.
    pub async fn is_rate_limited(&self) -> bool {
        self.gate.is_limited().await
    }

    /// Number of senders suspended waiting for the next reset.
    pub async fn queued(&self) -> usize {
        self.gate.queue_len().await
    }

    pub(crate) fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn config(&self) -> &DispatchConfig {
        &self.config
    }
}
