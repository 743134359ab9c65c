//! The transport trait and its request/response records.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

/// One HTTP request as the pipeline hands it to a transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute endpoint URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Already-serialized request body.
    pub body: String,
}

impl TransportRequest {
    /// Build a JSON POST request, the shape every webhook delivery uses.
    pub fn post_json(url: impl Into<String>, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: body.into(),
        }
    }
}

/// One HTTP response as a transport hands it back to the pipeline.
///
/// The body is fully buffered; webhook responses are small (an empty body or
/// a short JSON document on 429/error statuses).
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers, including the `x-ratelimit-*` family.
    pub headers: HeaderMap,
    /// Buffered response body.
    pub body: String,
}

/// Transport failure variants.
///
/// The split matters to the caller: `Malformed` means the request never
/// effectively counted against the endpoint, `Network` means it might have.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum TransportErrorKind {
    /// The request could not be constructed or sent (bad URL, bad header).
    #[display("Malformed request: {_0}")]
    Malformed(String),
    /// Connect, timeout, or other network-level failure.
    #[display("Network failure: {_0}")]
    Network(String),
}

impl TransportErrorKind {
    /// True when the failure means the request never reached the server.
    pub fn is_malformed(&self) -> bool {
        matches!(self, TransportErrorKind::Malformed(_))
    }
}

/// Transport error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transport Error: {} at line {} in {}", kind, line, file)]
pub struct TransportError {
    kind: TransportErrorKind,
    line: u32,
    file: &'static str,
}

impl TransportError {
    /// Create a new TransportError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use herald_transport::{TransportError, TransportErrorKind};
    ///
    /// let err = TransportError::new(TransportErrorKind::Network("timed out".into()));
    /// assert!(!err.kind().is_malformed());
    /// ```
    #[track_caller]
    pub fn new(kind: TransportErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TransportErrorKind {
        &self.kind
    }

    /// True when the failure means the request never reached the server.
    pub fn is_malformed(&self) -> bool {
        self.kind.is_malformed()
    }
}

/// Performs one HTTP exchange.
///
/// Implementations must not retry internally; the send pipeline owns the
/// retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and return the response or a classified failure.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
