//! Webhook-specific error types.
//!
//! These errors cover handle construction and configuration problems. Delivery
//! failures are not errors in this sense: the send pipeline folds them into a
//! structured outcome instead of propagating them.

/// Webhook error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum WebhookErrorKind {
    /// Endpoint URL failed validation.
    #[display("Invalid webhook URL: {_0}")]
    InvalidUrl(String),

    /// Underlying HTTP client could not be constructed.
    #[display("Client construction failed: {_0}")]
    ClientCreation(String),

    /// Configuration error (bad file, invalid constants).
    #[display("Configuration error: {_0}")]
    ConfigurationError(String),
}

/// Webhook error with source location tracking.
///
/// Captures the error kind along with the file and line where the error occurred.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Webhook Error: {} at line {} in {}", kind, line, file)]
pub struct WebhookError {
    kind: WebhookErrorKind,
    line: u32,
    file: &'static str,
}

impl WebhookError {
    /// Create a new WebhookError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use herald_error::{WebhookError, WebhookErrorKind};
    ///
    /// let err = WebhookError::new(WebhookErrorKind::InvalidUrl("not a url".into()));
    /// ```
    #[track_caller]
    pub fn new(kind: WebhookErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &WebhookErrorKind {
        &self.kind
    }
}

/// Result type for webhook operations.
pub type WebhookResult<T> = std::result::Result<T, WebhookError>;
