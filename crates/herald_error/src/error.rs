//! Top-level error wrapper types.

use crate::{ConfigError, HttpError, WebhookError};

/// This is the foundation error enum for the Herald workspace.
///
/// # Examples
///
/// ```
/// use herald_error::{HeraldError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: HeraldError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum HeraldErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Webhook handle error
    #[from(WebhookError)]
    Webhook(WebhookError),
}

/// Herald error with kind discrimination.
///
/// # Examples
///
/// ```
/// use herald_error::{HeraldResult, ConfigError};
///
/// fn might_fail() -> HeraldResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Herald Error: {}", _0)]
pub struct HeraldError(Box<HeraldErrorKind>);

impl HeraldError {
    /// Create a new error from a kind.
    pub fn new(kind: HeraldErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &HeraldErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to HeraldErrorKind
impl<T> From<T> for HeraldError
where
    T: Into<HeraldErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Herald operations.
///
/// # Examples
///
/// ```
/// use herald_error::{HeraldResult, HttpError};
///
/// fn fetch_data() -> HeraldResult<String> {
///     Err(HttpError::new("404 Not Found"))?
/// }
/// ```
pub type HeraldResult<T> = std::result::Result<T, HeraldError>;
