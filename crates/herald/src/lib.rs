//! Rate-limit-aware webhook dispatcher.
//!
//! Herald delivers already-serialized payloads to webhook endpoints while
//! honoring the endpoint's rate limit contract. Each [`Webhook`] handle owns
//! its own budget counter, bounded queue of suspended senders, and deferred
//! reset task; nothing is shared across handles.
//!
//! A send walks a fixed pipeline: refuse invalidated handles, queue behind an
//! active throttle (or fail fast when the queue is full), spend one budget
//! unit, then attempt delivery with exponential backoff on network failures
//! and header-driven waits on 429s. Every outcome — success or any of the
//! failure classes — comes back as a structured [`SendOutcome`]; the pipeline
//! never panics across the API boundary and never leaves a caller suspended
//! without a verdict.
//!
//! # Example
//!
//! ```no_run
//! use herald::Webhook;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let webhook = Webhook::new("https://discord.com/api/webhooks/123/token")?;
//! let outcome = webhook.send(r#"{"content":"deploy finished"}"#).await;
//!
//! if outcome.is_success() {
//!     println!("delivered");
//! } else if let Some(reason) = outcome.failure() {
//!     eprintln!("delivery failed: {}", reason);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod outcome;
mod pipeline;
mod webhook;

pub use outcome::{FailureReason, SendOutcome};
pub use webhook::Webhook;

pub use herald_error::{
    ConfigError, HeraldError, HeraldErrorKind, HeraldResult, HttpError, WebhookError,
    WebhookErrorKind,
};
pub use herald_rate_limit::{
    Admission, DispatchConfig, HeraldConfig, RateGate, RateLimitSnapshot, RateLimitState,
    SendQueue,
};
pub use herald_transport::{
    HttpTransport, Transport, TransportError, TransportErrorKind, TransportRequest,
    TransportResponse,
};
