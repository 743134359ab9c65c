//! Structured results for one logical send.

use herald_transport::TransportResponse;

/// Why a send failed.
///
/// The `Display` strings form the dispatcher's stable failure vocabulary:
/// `InvalidWebhook`, `ExhaustedQueue`, `BadRequest`, `UnexpectedFailure`,
/// `RateLimited`, or `HTTP <code>: <message>` for unrecognized statuses.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum FailureReason {
    /// The endpoint rejected the credentials (401/404) or the handle was
    /// pre-marked invalid. Permanent for the handle's lifetime.
    #[display("InvalidWebhook")]
    InvalidWebhook,

    /// The queue of suspended senders was full. Transient backpressure;
    /// retry later at a reduced rate.
    #[display("ExhaustedQueue")]
    ExhaustedQueue,

    /// The request was malformed (400, or a request that could not be
    /// constructed). Never retried.
    #[display("BadRequest")]
    BadRequest,

    /// Network-level failure that survived every internal retry.
    #[display("UnexpectedFailure")]
    UnexpectedFailure,

    /// Attempts exhausted while the endpoint was throttling us.
    #[display("RateLimited")]
    RateLimited,

    /// Any other HTTP status, surfaced without internal retry.
    #[display("HTTP {status}: {message}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// Status reason or response body excerpt.
        message: String,
    },
}

/// The verdict of one logical send.
///
/// Exactly one of two shapes: success with the terminal response, or failure
/// with a [`FailureReason`] and the last response when one was received (a
/// send that never reached the server carries no response).
#[derive(Debug, Clone)]
pub struct SendOutcome {
    success: bool,
    response: Option<TransportResponse>,
    failure: Option<FailureReason>,
}

impl SendOutcome {
    /// A terminal 2xx outcome.
    pub(crate) fn delivered(response: TransportResponse) -> Self {
        Self {
            success: true,
            response: Some(response),
            failure: None,
        }
    }

    /// A terminal failure, with the last response when one was received.
    pub(crate) fn failed(reason: FailureReason, response: Option<TransportResponse>) -> Self {
        Self {
            success: false,
            response,
            failure: Some(reason),
        }
    }

    /// Whether the payload was delivered.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The last HTTP response, absent when the request never reached
    /// the server.
    pub fn response(&self) -> Option<&TransportResponse> {
        self.response.as_ref()
    }

    /// The failure classification, absent on success.
    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }
}
