//! HTTP transport boundary for the Herald webhook dispatcher.
//!
//! The send pipeline never talks to the network directly. It consumes the
//! [`Transport`] trait, which performs exactly one HTTP exchange per call and
//! reports failures with a classification the pipeline can act on:
//!
//! - **malformed**: the request could never reach the server (bad URL, bad
//!   header, builder failure). Retrying is pointless and the pipeline refunds
//!   the pre-emptively spent budget unit.
//! - **network**: connect/timeout/IO failures. The request may or may not have
//!   reached the server; the pipeline retries with exponential backoff.
//!
//! [`HttpTransport`] is the production implementation backed by `reqwest`.
//! Tests substitute scripted transports.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod http;
mod transport;

pub use http::HttpTransport;
pub use transport::{
    Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse,
};
