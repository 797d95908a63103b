//! The request pipeline.
//!
//! This module provides the HTTP layer of the crate: the transport seam,
//! header composition, response classification, observer callbacks and the
//! [`ApiClient`] that ties them together.
//!
//! # Overview
//!
//! - [`ApiClient`]: entry point; runs requests with reauthentication and
//!   rate-limit remediation
//! - [`Transport`] / [`ReqwestTransport`]: performs one raw HTTP call
//! - [`PendingRequest`] / [`RawResponse`]: what goes over the wire
//! - [`HeaderBuilder`]: per-request headers from the current credentials
//! - [`classify`] / [`decode_error_envelope`]: decide whether a response failed
//!   and how to react
//! - [`HandlerRegistry`]: error and rate-limit observers
//!
//! # Retry Behavior
//!
//! - **401 (Unauthorized)**: the rejected token is dropped, the client logs in
//!   again and retries once
//! - **429 (Too Many Requests)**: rate-limit observers are notified, the client
//!   sleeps the configured delay (5 seconds by default) and retries once
//! - **Everything else**: returned immediately
//!
//! A response with a 2xx status whose body is a JSON error envelope
//! (`{"errors": [...]}` or `{"error": "..."}`) counts as a failure too.

mod classifier;
mod errors;
mod executor;
mod handlers;
mod headers;
mod http_request;
mod http_response;
mod transport;

pub use classifier::{classify, decode_error_envelope};
pub use errors::{ApiError, BusinessError, FailureClass, TransportError};
pub use executor::ApiClient;
pub use handlers::{ErrorObserver, HandlerRegistry, RateLimitObserver};
pub use headers::{HeaderBuilder, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};
pub use http_request::{DataType, HttpMethod, PendingRequest};
pub use http_response::RawResponse;
pub use transport::{BoxFuture, ReqwestTransport, Transport, SDK_VERSION};
