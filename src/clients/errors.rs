//! Error types for the request pipeline.
//!
//! - [`TransportError`]: the HTTP call itself failed (connection, timeout, size)
//! - [`BusinessError`]: the API answered with an error status or error envelope
//! - [`FailureClass`]: how the pipeline reacts to a [`BusinessError`]
//! - [`ApiError`]: unified error returned by [`ApiClient`](crate::ApiClient)
//!
//! # Example
//!
//! ```rust,ignore
//! use merchant_api::ApiError;
//!
//! match client.get("/v1/orders").await {
//!     Ok(response) => println!("{}", response.text()),
//!     Err(ApiError::Business(e)) => println!("API error {}: {:?}", e.status, e.messages),
//!     Err(ApiError::Transport(e)) => println!("Network problem: {e}"),
//!     Err(ApiError::Auth(e)) => println!("Cannot authenticate: {e}"),
//!     Err(ApiError::Decode(e)) => println!("Unexpected body: {e}"),
//! }
//! ```

use thiserror::Error;

use crate::auth::AuthError;

/// The HTTP call could not be completed.
///
/// Transport errors are never retried by the pipeline.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connect or read timeout elapsed.
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The response body exceeded the configured maximum download size.
    #[error("Response body exceeds the maximum download size of {limit} bytes")]
    ResponseTooLarge {
        /// The configured limit in bytes.
        limit: u64,
    },

    /// Connection, TLS or protocol error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl TransportError {
    /// Maps a reqwest error, separating timeouts from other failures.
    #[must_use]
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// A response that carries an error status or a JSON error envelope.
///
/// `messages` holds the envelope's `errors` array or its single `error`
/// string; when the body has no envelope it holds the status line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Request failed with status {status}: {}", .messages.join("; "))]
pub struct BusinessError {
    /// HTTP status code of the response.
    pub status: u16,
    /// Error messages decoded from the response.
    pub messages: Vec<String>,
    /// The raw response body.
    pub raw_response: String,
}

/// Classification of a failed response.
///
/// Only the first two classes are remediated, each with a single retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// 401: the token was rejected; reauthenticate and retry once.
    AuthExpiredRetry(BusinessError),
    /// 429: the caller is rate limited; back off and retry once.
    RateLimitedRetry(BusinessError),
    /// Anything else; surfaced to the caller as is.
    Terminal(BusinessError),
}

impl FailureClass {
    /// Returns the underlying business error.
    #[must_use]
    pub const fn business_error(&self) -> &BusinessError {
        match self {
            Self::AuthExpiredRetry(e) | Self::RateLimitedRetry(e) | Self::Terminal(e) => e,
        }
    }

    /// Consumes the classification, returning the underlying business error.
    #[must_use]
    pub fn into_business_error(self) -> BusinessError {
        match self {
            Self::AuthExpiredRetry(e) | Self::RateLimitedRetry(e) | Self::Terminal(e) => e,
        }
    }
}

/// Unified error type for the request pipeline.
///
/// A caller observes exactly one of these per request; retries only add
/// latency.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The API answered with an error.
    #[error(transparent)]
    Business(#[from] BusinessError),

    /// Authentication could not be established.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A successful response body did not match the expected shape.
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns the HTTP status of a business error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Business(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns the business error, if this is one.
    #[must_use]
    pub const fn as_business(&self) -> Option<&BusinessError> {
        match self {
            Self::Business(e) => Some(e),
            _ => None,
        }
    }
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ApiError>();
};
