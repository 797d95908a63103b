//! Authentication error types.
//!
//! # Error Types
//!
//! - [`AuthError::NotAuthenticated`], [`AuthError::AuthExpired`],
//!   [`AuthError::AuthStateCorrupt`]: the credential store cannot present a token
//! - [`AuthError::InvalidCredentialsFormat`], [`AuthError::MalformedLoginResponse`]:
//!   the login endpoint answered with something unusable
//! - [`AuthError::LoginRejected`], [`AuthError::AuthTestFailed`]: the handshake failed
//! - [`AuthError::ReauthLimitExceeded`]: too many consecutive failed reauthentications
//!
//! None of these are retried by the pipeline.
//!
//! # Example
//!
//! ```rust
//! use merchant_api::AuthError;
//!
//! let error = AuthError::MalformedLoginResponse {
//!     reason: "missing field 'id_token'".to_string(),
//! };
//! assert!(error.to_string().contains("id_token"));
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::clients::TransportError;

/// Errors that can occur while establishing or checking authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token has been obtained yet, or it was cleared.
    #[error("Not authenticated: no token is available")]
    NotAuthenticated,

    /// The token's expiry instant has passed.
    #[error("Authentication expired at {expired_at}")]
    AuthExpired {
        /// When the token expired.
        expired_at: DateTime<Utc>,
    },

    /// A token is present but its expiry is unknown.
    ///
    /// [`CredentialStore`](crate::CredentialStore) never produces this: every
    /// mutator that stores a token stores its parsed expiry with it. The
    /// variant is kept for stores built on other state sources.
    #[error("Authentication state is corrupt: token present without a readable expiry")]
    AuthStateCorrupt,

    /// Token data failed validation before being stored.
    #[error("Invalid credentials format: {reason}")]
    InvalidCredentialsFormat {
        /// What was wrong with the data.
        reason: String,
    },

    /// The login response lacked a required field or was not JSON.
    #[error("Malformed login response: {reason}")]
    MalformedLoginResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// The login endpoint answered with a non-success status.
    #[error("Login rejected with status {status}: {message}")]
    LoginRejected {
        /// The HTTP status code returned.
        status: u16,
        /// The response body.
        message: String,
    },

    /// The live auth test did not confirm the new token.
    #[error("Auth test failed with status {status}: unexpected body '{body}'")]
    AuthTestFailed {
        /// The HTTP status code returned.
        status: u16,
        /// The response body.
        body: String,
    },

    /// Consecutive reauthentications failed too often; the client stops
    /// calling the login endpoint.
    #[error("Reauthentication limit exceeded after {attempts} consecutive failed attempts")]
    ReauthLimitExceeded {
        /// Number of consecutive failed attempts.
        attempts: u32,
        /// The failure that reached the limit, if this call attempted a login.
        #[source]
        source: Option<Box<AuthError>>,
    },

    /// Another caller's login did not finish in time.
    #[error("Timed out after {waited:?} waiting for an in-flight login")]
    AuthWaitTimeout {
        /// How long the caller waited.
        waited: Duration,
    },

    /// The login or auth-test call failed at the transport level.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AuthError {
    /// Returns `true` if no further login will be attempted by this client.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ReauthLimitExceeded { .. })
    }
}
