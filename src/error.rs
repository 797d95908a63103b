//! Configuration error types for the merchant API client.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that a
//! misconfigured client fails before it ever reaches the network.
//!
//! # Example
//!
//! ```rust
//! use merchant_api::{ConfigError, Username};
//!
//! let result = Username::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyUsername)));
//! ```

use thiserror::Error;

/// Errors that can occur while building a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Merchant id cannot be empty.
    #[error("Merchant id cannot be empty. Please provide the merchant id issued with your API account.")]
    EmptyMerchantId,

    /// Username cannot be empty.
    #[error("Username cannot be empty. Please provide the API login user.")]
    EmptyUsername,

    /// Password cannot be empty.
    #[error("Password cannot be empty. Please provide the API login password.")]
    EmptyPassword,

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://api.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A numeric setting is out of its accepted range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The underlying HTTP client could not be created.
    #[error("Failed to create HTTP client: {reason}")]
    HttpClientBuild {
        /// Message from the HTTP library.
        reason: String,
    },
}
