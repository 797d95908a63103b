//! # Merchant API Client
//!
//! An async client for the merchant REST API that keeps a bearer token alive
//! on behalf of its callers.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - Validated newtypes for credentials and the API host
//! - Login with live token verification via [`auth::AuthCoordinator`]
//! - Coordinated reauthentication: concurrent callers that find the token
//!   expired or rejected trigger exactly one login
//! - Error classification, including JSON error envelopes in 2xx bodies
//! - One retry after reauthentication (401) and one after backing off (429)
//! - Error and rate-limit observers for logging and metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use merchant_api::{ClientConfig, HostUrl, MerchantId, Password, Username};
//!
//! let config = ClientConfig::builder()
//!     .host(HostUrl::new("https://api.example.com").unwrap())
//!     .merchant_id(MerchantId::new("4711").unwrap())
//!     .username(Username::new("api-user").unwrap())
//!     .password(Password::new("secret").unwrap())
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Making API Requests
//!
//! ```rust,ignore
//! use merchant_api::{ApiClient, ApiError};
//! use serde_json::json;
//!
//! let client = ApiClient::new(config)?;
//!
//! // Optional: the first request logs in on its own.
//! client.login().await?;
//!
//! let orders: serde_json::Value = client.get_json("/v1/orders").await?;
//!
//! match client.post("/v1/returns", json!({"order_id": 42})).await {
//!     Ok(response) => println!("created: {}", response.text()),
//!     Err(ApiError::Business(e)) => println!("rejected: {:?}", e.messages),
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
//! ## Observers
//!
//! ```rust,ignore
//! client.on_error(|response, error| {
//!     tracing::error!(status = ?response.map(|r| r.status), "request failed: {error}");
//! });
//! client.on_rate_limited(|response| {
//!     tracing::warn!("rate limited, retry-after {:?}", response.retry_after());
//! });
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: every client owns its credentials, coordinator and
//!   observers
//! - **Fail-fast validation**: all newtypes validate on construction
//! - **Thread-safe**: all types are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio runtime
//! - **No secrets in logs**: passwords and tokens are masked in `Debug` output
//!   and never traced

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;

// Re-export public types at crate root for convenience
pub use config::{ClientConfig, ClientConfigBuilder, HostUrl, MerchantId, Password, Username};
pub use error::ConfigError;

pub use auth::{AuthCoordinator, AuthError, AuthState, CredentialStore};

pub use clients::{
    ApiClient, ApiError, BusinessError, DataType, HandlerRegistry, HttpMethod, PendingRequest,
    RawResponse, Transport, TransportError,
};
