//! Authentication for the merchant API.
//!
//! The API uses short-lived bearer tokens obtained by posting the user name
//! and password to a token endpoint. This module holds the pieces that get
//! and keep such a token:
//!
//! - [`CredentialStore`]: the current token, its type and expiry
//! - [`AuthCoordinator`]: runs the login handshake, one caller at a time
//! - [`LoginResponse`] / [`TokenData`]: the token endpoint's answer
//! - [`AuthError`]: everything that can go wrong on the way
//!
//! # Handshake
//!
//! 1. `POST {login_path}` with `{"user": ..., "pass": ...}` and no
//!    `Authorization` header
//! 2. store `id_token`, `token_type` and `expires_on` from the response
//! 3. `GET {auth_test_path}` with the new token; the body must be the
//!    configured confirmation text, otherwise the token is discarded
//!
//! # Example
//!
//! ```rust,ignore
//! use merchant_api::{ApiClient, AuthError};
//!
//! let client = ApiClient::new(config)?;
//! match client.login().await {
//!     Ok(()) => println!("token valid until {:?}", client.credentials().expires_at()),
//!     Err(AuthError::LoginRejected { status, .. }) => println!("login refused: {status}"),
//!     Err(e) => println!("login failed: {e}"),
//! }
//! ```

mod coordinator;
mod credentials;
mod error;
mod login;

pub use coordinator::{AuthCoordinator, AuthState};
pub use credentials::{parse_expiry, CredentialStore, LoginIdentity, EXPIRY_FORMAT};
pub use error::AuthError;
pub use login::{LoginResponse, TokenData};
