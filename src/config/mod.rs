//! Configuration types for the merchant API client.
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: all settings the request pipeline needs
//! - [`ClientConfigBuilder`]: a builder for constructing [`ClientConfig`] instances
//! - [`MerchantId`], [`Username`], [`Password`], [`HostUrl`]: validated newtypes
//!
//! # Example
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
//!
//! assert_eq!(config.login_url(), "https://api.example.com/v1/token");
//! ```

mod newtypes;

use std::time::Duration;

pub use newtypes::{HostUrl, MerchantId, Password, Username};

use crate::error::ConfigError;

/// Default path of the token (login) endpoint.
pub const DEFAULT_LOGIN_PATH: &str = "/v1/token";

/// Default path of the live auth-test endpoint.
pub const DEFAULT_AUTH_TEST_PATH: &str = "/v1/test-auth";

/// Body the auth-test endpoint returns for a valid token.
pub const DEFAULT_AUTH_TEST_CONFIRMATION: &str = "Authentication successful";

/// Default maximum response body size (10 MiB).
pub const DEFAULT_MAX_DOWNLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Default bounded wait for the reauthentication lock.
pub const DEFAULT_REAUTH_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default fixed delay before retrying a rate-limited request.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(5000);

/// Consecutive failed reauthentications after which the client gives up.
pub const DEFAULT_MAX_REAUTH_ATTEMPTS: u32 = 5;

/// Configuration for the merchant API client.
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`. It is created once at
/// startup and shared by every component of the pipeline.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    host: HostUrl,
    merchant_id: MerchantId,
    username: Username,
    password: Password,
    login_path: String,
    auth_test_path: String,
    auth_test_confirmation: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    max_download_size: u64,
    accept: String,
    accept_language: String,
    allow_untrusted_ssl: bool,
    user_agent_prefix: Option<String>,
    reauth_lock_timeout: Duration,
    auth_wait_timeout: Duration,
    rate_limit_delay: Duration,
    max_reauth_attempts: u32,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the API host.
    #[must_use]
    pub const fn host(&self) -> &HostUrl {
        &self.host
    }

    /// Returns the merchant id.
    #[must_use]
    pub const fn merchant_id(&self) -> &MerchantId {
        &self.merchant_id
    }

    /// Returns the login user name.
    #[must_use]
    pub const fn username(&self) -> &Username {
        &self.username
    }

    /// Returns the login password.
    #[must_use]
    pub const fn password(&self) -> &Password {
        &self.password
    }

    /// Returns the absolute URL of the token endpoint.
    #[must_use]
    pub fn login_url(&self) -> String {
        self.host.join(&self.login_path)
    }

    /// Returns the absolute URL of the auth-test endpoint.
    #[must_use]
    pub fn auth_test_url(&self) -> String {
        self.host.join(&self.auth_test_path)
    }

    /// Returns the body the auth-test endpoint must answer with.
    #[must_use]
    pub fn auth_test_confirmation(&self) -> &str {
        &self.auth_test_confirmation
    }

    /// Returns the TCP connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the overall read timeout of a single HTTP call.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the maximum accepted response body size in bytes.
    #[must_use]
    pub const fn max_download_size(&self) -> u64 {
        self.max_download_size
    }

    /// Returns the `Accept` header value.
    #[must_use]
    pub fn accept(&self) -> &str {
        &self.accept
    }

    /// Returns the `Accept-Language` header value.
    #[must_use]
    pub fn accept_language(&self) -> &str {
        &self.accept_language
    }

    /// Returns whether invalid TLS certificates are accepted.
    #[must_use]
    pub const fn allow_untrusted_ssl(&self) -> bool {
        self.allow_untrusted_ssl
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns how long a caller waits for the reauthentication lock.
    #[must_use]
    pub const fn reauth_lock_timeout(&self) -> Duration {
        self.reauth_lock_timeout
    }

    /// Returns how long a caller that lost the lock race waits for the
    /// in-flight login to finish.
    #[must_use]
    pub const fn auth_wait_timeout(&self) -> Duration {
        self.auth_wait_timeout
    }

    /// Returns the fixed delay before retrying a rate-limited request.
    #[must_use]
    pub const fn rate_limit_delay(&self) -> Duration {
        self.rate_limit_delay
    }

    /// Returns the number of consecutive failed reauthentications tolerated.
    #[must_use]
    pub const fn max_reauth_attempts(&self) -> u32 {
        self.max_reauth_attempts
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// Required fields are `host`, `merchant_id`, `username` and `password`.
///
/// # Defaults
///
/// - `login_path`: [`DEFAULT_LOGIN_PATH`]
/// - `auth_test_path`: [`DEFAULT_AUTH_TEST_PATH`]
/// - `auth_test_confirmation`: [`DEFAULT_AUTH_TEST_CONFIRMATION`]
/// - `connect_timeout`: 10 seconds
/// - `read_timeout`: 30 seconds
/// - `max_download_size`: [`DEFAULT_MAX_DOWNLOAD_SIZE`]
/// - `accept`: `application/json`
/// - `accept_language`: `en-US`
/// - `allow_untrusted_ssl`: `false`
/// - `reauth_lock_timeout`: [`DEFAULT_REAUTH_LOCK_TIMEOUT`]
/// - `auth_wait_timeout`: 60 seconds
/// - `rate_limit_delay`: [`DEFAULT_RATE_LIMIT_DELAY`]
/// - `max_reauth_attempts`: [`DEFAULT_MAX_REAUTH_ATTEMPTS`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    host: Option<HostUrl>,
    merchant_id: Option<MerchantId>,
    username: Option<Username>,
    password: Option<Password>,
    login_path: Option<String>,
    auth_test_path: Option<String>,
    auth_test_confirmation: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_download_size: Option<u64>,
    accept: Option<String>,
    accept_language: Option<String>,
    allow_untrusted_ssl: Option<bool>,
    user_agent_prefix: Option<String>,
    reauth_lock_timeout: Option<Duration>,
    auth_wait_timeout: Option<Duration>,
    rate_limit_delay: Option<Duration>,
    max_reauth_attempts: Option<u32>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API host (required).
    #[must_use]
    pub fn host(mut self, host: HostUrl) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the merchant id (required).
    #[must_use]
    pub fn merchant_id(mut self, merchant_id: MerchantId) -> Self {
        self.merchant_id = Some(merchant_id);
        self
    }

    /// Sets the login user name (required).
    #[must_use]
    pub fn username(mut self, username: Username) -> Self {
        self.username = Some(username);
        self
    }

    /// Sets the login password (required).
    #[must_use]
    pub fn password(mut self, password: Password) -> Self {
        self.password = Some(password);
        self
    }

    /// Sets the token endpoint path, relative to the host.
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Sets the auth-test endpoint path, relative to the host.
    #[must_use]
    pub fn auth_test_path(mut self, path: impl Into<String>) -> Self {
        self.auth_test_path = Some(path.into());
        self
    }

    /// Sets the exact body the auth-test endpoint answers with on success.
    #[must_use]
    pub fn auth_test_confirmation(mut self, body: impl Into<String>) -> Self {
        self.auth_test_confirmation = Some(body.into());
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the read timeout of a single HTTP call.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the maximum accepted response body size in bytes.
    #[must_use]
    pub const fn max_download_size(mut self, bytes: u64) -> Self {
        self.max_download_size = Some(bytes);
        self
    }

    /// Sets the `Accept` header value.
    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Sets the `Accept-Language` header value.
    #[must_use]
    pub fn accept_language(mut self, language: impl Into<String>) -> Self {
        self.accept_language = Some(language.into());
        self
    }

    /// Accepts invalid TLS certificates. Only meant for staging hosts.
    #[must_use]
    pub const fn allow_untrusted_ssl(mut self, allow: bool) -> Self {
        self.allow_untrusted_ssl = Some(allow);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the bounded wait for the reauthentication lock.
    #[must_use]
    pub const fn reauth_lock_timeout(mut self, timeout: Duration) -> Self {
        self.reauth_lock_timeout = Some(timeout);
        self
    }

    /// Sets how long a caller waits for somebody else's login to finish.
    #[must_use]
    pub const fn auth_wait_timeout(mut self, timeout: Duration) -> Self {
        self.auth_wait_timeout = Some(timeout);
        self
    }

    /// Sets the delay before retrying a rate-limited request.
    #[must_use]
    pub const fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = Some(delay);
        self
    }

    /// Sets the number of consecutive failed reauthentications tolerated.
    #[must_use]
    pub const fn max_reauth_attempts(mut self, attempts: u32) -> Self {
        self.max_reauth_attempts = Some(attempts);
        self
    }

    /// Builds the [`ClientConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if a required field is
    /// not set, or [`ConfigError::InvalidValue`] if `max_download_size` or
    /// `max_reauth_attempts` is zero.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let host = self
            .host
            .ok_or(ConfigError::MissingRequiredField { field: "host" })?;
        let merchant_id = self.merchant_id.ok_or(ConfigError::MissingRequiredField {
            field: "merchant_id",
        })?;
        let username = self
            .username
            .ok_or(ConfigError::MissingRequiredField { field: "username" })?;
        let password = self
            .password
            .ok_or(ConfigError::MissingRequiredField { field: "password" })?;

        let max_download_size = self.max_download_size.unwrap_or(DEFAULT_MAX_DOWNLOAD_SIZE);
        if max_download_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_download_size",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_reauth_attempts = self
            .max_reauth_attempts
            .unwrap_or(DEFAULT_MAX_REAUTH_ATTEMPTS);
        if max_reauth_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_reauth_attempts",
                reason: "must allow at least one attempt".to_string(),
            });
        }

        Ok(ClientConfig {
            host,
            merchant_id,
            username,
            password,
            login_path: self
                .login_path
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            auth_test_path: self
                .auth_test_path
                .unwrap_or_else(|| DEFAULT_AUTH_TEST_PATH.to_string()),
            auth_test_confirmation: self
                .auth_test_confirmation
                .unwrap_or_else(|| DEFAULT_AUTH_TEST_CONFIRMATION.to_string()),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(10)),
            read_timeout: self.read_timeout.unwrap_or(Duration::from_secs(30)),
            max_download_size,
            accept: self
                .accept
                .unwrap_or_else(|| "application/json".to_string()),
            accept_language: self
                .accept_language
                .unwrap_or_else(|| "en-US".to_string()),
            allow_untrusted_ssl: self.allow_untrusted_ssl.unwrap_or(false),
            user_agent_prefix: self.user_agent_prefix,
            reauth_lock_timeout: self
                .reauth_lock_timeout
                .unwrap_or(DEFAULT_REAUTH_LOCK_TIMEOUT),
            auth_wait_timeout: self.auth_wait_timeout.unwrap_or(Duration::from_secs(60)),
            rate_limit_delay: self.rate_limit_delay.unwrap_or(DEFAULT_RATE_LIMIT_DELAY),
            max_reauth_attempts,
        })
    }
}
