//! The request executor.
//!
//! [`ApiClient`] is the entry point of the crate. Every call runs through the
//! same pipeline:
//!
//! 1. build headers from the current credentials and send the request
//! 2. classify the response
//! 3. remediate: a 401 triggers one reauthentication and retry, a 429
//!    notifies the rate-limit observers, sleeps and retries once
//! 4. anything else that failed is passed to the error observers and
//!    returned
//!
//! Each remediation class is applied at most once per call, so a request
//! performs at most three HTTP calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{AuthCoordinator, AuthError, CredentialStore};
use crate::clients::classifier::classify;
use crate::clients::errors::{ApiError, FailureClass};
use crate::clients::handlers::HandlerRegistry;
use crate::clients::headers::{HeaderBuilder, AUTHORIZATION};
use crate::clients::http_request::{DataType, HttpMethod, PendingRequest};
use crate::clients::http_response::RawResponse;
use crate::clients::transport::{ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::ConfigError;

/// Authenticated client for the merchant API.
///
/// Cloning is cheap; clones share the credentials, the coordinator and the
/// observers.
///
/// # Example
///
/// ```rust,ignore
/// use merchant_api::{ApiClient, ClientConfig, HostUrl, MerchantId, Password, Username};
/// use serde_json::json;
///
/// let config = ClientConfig::builder()
///     .host(HostUrl::new("https://api.example.com")?)
///     .merchant_id(MerchantId::new("4711")?)
///     .username(Username::new("api-user")?)
///     .password(Password::new("secret")?)
///     .build()?;
///
/// let client = ApiClient::new(config)?;
/// client.on_rate_limited(|response| {
///     tracing::warn!("rate limited, retry-after {:?}", response.retry_after());
/// });
///
/// let orders: serde_json::Value = client.get_json("/v1/orders?status=open").await?;
/// client.post("/v1/returns", json!({"order_id": 1})).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialStore>,
    coordinator: Arc<AuthCoordinator>,
    handlers: Arc<HandlerRegistry>,
    headers: HeaderBuilder,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("host", &self.config.host().as_ref())
            .field("credentials", &self.credentials)
            .field("coordinator", &self.coordinator)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client talking to the configured host through `reqwest`.
    ///
    /// No request is made until the first call or [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client cannot be
    /// created.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client using a custom [`Transport`].
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let credentials = Arc::new(CredentialStore::new(&config));
        let coordinator = Arc::new(AuthCoordinator::new(
            &config,
            Arc::clone(&credentials),
            Arc::clone(&transport),
        ));
        Self {
            headers: HeaderBuilder::new(&config),
            config: Arc::new(config),
            transport,
            credentials,
            coordinator,
            handlers: Arc::new(HandlerRegistry::new()),
        }
    }

    /// Replaces the observer registry, e.g. to share one between clients.
    #[must_use]
    pub fn with_handlers(mut self, handlers: Arc<HandlerRegistry>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the credential store.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Returns the reauthentication coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &AuthCoordinator {
        &self.coordinator
    }

    /// Returns the observer registry.
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Registers an observer for failed requests.
    pub fn on_error<F>(&self, observer: F)
    where
        F: Fn(Option<&RawResponse>, &ApiError) + Send + Sync + 'static,
    {
        self.handlers.add_error_observer(observer);
    }

    /// Registers an observer for rate-limited responses.
    pub fn on_rate_limited<F>(&self, observer: F)
    where
        F: Fn(&RawResponse) + Send + Sync + 'static,
    {
        self.handlers.add_rate_limit_observer(observer);
    }

    /// Logs in explicitly. See [`AuthCoordinator::login`].
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the failed handshake step.
    pub async fn login(&self) -> Result<(), AuthError> {
        self.coordinator.login().await
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn get(&self, path: &str) -> Result<RawResponse, ApiError> {
        self.execute(HttpMethod::Get, path, None, None).await
    }

    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post(&self, path: &str, body: Value) -> Result<RawResponse, ApiError> {
        self.execute(HttpMethod::Post, path, Some(body), None).await
    }

    /// Sends a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn put(&self, path: &str, body: Value) -> Result<RawResponse, ApiError> {
        self.execute(HttpMethod::Put, path, Some(body), None).await
    }

    /// Sends a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn patch(&self, path: &str, body: Value) -> Result<RawResponse, ApiError> {
        self.execute(HttpMethod::Patch, path, Some(body), None).await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn delete(&self, path: &str) -> Result<RawResponse, ApiError> {
        self.execute(HttpMethod::Delete, path, None, None).await
    }

    /// Sends a GET request and decodes the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if the body does not decode into `T`,
    /// otherwise see [`execute`](Self::execute).
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Ok(self.get(path).await?.json()?)
    }

    /// Sends a POST request and decodes the JSON response body.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<T, ApiError> {
        Ok(self.post(path, body).await?.json()?)
    }

    /// Sends a PUT request and decodes the JSON response body.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<T, ApiError> {
        Ok(self.put(path, body).await?.json()?)
    }

    /// Sends a PATCH request and decodes the JSON response body.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<T, ApiError> {
        Ok(self.patch(path, body).await?.json()?)
    }

    /// Sends a request through the pipeline.
    ///
    /// `path` is joined onto the configured host unless it is already an
    /// absolute URL. `extra_headers` replace generated headers of the same
    /// name, compared case-insensitively.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Business`] for an error status or error envelope that
    ///   survived remediation
    /// - [`ApiError::Transport`] if the HTTP call failed
    /// - [`ApiError::Auth`] if no valid token could be obtained
    ///
    /// Every error is passed to the error observers before it is returned.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Result<RawResponse, ApiError> {
        let url = self.config.host().join(path);

        match self
            .run(method, &url, body.as_ref(), extra_headers.as_ref())
            .await
        {
            Ok(response) => Ok(response),
            Err((response, error)) => {
                tracing::debug!("{} {} failed: {}", method, url, error);
                self.handlers.notify_error(response.as_ref(), &error);
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
        extra_headers: Option<&HashMap<String, String>>,
    ) -> Result<RawResponse, (Option<RawResponse>, ApiError)> {
        if !self.credentials.is_authenticated() {
            self.coordinator
                .ensure_authenticated()
                .await
                .map_err(|e| (None, ApiError::from(e)))?;
        }

        let mut reauthenticated = false;
        let mut backed_off = false;

        loop {
            let request = self.build_request(method, url, body, extra_headers);
            let response = self
                .transport
                .call(&request)
                .await
                .map_err(|e| (None, ApiError::from(e)))?;

            let failure = match classify(&response) {
                Ok(()) => return Ok(response),
                Err(failure) => failure,
            };

            match failure {
                FailureClass::AuthExpiredRetry(_) if !reauthenticated => {
                    reauthenticated = true;
                    let rejected = request.header(AUTHORIZATION).unwrap_or_default();
                    if self.credentials.invalidate_token(rejected) {
                        tracing::warn!("Token rejected by {} {}, reauthenticating", method, url);
                    } else {
                        tracing::debug!("Token for {} {} was already replaced", method, url);
                    }
                    self.coordinator
                        .ensure_authenticated()
                        .await
                        .map_err(|e| (Some(response), ApiError::from(e)))?;
                }
                FailureClass::RateLimitedRetry(_) if !backed_off => {
                    backed_off = true;
                    let delay = self.config.rate_limit_delay();
                    tracing::warn!(
                        "Rate limited on {} {}, retrying in {:?}",
                        method,
                        url,
                        delay
                    );
                    self.handlers.notify_rate_limited(&response);
                    tokio::time::sleep(delay).await;
                }
                failure => {
                    let error = ApiError::from(failure.into_business_error());
                    return Err((Some(response), error));
                }
            }
        }
    }

    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
        extra_headers: Option<&HashMap<String, String>>,
    ) -> PendingRequest {
        let mut headers = self.headers.authenticated(&self.credentials, DataType::Json);
        if let Some(extra) = extra_headers {
            for (key, value) in extra {
                headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
                headers.insert(key.clone(), value.clone());
            }
        }

        let request = PendingRequest::new(method, url).with_headers(headers);
        match body {
            Some(body) => request.with_body(body.clone()),
            None => request,
        }
    }
}

// Verify ApiClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ApiClient>();
};
