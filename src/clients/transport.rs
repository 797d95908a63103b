//! The HTTP transport seam.
//!
//! The pipeline only ever talks to a [`Transport`]. [`ReqwestTransport`] is
//! the production implementation; tests substitute scripted transports to
//! control response sequences precisely.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::clients::errors::TransportError;
use crate::clients::http_request::{HttpMethod, PendingRequest};
use crate::clients::http_response::RawResponse;
use crate::config::ClientConfig;
use crate::error::ConfigError;

/// Library version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Performs a single raw HTTP call.
///
/// Implementations must not retry or interpret status codes; a non-2xx
/// response is still `Ok`.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the completed response.
    fn call<'a>(
        &'a self,
        request: &'a PendingRequest,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>>;
}

/// [`Transport`] backed by a `reqwest` client.
///
/// Applies the configured connect and read timeouts, the untrusted-TLS
/// toggle, and aborts reading once the body passes the maximum download size.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    max_download_size: u64,
}

impl ReqwestTransport {
    /// Creates a transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Merchant API Library v{SDK_VERSION} | Rust {rust_version}");

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .danger_accept_invalid_certs(config.allow_untrusted_ssl())
            .build()
            .map_err(|e| ConfigError::HttpClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            max_download_size: config.max_download_size(),
        })
    }

    async fn send(&self, request: &PendingRequest) -> Result<RawResponse, TransportError> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.to_string());
        }

        let mut res = req_builder
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if res
            .content_length()
            .is_some_and(|len| len > self.max_download_size)
        {
            return Err(TransportError::ResponseTooLarge {
                limit: self.max_download_size,
            });
        }

        let status = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());

        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await.map_err(TransportError::from_reqwest)? {
            if (body.len() + chunk.len()) as u64 > self.max_download_size {
                return Err(TransportError::ResponseTooLarge {
                    limit: self.max_download_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

impl Transport for ReqwestTransport {
    fn call<'a>(
        &'a self,
        request: &'a PendingRequest,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        Box::pin(self.send(request))
    }
}

// Verify ReqwestTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestTransport>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostUrl, MerchantId, Password, Username};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, max_download_size: u64) -> ClientConfig {
        ClientConfig::builder()
            .host(HostUrl::new(server.uri()).unwrap())
            .merchant_id(MerchantId::new("1").unwrap())
            .username(Username::new("user").unwrap())
            .password(Password::new("pass").unwrap())
            .max_download_size(max_download_size)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_call_returns_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/orders/9"))
            .and(header("x-test", "yes"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("X-Request-Id", "req-1")
                    .set_body_string("missing"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&config_for(&server, 1024)).unwrap();
        let request = PendingRequest::new(HttpMethod::Patch, format!("{}/v1/orders/9", server.uri()))
            .with_header("X-Test", "yes")
            .with_body(serde_json::json!({"state": "shipped"}));

        let response = transport.call(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.header("x-request-id"), Some("req-1"));
        assert_eq!(response.text(), "missing");
    }

    #[tokio::test]
    async fn test_call_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&config_for(&server, 16)).unwrap();
        let request = PendingRequest::new(HttpMethod::Get, server.uri());

        let result = transport.call(&request).await;
        assert!(matches!(
            result,
            Err(TransportError::ResponseTooLarge { limit: 16 })
        ));
    }

    #[tokio::test]
    async fn test_call_maps_connection_failure_to_network_error() {
        let server = MockServer::start().await;
        let config = config_for(&server, 1024);
        let uri = server.uri();
        drop(server);

        let transport = ReqwestTransport::new(&config).unwrap();
        let request = PendingRequest::new(HttpMethod::Get, uri);

        let result = transport.call(&request).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
