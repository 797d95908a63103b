//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use merchant_api::clients::BoxFuture;
use merchant_api::{
    ApiClient, ClientConfig, ClientConfigBuilder, HostUrl, MerchantId, Password, PendingRequest,
    RawResponse, Transport, TransportError, Username,
};

pub const HOST: &str = "https://api.test";
pub const LOGIN_PATH: &str = "/v1/token";
pub const AUTH_TEST_PATH: &str = "/v1/test-auth";
pub const CONFIRMATION: &str = "Authentication successful";

/// Builder with the required fields set, pointing at `host`.
pub fn config_builder(host: &str) -> ClientConfigBuilder {
    ClientConfig::builder()
        .host(HostUrl::new(host).unwrap())
        .merchant_id(MerchantId::new("4711").unwrap())
        .username(Username::new("api-user").unwrap())
        .password(Password::new("secret").unwrap())
}

/// A successful token endpoint response.
pub fn login_ok(token: &str) -> RawResponse {
    RawResponse::new(
        200,
        format!(
            r#"{{"id_token":"{token}","token_type":"Bearer","expires_on":"2099-01-01T00:00:00Z"}}"#
        ),
    )
}

type ResourceHandler =
    Box<dyn Fn(&PendingRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync>;

/// In-memory transport with scripted answers.
///
/// The token endpoint answers from a queue whose last entry repeats, the
/// auth-test endpoint always confirms, and every other URL is answered by
/// the resource handler, which also receives the zero-based resource call
/// index.
pub struct ScriptedTransport {
    login_responses: Mutex<VecDeque<RawResponse>>,
    resource: ResourceHandler,
    resource_calls: AtomicUsize,
    calls: Mutex<Vec<PendingRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(resource: F) -> Self
    where
        F: Fn(&PendingRequest, usize) -> Result<RawResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            login_responses: Mutex::new(VecDeque::from([login_ok("abc")])),
            resource: Box::new(resource),
            resource_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers resource calls with `responses` in order; the last one repeats.
    pub fn sequence(responses: Vec<RawResponse>) -> Self {
        Self::new(move |_, index| {
            let response = responses
                .get(index)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or_else(|| RawResponse::new(200, ""));
            Ok(response)
        })
    }

    pub fn with_login_responses(self, responses: Vec<RawResponse>) -> Self {
        *self.login_responses.lock().unwrap() = responses.into();
        self
    }

    /// Every request seen, in order.
    pub fn calls(&self) -> Vec<PendingRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<PendingRequest> {
        self.calls()
            .into_iter()
            .filter(|request| request.url == format!("{HOST}{path}"))
            .collect()
    }

    pub fn login_count(&self) -> usize {
        self.calls_to(LOGIN_PATH).len()
    }

    pub fn resource_count(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }

    fn next_login_response(&self) -> RawResponse {
        let mut queue = self.login_responses.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap_or_else(|| login_ok("abc"))
        }
    }
}

impl Transport for ScriptedTransport {
    fn call<'a>(
        &'a self,
        request: &'a PendingRequest,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;

            if request.url.ends_with(LOGIN_PATH) {
                return Ok(self.next_login_response());
            }
            if request.url.ends_with(AUTH_TEST_PATH) {
                return Ok(RawResponse::new(200, CONFIRMATION));
            }
            let index = self.resource_calls.fetch_add(1, Ordering::SeqCst);
            (self.resource)(request, index)
        })
    }
}

/// A client on top of `transport`, configured by `configure`.
pub fn scripted_client(
    transport: &Arc<ScriptedTransport>,
    configure: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder,
) -> ApiClient {
    let config = configure(config_builder(HOST)).build().unwrap();
    ApiClient::with_transport(config, Arc::clone(transport) as Arc<dyn Transport>)
}

/// Seeds the client's store with a token that is valid for a long time.
pub fn seed_token(client: &ApiClient, token: &str) {
    client
        .credentials()
        .set_authentication_data(token, "Bearer", "2099-01-01T00:00:00Z")
        .unwrap();
}
