//! Integration tests for login and reauthentication against a mock server.

mod common;

use std::time::Duration;

use common::{config_builder, CONFIRMATION};
use merchant_api::{ApiClient, ApiError, AuthError, AuthState};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id_token": "abc",
        "token_type": "Bearer",
        "expires_on": "2099-01-01T00:00:00Z"
    }))
}

async fn mount_login(server: &MockServer, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"user": "api-user", "pass": "secret"})))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_auth_test(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/test-auth"))
        .and(header("Authorization", "Bearer abc"))
        .and(header("Content-Type", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CONFIRMATION))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_orders(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orders": []})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_login_then_requests_reuse_token() {
    let server = MockServer::start().await;
    mount_login(&server, token_response(), 1).await;
    mount_auth_test(&server, 1).await;
    mount_orders(&server, 3).await;

    let client = ApiClient::new(config_builder(&server.uri()).build().unwrap()).unwrap();

    client.login().await.unwrap();
    assert_eq!(client.credentials().authorization_header_value(), "Bearer abc");
    assert_eq!(client.coordinator().state(), AuthState::Authenticated);

    for _ in 0..3 {
        let body: serde_json::Value = client.get_json("/v1/orders").await.unwrap();
        assert_eq!(body, json!({"orders": []}));
    }
}

#[tokio::test]
async fn test_auth_test_mismatch_fails_request_and_clears_token() {
    let server = MockServer::start().await;
    mount_login(&server, token_response(), 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/test-auth"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Authentication failed"))
        .expect(1)
        .mount(&server)
        .await;
    mount_orders(&server, 0).await;

    let client = ApiClient::new(config_builder(&server.uri()).build().unwrap()).unwrap();
    let result = client.get("/v1/orders").await;

    assert!(matches!(
        result,
        Err(ApiError::Auth(AuthError::AuthTestFailed { status: 200, .. }))
    ));
    assert!(!client.credentials().is_authenticated());
    assert_eq!(client.credentials().authorization_header_value(), "");
    assert_eq!(client.coordinator().state(), AuthState::Failed);
}

#[tokio::test]
async fn test_custom_paths_and_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(token_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/check"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK\n"))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_builder(&server.uri())
        .login_path("/auth/login")
        .auth_test_path("auth/check")
        .auth_test_confirmation("OK")
        .build()
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    client.login().await.unwrap();
    assert!(client.credentials().is_authenticated());
}

// ============================================================================
// Concurrency
// ============================================================================

async fn race(client: &ApiClient, tasks: usize) {
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get("/v1/orders").await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_callers_queue_on_lock_and_login_once() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        token_response().set_delay(Duration::from_millis(200)),
        1,
    )
    .await;
    mount_auth_test(&server, 1).await;
    mount_orders(&server, 10).await;

    let client = ApiClient::new(config_builder(&server.uri()).build().unwrap()).unwrap();

    race(&client, 10).await;

    assert!(client.credentials().is_authenticated());
    assert_eq!(client.coordinator().reauth_attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_callers_wait_for_in_flight_login() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        token_response().set_delay(Duration::from_millis(300)),
        1,
    )
    .await;
    mount_auth_test(&server, 1).await;
    mount_orders(&server, 10).await;

    // Callers give up on the lock long before the login finishes and wait
    // on the published login state instead.
    let config = config_builder(&server.uri())
        .reauth_lock_timeout(Duration::from_millis(10))
        .build()
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    race(&client, 10).await;

    assert_eq!(client.coordinator().state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_waiter_times_out_when_login_hangs() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        token_response().set_delay(Duration::from_secs(2)),
        1,
    )
    .await;
    mount_auth_test(&server, 1).await;

    let config = config_builder(&server.uri())
        .reauth_lock_timeout(Duration::from_millis(10))
        .auth_wait_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    let leader = {
        let client = client.clone();
        tokio::spawn(async move { client.login().await })
    };
    while client.coordinator().state() != AuthState::Authenticating {
        tokio::task::yield_now().await;
    }

    let result = client.coordinator().ensure_authenticated().await;
    assert!(matches!(
        result,
        Err(AuthError::AuthWaitTimeout { waited }) if waited == Duration::from_millis(100)
    ));

    leader.await.unwrap().unwrap();
    assert!(client.credentials().is_authenticated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_callers_on_expired_token_login_once() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        token_response().set_delay(Duration::from_millis(200)),
        1,
    )
    .await;
    mount_auth_test(&server, 1).await;
    mount_orders(&server, 10).await;

    let client = ApiClient::new(config_builder(&server.uri()).build().unwrap()).unwrap();
    client
        .credentials()
        .set_authentication_data("stale", "Bearer", "2000-01-01T00:00:00Z")
        .unwrap();
    assert!(matches!(
        client.credentials().assert_authenticated(),
        Err(AuthError::AuthExpired { .. })
    ));

    race(&client, 10).await;

    assert_eq!(client.credentials().authorization_header_value(), "Bearer abc");
    assert!(client.credentials().is_authenticated());
}

// ============================================================================
// Reauthentication limit
// ============================================================================

#[tokio::test]
async fn test_five_failed_logins_stop_further_login_calls() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        ResponseTemplate::new(401).set_body_string("bad credentials"),
        5,
    )
    .await;
    mount_orders(&server, 0).await;

    let client = ApiClient::new(config_builder(&server.uri()).build().unwrap()).unwrap();

    for attempt in 1..=4 {
        let result = client.get("/v1/orders").await;
        assert!(matches!(
            result,
            Err(ApiError::Auth(AuthError::LoginRejected { status: 401, .. }))
        ));
        assert_eq!(client.coordinator().reauth_attempts(), attempt);
    }

    let fifth = client.get("/v1/orders").await;
    match fifth {
        Err(ApiError::Auth(AuthError::ReauthLimitExceeded { attempts, source })) => {
            assert_eq!(attempts, 5);
            assert!(matches!(
                source.as_deref(),
                Some(AuthError::LoginRejected { status: 401, .. })
            ));
        }
        other => panic!("Expected ReauthLimitExceeded, got {other:?}"),
    }

    for _ in 0..3 {
        let result = client.get("/v1/orders").await;
        match result {
            Err(ApiError::Auth(e @ AuthError::ReauthLimitExceeded { source: None, .. })) => {
                assert!(e.is_fatal());
            }
            other => panic!("Expected ReauthLimitExceeded without a login, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_success_resets_attempt_counter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_login(&server, token_response(), 1).await;
    mount_auth_test(&server, 1).await;
    mount_orders(&server, 1).await;

    let client = ApiClient::new(config_builder(&server.uri()).build().unwrap()).unwrap();

    assert!(client.get("/v1/orders").await.is_err());
    assert!(client.get("/v1/orders").await.is_err());
    assert_eq!(client.coordinator().reauth_attempts(), 2);

    client.get("/v1/orders").await.unwrap();
    assert_eq!(client.coordinator().reauth_attempts(), 0);
}
