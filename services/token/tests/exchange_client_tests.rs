//! Exchange client tests against a mock authorization server.

mod common;

use common::{material, AUDIENCE};
use coze_token::oauth::{JWT_BEARER_GRANT, MAX_EXPIRES_IN_SECONDS, TOKEN_ENDPOINT_PATH};
use coze_token::{
    AssertionBuilder, ExchangeClient, HttpExchangeClient, JwtAssertion, ModuleIdentity,
    SystemClock, TokenError,
};
use rust_common::HttpConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn assertion(module: ModuleIdentity) -> JwtAssertion {
    AssertionBuilder::new(AUDIENCE, Arc::new(SystemClock))
        .build(&material(module), None, None)
        .unwrap()
}

fn client(server: &MockServer) -> HttpExchangeClient {
    HttpExchangeClient::new(&server.uri(), &HttpConfig::default()).unwrap()
}

async fn respond_with(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_success_sends_bearer_assertion_and_grant() {
    let server = MockServer::start().await;
    let assertion = assertion(ModuleIdentity::Newspaper);

    Mock::given(method("POST"))
        .and(path(TOKEN_ENDPOINT_PATH))
        .and(header("authorization", format!("Bearer {}", assertion.as_str()).as_str()))
        .and(body_json(json!({
            "grant_type": JWT_BEARER_GRANT,
            "duration_seconds": 900
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "czs_newspaper_token",
            "expires_in": 900,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server).exchange(&assertion, 900).await.unwrap();
    assert_eq!(token.access_token, "czs_newspaper_token");
    assert_eq!(token.expires_in_seconds, 900);
}

#[tokio::test]
async fn test_unknown_kid_is_key_not_registered() {
    let server = respond_with(401, json!({"error_message": "invalid kid xyz"})).await;
    let err = client(&server)
        .exchange(&assertion(ModuleIdentity::Camera), 900)
        .await
        .unwrap_err();

    match err {
        TokenError::KeyNotRegistered { module, key_id, message } => {
            assert_eq!(module, ModuleIdentity::Camera);
            assert_eq!(key_id, "kid-camera");
            assert_eq!(message, "invalid kid xyz");
        }
        other => panic!("expected KeyNotRegistered, got {other:?}"),
    }
}

#[tokio::test]
async fn test_verification_failure_is_signature_error() {
    let server =
        respond_with(401, json!({"error_message": "failed to verify jwt token signature"})).await;
    let err = client(&server)
        .exchange(&assertion(ModuleIdentity::Speak), 900)
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::SignatureVerification { module: ModuleIdentity::Speak, .. }));
    assert!(err.is_operator_action());
}

#[tokio::test]
async fn test_server_error_is_generic_exchange_error() {
    let server = respond_with(500, json!({"error_message": "internal error", "error_code": 5000})).await;
    let err = client(&server)
        .exchange(&assertion(ModuleIdentity::Voice), 900)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TokenError::Exchange { status: Some(500), ref message } if message == "internal error"
    ));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_non_json_error_body_uses_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .exchange(&assertion(ModuleIdentity::Voice), 900)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TokenError::Exchange { status: Some(502), ref message } if message == "Bad Gateway"
    ));
}

#[tokio::test]
async fn test_malformed_success_body_is_exchange_error() {
    let server = respond_with(200, json!({"token": "wrong-field"})).await;
    let err = client(&server)
        .exchange(&assertion(ModuleIdentity::Newspaper), 900)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Exchange { status: Some(200), .. }));
}

#[tokio::test]
async fn test_out_of_range_expires_in_is_exchange_error() {
    let server = respond_with(
        200,
        json!({"access_token": "czs_x", "expires_in": 9_223_372_036_854_775_i64}),
    )
    .await;
    let err = client(&server)
        .exchange(&assertion(ModuleIdentity::Newspaper), 900)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Exchange { status: Some(200), .. }));
}

#[tokio::test]
async fn test_year_long_expires_in_is_accepted() {
    let server = respond_with(
        200,
        json!({"access_token": "czs_x", "expires_in": MAX_EXPIRES_IN_SECONDS}),
    )
    .await;
    let token = client(&server)
        .exchange(&assertion(ModuleIdentity::Newspaper), 900)
        .await
        .unwrap();
    assert_eq!(token.expires_in_seconds, MAX_EXPIRES_IN_SECONDS);
}

#[tokio::test]
async fn test_timeout_is_exchange_error_without_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "late", "expires_in": 900}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = HttpConfig::default().with_timeout(Duration::from_millis(200));
    let client = HttpExchangeClient::new(&server.uri(), &config).unwrap();
    let err = client
        .exchange(&assertion(ModuleIdentity::Newspaper), 900)
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::Exchange { status: None, .. }));
}

#[test]
fn test_token_url_joins_base() {
    let client = HttpExchangeClient::new("https://api.coze.cn/", &HttpConfig::default()).unwrap();
    assert_eq!(client.token_url(), "https://api.coze.cn/api/permission/oauth2/token");
}
