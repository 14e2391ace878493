//! Mock HTTP server tests for [`HttpChatClient::complete()`].
//!
//! Uses [`wiremock`] to stand up a local HTTP server that emulates the
//! OpenAI-compatible chat-completions endpoint. This exercises the full
//! HTTP request/response path without a real endpoint.
//!
//! Coverage:
//! - Successful completion with text content
//! - 401/403 authentication failures
//! - 500 upstream failure
//! - Non-JSON response body
//! - Empty choices decoding leniently
//! - Authorization header presence and absence
//! - Request body shape

use secrecy::SecretString;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mail_agent_tools::config::LlmConfig;
use mail_agent_tools::errors::AppError;
use mail_agent_tools::llm::{ChatMessage, ChatProvider, ChatRequest, HttpChatClient};

/// Build an `LlmConfig` pointing at the given mock server.
fn mock_config(server_url: &str) -> LlmConfig {
    LlmConfig {
        url: format!("{server_url}/v1/chat/completions"),
        model: "test-model".into(),
        api_key: None,
    }
}

/// The same config with a bearer token attached.
fn mock_config_with_key(server_url: &str, key: &str) -> LlmConfig {
    LlmConfig {
        api_key: Some(SecretString::new(key.into())),
        ..mock_config(server_url)
    }
}

/// Build a minimal request for testing.
fn test_request() -> ChatRequest {
    ChatRequest {
        model: "test-model".into(),
        messages: vec![
            ChatMessage::system("You are a test."),
            ChatMessage::user("Hello"),
        ],
        temperature: 0.0,
        max_tokens: 150,
    }
}

/// Minimal success body with one text choice.
fn text_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": null
    })
}

// ── Successful completion ──────────────────────────────────────────────

#[tokio::test]
async fn complete_success_returns_first_content() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "chatcmpl-test-001",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Kickoff notes, summarized."
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 8,
            "total_tokens": 18
        }
    });

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config(&server.uri()));
    let response = client.complete(&test_request()).await.unwrap();

    assert_eq!(response.choices.len(), 1);
    assert_eq!(response.first_content(), Some("Kickoff notes, summarized."));
}

// ── Error responses ────────────────────────────────────────────────────

#[tokio::test]
async fn complete_401_returns_auth_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            "{\"error\":{\"message\":\"Invalid API key\",\"type\":\"authentication_error\"}}",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config_with_key(&server.uri(), "sk-bad-key"));

    let err = client.complete(&test_request()).await.unwrap_err();
    assert!(
        matches!(err, AppError::AuthFailed(_)),
        "expected AuthFailed, got: {err:?}"
    );
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn complete_403_returns_auth_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("{\"error\":{\"message\":\"Forbidden\"}}"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config_with_key(&server.uri(), "sk-forbidden"));

    let err = client.complete(&test_request()).await.unwrap_err();
    assert!(matches!(err, AppError::AuthFailed(_)));
}

#[tokio::test]
async fn complete_500_returns_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config(&server.uri()));

    let err = client.complete(&test_request()).await.unwrap_err();
    assert!(
        matches!(err, AppError::Upstream(_)),
        "expected Upstream, got: {err:?}"
    );
    let msg = err.to_string();
    assert!(msg.contains("500"), "error should carry the status: {msg}");
}

#[tokio::test]
async fn complete_unreachable_endpoint_returns_upstream() {
    let config = LlmConfig {
        url: "http://127.0.0.1:1/v1/chat/completions".into(),
        model: "test-model".into(),
        api_key: None,
    };
    let client = HttpChatClient::new(&config);

    let err = client.complete(&test_request()).await.unwrap_err();
    assert!(
        matches!(err, AppError::Upstream(_)),
        "expected Upstream, got: {err:?}"
    );
}

// ── Malformed responses ────────────────────────────────────────────────

#[tokio::test]
async fn complete_malformed_body_returns_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not json {{{"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config(&server.uri()));

    let err = client.complete(&test_request()).await.unwrap_err();
    assert!(
        matches!(err, AppError::Upstream(_)),
        "expected Upstream, got: {err:?}"
    );
    assert!(err.to_string().contains("parse"));
}

#[tokio::test]
async fn complete_empty_choices_is_ok_without_content() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "chatcmpl-empty",
        "model": "test-model",
        "choices": [],
        "usage": null
    });

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config(&server.uri()));

    let response = client.complete(&test_request()).await.unwrap();
    assert!(response.choices.is_empty());
    assert_eq!(response.first_content(), None);
}

// ── Request construction ───────────────────────────────────────────────

#[tokio::test]
async fn complete_sends_authorization_header_when_key_is_set() {
    let server = MockServer::start().await;

    // The mock only matches with the right header; a miss fails expect(1).
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-verify-auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&text_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config_with_key(&server.uri(), "sk-verify-auth"));
    client.complete(&test_request()).await.unwrap();
}

#[tokio::test]
async fn complete_omits_authorization_header_without_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&text_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config(&server.uri()));
    client.complete(&test_request()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn complete_posts_the_documented_body_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "temperature": 0.0,
            "max_tokens": 150,
            "messages": [
                {"role": "system", "content": "You are a test."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&text_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&mock_config(&server.uri()));
    client.complete(&test_request()).await.unwrap();
}
