//! HTTP-level tests for the OpenAI-compatible adapter against a local mock
//! server.  No network access or real credentials required.

use serde_json::json;
use sx_domain::config::LlmConfig;
use sx_domain::error::Error;
use sx_providers::{CompletionProvider, OpenAiCompatProvider};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> OpenAiCompatProvider {
    let cfg = LlmConfig {
        base_url: server.uri(),
        timeout_ms: 5_000,
        ..LlmConfig::default()
    };
    OpenAiCompatProvider::with_api_key(&cfg, "sk-test".into()).unwrap()
}

#[tokio::test]
async fn completion_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 250 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "message": { "role": "assistant", "content": "Handmade ceramic mug." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let completion = provider.complete("Product name: Mug", 250).await.unwrap();
    assert_eq!(completion.text, "Handmade ceramic mug.");
    assert_eq!(completion.usage.unwrap().completion_tokens, 4);
}

#[tokio::test]
async fn upstream_error_is_surfaced_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server).complete("x", 10).await.unwrap_err();
    match err {
        Error::Provider { provider, message } => {
            assert_eq!(provider, "openai");
            assert_eq!(message, "HTTP 401 - Incorrect API key provided");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = provider_for(&server).complete("x", 10).await.unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}
