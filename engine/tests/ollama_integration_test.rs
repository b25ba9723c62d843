//! Integration tests for the HTTP providers and the provider gateway
//!
//! Providers talk to wiremock servers; no real Ollama or Gemini endpoint is
//! needed.

use std::time::Duration;

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use agrisage_engine::config::GeminiConfig;
use agrisage_engine::llm::{
    gemini::GeminiProvider, ollama::OllamaProvider, CompletionGateway, LLMError, LLMProvider,
    Message, ProviderGateway,
};

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn ollama_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3.1:8b",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

fn gemini(server: &MockServer) -> GeminiProvider {
    let config = GeminiConfig {
        base_url: server.uri(),
        model: "gemini-2.0-flash-001".to_string(),
    };
    GeminiProvider::new(config, Some("test-key".to_string()), timeout()).unwrap()
}

#[tokio::test]
async fn test_ollama_generate_posts_non_streaming_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "llama3.1:8b", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("Sow by mid November")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b", timeout()).unwrap();
    let text = provider
        .generate(&[Message::system("planner"), Message::user("When to sow wheat?")])
        .await
        .unwrap();

    assert_eq!(text, "Sow by mid November");
}

#[tokio::test]
async fn test_ollama_server_error_maps_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b", timeout()).unwrap();
    match provider.generate(&[Message::user("Hello")]).await {
        Err(LLMError::ProviderUnavailable(msg)) => assert!(msg.contains("model not loaded")),
        other => panic!("Expected ProviderUnavailable, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_ollama_blank_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("   ")))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b", timeout()).unwrap();
    let result = provider.generate(&[Message::user("Hello")]).await;
    assert!(matches!(result, Err(LLMError::EmptyResponse(_))));
}

#[tokio::test]
async fn test_ollama_connection_error() {
    // Nothing listens on port 9
    let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.1:8b", timeout()).unwrap();
    let result = provider.generate(&[Message::user("Hello")]).await;

    match result {
        Err(LLMError::ProviderUnavailable(msg)) => {
            assert!(msg.contains("Cannot connect to Ollama"));
        }
        Err(LLMError::NetworkError(_)) => {
            // Also acceptable - network errors can manifest differently
        }
        other => panic!(
            "Expected ProviderUnavailable or NetworkError, got: {:?}",
            other
        ),
    }
}

#[tokio::test]
async fn test_gemini_sends_key_as_query_and_system_instruction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-001:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "planner" }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Use drip lines")))
        .expect(1)
        .mount(&server)
        .await;

    let text = gemini(&server)
        .generate(&[Message::system("planner"), Message::user("Water saving?")])
        .await
        .unwrap();
    assert_eq!(text, "Use drip lines");
}

#[tokio::test]
async fn test_gemini_rate_limit_and_missing_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = gemini(&server).generate(&[Message::user("Hi")]).await;
    assert!(matches!(result, Err(LLMError::RateLimitExceeded)));

    let config = GeminiConfig {
        base_url: server.uri(),
        model: "gemini-2.0-flash-001".to_string(),
    };
    let keyless = GeminiProvider::new(config, None, timeout()).unwrap();
    assert!(!keyless.check_health().await);
    let result = keyless.generate(&[Message::user("Hi")]).await;
    match result {
        Err(LLMError::AuthenticationFailed(msg)) => assert!(!msg.contains("test-key")),
        other => panic!("Expected AuthenticationFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_gateway_fails_over_to_next_provider() {
    let failing = MockServer::start().await;
    let succeeding = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&failing)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-001:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Fallback answer")))
        .expect(1)
        .mount(&succeeding)
        .await;

    let providers: Vec<Box<dyn LLMProvider>> = vec![
        Box::new(OllamaProvider::new(failing.uri(), "llama3.1:8b", timeout()).unwrap()),
        Box::new(gemini(&succeeding)),
    ];
    let gateway = ProviderGateway::new(providers);
    assert_eq!(gateway.provider_names(), vec!["ollama", "gemini"]);

    let completion = gateway.send("planner", "Kharif plan").await;
    assert_eq!(completion.into_text().as_deref(), Some("Fallback answer"));
}

#[tokio::test]
async fn test_gateway_returns_empty_when_all_providers_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let providers: Vec<Box<dyn LLMProvider>> = vec![Box::new(
        OllamaProvider::new(server.uri(), "llama3.1:8b", timeout()).unwrap(),
    )];
    let gateway = ProviderGateway::new(providers);

    let completion = gateway.send("planner", "Anything").await;
    assert_eq!(completion.into_text(), None);
}
