//! Shared fixtures for integration tests.

#![allow(dead_code)]

use page_assist_lib::config::AppConfig;
use page_assist_lib::storage::MemoryStorage;
use page_assist_lib::state::StateStore;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OPENAI_PATH: &str = "/v1/chat/completions";

pub fn gemini_path(model: &str) -> String {
    format!("/v1beta/models/{}:generateContent", model)
}

/// Config with both providers pointed at the mock server.
pub fn mock_config(server: &MockServer) -> AppConfig {
    AppConfig {
        openai_url: format!("{}{}", server.uri(), OPENAI_PATH),
        gemini_url: server.uri(),
        request_timeout: Duration::from_secs(5),
        capture_timeout: Duration::from_secs(1),
        ..AppConfig::default()
    }
}

pub async fn mount_openai_answer(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path(OPENAI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": answer},
                "finish_reason": "stop"
            }]
        })))
        .mount(server)
        .await;
}

pub async fn mount_gemini_answer(server: &MockServer, model: &str, answer: &str) {
    Mock::given(method("POST"))
        .and(path(gemini_path(model)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": answer}]},
                "finishReason": "STOP"
            }]
        })))
        .mount(server)
        .await;
}

/// Initialized store over fresh in-memory storage.
pub async fn fresh_store() -> (Arc<MemoryStorage>, Arc<StateStore>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(StateStore::new(storage.clone()));
    store.initialize().await.expect("initialize on empty storage");
    (storage, store)
}

/// First JSON body the mock server received.
pub async fn first_request_body(server: &MockServer) -> serde_json::Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let req = requests.first().expect("at least one request");
    serde_json::from_slice(&req.body).expect("request body is JSON")
}
