//! LLM domain — one `generate_content` contract over two request shapes.
//!
//! Providers:
//!   - OpenAI chat completions (openai.rs)
//!   - Google Gemini generateContent (gemini.rs)
//!
//! Shared:
//!   - image.rs: screenshot data-URL parsing
//!
//! The caller picks a provider from the selected model's catalog entry and
//! gets a boxed generator from `generator_for`. Each call is a single
//! attempt; nothing here retries.

mod gemini;
pub mod image;
mod openai;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

use crate::catalog::ProviderId;
use crate::config::AppConfig;
use crate::error::AssistError;
use crate::page::WebpageContent;
use async_trait::async_trait;
use serde_json::Value;

/// Produce the model's answer for a prompt, optional screenshot
/// (`data:` URL) and optional webpage content.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn provider(&self) -> ProviderId;

    async fn generate_content(
        &self,
        screenshot: Option<&str>,
        prompt: &str,
        model_id: &str,
        webpage: Option<&WebpageContent>,
    ) -> Result<String, AssistError>;
}

/// Provider → implementation lookup.
pub fn generator_for(
    provider: ProviderId,
    api_key: &str,
    config: &AppConfig,
    client: &reqwest::Client,
) -> Box<dyn ContentGenerator> {
    match provider {
        ProviderId::OpenAi => Box::new(OpenAiGenerator::new(
            client.clone(),
            &config.openai_url,
            api_key,
        )),
        ProviderId::Gemini => Box::new(GeminiGenerator::new(
            client.clone(),
            &config.gemini_url,
            api_key,
        )),
    }
}

// ── Shared response handling ─────────────────────────────────────────

/// Send a prepared request and parse the body as JSON.
///
/// Network failures and non-JSON bodies are `Transport` errors; an HTTP
/// error status with a JSON body is left for the caller, because the
/// provider's `error` payload lives in that body. Request URLs are stripped
/// from reqwest errors since Gemini carries its key in the query string.
async fn send_json(provider: ProviderId, req: reqwest::RequestBuilder) -> Result<Value, AssistError> {
    let start = std::time::Instant::now();
    let resp = req.send().await.map_err(|e| {
        let e = e.without_url();
        log::error!("[LLM] {} request failed: {}", provider, e);
        AssistError::transport(provider.as_str(), e)
    })?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| {
        let e = e.without_url();
        log::error!("[LLM] {} body read failed: {}", provider, e);
        AssistError::transport(provider.as_str(), e)
    })?;
    log::info!(
        "[LLM] {} returned {} in {}ms ({} bytes)",
        provider,
        status,
        start.elapsed().as_millis(),
        body.len()
    );

    serde_json::from_str(&body).map_err(|e| {
        log::error!(
            "[LLM] {} returned non-JSON body (HTTP {}): {}",
            provider,
            status,
            body.chars().take(200).collect::<String>()
        );
        AssistError::transport(
            provider.as_str(),
            format!("non-JSON response (HTTP {}): {}", status, e),
        )
    })
}

/// Pull the provider's message out of an `{"error": ...}` payload.
fn provider_error(body: &Value) -> Option<String> {
    let err = body.get("error").filter(|e| !e.is_null())?;
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| err.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    Some(message)
}
