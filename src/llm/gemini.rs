//! Gemini generateContent generator.
//!
//! Differences from OpenAI:
//! - API key in URL query param, not header
//! - Part order: webpage context, prompt, then image
//! - Image sent as `inline_data {mime_type, data}`; a screenshot that is not
//!   a well-formed `data:<mime>;base64,` URL is dropped, not an error
//! - Answer at `candidates[0].content.parts[0].text`; a missing path is an
//!   empty answer

use super::image::parse_data_url;
use super::{provider_error, send_json, ContentGenerator};
use crate::catalog::ProviderId;
use crate::error::AssistError;
use crate::page::WebpageContent;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Key excluded; it is attached with `.query()`.
    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model_id)
    }

    /// JSON body for `models/{model}:generateContent`.
    pub fn build_request(
        screenshot: Option<&str>,
        prompt: &str,
        webpage: Option<&WebpageContent>,
    ) -> Value {
        let mut parts = Vec::with_capacity(3);
        if let Some(page) = webpage {
            parts.push(json!({ "text": page.context_block() }));
        }
        parts.push(json!({ "text": prompt }));
        if let Some(url) = screenshot {
            match parse_data_url(url) {
                Some(image) => parts.push(json!({
                    "inline_data": {
                        "mime_type": image.mime_type,
                        "data": image.data
                    }
                })),
                None => log::warn!("[LLM] Screenshot is not an image data URL, sending text only"),
            }
        }
        json!({ "contents": [{ "parts": parts }] })
    }

    /// `candidates[0].content.parts[0].text`, empty when absent.
    pub fn extract_answer(body: &Value) -> Result<String, AssistError> {
        if let Some(message) = provider_error(body) {
            log::warn!("[LLM] gemini error payload: {}", message);
            return Err(AssistError::Provider(message));
        }
        let text = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(Value::as_str);
        if text.is_none() {
            log::warn!("[LLM] gemini response has no candidate text");
        }
        Ok(text.unwrap_or_default().to_string())
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    fn provider(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn generate_content(
        &self,
        screenshot: Option<&str>,
        prompt: &str,
        model_id: &str,
        webpage: Option<&WebpageContent>,
    ) -> Result<String, AssistError> {
        log::info!("[LLM] Provider: gemini");
        log::info!("[LLM] Model: {}", model_id);
        log::info!(
            "[LLM] Prompt {} chars, page context: {}, screenshot: {}",
            prompt.len(),
            webpage.is_some(),
            screenshot.is_some()
        );

        let body = Self::build_request(screenshot, prompt, webpage);
        let req = self
            .client
            .post(self.endpoint(model_id))
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&body);

        let response = send_json(ProviderId::Gemini, req).await?;
        let answer = Self::extract_answer(&response)?;
        log::info!("[LLM] Answer: {} chars", answer.len());
        Ok(answer)
    }
}
