//! OpenAI chat-completions generator.
//!
//! Request: one user message whose content parts are, in order, the prompt,
//! the webpage context block (if any), and the screenshot (if any) as an
//! `image_url` re-declared as `data:image/png;base64,...`.
//! Bearer-token auth. Answer at `choices[0].message.content`.

use super::image::base64_payload;
use super::{provider_error, send_json, ContentGenerator};
use crate::catalog::ProviderId;
use crate::error::AssistError;
use crate::page::WebpageContent;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// JSON body for `/v1/chat/completions`.
    pub fn build_request(
        screenshot: Option<&str>,
        prompt: &str,
        model_id: &str,
        webpage: Option<&WebpageContent>,
    ) -> Value {
        let mut content = vec![json!({ "type": "text", "text": prompt })];
        if let Some(page) = webpage {
            content.push(json!({ "type": "text", "text": page.context_block() }));
        }
        match screenshot.map(|url| (url, base64_payload(url))) {
            Some((_, Some(data))) => content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/png;base64,{}", data) }
            })),
            Some((url, None)) => {
                log::warn!(
                    "[LLM] Dropping screenshot without base64 payload ({} chars)",
                    url.len()
                );
            }
            None => {}
        }

        json!({
            "model": model_id,
            "messages": [{ "role": "user", "content": content }]
        })
    }

    /// `choices[0].message.content`, or the provider's error message.
    pub fn extract_answer(body: &Value) -> Result<String, AssistError> {
        if let Some(message) = provider_error(body) {
            log::warn!("[LLM] openai error payload: {}", message);
            return Err(AssistError::Provider(message));
        }
        let choices = body
            .get("choices")
            .and_then(Value::as_array)
            .ok_or_else(|| AssistError::contract("openai", "response has no `choices` array"))?;
        let first = choices
            .first()
            .ok_or_else(|| AssistError::contract("openai", "`choices` is empty"))?;
        first
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AssistError::contract("openai", "`choices[0].message.content` is not a string")
            })
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn generate_content(
        &self,
        screenshot: Option<&str>,
        prompt: &str,
        model_id: &str,
        webpage: Option<&WebpageContent>,
    ) -> Result<String, AssistError> {
        log::info!("[LLM] Provider: openai");
        log::info!("[LLM] Model: {}", model_id);
        log::info!(
            "[LLM] Prompt {} chars, page context: {}, screenshot: {}",
            prompt.len(),
            webpage.is_some(),
            screenshot.is_some()
        );

        let body = Self::build_request(screenshot, prompt, model_id, webpage);
        let req = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let response = send_json(ProviderId::OpenAi, req).await?;
        let answer = Self::extract_answer(&response)?;
        log::info!("[LLM] Answer: {} chars", answer.len());
        Ok(answer)
    }
}
