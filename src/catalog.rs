//! Model catalog — static list of selectable models and their providers.
//!
//! The popup only offers models whose provider has a non-empty API key,
//! grouped by provider in catalog order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Provider that owns a model and decides the request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
}

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [ProviderId::OpenAi, ProviderId::Gemini];

    /// Storage key inside the `apiKeys` map.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Gemini => "Gemini",
        }
    }

    /// Where a user without a key can get one.
    pub fn key_help_url(self) -> &'static str {
        match self {
            ProviderId::OpenAi => "https://platform.openai.com/docs/api-reference/introduction",
            ProviderId::Gemini => "https://makersuite.google.com/app/apikey",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "gemini" => Ok(ProviderId::Gemini),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// One selectable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub provider: ProviderId,
}

const fn model(id: &'static str, display_name: &'static str, provider: ProviderId) -> ModelInfo {
    ModelInfo {
        id,
        display_name,
        provider,
    }
}

/// All known models, in display order.
pub static MODEL_CATALOG: &[ModelInfo] = &[
    model("gpt-4.1", "GPT-4.1 (Premium)", ProviderId::OpenAi),
    model("gpt-4.1-mini", "GPT-4.1 Mini (Premium)", ProviderId::OpenAi),
    model("gpt-4.1-nano", "GPT-4.1 Nano (Premium)", ProviderId::OpenAi),
    model("gpt-4o", "GPT-4o (Premium)", ProviderId::OpenAi),
    model("gpt-4o-mini", "GPT-4o Mini (Premium)", ProviderId::OpenAi),
    model("gpt-4", "GPT-4 (Premium)", ProviderId::OpenAi),
    model("gpt-3.5-turbo", "GPT-3.5 Turbo (Free)", ProviderId::OpenAi),
    // Gemini: image-capable models only
    model(
        "gemini-2.5-pro-preview-05-06",
        "Gemini 2.5 Pro Preview (Premium)",
        ProviderId::Gemini,
    ),
    model(
        "gemini-2.5-flash-preview-05-20",
        "Gemini 2.5 Flash Preview (Premium)",
        ProviderId::Gemini,
    ),
    model("gemini-2.0-flash", "Gemini 2.0 Flash (Free)", ProviderId::Gemini),
    model(
        "gemini-2.0-flash-lite",
        "Gemini 2.0 Flash Lite (Free)",
        ProviderId::Gemini,
    ),
    model("gemini-1.5-pro", "Gemini 1.5 Pro (Premium)", ProviderId::Gemini),
    model("gemini-1.5-flash", "Gemini 1.5 Flash (Free)", ProviderId::Gemini),
    model(
        "gemini-1.5-flash-8b",
        "Gemini 1.5 Flash-8B (Free)",
        ProviderId::Gemini,
    ),
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODEL_CATALOG.iter().find(|m| m.id == id)
}

/// Cheapest model of a provider, used for connection tests.
pub fn default_model(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAi => "gpt-4o-mini",
        ProviderId::Gemini => "gemini-2.0-flash",
    }
}

/// Check if a provider has a usable key in the given map.
pub fn is_provider_configured(api_keys: &HashMap<ProviderId, String>, provider: ProviderId) -> bool {
    api_keys
        .get(&provider)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

/// Selectable models grouped by provider, skipping providers without a key.
pub fn available_models(
    api_keys: &HashMap<ProviderId, String>,
) -> Vec<(ProviderId, Vec<&'static ModelInfo>)> {
    let mut groups: Vec<(ProviderId, Vec<&'static ModelInfo>)> = Vec::new();
    for m in MODEL_CATALOG
        .iter()
        .filter(|m| is_provider_configured(api_keys, m.provider))
    {
        match groups.iter_mut().find(|(p, _)| *p == m.provider) {
            Some((_, list)) => list.push(m),
            None => groups.push((m.provider, vec![m])),
        }
    }
    groups
}
