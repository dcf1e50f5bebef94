//! Settings panel operations and provider connection testing.
//!
//! Handles:
//! - API key storage (local `apiKeys` map) + re-broadcast to subscribers
//! - Prompt save path (add or edit, with non-empty validation)
//! - Full reset (keys, prompts, model selection)
//! - Provider connection testing

use crate::catalog::{self, ProviderId};
use crate::config::AppConfig;
use crate::error::AssistError;
use crate::llm;
use crate::state::{NewPrompt, StateStore};
use crate::storage::{
    self, Namespace, KEY_API_KEYS, KEY_CUSTOM_PROMPTS, KEY_LEGACY_API_KEY,
};
use serde_json::{Map, Value};

/// A key is usable when it is non-empty after trimming.
pub fn validate_api_key(key: &str) -> bool {
    !key.trim().is_empty()
}

// ── API keys ────────────────────────────────────────────────────────

/// Store (or clear, with an empty string) one provider's key, then
/// refresh the store so model lists update.
pub async fn save_api_key(
    store: &StateStore,
    provider: ProviderId,
    key: &str,
) -> Result<(), AssistError> {
    let key = key.trim();
    let current = store.storage().get(Namespace::Local, &[KEY_API_KEYS]).await?;
    let mut keys = current
        .get(KEY_API_KEYS)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);
    keys.insert(provider.as_str().to_string(), Value::from(key));
    store
        .storage()
        .set(Namespace::Local, storage::record(KEY_API_KEYS, Value::Object(keys)))
        .await?;
    if provider == ProviderId::OpenAi {
        // The map entry now owns the OpenAI key; drop the legacy single key.
        store
            .storage()
            .remove(Namespace::Sync, &[KEY_LEGACY_API_KEY])
            .await?;
    }

    if validate_api_key(key) {
        log::info!("[SETTINGS] API key saved for {} ({} chars)", provider, key.len());
    } else {
        log::info!("[SETTINGS] API key cleared for {}", provider);
    }

    store.reload_api_keys().await?;
    store.notify();
    Ok(())
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Save from the prompt editor: edit `editing_id` if given, else add.
/// Returns the id of the saved prompt.
pub async fn save_prompt(
    store: &StateStore,
    editing_id: Option<&str>,
    name: &str,
    text: &str,
) -> Result<String, AssistError> {
    let name = name.trim();
    let text = text.trim();
    if name.is_empty() {
        return Err(AssistError::validation("Prompt name cannot be empty"));
    }
    if text.is_empty() {
        return Err(AssistError::validation("Prompt text cannot be empty"));
    }

    match editing_id {
        Some(id) => {
            if !store.update_custom_prompt(id, name, text).await? {
                return Err(AssistError::validation("Prompt not found"));
            }
            Ok(id.to_string())
        }
        None => Ok(store.add_custom_prompt(NewPrompt::new(name, text)).await?),
    }
}

// ── Reset ───────────────────────────────────────────────────────────

/// Remove every API key and custom prompt, restore the default prompts,
/// and clear the model selection.
pub async fn reset_all(store: &StateStore) -> Result<(), AssistError> {
    store
        .storage()
        .remove(Namespace::Local, &[KEY_API_KEYS])
        .await?;
    store
        .storage()
        .remove(Namespace::Sync, &[KEY_LEGACY_API_KEY, KEY_CUSTOM_PROMPTS])
        .await?;
    // Keys first so every broadcast below already sees them cleared.
    store.reload_api_keys().await?;
    store.set_selected_model(None).await?;
    store.reset_prompts_to_default().await?;
    log::info!("[SETTINGS] All API keys and custom prompts have been reset");
    Ok(())
}

// ── Connection test ─────────────────────────────────────────────────

/// Send a minimal request to the provider's default model.
///
/// Returns the (short) answer on success so the caller can show it.
pub async fn test_provider(
    config: &AppConfig,
    client: &reqwest::Client,
    provider: ProviderId,
    api_key: &str,
) -> Result<String, AssistError> {
    if !validate_api_key(api_key) {
        return Err(AssistError::validation(format!(
            "No API key set for {}",
            provider.label()
        )));
    }
    let model = catalog::default_model(provider);
    let generator = llm::generator_for(provider, api_key.trim(), config, client);
    let start = std::time::Instant::now();
    let result = generator
        .generate_content(None, "Reply with just: ok", model, None)
        .await;
    log::info!(
        "[SETTINGS] Test {} ({}): {} in {}ms",
        provider,
        model,
        if result.is_ok() { "ok" } else { "failed" },
        start.elapsed().as_millis()
    );
    result
}
