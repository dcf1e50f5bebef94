//! Application state store — user preferences plus change notification.
//!
//! One `StateStore` is built at startup and shared by reference (`Arc`)
//! with every surface that reads or edits preferences. Storage is the
//! source of truth for the prompt list: collection mutators re-read it
//! before changing anything, and memory is refreshed from the result.
//!
//! Every successful mutator persists, updates memory, then synchronously
//! calls all subscribers with a full snapshot, in registration order.

mod prompts;

pub use prompts::{
    default_prompts, generate_prompt_id, parse_stored, resolve_selection, NewPrompt,
    ParsedPrompts, Prompt,
};

use crate::catalog::{self, ModelInfo, ProviderId};
use crate::error::StorageError;
use crate::storage::{
    self, KeyValueStore, Namespace, KEY_API_KEYS, KEY_CUSTOM_PROMPTS, KEY_IS_DEEP_CONTEXT,
    KEY_LEGACY_API_KEY, KEY_SELECTED_MODEL, KEY_SELECTED_PROMPT_ID,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot handed to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub api_keys: HashMap<ProviderId, String>,
    pub custom_prompts: Vec<Prompt>,
    pub selected_prompt_id: Option<String>,
    pub selected_model: Option<String>,
    pub is_deep_context: bool,
}

impl ApplicationState {
    pub fn selected_prompt(&self) -> Option<&Prompt> {
        let id = self.selected_prompt_id.as_deref()?;
        self.custom_prompts.iter().find(|p| p.id == id)
    }

    pub fn selected_model_info(&self) -> Option<&'static ModelInfo> {
        self.selected_model.as_deref().and_then(catalog::find_model)
    }

    pub fn api_key(&self, provider: ProviderId) -> Option<&str> {
        self.api_keys
            .get(&provider)
            .map(String::as_str)
            .filter(|k| !k.trim().is_empty())
    }
}

pub type Listener = Arc<dyn Fn(&ApplicationState) + Send + Sync>;

pub struct StateStore {
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<ApplicationState>,
    listeners: Mutex<Vec<Listener>>,
}

impl StateStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            state: Mutex::new(ApplicationState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    fn state(&self) -> MutexGuard<'_, ApplicationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ApplicationState {
        self.state().clone()
    }

    // ── Notification ────────────────────────────────────────────────

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ApplicationState) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(listener));
    }

    /// Re-broadcast the current snapshot. A panicking listener is logged
    /// and skipped; the rest still run.
    pub fn notify(&self) {
        let snapshot = self.snapshot();
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for (i, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(&snapshot))).is_err() {
                log::error!("[STATE] Listener #{} panicked during notify", i);
            }
        }
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Hydrate every field from storage, then notify once.
    ///
    /// Empty storage is not an error: each field has a default, and the
    /// default prompt set is written back when no prompts exist.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        let api_keys = self.load_api_keys().await?;
        let prompts = self.load_prompts().await?;
        let local = self
            .storage
            .get(
                Namespace::Local,
                &[KEY_SELECTED_MODEL, KEY_SELECTED_PROMPT_ID, KEY_IS_DEEP_CONTEXT],
            )
            .await?;

        let selected_model = local
            .get(KEY_SELECTED_MODEL)
            .and_then(Value::as_str)
            .filter(|id| {
                let known = catalog::find_model(id).is_some();
                if !known {
                    log::warn!("[STATE] Ignoring unknown stored model: {}", id);
                }
                known
            })
            .map(str::to_string);
        let selected_prompt_id = resolve_selection(
            &prompts,
            local.get(KEY_SELECTED_PROMPT_ID).and_then(Value::as_str),
        );
        let is_deep_context = local
            .get(KEY_IS_DEEP_CONTEXT)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        {
            let mut state = self.state();
            *state = ApplicationState {
                api_keys,
                custom_prompts: prompts,
                selected_prompt_id,
                selected_model,
                is_deep_context,
            };
            log::info!(
                "[STATE] Initialized: {} prompts, model={:?}, deep={}, providers with keys={}",
                state.custom_prompts.len(),
                state.selected_model,
                state.is_deep_context,
                state.api_keys.len()
            );
        }

        self.notify();
        Ok(())
    }

    /// Refresh the in-memory key map from storage. Does not notify.
    pub async fn reload_api_keys(&self) -> Result<(), StorageError> {
        let api_keys = self.load_api_keys().await?;
        self.state().api_keys = api_keys;
        Ok(())
    }

    /// Per-provider keys from local storage; a legacy single key (sync)
    /// stands in for OpenAI only when the map has no `openai` entry at all.
    /// An explicitly cleared entry keeps the legacy key out.
    async fn load_api_keys(&self) -> Result<HashMap<ProviderId, String>, StorageError> {
        let local = self.storage.get(Namespace::Local, &[KEY_API_KEYS]).await?;
        let mut keys = HashMap::new();
        let map = local.get(KEY_API_KEYS).and_then(Value::as_object);
        let openai_entry = map.is_some_and(|m| m.contains_key(ProviderId::OpenAi.as_str()));
        if let Some(map) = map {
            for (provider, key) in map {
                let Ok(provider) = provider.parse::<ProviderId>() else {
                    log::debug!("[STATE] Skipping key for unknown provider {}", provider);
                    continue;
                };
                if let Some(key) = key.as_str().map(str::trim).filter(|k| !k.is_empty()) {
                    keys.insert(provider, key.to_string());
                }
            }
        }

        if !openai_entry {
            let sync = self
                .storage
                .get(Namespace::Sync, &[KEY_LEGACY_API_KEY])
                .await?;
            if let Some(legacy) = sync
                .get(KEY_LEGACY_API_KEY)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|k| !k.is_empty())
            {
                log::info!("[STATE] Using legacy apiKey for openai ({} chars)", legacy.len());
                keys.insert(ProviderId::OpenAi, legacy.to_string());
            }
        }
        Ok(keys)
    }

    /// Storage-authoritative prompt list. Writes back defaults or a
    /// migrated/repaired list when normalization changed anything.
    async fn load_prompts(&self) -> Result<Vec<Prompt>, StorageError> {
        let sync = self
            .storage
            .get(Namespace::Sync, &[KEY_CUSTOM_PROMPTS])
            .await?;
        let parsed = parse_stored(sync.get(KEY_CUSTOM_PROMPTS));
        if parsed.needs_write {
            log::info!(
                "[STATE] Writing normalized prompt list ({} prompts)",
                parsed.prompts.len()
            );
            self.save_prompts(&parsed.prompts).await?;
        }
        Ok(parsed.prompts)
    }

    async fn save_prompts(&self, prompts: &[Prompt]) -> Result<(), StorageError> {
        self.storage
            .set(
                Namespace::Sync,
                storage::record_of(KEY_CUSTOM_PROMPTS, &prompts)?,
            )
            .await
    }

    async fn save_selected_prompt_id(&self, id: Option<&str>) -> Result<(), StorageError> {
        match id {
            Some(id) => {
                self.storage
                    .set(
                        Namespace::Local,
                        storage::record(KEY_SELECTED_PROMPT_ID, Value::from(id)),
                    )
                    .await
            }
            None => {
                self.storage
                    .remove(Namespace::Local, &[KEY_SELECTED_PROMPT_ID])
                    .await
            }
        }
    }

    // ── Selection mutators ──────────────────────────────────────────

    /// Select a prompt. Returns `false` (no write, no notify) when `id` is
    /// empty or names no current prompt.
    pub async fn set_selected_prompt_id(&self, id: &str) -> Result<bool, StorageError> {
        if id.is_empty() {
            return Ok(false);
        }
        let known = self.state().custom_prompts.iter().any(|p| p.id == id);
        if !known {
            log::debug!("[STATE] Ignoring selection of unknown prompt {}", id);
            return Ok(false);
        }
        self.save_selected_prompt_id(Some(id)).await?;
        self.state().selected_prompt_id = Some(id.to_string());
        self.notify();
        Ok(true)
    }

    /// Select a model, or clear the selection with `None`.
    pub async fn set_selected_model(&self, model: Option<String>) -> Result<(), StorageError> {
        match &model {
            Some(id) => {
                self.storage
                    .set(
                        Namespace::Local,
                        storage::record(KEY_SELECTED_MODEL, Value::from(id.as_str())),
                    )
                    .await?
            }
            None => {
                self.storage
                    .remove(Namespace::Local, &[KEY_SELECTED_MODEL])
                    .await?
            }
        }
        log::info!("[STATE] Selected model: {:?}", model);
        self.state().selected_model = model;
        self.notify();
        Ok(())
    }

    /// `true` → include a full-page screenshot with each request.
    pub async fn set_context_mode(&self, is_deep: bool) -> Result<(), StorageError> {
        self.storage
            .set(
                Namespace::Local,
                storage::record(KEY_IS_DEEP_CONTEXT, Value::Bool(is_deep)),
            )
            .await?;
        self.state().is_deep_context = is_deep;
        self.notify();
        Ok(())
    }

    // ── Prompt list mutators ────────────────────────────────────────

    /// Append a prompt to the stored list and return its id.
    pub async fn add_custom_prompt(&self, new: NewPrompt) -> Result<String, StorageError> {
        let mut prompts = self.load_prompts().await?;
        let id = match new.id.filter(|id| !id.is_empty()) {
            Some(id) if !prompts.iter().any(|p| p.id == id) => id,
            Some(id) => {
                log::warn!("[STATE] Prompt id {} already exists, generating a new one", id);
                generate_prompt_id()
            }
            None => generate_prompt_id(),
        };
        prompts.push(Prompt {
            id: id.clone(),
            name: new.name,
            text: new.text,
        });
        self.save_prompts(&prompts).await?;
        self.replace_prompts(prompts, None).await?;
        log::info!("[STATE] Added prompt {}", id);
        self.notify();
        Ok(id)
    }

    /// Rename / rewrite an existing prompt in place. Returns `false` when
    /// no stored prompt has `id`.
    pub async fn update_custom_prompt(
        &self,
        id: &str,
        name: &str,
        text: &str,
    ) -> Result<bool, StorageError> {
        let mut prompts = self.load_prompts().await?;
        let Some(prompt) = prompts.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        prompt.name = name.to_string();
        prompt.text = text.to_string();
        self.save_prompts(&prompts).await?;
        self.replace_prompts(prompts, None).await?;
        log::info!("[STATE] Updated prompt {}", id);
        self.notify();
        Ok(true)
    }

    /// Remove a prompt by id. If the selection no longer resolves, it moves
    /// to the first remaining prompt (or `None` when the list is empty).
    pub async fn delete_custom_prompt(&self, id: &str) -> Result<(), StorageError> {
        let prompts: Vec<Prompt> = self
            .load_prompts()
            .await?
            .into_iter()
            .filter(|p| p.id != id)
            .collect();
        self.save_prompts(&prompts).await?;
        self.replace_prompts(prompts, Some(id)).await?;
        log::info!("[STATE] Deleted prompt {}", id);
        self.notify();
        Ok(())
    }

    /// Overwrite the list with the built-in set and select its first entry.
    pub async fn reset_prompts_to_default(&self) -> Result<(), StorageError> {
        let defaults = default_prompts();
        let first = defaults.first().map(|p| p.id.clone());
        self.save_prompts(&defaults).await?;
        self.save_selected_prompt_id(first.as_deref()).await?;
        {
            let mut state = self.state();
            state.custom_prompts = defaults;
            state.selected_prompt_id = first;
        }
        log::info!("[STATE] Prompts reset to defaults");
        self.notify();
        Ok(())
    }

    /// Install a freshly stored list in memory, re-resolving the selection
    /// when it was `removed` or no longer exists. Persists a changed selection.
    async fn replace_prompts(
        &self,
        prompts: Vec<Prompt>,
        removed: Option<&str>,
    ) -> Result<(), StorageError> {
        let (old, new) = {
            let state = self.state();
            let current = state.selected_prompt_id.as_deref();
            let keep = current.filter(|c| Some(*c) != removed);
            (
                state.selected_prompt_id.clone(),
                resolve_selection(&prompts, keep),
            )
        };
        if old != new {
            self.save_selected_prompt_id(new.as_deref()).await?;
        }
        let mut state = self.state();
        state.custom_prompts = prompts;
        state.selected_prompt_id = new;
        Ok(())
    }
}
