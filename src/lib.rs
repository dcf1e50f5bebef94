//! Page Assist — capture webpage content, send it with a prompt to an LLM
//! provider, and return the Markdown answer.
//!
//! This is the shell that wires the domains together. No business logic
//! lives here, only module declarations and host startup.
//!
//! Domains:
//!   - state.rs / storage: preferences store + key-value persistence
//!   - llm: OpenAI / Gemini content generators
//!   - assist.rs: the Assist action (validation → context → provider)
//!   - settings.rs: API keys, prompt editing, reset, provider test
//!   - capture / page.rs: screenshot and webpage-content collaborators
//!   - cli.rs: command-line host

pub mod assist;
pub mod capture;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod page;
pub mod settings;
pub mod state;
pub mod storage;

use config::AppConfig;
use error::AssistError;
use state::StateStore;
use std::sync::Arc;
use storage::JsonFileStorage;

/// Entry point for the binary host.
pub async fn run() -> Result<(), AssistError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    config::load_env_files(&cwd);

    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)
        .map_err(|msg| AssistError::validation(format!("{}\n\n{}", msg, cli::USAGE)))?;

    let config = AppConfig::from_env();
    log::info!("Page Assist starting up (data dir: {})", config.data_dir.display());

    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let store = Arc::new(StateStore::new(storage));
    store.subscribe(|state| {
        log::debug!(
            "[STATE] Changed: model={:?}, prompt={:?}, deep={}, prompts={}",
            state.selected_model,
            state.selected_prompt_id,
            state.is_deep_context,
            state.custom_prompts.len()
        );
    });
    store.initialize().await?;

    cli::execute(command, store, config).await
}
