//! Command-line host — plays the popup's role without a browser.
//!
//! Each invocation loads state from the data dir, performs one command,
//! and prints the result. `ask` reads page text from a file and an
//! optional PNG as the screenshot.

use crate::assist::{AssistStatus, Assistant, LogNotices};
use crate::capture::{FileScreenshotSource, ScreenshotSource};
use crate::catalog::{self, ProviderId};
use crate::config::AppConfig;
use crate::error::{AssistError, CaptureError};
use crate::page::{PageMetadata, StaticPage, WebpageContent};
use crate::settings;
use crate::state::StateStore;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub const USAGE: &str = "Usage:
  page-assist status
  page-assist models
  page-assist prompts
  page-assist key <openai|gemini> <api-key>
  page-assist model <model-id>
  page-assist prompt <prompt-id>
  page-assist deep <on|off>
  page-assist add-prompt <name> <text>
  page-assist delete-prompt <prompt-id>
  page-assist reset
  page-assist test <openai|gemini>
  page-assist ask [--page <file>] [--title <t>] [--url <u>] [--screenshot <png>] [prompt...]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskArgs {
    pub page: Option<PathBuf>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub screenshot: Option<PathBuf>,
    /// Falls back to the selected prompt's text when absent.
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Models,
    Prompts,
    Key { provider: ProviderId, key: String },
    Model(String),
    Prompt(String),
    Deep(bool),
    AddPrompt { name: String, text: String },
    DeletePrompt(String),
    Reset,
    Test(ProviderId),
    Ask(AskArgs),
}

/// Parse arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some((name, rest)) = args.split_first() else {
        return Ok(Command::Status);
    };
    let arg = |i: usize, what: &str| -> Result<String, String> {
        rest.get(i)
            .cloned()
            .ok_or_else(|| format!("Missing {} for `{}`", what, name))
    };

    match name.as_str() {
        "status" => Ok(Command::Status),
        "models" => Ok(Command::Models),
        "prompts" => Ok(Command::Prompts),
        "key" => Ok(Command::Key {
            provider: arg(0, "provider")?.parse()?,
            key: rest.get(1).cloned().unwrap_or_default(),
        }),
        "model" => Ok(Command::Model(arg(0, "model id")?)),
        "prompt" => Ok(Command::Prompt(arg(0, "prompt id")?)),
        "deep" => match arg(0, "on|off")?.as_str() {
            "on" | "true" | "1" => Ok(Command::Deep(true)),
            "off" | "false" | "0" => Ok(Command::Deep(false)),
            other => Err(format!("Expected on|off, got {}", other)),
        },
        "add-prompt" => Ok(Command::AddPrompt {
            name: arg(0, "name")?,
            text: rest.get(1..).map(|t| t.join(" ")).unwrap_or_default(),
        }),
        "delete-prompt" => Ok(Command::DeletePrompt(arg(0, "prompt id")?)),
        "reset" => Ok(Command::Reset),
        "test" => Ok(Command::Test(arg(0, "provider")?.parse()?)),
        "ask" => parse_ask(rest).map(Command::Ask),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_ask(rest: &[String]) -> Result<AskArgs, String> {
    let mut ask = AskArgs::default();
    let mut words = Vec::new();
    let mut iter = rest.iter();
    while let Some(token) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {}", flag))
        };
        match token.as_str() {
            "--page" => ask.page = Some(PathBuf::from(value("--page")?)),
            "--title" => ask.title = Some(value("--title")?),
            "--url" => ask.url = Some(value("--url")?),
            "--screenshot" => ask.screenshot = Some(PathBuf::from(value("--screenshot")?)),
            _ => words.push(token.clone()),
        }
    }
    if !words.is_empty() {
        ask.prompt = Some(words.join(" "));
    }
    Ok(ask)
}

/// Screenshot source for hosts that were given no image.
struct NoScreenshot;

#[async_trait]
impl ScreenshotSource for NoScreenshot {
    async fn capture(&self) -> Result<String, CaptureError> {
        Err(CaptureError::Failed("no --screenshot file given".to_string()))
    }
}

fn load_page(ask: &AskArgs) -> Result<Option<WebpageContent>, AssistError> {
    let Some(path) = &ask.page else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        AssistError::validation(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(Some(WebpageContent {
        text,
        metadata: PageMetadata {
            title: ask.title.clone().unwrap_or_default(),
            url: ask
                .url
                .clone()
                .unwrap_or_else(|| format!("file://{}", path.display())),
            ..Default::default()
        },
    }))
}

pub async fn execute(
    command: Command,
    store: Arc<StateStore>,
    config: AppConfig,
) -> Result<(), AssistError> {
    match command {
        Command::Status => {
            let state = store.snapshot();
            println!("Model:   {}", state.selected_model.as_deref().unwrap_or("(none)"));
            println!(
                "Prompt:  {}",
                state
                    .selected_prompt()
                    .map(|p| p.name.as_str())
                    .unwrap_or("(none)")
            );
            println!(
                "Context: {}",
                if state.is_deep_context { "deep (page + screenshot)" } else { "shallow (page only)" }
            );
            for provider in ProviderId::ALL {
                let status = if state.api_key(provider).is_some() { "configured" } else { "no key" };
                println!("{:<8} {}", format!("{}:", provider.label()), status);
            }
        }
        Command::Models => {
            let state = store.snapshot();
            let groups = catalog::available_models(&state.api_keys);
            if groups.is_empty() {
                println!("No models available. Add a key with `page-assist key <provider> <key>`:");
                for provider in ProviderId::ALL {
                    println!("  {}: {}", provider.label(), provider.key_help_url());
                }
            }
            for (provider, models) in groups {
                println!("{}", provider.label());
                for m in models {
                    let mark = if state.selected_model.as_deref() == Some(m.id) { "*" } else { " " };
                    println!("  {} {:<32} {}", mark, m.id, m.display_name);
                }
            }
        }
        Command::Prompts => {
            let state = store.snapshot();
            if state.custom_prompts.is_empty() {
                println!("No saved prompts yet");
            }
            for p in &state.custom_prompts {
                let mark = if state.selected_prompt_id.as_deref() == Some(p.id.as_str()) { "*" } else { " " };
                println!("{} {:<36} {}", mark, p.id, p.name);
            }
        }
        Command::Key { provider, key } => {
            settings::save_api_key(&store, provider, &key).await?;
            println!("Saved!");
        }
        Command::Model(id) => {
            if catalog::find_model(&id).is_none() {
                return Err(AssistError::validation(format!("Unknown model: {}", id)));
            }
            store.set_selected_model(Some(id)).await?;
        }
        Command::Prompt(id) => {
            if !store.set_selected_prompt_id(&id).await? {
                return Err(AssistError::validation(format!("No prompt with id {}", id)));
            }
        }
        Command::Deep(on) => store.set_context_mode(on).await?,
        Command::AddPrompt { name, text } => {
            let id = settings::save_prompt(&store, None, &name, &text).await?;
            println!("Prompt saved successfully ({})", id);
        }
        Command::DeletePrompt(id) => {
            store.delete_custom_prompt(&id).await?;
            println!("Prompt deleted successfully");
        }
        Command::Reset => {
            settings::reset_all(&store).await?;
            println!("All API keys and custom prompts have been reset.");
        }
        Command::Test(provider) => {
            let key = store.snapshot().api_key(provider).unwrap_or_default().to_string();
            let answer =
                settings::test_provider(&config, &config.http_client(), provider, &key).await?;
            println!("{} OK: {}", provider.label(), answer.trim());
        }
        Command::Ask(ask) => {
            let prompt = match &ask.prompt {
                Some(p) => p.clone(),
                None => store
                    .snapshot()
                    .selected_prompt()
                    .map(|p| p.text.clone())
                    .unwrap_or_default(),
            };
            let pages = Arc::new(StaticPage(load_page(&ask)?));
            let screenshots: Arc<dyn ScreenshotSource> = match &ask.screenshot {
                Some(path) => Arc::new(FileScreenshotSource::new(path)),
                None => Arc::new(NoScreenshot),
            };
            let assistant = Assistant::new(store, config, pages, screenshots, Arc::new(LogNotices));
            if let AssistStatus::Completed(outcome) = assistant.assist(&prompt).await? {
                println!("{}", outcome.answer);
            }
        }
    }
    Ok(())
}
