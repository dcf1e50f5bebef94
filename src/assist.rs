//! The "Assist" action — prompt + page context → provider → Markdown answer.
//!
//! Steps:
//! 1. Validate: a catalog model is selected, its provider has a key, and
//!    the prompt is non-empty (no network call otherwise)
//! 2. Append the Markdown formatting instruction to the prompt
//! 3. Extract webpage content (failure → warn, continue without it)
//! 4. Deep context only: capture a screenshot (failure → warn, text only)
//! 5. Dispatch to the provider's generator
//! 6. Drop the result if a newer assist started meanwhile; otherwise raise
//!    a success or error notice
//!
//! Each call takes a sequence number. Only the latest call may report.

use crate::capture::ScreenshotSource;
use crate::catalog::ProviderId;
use crate::config::AppConfig;
use crate::error::AssistError;
use crate::llm::{self, ContentGenerator};
use crate::page::{PageExtractor, WebpageContent};
use crate::state::StateStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MARKDOWN_SUFFIX: &str = "\n\nPlease format your response in Markdown. Use bullet points, numbered lists, and headings where appropriate. Be precise, concise, and correct in your answer.";

pub const MISSING_MODEL_MESSAGE: &str = "Please select a model and set its API key in settings";
pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a prompt";
pub const SUCCESS_MESSAGE: &str = "Assist Completed!";

/// How long a notice stays on screen.
pub const NOTICE_DURATION: Duration = Duration::from_secs(3);

// ── Notices ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient banner message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub duration: Duration,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
            duration: NOTICE_DURATION,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            duration: NOTICE_DURATION,
        }
    }
}

/// Where notices are shown. The host decides how (banner, log line, ...).
pub trait NoticeSink: Send + Sync {
    fn show(&self, notice: Notice);
}

/// Notice sink that writes to the log.
pub struct LogNotices;

impl NoticeSink for LogNotices {
    fn show(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => log::info!("[NOTICE] {}", notice.message),
            NoticeKind::Error => log::error!("[NOTICE] {}", notice.message),
        }
    }
}

// ── Outcome ─────────────────────────────────────────────────────────

/// A finished assist, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistOutcome {
    pub sequence: u64,
    pub provider: ProviderId,
    pub model_id: String,
    /// Markdown answer.
    pub answer: String,
    pub webpage: Option<WebpageContent>,
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistStatus {
    Completed(AssistOutcome),
    /// A newer assist started while this one was in flight; its result
    /// was discarded without touching the UI.
    Superseded { sequence: u64 },
}

// ── Assistant ───────────────────────────────────────────────────────

pub struct Assistant {
    store: Arc<StateStore>,
    config: AppConfig,
    client: reqwest::Client,
    pages: Arc<dyn PageExtractor>,
    screenshots: Arc<dyn ScreenshotSource>,
    notices: Arc<dyn NoticeSink>,
    latest: AtomicU64,
}

impl Assistant {
    pub fn new(
        store: Arc<StateStore>,
        config: AppConfig,
        pages: Arc<dyn PageExtractor>,
        screenshots: Arc<dyn ScreenshotSource>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        let client = config.http_client();
        Self {
            store,
            config,
            client,
            pages,
            screenshots,
            notices,
            latest: AtomicU64::new(0),
        }
    }

    /// Sequence number of the most recent assist.
    pub fn latest_sequence(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.latest_sequence() == sequence
    }

    /// Run one assist with the user's (possibly edited) prompt text.
    pub async fn assist(&self, prompt_text: &str) -> Result<AssistStatus, AssistError> {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let start = std::time::Instant::now();
        log::info!("[ASSIST] #{} started", sequence);

        match self.run(sequence, prompt_text).await {
            Ok(outcome) if self.is_current(sequence) => {
                log::info!(
                    "[ASSIST] #{} completed in {}ms ({} chars)",
                    sequence,
                    start.elapsed().as_millis(),
                    outcome.answer.len()
                );
                self.notices.show(Notice::success(SUCCESS_MESSAGE));
                Ok(AssistStatus::Completed(outcome))
            }
            Err(e) if self.is_current(sequence) => {
                match &e {
                    AssistError::Contract { .. } => {
                        log::error!("[ASSIST] #{} provider contract violation: {}", sequence, e)
                    }
                    _ => log::warn!("[ASSIST] #{} failed: {}", sequence, e),
                }
                self.notices.show(Notice::error(e.user_message()));
                Err(e)
            }
            _ => {
                log::info!(
                    "[ASSIST] #{} superseded by #{}, discarding result",
                    sequence,
                    self.latest_sequence()
                );
                Ok(AssistStatus::Superseded { sequence })
            }
        }
    }

    async fn run(&self, sequence: u64, prompt_text: &str) -> Result<AssistOutcome, AssistError> {
        // 1. Validation
        let state = self.store.snapshot();
        let model = state
            .selected_model_info()
            .ok_or_else(|| AssistError::validation(MISSING_MODEL_MESSAGE))?;
        let api_key = state
            .api_key(model.provider)
            .ok_or_else(|| AssistError::validation(MISSING_MODEL_MESSAGE))?;
        let prompt_text = prompt_text.trim();
        if prompt_text.is_empty() {
            return Err(AssistError::validation(EMPTY_PROMPT_MESSAGE));
        }

        // 2. Prompt
        let prompt = format!("{}{}", prompt_text, MARKDOWN_SUFFIX);

        // 3. Page context
        let webpage = match self.pages.extract().await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("[ASSIST] Failed to extract webpage content: {}", e);
                None
            }
        };

        // 4. Screenshot (deep context only)
        let screenshot = if state.is_deep_context {
            match self.screenshots.capture().await {
                Ok(url) => Some(url),
                Err(e) => {
                    log::warn!("[ASSIST] Screenshot unavailable, continuing text-only: {}", e);
                    None
                }
            }
        } else {
            None
        };

        // 5. Dispatch
        log::info!(
            "[ASSIST] #{} → {} / {} (page: {}, screenshot: {})",
            sequence,
            model.provider,
            model.id,
            webpage.is_some(),
            screenshot.is_some()
        );
        let generator: Box<dyn ContentGenerator> =
            llm::generator_for(model.provider, api_key, &self.config, &self.client);
        let answer = generator
            .generate_content(screenshot.as_deref(), &prompt, model.id, webpage.as_ref())
            .await?;

        Ok(AssistOutcome {
            sequence,
            provider: model.provider,
            model_id: model.id.to_string(),
            answer,
            webpage,
            screenshot,
        })
    }
}
