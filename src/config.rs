//! Runtime configuration — environment variables + `.env` files.
//!
//! Priority per value: process environment, then `.env.local` / `.env`
//! (loaded into the environment by `load_env_files`), then built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding `sync.json` and `local.json`.
    pub data_dir: PathBuf,
    /// Full chat-completions endpoint.
    pub openai_url: String,
    /// Base URL; `/v1beta/models/{model}:generateContent` is appended.
    pub gemini_url: String,
    pub request_timeout: Duration,
    pub capture_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            openai_url: DEFAULT_OPENAI_URL.to_string(),
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            capture_timeout: Duration::from_secs(DEFAULT_CAPTURE_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env_non_empty("PAGE_ASSIST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            openai_url: env_non_empty("OPENAI_API_URL").unwrap_or(defaults.openai_url),
            gemini_url: env_non_empty("GEMINI_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_url),
            request_timeout: env_secs("PAGE_ASSIST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
            capture_timeout: env_secs("PAGE_ASSIST_CAPTURE_TIMEOUT_SECS")
                .unwrap_or(defaults.capture_timeout),
        }
    }

    /// HTTP client shared by both providers.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[CONFIG] Failed to build HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            })
    }
}

/// Load `.env.local` → `.env` from `dir`. First file found wins.
pub fn load_env_files(dir: &Path) {
    'env_load: for env_file in [".env.local", ".env"] {
        let path = dir.join(env_file);
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("page-assist")
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(key: &str) -> Option<Duration> {
    let raw = env_non_empty(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            log::warn!("[CONFIG] Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
