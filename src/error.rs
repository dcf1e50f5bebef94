//! Error kinds surfaced by the assist core.
//!
//! The split matters to callers: a `Validation` error never touched the
//! network, a `Transport` error never reached the provider, and a
//! `Provider` error carries the provider's own message verbatim.

use thiserror::Error;

/// Failure of the key-value storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored data in {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the screenshot capture collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("a screenshot capture is already in progress")]
    Busy,

    #[error("screenshot capture timed out after {0}s")]
    TimedOut(u64),

    #[error("screenshot capture was cancelled")]
    Cancelled,

    #[error("screenshot capture failed: {0}")]
    Failed(String),
}

/// Everything that can go wrong between pressing "Assist" and rendering an answer.
#[derive(Debug, Error)]
pub enum AssistError {
    /// Missing model, missing key, empty prompt. No network call was made.
    #[error("{0}")]
    Validation(String),

    /// Could not reach the provider, or its body was not JSON.
    #[error("could not reach {provider}: {detail}")]
    Transport { provider: String, detail: String },

    /// The provider answered with a structured `error` payload.
    #[error("{0}")]
    Provider(String),

    /// The provider answered, but not in the documented shape.
    #[error("unexpected response from {provider}: {detail}")]
    Contract { provider: String, detail: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl AssistError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(provider: &str, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn contract(provider: &str, detail: impl Into<String>) -> Self {
        Self::Contract {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// Text for the transient notification banner.
    ///
    /// Validation and provider messages are shown as-is; everything else
    /// collapses to a generic line (details go to the log).
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Provider(msg) => msg.clone(),
            Self::Transport { .. } | Self::Contract { .. } => {
                "Failed to generate result".to_string()
            }
            Self::Storage(_) => "Failed to save settings".to_string(),
            Self::Capture(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_is_verbatim() {
        let err = AssistError::Provider("bad key".to_string());
        assert_eq!(err.to_string(), "bad key");
        assert_eq!(err.user_message(), "bad key");
    }

    #[test]
    fn transport_and_contract_share_generic_banner() {
        let t = AssistError::transport("openai", "dns error");
        let c = AssistError::contract("openai", "missing choices");
        assert_eq!(t.user_message(), "Failed to generate result");
        assert_eq!(c.user_message(), "Failed to generate result");
        assert!(t.to_string().contains("dns error"));
        assert!(c.to_string().contains("missing choices"));
    }
}
