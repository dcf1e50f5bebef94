//! Webpage content — what the extraction collaborator hands back, and the
//! labeled context block both providers embed in their requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Visible text of the active page plus its metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebpageContent {
    /// The extractor reports this field as `content`.
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default)]
    pub metadata: PageMetadata,
}

impl WebpageContent {
    /// Labeled block sent alongside the prompt. Any metadata line whose
    /// value is missing or empty is left out.
    pub fn context_block(&self) -> String {
        let meta = &self.metadata;
        let mut block = String::from("Webpage Context:\n");
        let lines = [
            ("Title", Some(meta.title.as_str())),
            ("URL", Some(meta.url.as_str())),
            ("Description", meta.description.as_deref()),
            ("Author", meta.author.as_deref()),
            ("Date", meta.date.as_deref()),
        ];
        for (label, value) in lines {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                block.push_str(label);
                block.push_str(": ");
                block.push_str(value);
                block.push('\n');
            }
        }
        block.push_str("\n\nContent:\n");
        block.push_str(&self.text);
        block
    }
}

/// Webpage extraction collaborator.
///
/// `Ok(None)` means the page yielded nothing usable; `Err` is logged by
/// the caller, which then proceeds without page context.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self) -> Result<Option<WebpageContent>, String>;
}

/// Extractor that always returns the same content (hosts without a live page).
pub struct StaticPage(pub Option<WebpageContent>);

#[async_trait]
impl PageExtractor for StaticPage {
    async fn extract(&self) -> Result<Option<WebpageContent>, String> {
        Ok(self.0.clone())
    }
}
