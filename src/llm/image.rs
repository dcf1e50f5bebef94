//! Screenshot data-URL handling shared by both providers.

use regex::Regex;
use std::sync::OnceLock;

/// A parsed `data:<mime>;base64,<data>` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineImage<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^data:(image/[a-zA-Z0-9.+-]+);base64,(.+)$").expect("data URL pattern is valid")
    })
}

/// Strict parse used for Gemini `inline_data`. Anything that is not an
/// image data URL yields `None`.
pub fn parse_data_url(url: &str) -> Option<InlineImage<'_>> {
    let caps = data_url_regex().captures(url.trim())?;
    Some(InlineImage {
        mime_type: caps.get(1)?.as_str(),
        data: caps.get(2)?.as_str(),
    })
}

/// Everything after the first comma, used for OpenAI `image_url`.
/// `None` when there is no comma or nothing follows it.
pub fn base64_payload(url: &str) -> Option<&str> {
    let (_, payload) = url.trim().split_once(',')?;
    Some(payload).filter(|p| !p.is_empty())
}
