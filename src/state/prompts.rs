//! Prompt records, the built-in default set, and stored-format repair.
//!
//! Stored prompt lists come in three shapes:
//!   - current:  `[{id, name, text}, ...]`
//!   - legacy:   `["text", ...]`          → named "Prompt N" by position
//!   - partial:  `[{name, text}, ...]`    → missing ids are generated
//!
//! `parse_stored` normalizes all of them and reports whether the result
//! differs from what was stored, so the caller can write it back.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub text: String,
}

/// Input to `StateStore::add_custom_prompt`. `id` is generated when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPrompt {
    pub name: String,
    pub text: String,
    pub id: Option<String>,
}

impl NewPrompt {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            id: None,
        }
    }
}

/// Built-in prompt set, restored when storage has none.
pub fn default_prompts() -> Vec<Prompt> {
    [
        (
            "default-summarize",
            "Summarize",
            "Summarize this page in a few short paragraphs, keeping the most important facts.",
        ),
        (
            "default-key-points",
            "Key Points",
            "List the key points of this page as concise bullet points.",
        ),
        (
            "default-explain",
            "Explain Simply",
            "Explain the content of this page in simple terms, as if to someone new to the topic.",
        ),
        (
            "default-questions",
            "Study Questions",
            "Write five questions (with answers) that test understanding of this page.",
        ),
    ]
    .into_iter()
    .map(|(id, name, text)| Prompt {
        id: id.to_string(),
        name: name.to_string(),
        text: text.to_string(),
    })
    .collect()
}

/// Unique prompt id: millisecond timestamp + 9 random base-36 chars.
pub fn generate_prompt_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("prompt-{}-{}", millis, suffix)
}

/// Result of normalizing a stored prompt list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrompts {
    pub prompts: Vec<Prompt>,
    /// True when `prompts` must be written back (defaults, migration, repair).
    pub needs_write: bool,
}

#[derive(Deserialize)]
struct StoredPrompt {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

pub fn parse_stored(value: Option<&Value>) -> ParsedPrompts {
    let items = match value.and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => {
            return ParsedPrompts {
                prompts: default_prompts(),
                needs_write: true,
            }
        }
    };

    let mut needs_write = false;
    let mut seen = HashSet::new();
    let mut prompts = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let fallback_name = format!("Prompt {}", i + 1);
        let (id, name, text) = match item {
            Value::String(text) => {
                needs_write = true;
                (None, fallback_name, text.clone())
            }
            Value::Object(_) => match serde_json::from_value::<StoredPrompt>(item.clone()) {
                Ok(StoredPrompt {
                    id,
                    name,
                    text: Some(text),
                }) => {
                    let name = match name.filter(|n| !n.is_empty()) {
                        Some(n) => n,
                        None => {
                            needs_write = true;
                            fallback_name
                        }
                    };
                    (id.filter(|id| !id.is_empty()), name, text)
                }
                _ => {
                    log::warn!("[STATE] Dropping unreadable stored prompt at index {}", i);
                    needs_write = true;
                    continue;
                }
            },
            _ => {
                log::warn!("[STATE] Dropping non-prompt value at index {}", i);
                needs_write = true;
                continue;
            }
        };

        let id = match id {
            Some(id) if !seen.contains(&id) => id,
            _ => {
                needs_write = true;
                let mut fresh = generate_prompt_id();
                while seen.contains(&fresh) {
                    fresh = generate_prompt_id();
                }
                fresh
            }
        };
        seen.insert(id.clone());
        prompts.push(Prompt { id, name, text });
    }

    if prompts.is_empty() {
        return ParsedPrompts {
            prompts: default_prompts(),
            needs_write: true,
        };
    }
    ParsedPrompts {
        prompts,
        needs_write,
    }
}

/// Keep `wanted` if it names a prompt in `prompts`, else fall back to the first.
pub fn resolve_selection(prompts: &[Prompt], wanted: Option<&str>) -> Option<String> {
    match wanted {
        Some(id) if prompts.iter().any(|p| p.id == id) => Some(id.to_string()),
        _ => prompts.first().map(|p| p.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_or_empty_list_yields_defaults() {
        for stored in [None, Some(json!([])), Some(json!("nope"))] {
            let parsed = parse_stored(stored.as_ref());
            assert_eq!(parsed.prompts, default_prompts());
            assert!(parsed.needs_write);
        }
    }

    #[test]
    fn legacy_strings_are_migrated_with_positional_names() {
        let stored = json!(["first text", "second text"]);
        let parsed = parse_stored(Some(&stored));
        assert!(parsed.needs_write);
        assert_eq!(parsed.prompts.len(), 2);
        assert_eq!(parsed.prompts[0].name, "Prompt 1");
        assert_eq!(parsed.prompts[1].name, "Prompt 2");
        assert_eq!(parsed.prompts[1].text, "second text");
        assert_ne!(parsed.prompts[0].id, parsed.prompts[1].id);
    }

    #[test]
    fn current_format_is_left_untouched() {
        let stored = json!([
            {"id": "a", "name": "A", "text": "alpha"},
            {"id": "b", "name": "B", "text": "beta"}
        ]);
        let parsed = parse_stored(Some(&stored));
        assert!(!parsed.needs_write);
        assert_eq!(parsed.prompts[1].id, "b");
    }

    #[test]
    fn missing_and_duplicate_ids_are_regenerated() {
        let stored = json!([
            {"name": "A", "text": "alpha"},
            {"id": "x", "name": "B", "text": "beta"},
            {"id": "x", "name": "C", "text": "gamma"}
        ]);
        let parsed = parse_stored(Some(&stored));
        assert!(parsed.needs_write);
        let ids: HashSet<_> = parsed.prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("x"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<String> = (0..200).map(|_| generate_prompt_id()).collect();
        assert_eq!(ids.len(), 200);
        assert!(ids.iter().all(|id| id.starts_with("prompt-")));
    }

    #[test]
    fn selection_falls_back_to_first() {
        let prompts = default_prompts();
        assert_eq!(
            resolve_selection(&prompts, Some("default-explain")).as_deref(),
            Some("default-explain")
        );
        assert_eq!(
            resolve_selection(&prompts, Some("gone")).as_deref(),
            Some("default-summarize")
        );
        assert_eq!(resolve_selection(&[], Some("gone")), None);
    }
}
