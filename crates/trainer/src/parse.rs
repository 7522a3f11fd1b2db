//! Lenient parsing of oracle replies.
//!
//! Models wrap JSON in prose or code fences and sometimes use single quotes.
//! We take the first `{...}` block, try strict JSON, then retry with quotes
//! swapped. When neither parses (an apostrophe inside a single-quoted
//! string), the index and rationale are scraped from the block directly.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::AdviceError;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("valid regex"));

static LOOSE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]?\b(?:i|index|move_index|moveIndex)['"]?\s*:\s*['"]?(\d+)"#)
        .expect("valid regex")
});

static LOOSE_RATIONALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"['"]?\b(?:r|rationale|reason|explanation)['"]?\s*:\s*['"](.*?)['"]\s*(?:,\s*['"]?\w+['"]?\s*:|\}$)"#,
    )
    .expect("valid regex")
});

const INDEX_KEYS: [&str; 4] = ["i", "index", "move_index", "moveIndex"];
const RATIONALE_KEYS: [&str; 4] = ["r", "rationale", "reason", "explanation"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAdvice {
    pub index: usize,
    /// May be empty.
    pub rationale: String,
}

/// Pull `{index, rationale}` out of a free-text reply.
pub fn parse_advice(raw: &str) -> Result<ParsedAdvice, AdviceError> {
    let Some(object) = extract_object(raw) else {
        return scrape_block(raw)
            .ok_or_else(|| AdviceError::MalformedResponse(format!("no JSON object in {raw:?}")));
    };

    let index = INDEX_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(as_index))
        .ok_or_else(|| AdviceError::MalformedResponse("missing move index".to_string()))?;

    let rationale = RATIONALE_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(ParsedAdvice { index, rationale })
}

/// First `{...}` block of `raw` as a JSON object, if any.
pub fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let block = cleaned_block(raw)?;
    let value = serde_json::from_str::<Value>(&block)
        .or_else(|_| serde_json::from_str::<Value>(&block.replace('\'', "\"")))
        .ok()?;
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn cleaned_block(raw: &str) -> Option<String> {
    let flat = raw.replace(['\r', '\n'], " ");
    let cleaned = CODE_FENCE.replace_all(&flat, "");
    first_brace_block(&cleaned).map(str::to_string)
}

/// Last resort for blocks that are not JSON under either quote style.
fn scrape_block(raw: &str) -> Option<ParsedAdvice> {
    let block = cleaned_block(raw)?;
    let index = LOOSE_INDEX
        .captures(&block)
        .and_then(|c| c[1].parse().ok())?;
    let rationale = LOOSE_RATIONALE
        .captures(&block)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();
    Some(ParsedAdvice { index, rationale })
}

/// Slice from the first `{` to its matching `}`. Braces inside strings are
/// not special-cased.
fn first_brace_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
