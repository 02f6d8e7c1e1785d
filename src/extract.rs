//! Tolerant recovery of JSON arrays from generative-service output.
//!
//! Models do not reliably honor "respond with only JSON": the payload shows
//! up wrapped in code fences, preceded by commentary, with trailing commas,
//! or truncated mid-array. Recovery is an ordered list of pure
//! `&str -> Option<Vec<Value>>` strategies tried in sequence, each strictly
//! more permissive than the last. Total failure yields `None`; callers map
//! that to an empty collection and never surface a parse error.

use regex::Regex;
use serde_json::Value;

/// Removes markdown code-fence markers (```json, ```, etc.).
pub fn strip_code_fences(raw: &str) -> String {
    let fence = Regex::new(r"(?i)```[a-z]*\n?").unwrap();
    fence.replace_all(raw, "").trim().to_string()
}

/// Drops commas that directly precede a closing brace or bracket, the most
/// common malformation in model-emitted JSON.
pub fn sanitize_trailing_commas(raw: &str) -> String {
    let before_brace = Regex::new(r",\s*\}").unwrap();
    let before_bracket = Regex::new(r",\s*\]").unwrap();
    let cleaned = before_brace.replace_all(raw, "}");
    before_bracket.replace_all(&cleaned, "]").to_string()
}

/// Strategy 1: parse the whole (fence-stripped, trimmed) text as an array.
pub fn parse_direct(raw: &str) -> Option<Vec<Value>> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Strategy 2: locate the widest `[...]` span (greedy: first `[` to last
/// `]`), sanitize trailing commas, and parse that substring.
pub fn parse_array_span(raw: &str) -> Option<Vec<Value>> {
    let cleaned = strip_code_fences(raw);
    let span = Regex::new(r"\[[\s\S]*\]").unwrap();
    let candidate = span.find(&cleaned)?.as_str();
    match serde_json::from_str::<Value>(&sanitize_trailing_commas(candidate)) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Number of unmatched `{` and `[` in the text, counted naively (string
/// contents included, same as the closers the strategies append).
pub fn missing_closers(raw: &str) -> (usize, usize) {
    let open_curly = raw.matches('{').count();
    let close_curly = raw.matches('}').count();
    let open_square = raw.matches('[').count();
    let close_square = raw.matches(']').count();

    (
        open_curly.saturating_sub(close_curly),
        open_square.saturating_sub(close_square),
    )
}

/// Appends exactly the missing `}` / `]` characters (braces first, so a
/// truncated `[{...` closes as `...}]`).
pub fn balance_delimiters(raw: &str) -> String {
    let (braces, brackets) = missing_closers(raw);
    let mut candidate = raw.to_string();
    for _ in 0..braces {
        candidate.push('}');
    }
    for _ in 0..brackets {
        candidate.push(']');
    }
    candidate
}

/// Strategy 3: close unterminated braces/brackets on a truncated response,
/// then parse.
pub fn balance_and_parse(raw: &str) -> Option<Vec<Value>> {
    let cleaned = strip_code_fences(raw);
    let candidate = sanitize_trailing_commas(&balance_delimiters(&cleaned));
    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Strategy 4 (last resort): pull out every `{...}` substring and parse each
/// independently, keeping whichever objects survive.
pub fn salvage_objects(raw: &str) -> Option<Vec<Value>> {
    let cleaned = strip_code_fences(raw);
    let object = Regex::new(r"\{[\s\S]*?\}").unwrap();

    let salvaged: Vec<Value> = object
        .find_iter(&cleaned)
        .filter_map(|m| {
            serde_json::from_str::<Value>(&sanitize_trailing_commas(m.as_str())).ok()
        })
        .filter(|v| v.is_object())
        .collect();

    if salvaged.is_empty() {
        None
    } else {
        Some(salvaged)
    }
}

/// Runs the full recovery chain over a single response text.
///
/// The one-shot "return only JSON" retry request sits between strategies 2
/// and 3 and is orchestrated by the caller, since it needs another network
/// round-trip.
pub fn recover_json_array(raw: &str) -> Option<Vec<Value>> {
    parse_direct(raw)
        .or_else(|| parse_array_span(raw))
        .or_else(|| balance_and_parse(raw))
        .or_else(|| salvage_objects(raw))
}
