use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref REASONING: Regex =
        Regex::new(r"(?s)REASONING:\s*(.*?)\s*(?:PREFERENCES:|\z)").expect("valid regex");
    static ref PREFERENCES: Regex =
        Regex::new(r"(?s)PREFERENCES:\s*(\{[^}]*\})").expect("valid regex");
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex");
}

/// What could be salvaged from a model answer.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedAnswer {
    pub reasoning: Option<String>,
    pub preferences: Option<Value>,
}

/// Accepts `{"reasoning", "preferences"}` JSON (optionally fenced), a bare
/// preferences object, or the `REASONING: ... PREFERENCES: {...}` layout.
pub fn parse_answer(raw: &str) -> ParsedAnswer {
    let text = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str())
        .trim();

    if let Some(parsed) = parse_json_answer(text) {
        return parsed;
    }

    let reasoning = REASONING
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    let preferences = PREFERENCES
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(Value::is_object)
        .or_else(|| embedded_object(text));

    ParsedAnswer {
        reasoning,
        preferences,
    }
}

fn parse_json_answer(text: &str) -> Option<ParsedAnswer> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let preferences = match object.get("preferences") {
        Some(prefs) if prefs.is_object() => Some(prefs.clone()),
        Some(_) => None,
        None if object.keys().any(|k| k != "reasoning") => Some(value.clone()),
        None => None,
    };

    Some(ParsedAnswer {
        reasoning,
        preferences,
    })
}

/// Last resort: the outermost `{...}` span in free text.
fn embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    match value.get("preferences") {
        Some(prefs) if prefs.is_object() => Some(prefs.clone()),
        _ => value.is_object().then_some(value),
    }
}
