//! Structured-text extraction
//!
//! Models asked for JSON answer in several shapes:
//! 1. Raw JSON: the whole completion is the object
//! 2. Fenced JSON (with or without surrounding prose): ` ```json\n{...}\n``` `
//! 3. JSON embedded in prose: the first balanced `{...}` in the text
//!
//! `extract_json` tries each in order. When none of them deserialize into the
//! requested type the raw text is handed back untouched so the caller can
//! degrade instead of failing.

use serde::de::DeserializeOwned;

/// Result of extracting a typed value from model output
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    /// The text contained a value matching the schema
    Structured(T),

    /// No candidate matched; carries the original text verbatim
    RawFallback(String),
}

impl<T> Extracted<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, Extracted::Structured(_))
    }
}

/// Extract a `T` from free-form completion text
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Extracted<T> {
    let trimmed = text.trim();

    // Pattern 1: entire content
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Extracted::Structured(value);
    }

    // Pattern 2: markdown code fence
    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<T>(inner.trim()) {
            return Extracted::Structured(value);
        }
    }

    // Pattern 3: first balanced object in prose
    if let Some(pos) = trimmed.find('{') {
        if let Some(json_str) = extract_balanced_json(&trimmed[pos..]) {
            if let Ok(value) = serde_json::from_str::<T>(json_str) {
                return Extracted::Structured(value);
            }
        }
    }

    tracing::debug!(
        "No structured payload found in {} chars of model output",
        text.len()
    );
    Extracted::RawFallback(text.to_string())
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Score {
        score: f64,
    }

    #[test]
    fn test_plain_json() {
        let out: Extracted<Score> = extract_json(r#"{"score": 0.8}"#);
        assert_eq!(out, Extracted::Structured(Score { score: 0.8 }));
    }

    #[test]
    fn test_fenced_json_with_trailing_prose() {
        let text = "Here is the evaluation:\n```json\n{\"score\": 0.6}\n```\nLet me know.";
        let out: Extracted<Score> = extract_json(text);
        assert_eq!(out, Extracted::Structured(Score { score: 0.6 }));
    }

    #[test]
    fn test_embedded_object_with_braces_in_strings() {
        let text = r#"Result => {"score": 0.4, "note": "use {N,P,K}"} done"#;
        #[derive(Debug, Deserialize)]
        struct Noted {
            score: f64,
            #[allow(dead_code)]
            note: String,
        }
        match extract_json::<Noted>(text) {
            Extracted::Structured(n) => assert_eq!(n.score, 0.4),
            other => panic!("expected structured, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_returns_raw_text() {
        let text = "Plant early and water often.";
        let out: Extracted<Score> = extract_json(text);
        assert_eq!(out, Extracted::RawFallback(text.to_string()));
        assert!(!out.is_structured());
    }

    #[test]
    fn test_schema_mismatch_is_fallback() {
        let out: Extracted<Score> = extract_json(r#"{"grade": "A"}"#);
        assert!(matches!(out, Extracted::RawFallback(_)));
    }
}
