//! Classification reply parsing
//!
//! The classification endpoint is asked for a JSON object but models
//! wrap it in prose, code fences, or both. The parser takes the span
//! from the first `{` to the last `}` and decodes it; anything that
//! does not yield both fields as strings counts as a parse failure.

use serde::Deserialize;

use crate::models::Classification;

/// The decode target for a reply span
///
/// Both fields are required strings; unknown keys are ignored.
#[derive(Deserialize)]
struct RawPair {
    priority: String,
    category: String,
}

/// Extract a `{priority, category}` object from model output
///
/// Returns `None` when no brace-delimited span exists or the span does
/// not decode to an object with both fields as strings. The caller maps
/// `None` to its parse-failure sentinel pair.
pub fn extract_classification(content: &str) -> Option<Classification> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    let span = &content[start..=end];

    let pair: RawPair = serde_json::from_str(span).ok()?;
    Some(Classification {
        priority: Some(pair.priority),
        category: Some(pair.category),
    })
}

#[cfg(test)]
mod tests {
    use super::extract_classification;

    #[test]
    fn parses_bare_object() {
        let reply = r#"{"priority": "important", "category": "work"}"#;
        let pair = extract_classification(reply).expect("object parses");
        assert_eq!(pair.priority.as_deref(), Some("important"));
        assert_eq!(pair.category.as_deref(), Some("work"));
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let reply = concat!(
            "Sure! Based on the content, here is the classification:\n",
            r#"{"priority": "not important", "category": "newsletter"}"#,
            "\nLet me know if you need anything else."
        );
        let pair = extract_classification(reply).expect("object parses");
        assert_eq!(pair.priority.as_deref(), Some("not important"));
        assert_eq!(pair.category.as_deref(), Some("newsletter"));
    }

    #[test]
    fn parses_object_inside_code_fence() {
        let reply = "```json\n{\"priority\": \"important\", \"category\": \"finance\"}\n```";
        let pair = extract_classification(reply).expect("object parses");
        assert_eq!(pair.category.as_deref(), Some("finance"));
    }

    #[test]
    fn ignores_extra_keys() {
        let reply = r#"{"priority": "important", "category": "work", "confidence": 0.9}"#;
        assert!(extract_classification(reply).is_some());
    }

    #[test]
    fn rejects_reply_without_braces() {
        assert!(extract_classification("priority: important, category: work").is_none());
        assert!(extract_classification("").is_none());
    }

    #[test]
    fn rejects_reversed_braces() {
        assert!(extract_classification("} nothing here {").is_none());
    }

    #[test]
    fn rejects_malformed_span() {
        assert!(extract_classification(r#"{"priority": "important", "#).is_none());
        assert!(extract_classification("{not json}").is_none());
    }

    #[test]
    fn rejects_missing_or_non_string_fields() {
        assert!(extract_classification(r#"{"priority": "important"}"#).is_none());
        assert!(extract_classification(r#"{"priority": 1, "category": "work"}"#).is_none());
        assert!(extract_classification(r#"{"priority": null, "category": "work"}"#).is_none());
    }

    #[test]
    fn outer_span_must_itself_decode() {
        // A prose brace before the object widens the span past valid JSON.
        let reply = r#"note {this} then {"priority": "important", "category": "work"}"#;
        assert!(extract_classification(reply).is_none());

        let nested = r#"{"result": {"priority": "important", "category": "work"}}"#;
        assert!(extract_classification(nested).is_none());
    }
}
