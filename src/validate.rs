//! Structural validation of candidate template data.

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::templates::TemplateSet;

/// True when `candidate` is a non-empty object whose values are all arrays
/// of strings. Categories with zero messages are accepted.
pub fn validate(candidate: &Value) -> bool {
    check(candidate).is_ok()
}

/// Same rules as [`validate`], reporting the first violation.
pub(crate) fn check(candidate: &Value) -> std::result::Result<(), String> {
    let Some(map) = candidate.as_object() else {
        return Err("expected an object of category arrays".to_string());
    };
    if map.is_empty() {
        return Err("at least one category is required".to_string());
    }
    for (name, value) in map {
        let Some(messages) = value.as_array() else {
            return Err(format!("category \"{name}\" must be an array"));
        };
        if let Some(pos) = messages.iter().position(|m| !m.is_string()) {
            return Err(format!("category \"{name}\" has a non-string message at index {pos}"));
        }
    }
    Ok(())
}

impl TryFrom<&Value> for TemplateSet {
    type Error = StoreError;

    fn try_from(value: &Value) -> Result<Self> {
        check(value).map_err(StoreError::Validation)?;
        serde_json::from_value(value.clone()).map_err(|e| StoreError::Validation(e.to_string()))
    }
}

impl TryFrom<Value> for TemplateSet {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self> {
        check(&value).map_err(StoreError::Validation)?;
        serde_json::from_value(value).map_err(|e| StoreError::Validation(e.to_string()))
    }
}

/// Parse text typed into the JSON editor. Blank or malformed text is a
/// [`StoreError::Parse`]; well-formed JSON with the wrong shape is a
/// [`StoreError::Validation`].
pub fn parse_template_json(text: &str) -> Result<TemplateSet> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::Parse("no data".to_string()));
    }
    let value: Value = serde_json::from_str(text).map_err(|e| StoreError::Parse(e.to_string()))?;
    TemplateSet::try_from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_sets() {
        assert!(validate(&json!({"greeting": ["Hello there", "Hi, welcome"], "closing": ["Goodbye"]})));
        assert!(validate(&json!({"editing": []})));
    }

    #[test]
    fn rejects_empty_object() {
        assert!(!validate(&json!({})));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(!validate(&json!(null)));
        assert!(!validate(&json!([["a"]])));
        assert!(!validate(&json!("greeting")));
        assert!(!validate(&json!(42)));
    }

    #[test]
    fn rejects_scalar_values() {
        assert!(!validate(&json!({"greeting": "Hello"})));
        assert!(!validate(&json!({"ok": ["a"], "bad": {"nested": ["b"]}})));
    }

    #[test]
    fn rejects_non_string_elements() {
        assert!(!validate(&json!({"greeting": ["Hello", null]})));
        assert!(!validate(&json!({"greeting": [1]})));
        assert!(!validate(&json!({"greeting": [{"text": "Hello"}]})));
    }

    #[test]
    fn check_reports_offending_category() {
        let err = check(&json!({"ok": ["a"], "bad": ["b", 3]})).unwrap_err();
        assert!(err.contains("\"bad\""));
        assert!(err.contains("index 1"));
    }

    #[test]
    fn try_from_keeps_key_order() {
        let value: Value = serde_json::from_str(r#"{"b":["1"],"a":["2"]}"#).unwrap();
        let set = TemplateSet::try_from(&value).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn try_from_rejects_invalid_shape() {
        let err = TemplateSet::try_from(json!({})).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn parse_distinguishes_syntax_from_shape() {
        assert!(matches!(parse_template_json("   "), Err(StoreError::Parse(_))));
        assert!(matches!(parse_template_json("{not json"), Err(StoreError::Parse(_))));
        assert!(matches!(parse_template_json(r#"{"a": "b"}"#), Err(StoreError::Validation(_))));

        let set = parse_template_json(r#"  {"greeting": ["Hi"]}  "#).unwrap();
        assert_eq!(set.get("greeting").unwrap(), ["Hi".to_string()]);
    }
}
