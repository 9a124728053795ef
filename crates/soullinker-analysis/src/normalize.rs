//! Canonical shape for the result document attached to `complete`.
//!
//! The producing service stores the structured sections as JSON text and
//! sometimes forwards them as native values, so each section may arrive either
//! way. Decoding is per field and never fails the whole document.

use serde_json::{Map, Value};

/// Sections that may arrive as JSON-encoded text.
pub const STRUCTURED_FIELDS: [&str; 8] = [
    "core_traits",
    "behavior_preferences",
    "social_interaction",
    "cognitive_thinking",
    "interests",
    "dos_and_donts",
    "topic_suggestions",
    "gift_suggestions",
];

const SUMMARY_FIELD: &str = "summary";

/// Result document with every decodable section in structured form.
///
/// A section that could not be decoded keeps its original text. Fields the
/// normalizer does not know about are carried in `extra` untouched.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct NormalizedAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_traits: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_preferences: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_interaction: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognitive_thinking: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dos_and_donts: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_suggestions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_suggestions: Option<Value>,
    pub summary: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedAnalysis {
    /// Looks up one of [`STRUCTURED_FIELDS`] by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match field {
            "core_traits" => self.core_traits.as_ref(),
            "behavior_preferences" => self.behavior_preferences.as_ref(),
            "social_interaction" => self.social_interaction.as_ref(),
            "cognitive_thinking" => self.cognitive_thinking.as_ref(),
            "interests" => self.interests.as_ref(),
            "dos_and_donts" => self.dos_and_donts.as_ref(),
            "topic_suggestions" => self.topic_suggestions.as_ref(),
            "gift_suggestions" => self.gift_suggestions.as_ref(),
            _ => None,
        }
    }

    fn slot(&mut self, field: &str) -> Option<&mut Option<Value>> {
        match field {
            "core_traits" => Some(&mut self.core_traits),
            "behavior_preferences" => Some(&mut self.behavior_preferences),
            "social_interaction" => Some(&mut self.social_interaction),
            "cognitive_thinking" => Some(&mut self.cognitive_thinking),
            "interests" => Some(&mut self.interests),
            "dos_and_donts" => Some(&mut self.dos_and_donts),
            "topic_suggestions" => Some(&mut self.topic_suggestions),
            "gift_suggestions" => Some(&mut self.gift_suggestions),
            _ => None,
        }
    }

    /// Names of sections that are still raw text after normalization.
    pub fn undecoded_fields(&self) -> Vec<&'static str> {
        STRUCTURED_FIELDS
            .into_iter()
            .filter(|field| matches!(self.get(field), Some(Value::String(_))))
            .collect()
    }

    /// Re-serializes into the document shape [`normalize`] accepts.
    pub fn to_document(&self) -> Value {
        let mut doc = self.extra.clone();
        for field in STRUCTURED_FIELDS {
            if let Some(value) = self.get(field) {
                doc.insert(field.to_string(), value.clone());
            }
        }
        doc.insert(SUMMARY_FIELD.to_string(), Value::String(self.summary.clone()));
        Value::Object(doc)
    }
}

/// Decodes JSON text into an object or array, keeping the input otherwise.
///
/// Only textual values are decoded, and only a structured result is
/// accepted: text that parses to a scalar stays text, which keeps repeated
/// application stable.
pub fn decode_lenient(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(decoded @ (Value::Object(_) | Value::Array(_))) => decoded,
        _ => Value::String(text),
    }
}

/// Normalizes a raw result document. Never fails.
pub fn normalize(doc: &Value) -> NormalizedAnalysis {
    let fields = match decode_lenient(doc.clone()) {
        Value::Object(map) => map,
        other => {
            if !other.is_null() {
                tracing::debug!(kind = json_kind(&other), "analysis document is not an object");
            }
            Map::new()
        }
    };

    let mut out = NormalizedAnalysis::default();
    for (key, value) in fields {
        if key == SUMMARY_FIELD {
            out.summary = summary_text(value);
            continue;
        }
        let Some(slot) = out.slot(&key) else {
            out.extra.insert(key, value);
            continue;
        };
        if is_blank(&value) {
            continue;
        }
        let decoded = decode_lenient(value);
        if decoded.is_string() {
            tracing::debug!(field = %key, "section kept as text");
        }
        *slot = Some(decoded);
    }
    out
}

// Stored sections default to empty text; treat that like a missing section.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn summary_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_textual_sections() {
        let doc = json!({
            "summary": "ok",
            "interests": "[\"music\"]",
            "core_traits": "{\"openness\": \"high\"}",
        });
        let normalized = normalize(&doc);
        assert_eq!(normalized.interests, Some(json!(["music"])));
        assert_eq!(normalized.core_traits, Some(json!({"openness": "high"})));
        assert_eq!(normalized.summary, "ok");
        assert!(normalized.undecoded_fields().is_empty());
    }

    #[test]
    fn structured_sections_pass_through() {
        let doc = json!({
            "dos_and_donts": {"dos": ["listen"], "donts": ["interrupt"]},
            "gift_suggestions": [{"name": "book"}],
        });
        let normalized = normalize(&doc);
        assert_eq!(
            normalized.dos_and_donts,
            Some(json!({"dos": ["listen"], "donts": ["interrupt"]}))
        );
        assert_eq!(normalized.gift_suggestions, Some(json!([{"name": "book"}])));
    }

    #[test]
    fn undecodable_text_is_kept() {
        let doc = json!({
            "topic_suggestions": "travel, food",
            "behavior_preferences": "{broken",
            "social_interaction": "42",
        });
        let normalized = normalize(&doc);
        assert_eq!(normalized.topic_suggestions, Some(json!("travel, food")));
        assert_eq!(normalized.behavior_preferences, Some(json!("{broken")));
        assert_eq!(normalized.social_interaction, Some(json!("42")));
        assert_eq!(
            normalized.undecoded_fields(),
            vec!["behavior_preferences", "social_interaction", "topic_suggestions"]
        );
    }

    #[test]
    fn absent_fields_and_summary_default() {
        let normalized = normalize(&json!({"interests": null}));
        assert_eq!(normalized, NormalizedAnalysis::default());
        assert_eq!(normalized.summary, "");
        assert_eq!(normalize(&Value::Null), NormalizedAnalysis::default());
        assert_eq!(normalize(&json!([1, 2])), NormalizedAnalysis::default());
    }

    #[test]
    fn blank_text_sections_are_absent() {
        let normalized = normalize(&json!({
            "summary": "s",
            "interests": "",
            "gift_suggestions": "   ",
        }));
        assert_eq!(normalized.interests, None);
        assert_eq!(normalized.gift_suggestions, None);
        assert!(normalized.undecoded_fields().is_empty());
        let value = serde_json::to_value(&normalized).expect("serialize");
        assert_eq!(value, json!({"summary": "s"}));
    }

    #[test]
    fn non_text_summary_is_rendered() {
        let normalized = normalize(&json!({"summary": 7}));
        assert_eq!(normalized.summary, "7");
    }

    #[test]
    fn unknown_fields_are_carried_in_extra() {
        let doc = json!({"id": 3, "contact_id": 9, "updated_at": "2024-05-01T10:00:00"});
        let normalized = normalize(&doc);
        assert_eq!(normalized.extra.get("contact_id"), Some(&json!(9)));
        assert_eq!(normalized.to_document()["updated_at"], json!("2024-05-01T10:00:00"));
    }

    #[test]
    fn whole_document_may_arrive_as_text() {
        let doc = Value::String(r#"{"summary":"s","interests":"[\"art\"]"}"#.into());
        let normalized = normalize(&doc);
        assert_eq!(normalized.summary, "s");
        assert_eq!(normalized.interests, Some(json!(["art"])));
    }

    #[test]
    fn normalize_is_idempotent() {
        let docs = [
            json!({
                "summary": "ok",
                "interests": "[\"music\"]",
                "core_traits": {"a": 1},
                "topic_suggestions": "not json",
                "gift_suggestions": "\"[1]\"",
                "cognitive_thinking": "  {\"style\": \"analytic\"}  ",
                "raw_response": "{\"x\":1}",
                "id": 1,
            }),
            json!({}),
            json!({"summary": null, "dos_and_donts": "[]"}),
            json!({"summary": "", "interests": "", "core_traits": " "}),
        ];
        for doc in docs {
            let once = normalize(&doc);
            let twice = normalize(&once.to_document());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn serializes_without_absent_sections() {
        let normalized = normalize(&json!({"summary": "hi", "interests": "[\"go\"]", "id": 5}));
        let value = serde_json::to_value(&normalized).expect("serialize");
        assert_eq!(value, json!({"summary": "hi", "interests": ["go"], "id": 5}));
    }
}
