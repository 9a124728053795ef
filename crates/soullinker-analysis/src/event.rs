use serde_json::Value;

/// One decoded line of the analysis stream.
///
/// Exactly one `Complete` or `Error` ends a session; any number of
/// `ContentUpdate`/`TokenUpdate` events come first.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Length of the generated text so far. Token counters are optional on
    /// the wire and default to `0`.
    ContentUpdate {
        content_length: u64,
        total_tokens: u64,
        completion_tokens: u64,
    },
    /// Token accounting from the model provider.
    TokenUpdate {
        total_tokens: u64,
        completion_tokens: u64,
    },
    /// Terminal failure reported by the server.
    Error { message: String },
    /// Terminal success carrying the raw result document.
    Complete {
        completion_tokens: u64,
        total_tokens: u64,
        message_count: u64,
        analysis: Value,
    },
    /// Any other or missing `type`. Never an error.
    Unknown,
}

impl StreamEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Complete { .. })
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContentUpdate { .. } => "content_update",
            Self::TokenUpdate { .. } => "token_update",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
            Self::Unknown => "unknown",
        }
    }
}

/// Decodes one framed line.
///
/// Blank lines and lines that are not valid JSON yield `None`: keep-alive
/// padding and stray diagnostics share the channel and are dropped here.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(value) => Some(classify(&value)),
        Err(err) => {
            tracing::debug!(error = %err, len = line.len(), "skipping undecodable frame");
            None
        }
    }
}

/// Classifies an already parsed envelope by its `type` field.
pub fn classify(value: &Value) -> StreamEvent {
    let Some(event_type) = value.get("type").and_then(Value::as_str) else {
        return StreamEvent::Unknown;
    };
    match event_type {
        "content_update" => StreamEvent::ContentUpdate {
            content_length: uint_field(value, "content_length"),
            total_tokens: uint_field(value, "total_tokens"),
            completion_tokens: uint_field(value, "completion_tokens"),
        },
        "token_update" => StreamEvent::TokenUpdate {
            total_tokens: uint_field(value, "total_tokens"),
            completion_tokens: uint_field(value, "completion_tokens"),
        },
        "error" => StreamEvent::Error {
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        "complete" => StreamEvent::Complete {
            completion_tokens: uint_field(value, "completion_tokens"),
            total_tokens: uint_field(value, "total_tokens"),
            message_count: uint_field(value, "message_count"),
            analysis: value.get("analysis").cloned().unwrap_or(Value::Null),
        },
        _ => StreamEvent::Unknown,
    }
}

// Missing, null, negative or non-numeric values read as 0; fractional values truncate.
fn uint_field(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}
