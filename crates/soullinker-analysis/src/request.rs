use std::collections::BTreeSet;

/// Which slice of a contact's history the server analyzes.
///
/// Both scopes speak the same stream protocol; they differ only in endpoint
/// path and request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisScope {
    /// The whole chat history of the target.
    WholeTarget,
    /// Only the listed chat items.
    Subset(BTreeSet<i64>),
}

impl AnalysisScope {
    /// An empty item set means the whole target.
    pub fn from_items(items: impl IntoIterator<Item = i64>) -> Self {
        let items: BTreeSet<i64> = items.into_iter().collect();
        if items.is_empty() {
            Self::WholeTarget
        } else {
            Self::Subset(items)
        }
    }

    pub fn endpoint_path(&self, target_id: u64) -> String {
        match self {
            Self::WholeTarget => format!("/api/contacts/{target_id}/analyze/stream"),
            Self::Subset(_) => format!("/api/contacts/{target_id}/analyze-selected/stream"),
        }
    }

    pub fn request_body(&self, api_key: Option<&str>) -> serde_json::Value {
        match self {
            Self::WholeTarget => serde_json::json!({ "api_key": api_key }),
            Self::Subset(items) => serde_json::json!({
                "message_ids": items,
                "api_key": api_key,
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::WholeTarget => "whole_target",
            Self::Subset(_) => "subset",
        }
    }
}

/// One analysis job to start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub target_id: u64,
    pub scope: AnalysisScope,
    /// Per-request credential forwarded to the server. Overrides the client's.
    pub api_key: Option<String>,
}

impl AnalysisRequest {
    /// Analyze everything recorded for the target.
    pub fn whole_target(target_id: u64) -> Self {
        Self {
            target_id,
            scope: AnalysisScope::WholeTarget,
            api_key: None,
        }
    }

    /// Analyze only the given items; an empty set falls back to the whole target.
    pub fn items(target_id: u64, items: impl IntoIterator<Item = i64>) -> Self {
        Self {
            target_id,
            scope: AnalysisScope::from_items(items),
            api_key: None,
        }
    }

    /// Sets the credential. Blank keys are treated as absent.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    pub fn endpoint_path(&self) -> String {
        self.scope.endpoint_path(self.target_id)
    }

    pub fn body(&self) -> serde_json::Value {
        self.scope.request_body(self.api_key.as_deref())
    }
}
