use crate::event::StreamEvent;
use crate::stage::Stage;

/// Heuristic constants behind the displayed percentage and the stage switch.
///
/// `Default` keeps the values the server's jobs were tuned against: typical
/// runs reach the ceiling shortly before the terminal event arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressPolicy {
    /// Percentage shown as soon as the first streaming event arrives.
    pub floor: f64,
    /// Upper bound before `Complete`.
    pub ceiling: f64,
    /// Percentage points distributed over one unit of scaled output.
    pub span: f64,
    /// Characters of generated content counted as one unit.
    pub content_scale: f64,
    /// Completion tokens counted as one unit.
    pub token_scale: f64,
    /// `content_length` above which the job is considered finalizing.
    pub finalizing_content_length: u64,
    /// `completion_tokens` above which the job is considered finalizing.
    pub finalizing_completion_tokens: u64,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            floor: 20.0,
            ceiling: 95.0,
            span: 75.0,
            content_scale: 100.0,
            token_scale: 2000.0,
            finalizing_content_length: 50,
            finalizing_completion_tokens: 500,
        }
    }
}

impl ProgressPolicy {
    /// Raw percentage suggested by a single event, before monotonic clamping.
    ///
    /// `None` for events that never move the bar (`Error`, `Unknown`).
    pub fn target(&self, event: &StreamEvent) -> Option<f64> {
        match event {
            StreamEvent::ContentUpdate { content_length, .. } => {
                Some(self.scaled(*content_length, self.content_scale))
            }
            StreamEvent::TokenUpdate {
                completion_tokens, ..
            } => Some(self.scaled(*completion_tokens, self.token_scale)),
            StreamEvent::Complete { .. } => Some(100.0),
            StreamEvent::Error { .. } | StreamEvent::Unknown => None,
        }
    }

    fn scaled(&self, amount: u64, scale: f64) -> f64 {
        let raw = self.floor + amount as f64 * self.span / scale;
        raw.min(self.ceiling)
    }
}

/// Next displayed percentage given the previous one. Never decreases.
pub fn estimate(policy: &ProgressPolicy, previous: f64, event: &StreamEvent) -> f64 {
    match policy.target(event) {
        Some(target) if target > previous => target,
        _ => previous,
    }
}

/// Stateful wrapper around [`estimate`] for one session.
#[derive(Clone, Debug)]
pub struct ProgressEstimator {
    policy: ProgressPolicy,
    percent: f64,
    complete: bool,
}

impl ProgressEstimator {
    pub fn new(policy: ProgressPolicy) -> Self {
        Self {
            policy,
            percent: 0.0,
            complete: false,
        }
    }

    /// Feeds one event and returns the percentage to display.
    pub fn observe(&mut self, event: &StreamEvent) -> f64 {
        if self.complete {
            return self.percent;
        }
        self.percent = estimate(&self.policy, self.percent, event);
        if matches!(event, StreamEvent::Complete { .. }) {
            self.complete = true;
        }
        self.percent
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Percentage rounded for an `NN%` label.
    pub fn rounded_percent(&self) -> u8 {
        self.percent.round().clamp(0.0, 100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn policy(&self) -> &ProgressPolicy {
        &self.policy
    }

    /// Human-readable status line for the current position.
    pub fn status_message(&self, stage: Stage) -> &'static str {
        if self.complete {
            return "Analysis complete";
        }
        match stage {
            Stage::Connecting => "Connecting to the analysis service...",
            Stage::Analyzing => "Analyzing chat history...",
            Stage::Finalizing => "Composing the profile...",
        }
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(ProgressPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn content(len: u64) -> StreamEvent {
        StreamEvent::ContentUpdate {
            content_length: len,
            total_tokens: 0,
            completion_tokens: 0,
        }
    }

    fn tokens(completion: u64) -> StreamEvent {
        StreamEvent::TokenUpdate {
            total_tokens: 0,
            completion_tokens: completion,
        }
    }

    fn complete() -> StreamEvent {
        StreamEvent::Complete {
            completion_tokens: 0,
            total_tokens: 0,
            message_count: 0,
            analysis: Value::Null,
        }
    }

    #[test]
    fn content_update_formula() {
        let policy = ProgressPolicy::default();
        assert_eq!(policy.target(&content(0)), Some(20.0));
        assert_eq!(policy.target(&content(40)), Some(50.0));
        assert_eq!(policy.target(&content(100)), Some(95.0));
        assert_eq!(policy.target(&content(10_000)), Some(95.0));
    }

    #[test]
    fn token_update_formula() {
        let policy = ProgressPolicy::default();
        assert_eq!(policy.target(&tokens(100)), Some(23.75));
        assert_eq!(policy.target(&tokens(1000)), Some(57.5));
        assert_eq!(policy.target(&tokens(5000)), Some(95.0));
    }

    #[test]
    fn error_and_unknown_do_not_move_the_bar() {
        let policy = ProgressPolicy::default();
        let error = StreamEvent::Error {
            message: "boom".into(),
        };
        assert_eq!(policy.target(&error), None);
        assert_eq!(estimate(&policy, 42.0, &error), 42.0);
        assert_eq!(estimate(&policy, 42.0, &StreamEvent::Unknown), 42.0);
    }

    #[test]
    fn never_decreases_and_caps_before_complete() {
        let mut estimator = ProgressEstimator::default();
        let events = [
            tokens(1800),
            content(10),
            tokens(50),
            content(80),
            tokens(9000),
            content(1),
        ];
        let mut last = 0.0;
        for event in &events {
            let percent = estimator.observe(event);
            assert!(percent >= last, "{percent} < {last}");
            assert!(percent <= 95.0);
            last = percent;
        }
        assert_eq!(estimator.observe(&complete()), 100.0);
        assert_eq!(estimator.observe(&tokens(1)), 100.0);
        assert!(estimator.is_complete());
    }

    #[test]
    fn rounded_percent_for_labels() {
        let mut estimator = ProgressEstimator::default();
        estimator.observe(&tokens(100));
        assert_eq!(estimator.rounded_percent(), 24);
    }

    #[test]
    fn status_message_tracks_stage_and_completion() {
        let mut estimator = ProgressEstimator::default();
        assert_eq!(
            estimator.status_message(Stage::Connecting),
            "Connecting to the analysis service..."
        );
        assert_eq!(
            estimator.status_message(Stage::Analyzing),
            "Analyzing chat history..."
        );
        estimator.observe(&complete());
        assert_eq!(estimator.status_message(Stage::Finalizing), "Analysis complete");
    }
}
