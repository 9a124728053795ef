use crate::event::StreamEvent;
use crate::progress::{ProgressEstimator, ProgressPolicy};
use crate::stage::{Stage, StageTracker};

/// What the progress callback receives after each decoded event.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ProgressSnapshot {
    pub progress_percent: f64,
    pub stage: Stage,
    pub generated_tokens: u64,
    pub total_tokens: u64,
    pub status_message: String,
}

impl ProgressSnapshot {
    /// Percentage rounded for an `NN%` label.
    pub fn rounded_percent(&self) -> u8 {
        self.progress_percent.round().clamp(0.0, 100.0) as u8
    }
}

/// Mutable state of one job session.
///
/// Owned by the session's run task; callers only ever see snapshots.
#[derive(Clone, Debug)]
pub struct SessionState {
    progress: ProgressEstimator,
    tracker: StageTracker,
    cancelled: bool,
    generated_tokens: u64,
    total_tokens: u64,
}

impl SessionState {
    pub fn new(policy: ProgressPolicy) -> Self {
        Self {
            progress: ProgressEstimator::new(policy),
            tracker: StageTracker::new(),
            cancelled: false,
            generated_tokens: 0,
            total_tokens: 0,
        }
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress.percent()
    }

    pub fn stage(&self) -> Stage {
        self.tracker.stage()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn generated_tokens(&self) -> u64 {
        self.generated_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Applies a decoded event and returns the snapshot to publish.
    ///
    /// Returns `None` once cancelled, and for events that carry no progress
    /// (`Error`, `Unknown`).
    pub fn apply(&mut self, event: &StreamEvent) -> Option<ProgressSnapshot> {
        if self.cancelled {
            return None;
        }
        match event {
            StreamEvent::ContentUpdate {
                total_tokens,
                completion_tokens,
                ..
            }
            | StreamEvent::TokenUpdate {
                total_tokens,
                completion_tokens,
            }
            | StreamEvent::Complete {
                total_tokens,
                completion_tokens,
                ..
            } => {
                self.generated_tokens = *completion_tokens;
                self.total_tokens = *total_tokens;
            }
            StreamEvent::Error { .. } | StreamEvent::Unknown => return None,
        }
        self.progress.observe(event);
        self.tracker.observe(self.progress.policy(), event);
        Some(self.snapshot())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            progress_percent: self.progress.percent(),
            stage: self.tracker.stage(),
            generated_tokens: self.generated_tokens,
            total_tokens: self.total_tokens,
            status_message: self.progress.status_message(self.tracker.stage()).to_string(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ProgressPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let state = SessionState::default();
        assert_eq!(state.progress_percent(), 0.0);
        assert_eq!(state.stage(), Stage::Connecting);
        assert!(!state.is_cancelled());
        assert_eq!((state.generated_tokens(), state.total_tokens()), (0, 0));
    }

    #[test]
    fn content_update_takes_token_counters() {
        let mut state = SessionState::default();
        let snapshot = state
            .apply(&StreamEvent::ContentUpdate {
                content_length: 60,
                total_tokens: 1200,
                completion_tokens: 80,
            })
            .expect("snapshot");
        assert_eq!(snapshot.progress_percent, 65.0);
        assert_eq!(snapshot.stage, Stage::Finalizing);
        assert_eq!(snapshot.generated_tokens, 80);
        assert_eq!(snapshot.total_tokens, 1200);
        assert_eq!(snapshot.status_message, "Composing the profile...");
    }

    #[test]
    fn error_and_unknown_publish_nothing() {
        let mut state = SessionState::default();
        assert!(state.apply(&StreamEvent::Unknown).is_none());
        assert!(
            state
                .apply(&StreamEvent::Error {
                    message: "x".into()
                })
                .is_none()
        );
        assert_eq!(state.stage(), Stage::Connecting);
    }

    #[test]
    fn cancelled_state_stops_mutating() {
        let mut state = SessionState::default();
        state.cancel();
        let event = StreamEvent::TokenUpdate {
            total_tokens: 10,
            completion_tokens: 900,
        };
        assert!(state.apply(&event).is_none());
        assert_eq!(state.progress_percent(), 0.0);
        assert_eq!(state.generated_tokens(), 0);
    }
}
