use crate::event::StreamEvent;
use crate::progress::ProgressPolicy;

/// Coarse phase of a job as shown by the three step indicators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Connecting,
    Analyzing,
    Finalizing,
}

impl Stage {
    /// Which of the three step checkmarks are filled.
    pub fn checkmarks(self) -> [bool; 3] {
        let filled = self.step();
        [filled >= 1, filled >= 2, filled >= 3]
    }

    /// One-based step number.
    pub fn step(self) -> u8 {
        match self {
            Self::Connecting => 1,
            Self::Analyzing => 2,
            Self::Finalizing => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Analyzing => "analyzing",
            Self::Finalizing => "finalizing",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage a single event points at, or `None` when it says nothing about
/// the stage (`Error`, `Unknown`).
pub fn stage_for(policy: &ProgressPolicy, event: &StreamEvent) -> Option<Stage> {
    match event {
        StreamEvent::ContentUpdate { content_length, .. } => {
            Some(if *content_length > policy.finalizing_content_length {
                Stage::Finalizing
            } else {
                Stage::Analyzing
            })
        }
        StreamEvent::TokenUpdate {
            completion_tokens, ..
        } => Some(if *completion_tokens > policy.finalizing_completion_tokens {
            Stage::Finalizing
        } else {
            Stage::Analyzing
        }),
        StreamEvent::Complete { .. } => Some(Stage::Finalizing),
        StreamEvent::Error { .. } | StreamEvent::Unknown => None,
    }
}

/// One-directional Connecting -> Analyzing -> Finalizing state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Advances on the event. Stages never regress.
    pub fn observe(&mut self, policy: &ProgressPolicy, event: &StreamEvent) -> Stage {
        if let Some(next) = stage_for(policy, event) {
            self.stage = self.stage.max(next);
        }
        self.stage
    }
}
