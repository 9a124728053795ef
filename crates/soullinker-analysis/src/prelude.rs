//! Common imports for typical client usage.
pub use crate::{
    AnalysisClient, AnalysisRequest, CancelHandle, ClientConfig, ClientError, JobHandle,
    NormalizedAnalysis, ProgressSnapshot, SessionEvent, SessionFailure, SessionObserver, Stage,
};
