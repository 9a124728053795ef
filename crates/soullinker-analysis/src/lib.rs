//! Client for streamed contact-analysis jobs.
//!
//! The server answers an analysis request with newline-delimited JSON status
//! events. This crate frames and decodes that stream, turns it into a
//! monotonic progress estimate plus a three-step stage indicator, and
//! normalizes the result document attached to the final `complete` event.
//!
//! # Usage
//!
//! ```no_run
//! use soullinker_analysis::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = AnalysisClient::new(ClientConfig::new("http://127.0.0.1:5000"))?;
//!
//! let mut job = client.start(AnalysisRequest::items(42, [101, 102, 107]).api_key("my-key"))?;
//! while let Some(event) = job.next_event().await {
//!     if let SessionEvent::Progress(p) = event {
//!         println!("{:>3}% [{}] {}", p.rounded_percent(), p.stage, p.status_message);
//!     }
//! }
//! let analysis = job.finish().await?;
//! println!("{}", analysis.summary);
//! # Ok(())
//! # }
//! ```

/// Analysis client entry point and builder.
pub mod client;
/// Client configuration.
pub mod config;
/// Public error types.
pub mod errors;
/// Stream event types and line decoding.
pub mod event;
/// Newline framing over chunked bodies.
pub mod framer;
/// Result document normalization.
pub mod normalize;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Progress heuristics.
pub mod progress;
/// Request scope and body construction.
pub mod request;
/// Job session run task and handles.
pub mod session;
/// Stage state machine.
pub mod stage;
/// Per-session mutable state.
pub mod state;
/// Transport abstraction and HTTP implementation.
pub mod transport;

pub use client::{AnalysisClient, AnalysisClientBuilder};
pub use config::ClientConfig;
pub use errors::{ClientError, SessionFailure, TransportError};
pub use event::{StreamEvent, decode_line};
pub use framer::{LineFramer, frame_lines};
pub use normalize::{NormalizedAnalysis, STRUCTURED_FIELDS, decode_lenient, normalize};
pub use progress::{ProgressEstimator, ProgressPolicy};
pub use request::{AnalysisRequest, AnalysisScope};
pub use session::{CancelHandle, JobHandle, SessionEvent, SessionObserver};
pub use stage::{Stage, StageTracker};
pub use state::{ProgressSnapshot, SessionState};
pub use transport::{AnalysisTransport, ChunkStream, HttpTransport};
