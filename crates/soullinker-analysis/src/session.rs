use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::errors::{ClientError, SessionFailure};
use crate::event::{StreamEvent, decode_line};
use crate::framer::frame_lines;
use crate::normalize::{NormalizedAnalysis, normalize};
use crate::progress::ProgressPolicy;
use crate::request::AnalysisRequest;
use crate::state::{ProgressSnapshot, SessionState};
use crate::transport::AnalysisTransport;

/// Events published by a running session, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// State after one decoded streaming event.
    Progress(ProgressSnapshot),
    /// Terminal success.
    Completed(NormalizedAnalysis),
    /// Terminal failure.
    Failed(SessionFailure),
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Callback surface for presentation code.
///
/// Exactly one of `on_complete` / `on_error` is called per session, after
/// every `on_progress`.
pub trait SessionObserver: Send {
    fn on_progress(&mut self, _snapshot: &ProgressSnapshot) {}
    fn on_complete(&mut self, _analysis: &NormalizedAnalysis) {}
    fn on_error(&mut self, _failure: &SessionFailure) {}
}

/// Handle used to cancel a running session.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation.
    ///
    /// The run task stops reading, drops the response stream and resolves
    /// with `SessionFailure::Cancelled`. No progress is published afterwards.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

pub(crate) struct SessionParams {
    pub transport: Arc<dyn AnalysisTransport>,
    pub request: AnalysisRequest,
    pub policy: ProgressPolicy,
    pub buffer: usize,
}

/// A running analysis job.
///
/// Use `next_event()` to consume events as they arrive, `drive()` to forward
/// them to a [`SessionObserver`], or `finish()` to wait for the result.
pub struct JobHandle {
    session_id: uuid::Uuid,
    target_id: u64,
    rx: mpsc::Receiver<SessionEvent>,
    final_rx: oneshot::Receiver<Result<NormalizedAnalysis, SessionFailure>>,
    cancel: CancelHandle,
    saw_terminal: bool,
}

impl JobHandle {
    pub(crate) fn spawn(params: SessionParams) -> Self {
        let (tx, rx) = mpsc::channel(params.buffer);
        let (final_tx, final_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let session_id = uuid::Uuid::new_v4();
        let target_id = params.request.target_id;

        tokio::spawn(run_session(session_id, params, tx, final_tx, cancel_rx));

        Self {
            session_id,
            target_id,
            rx,
            final_rx,
            cancel: CancelHandle {
                tx: Arc::new(cancel_tx),
            },
            saw_terminal: false,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn target_id(&self) -> u64 {
        self.target_id
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the next event. Returns `None` after the terminal event.
    ///
    /// Progress already buffered when `cancel()` was called is dropped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.saw_terminal {
            return None;
        }
        loop {
            let event = self.rx.recv().await?;
            if matches!(event, SessionEvent::Progress(_)) && self.cancel.is_cancelled() {
                continue;
            }
            if event.is_terminal() {
                self.saw_terminal = true;
            }
            return Some(event);
        }
    }

    /// Forwards every remaining event to `observer` and returns the result.
    pub async fn drive<O>(mut self, observer: &mut O) -> Result<NormalizedAnalysis, ClientError>
    where
        O: SessionObserver + ?Sized,
    {
        while let Some(event) = self.next_event().await {
            match &event {
                SessionEvent::Progress(snapshot) => observer.on_progress(snapshot),
                SessionEvent::Completed(analysis) => observer.on_complete(analysis),
                SessionEvent::Failed(failure) => observer.on_error(failure),
            }
        }
        self.finish().await
    }

    /// Drains the stream (if needed) and returns the terminal result.
    pub async fn finish(mut self) -> Result<NormalizedAnalysis, ClientError> {
        while self.next_event().await.is_some() {}
        match self.final_rx.await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::protocol_msg(format!(
                "session {} ended without a result (target={})",
                self.session_id, self.target_id
            ))),
        }
    }
}

enum Outcome {
    Completed(NormalizedAnalysis),
    Failed(SessionFailure),
    ReceiverGone,
}

async fn run_session(
    session_id: uuid::Uuid,
    params: SessionParams,
    tx: mpsc::Sender<SessionEvent>,
    final_tx: oneshot::Sender<Result<NormalizedAnalysis, SessionFailure>>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let target_id = params.request.target_id;
    info!(%session_id, target_id, scope = params.request.scope.label(), "analysis session started");

    let mut state = SessionState::new(params.policy.clone());
    let outcome = pump(session_id, &params, &mut state, &tx, &mut cancel_rx).await;

    match outcome {
        Outcome::Completed(analysis) => {
            info!(
                %session_id,
                target_id,
                generated_tokens = state.generated_tokens(),
                total_tokens = state.total_tokens(),
                "analysis session completed"
            );
            let _ = tx.send(SessionEvent::Completed(analysis.clone())).await;
            let _ = final_tx.send(Ok(analysis));
        }
        Outcome::Failed(failure) => {
            if state.is_cancelled() {
                info!(%session_id, target_id, stage = %state.stage(), "analysis session cancelled");
            } else {
                warn!(%session_id, target_id, stage = %state.stage(), error = %failure, "analysis session failed");
            }
            let _ = tx.send(SessionEvent::Failed(failure.clone())).await;
            let _ = final_tx.send(Err(failure));
        }
        Outcome::ReceiverGone => {
            debug!(%session_id, target_id, "session handle dropped; abandoning stream");
        }
    }
}

async fn pump(
    session_id: uuid::Uuid,
    params: &SessionParams,
    state: &mut SessionState,
    tx: &mpsc::Sender<SessionEvent>,
    cancel_rx: &mut watch::Receiver<bool>,
) -> Outcome {
    let chunks = tokio::select! {
        biased;
        _ = cancelled(cancel_rx) => return cancel_outcome(state),
        _ = tx.closed() => return Outcome::ReceiverGone,
        opened = params.transport.open(&params.request) => match opened {
            Ok(chunks) => chunks,
            Err(err) => return Outcome::Failed(err.into()),
        },
    };
    let mut lines = std::pin::pin!(frame_lines(chunks));

    loop {
        let next = tokio::select! {
            biased;
            _ = cancelled(cancel_rx) => return cancel_outcome(state),
            _ = tx.closed() => return Outcome::ReceiverGone,
            next = lines.next() => next,
        };
        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(err)) => return Outcome::Failed(err.into()),
            None => {
                return Outcome::Failed(SessionFailure::transport(
                    "stream ended before a terminal event",
                ));
            }
        };
        let Some(event) = decode_line(&line) else {
            continue;
        };
        debug!(%session_id, kind = event.kind(), "decoded stream event");

        match &event {
            StreamEvent::Unknown => continue,
            StreamEvent::Error { message } => {
                return Outcome::Failed(SessionFailure::upstream(message.clone()));
            }
            StreamEvent::Complete { .. }
            | StreamEvent::ContentUpdate { .. }
            | StreamEvent::TokenUpdate { .. } => {
                if *cancel_rx.borrow() {
                    state.cancel();
                }
                // Progress-bearing events only apply to a live session.
                let Some(snapshot) = state.apply(&event) else {
                    return cancel_outcome(state);
                };
                if !publish(tx, snapshot).await {
                    return Outcome::ReceiverGone;
                }
                if let StreamEvent::Complete { analysis, .. } = &event {
                    return Outcome::Completed(normalize(analysis));
                }
            }
        }
    }
}

fn cancel_outcome(state: &mut SessionState) -> Outcome {
    state.cancel();
    Outcome::Failed(SessionFailure::Cancelled)
}

async fn publish(tx: &mpsc::Sender<SessionEvent>, snapshot: ProgressSnapshot) -> bool {
    tx.send(SessionEvent::Progress(snapshot)).await.is_ok()
}

// Resolves once cancellation is requested; never resolves if every handle is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
