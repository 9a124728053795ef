/// Message shown to users when the stream fails below the protocol level.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "the analysis stream was interrupted, please retry";

/// Errors raised while opening or reading the analysis stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection was refused.
    #[error("request failed: {0}")]
    Request(String),
    /// The server answered with a non-success status.
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Reading the response body failed mid-stream.
    #[error("stream read failed: {0}")]
    Read(String),
}

impl TransportError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read(message.into())
    }
}

/// Terminal failure of one job session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionFailure {
    /// The server sent an `error` event; `message` is passed through verbatim.
    #[error("analysis failed: {message}")]
    Upstream { message: String },
    /// The stream failed to open or ended before a terminal event.
    #[error("transport failure: {detail}")]
    Transport { detail: String },
    /// The caller cancelled the session.
    #[error("analysis cancelled")]
    Cancelled,
}

impl SessionFailure {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    /// Text a UI should show for this failure.
    ///
    /// Upstream messages are shown as sent; transport failures share one
    /// generic message so the two are distinguishable.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Upstream { message } => message,
            Self::Transport { .. } => TRANSPORT_FAILURE_MESSAGE,
            Self::Cancelled => "analysis cancelled",
        }
    }
}

impl From<TransportError> for SessionFailure {
    fn from(value: TransportError) -> Self {
        Self::transport(value.to_string())
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request passed to the client.
    #[error("validation error: {0}")]
    Validation(String),
    /// The session ended with a terminal failure.
    #[error(transparent)]
    Failed(SessionFailure),
    /// The run task went away without producing a result.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// The session failure behind this error, if any.
    pub fn failure(&self) -> Option<&SessionFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<SessionFailure> for ClientError {
    fn from(value: SessionFailure) -> Self {
        ClientError::Failed(value)
    }
}
