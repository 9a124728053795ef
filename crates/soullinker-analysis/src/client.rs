use std::sync::Arc;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::normalize::NormalizedAnalysis;
use crate::progress::ProgressPolicy;
use crate::request::AnalysisRequest;
use crate::session::{JobHandle, SessionParams};
use crate::transport::{AnalysisTransport, HttpTransport};

struct ClientInner {
    transport: Arc<dyn AnalysisTransport>,
    policy: ProgressPolicy,
    buffer: usize,
}

/// Entry point for starting analysis jobs.
///
/// Cheap to clone. Sessions started from one client are independent; the
/// client does not serialize jobs for the same target.
#[derive(Clone)]
pub struct AnalysisClient {
    inner: Arc<ClientInner>,
}

impl AnalysisClient {
    pub fn builder() -> AnalysisClientBuilder {
        AnalysisClientBuilder::default()
    }

    /// HTTP client for the given configuration with the default policy.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::builder().config(config).build()
    }

    /// HTTP client configured from `SOULLINKER_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn policy(&self) -> &ProgressPolicy {
        &self.inner.policy
    }

    /// Validates the request and starts a session on the current tokio runtime.
    pub fn start(&self, request: AnalysisRequest) -> Result<JobHandle, ClientError> {
        if request.target_id == 0 {
            return Err(ClientError::Validation(
                "target id must be greater than 0".into(),
            ));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ClientError::Config(
                "AnalysisClient::start must be called inside a tokio runtime".into(),
            ));
        }
        Ok(JobHandle::spawn(SessionParams {
            transport: self.inner.transport.clone(),
            request,
            policy: self.inner.policy.clone(),
            buffer: self.inner.buffer,
        }))
    }

    /// Runs one job to completion and returns the normalized result.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<NormalizedAnalysis, ClientError> {
        self.start(request)?.finish().await
    }
}

/// Builder for [`AnalysisClient`].
///
/// Without an explicit transport, an [`HttpTransport`] is built from the
/// config (or `ClientConfig::default()`).
#[derive(Default)]
pub struct AnalysisClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn AnalysisTransport>>,
    policy: Option<ProgressPolicy>,
}

impl AnalysisClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses a custom transport instead of HTTP.
    pub fn transport(mut self, transport: Arc<dyn AnalysisTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn policy(mut self, policy: ProgressPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<AnalysisClient, ClientError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let policy = self.policy.unwrap_or_default();
        if !(policy.content_scale > 0.0 && policy.token_scale > 0.0) {
            return Err(ClientError::Config(
                "progress scales must be greater than 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&policy.floor) || !(policy.floor..=100.0).contains(&policy.ceiling) {
            return Err(ClientError::Config(
                "progress floor and ceiling must satisfy 0 <= floor <= ceiling <= 100".into(),
            ));
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(config.clone())?),
        };
        Ok(AnalysisClient {
            inner: Arc::new(ClientInner {
                transport,
                policy,
                buffer: config.stream_buffer_capacity,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::transport::ChunkStream;

    struct Unreachable;

    #[async_trait::async_trait]
    impl AnalysisTransport for Unreachable {
        async fn open(&self, _request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
            Err(TransportError::request("unreachable in tests"))
        }
    }

    #[test]
    fn build_rejects_invalid_policy() {
        let result = AnalysisClient::builder()
            .transport(Arc::new(Unreachable))
            .policy(ProgressPolicy {
                token_scale: 0.0,
                ..ProgressPolicy::default()
            })
            .build();
        assert!(matches!(result, Err(ClientError::Config(message)) if message.contains("scales")));

        let result = AnalysisClient::builder()
            .transport(Arc::new(Unreachable))
            .policy(ProgressPolicy {
                ceiling: 10.0,
                ..ProgressPolicy::default()
            })
            .build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let client = AnalysisClient::builder()
            .transport(Arc::new(Unreachable))
            .build()
            .expect("client");
        let result = client.start(AnalysisRequest::whole_target(1));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn start_rejects_zero_target() {
        let client = AnalysisClient::builder()
            .transport(Arc::new(Unreachable))
            .build()
            .expect("client");
        let result = client.start(AnalysisRequest::whole_target(0));
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn analyze_surfaces_transport_failure() {
        let client = AnalysisClient::builder()
            .transport(Arc::new(Unreachable))
            .build()
            .expect("client");
        let err = client
            .analyze(AnalysisRequest::whole_target(4))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("unreachable in tests"));
    }
}
