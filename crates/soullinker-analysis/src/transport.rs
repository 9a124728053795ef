use std::pin::Pin;

use futures::TryStreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, TransportError};
use crate::request::AnalysisRequest;

/// Raw response body as an ordered stream of chunks.
pub type ChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Opens the byte stream for one analysis request.
///
/// Dropping the returned stream must release the underlying connection;
/// cancellation relies on that.
#[async_trait::async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn open(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError>;
}

/// HTTP transport posting to the analysis server with reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for HttpTransport {
    async fn open(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
        let url = self.config.endpoint_url(&request.endpoint_path());
        let api_key = request
            .api_key
            .as_deref()
            .or(self.config.api_key.as_deref());
        let body = request.scope.request_body(api_key);
        debug!(target_id = request.target_id, scope = request.scope.label(), %url, "opening analysis stream");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map_err(|e| TransportError::read(e.to_string())),
        ))
    }
}
