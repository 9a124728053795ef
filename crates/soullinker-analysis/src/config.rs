use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Configuration for the analysis client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the analysis server.
    pub base_url: String,
    /// Credential sent with requests that do not carry their own.
    pub api_key: Option<String>,
    /// Time allowed to establish the connection.
    pub connect_timeout: Duration,
    /// Optional cap on the whole request, stream included. Unset by default
    /// because analysis jobs run for minutes.
    pub request_timeout: Option<Duration>,
    /// Bounded event buffer between the run task and the consumer.
    pub stream_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            stream_buffer_capacity: 128,
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from the environment.
    ///
    /// - `SOULLINKER_BASE_URL` (default `http://127.0.0.1:5000`)
    /// - `SOULLINKER_API_KEY` (optional; blank means unset)
    /// - `SOULLINKER_CONNECT_TIMEOUT_SECS` (default 10)
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(base_url) = non_blank_env("SOULLINKER_BASE_URL") {
            config.base_url = base_url;
        }
        config.api_key = non_blank_env("SOULLINKER_API_KEY");
        if let Some(raw) = non_blank_env("SOULLINKER_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "SOULLINKER_CONNECT_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the default credential. Blank keys are treated as absent.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
