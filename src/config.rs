use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default backend base URL, including the `/api` prefix.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8999/api";

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "TEXTVISION_API_BASE_URL";

/// Environment variable overriding [`ClientConfig::request_timeout`], in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "TEXTVISION_API_TIMEOUT_MS";

fn normalize(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Configuration for the HTTP layer.
///
/// Use [`ClientConfig::builder()`] for ergonomic construction,
/// [`ClientConfig::from_env()`] to pick up deployment overrides, or
/// [`ClientConfig::default()`] for a local backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(10_000),
            user_agent: format!("textvision-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults overridden by `TEXTVISION_API_BASE_URL` and
    /// `TEXTVISION_API_TIMEOUT_MS` when they are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            builder = builder.with_base_url(url.trim());
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!("{} must be a number of milliseconds, got {:?}", ENV_TIMEOUT_MS, raw))
            })?;
            if millis == 0 {
                return Err(ClientError::Config(format!("{} must be greater than zero", ENV_TIMEOUT_MS)));
            }
            builder = builder.with_request_timeout(Duration::from_millis(millis));
        }

        Ok(builder.build())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the backend base URL. Trailing slashes are trimmed.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = normalize(url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header value.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the final [`ClientConfig`].
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// How the generation store treats a submit while another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPolicy {
    /// Fail the second submit with [`ClientError::GenerationInFlight`].
    #[default]
    Reject,
    /// Let both run; each gets its own placeholder.
    Allow,
}

/// Configuration for [`GenerationStore`](crate::store::GenerationStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum entries kept in history after a generation or insert.
    pub history_cap: usize,

    /// Period between status checks while a generation is processing.
    pub poll_interval: Duration,

    /// Behavior for overlapping submits.
    pub submit_policy: SubmitPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_cap: 4,
            poll_interval: Duration::from_secs(3),
            submit_policy: SubmitPolicy::Reject,
        }
    }
}

impl StoreConfig {
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_submit_policy(mut self, policy: SubmitPolicy) -> Self {
        self.submit_policy = policy;
        self
    }
}
