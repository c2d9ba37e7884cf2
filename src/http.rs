use std::sync::Arc;

use reqwest::{header, Client, Method};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::unwrap_response;
use crate::error::{ClientError, Result};
use crate::token::{MemoryTokenStore, TokenStore};

/// The single request path every facade goes through.
///
/// Attaches `Authorization: Bearer <token>` when a token is stored, sends
/// JSON bodies, and interprets the `{ code, message, data }` envelope.
/// One attempt per call: no retry, no backoff.
///
/// # Example
/// ```no_run
/// use textvision_client::ApiClient;
///
/// # async fn example() -> textvision_client::Result<()> {
/// let client = ApiClient::new("http://127.0.0.1:8999/api");
/// let styles = client.get("/art-styles").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client for the given base URL with an in-memory token store.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Arc::new(MemoryTokenStore::new()),
        }
    }

    /// Create a client from a [`ClientConfig`], applying its timeout and user agent.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config(format!("Cannot build HTTP client: {}", e)))?;
        Ok(Self::new(config.base_url.clone()).with_http_client(http))
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Use a different token store, e.g. a [`FileTokenStore`](crate::token::FileTokenStore).
    pub fn with_token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // ── Verbs ───────────────────────────────────────────────────────

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, &[], None).await
    }

    /// GET with URL-encoded query parameters.
    pub async fn get_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, &[], Some(&body)).await
    }

    /// POST with no body.
    pub async fn post_empty(&self, path: &str) -> Result<Value> {
        self.request(Method::POST, path, &[], None).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, &[], Some(&body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, &[], None).await
    }

    /// DELETE carrying a JSON body (used by batch deletion).
    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.request(Method::DELETE, path, &[], Some(&body)).await
    }

    // ── Core ────────────────────────────────────────────────────────

    /// Send one request and interpret the envelope.
    ///
    /// A 401 clears the stored token before the error is returned.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "sending request");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = self.tokens.token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| transport_error(e, &self.base_url))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| transport_error(e, &self.base_url))?;

        match unwrap_response(status, &bytes) {
            Err(err @ ClientError::Unauthorized(_)) => {
                warn!(%method, path, "backend answered 401, clearing stored token");
                if let Err(e) = self.tokens.clear_token() {
                    warn!(error = %e, "failed to clear stored token");
                }
                Err(err)
            }
            Err(err @ ClientError::Business { .. }) => {
                warn!(%method, path, error = %err, "business status code error");
                Err(err)
            }
            other => other,
        }
    }
}

fn transport_error(e: reqwest::Error, base_url: &str) -> ClientError {
    if e.is_timeout() {
        return ClientError::Timeout;
    }
    ClientError::Network {
        context: format!(
            "Network connection to {} failed, check the connection or retry later",
            base_url
        ),
        source: e,
    }
}
