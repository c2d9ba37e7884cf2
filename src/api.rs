use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::http::ApiClient;
use crate::request::GenerateRequest;
use crate::types::*;

/// What the generation store needs from the backend.
///
/// [`ContentApi`] is the HTTP implementation; tests and offline shells can
/// supply their own.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Submit a generation. The store rejects a record without an id.
    async fn generate(&self, request: &GenerateRequest) -> Result<ContentRecord>;

    /// Fetch one piece of content by id.
    async fn content(&self, id: &str) -> Result<ContentRecord>;

    /// Fetch one page of the user's persisted history.
    async fn contents(&self, query: &ContentQuery) -> Result<Page<ContentRecord>>;
}

/// Decode an unwrapped payload, failing closed on an unexpected shape.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::InvalidResponse(format!("Unexpected {} response: {}", what, e)))
}

/// Typed wrappers around the `/contents/*` and `/art-styles` endpoints.
#[derive(Debug, Clone)]
pub struct ContentApi {
    client: ApiClient,
}

impl ContentApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // ── Generation ──────────────────────────────────────────────────

    /// `POST /contents/generate`. Fails with `InvalidResponse` when the
    /// backend does not return a content id.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<ContentRecord> {
        let body = request.to_body()?;
        let data = self.client.post("/contents/generate", &body).await?;
        let record = require_id(decode(data, "generation")?)?;
        info!(id = record.id.as_deref().unwrap_or_default(), kind = request.content_type.as_str(), "generation accepted");
        Ok(record)
    }

    /// `GET /contents/{id}`. The response may leave out the id.
    pub async fn content(&self, id: &str) -> Result<ContentRecord> {
        let data = self.client.get(&format!("/contents/{}", id)).await?;
        decode(data, "content")
    }

    // ── History ─────────────────────────────────────────────────────

    /// `GET /contents?page=&size=&type=`.
    pub async fn contents(&self, query: &ContentQuery) -> Result<Page<ContentRecord>> {
        let data = self
            .client
            .get_with_query("/contents", &query.to_params())
            .await?;
        decode(data, "content page")
    }

    /// `GET /contents/recent?limit=`.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ContentRecord>> {
        let data = self
            .client
            .get_with_query("/contents/recent", &[("limit", limit.to_string())])
            .await?;
        decode(data, "recent contents")
    }

    /// `GET /contents/stats`.
    pub async fn stats(&self) -> Result<ContentStats> {
        let data = self.client.get("/contents/stats").await?;
        decode(data, "content stats")
    }

    /// `DELETE /contents/{id}`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("/contents/{}", id)).await?;
        Ok(())
    }

    /// `DELETE /contents/batch` with the ids as a JSON array of integers.
    pub async fn batch_delete<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchDeleteResult> {
        let numeric = numeric_ids(ids)?;
        let data = self
            .client
            .delete_with_body("/contents/batch", &numeric)
            .await?;
        decode_batch_delete(data)
    }

    // ── Art styles ──────────────────────────────────────────────────

    /// `GET /art-styles`, optionally filtered by target media.
    pub async fn art_styles(&self, target: Option<StyleTarget>) -> Result<Vec<ArtStyle>> {
        let query: Vec<(&str, String)> = target
            .map(|t| vec![("type", t.as_str().to_string())])
            .unwrap_or_default();
        let data = self.client.get_with_query("/art-styles", &query).await?;
        decode(data, "art styles")
    }

    /// `GET /art-styles/{id}`.
    pub async fn art_style(&self, id: i64) -> Result<ArtStyle> {
        let data = self.client.get(&format!("/art-styles/{}", id)).await?;
        decode(data, "art style")
    }
}

/// A generation is only accepted once the backend names the new content.
pub(crate) fn require_id(record: ContentRecord) -> Result<ContentRecord> {
    if record.id.is_none() {
        return Err(ClientError::InvalidResponse(
            "Generation response is missing a content id".into(),
        ));
    }
    Ok(record)
}

/// A success envelope with `null` data comes back whole; that reply
/// carries no counts.
fn decode_batch_delete(data: Value) -> Result<BatchDeleteResult> {
    let is_bare_envelope = data
        .as_object()
        .is_some_and(|obj| obj.contains_key("code") && obj.get("data").map_or(true, Value::is_null));
    if is_bare_envelope {
        return Ok(BatchDeleteResult::default());
    }
    decode(data, "batch delete")
}

/// Content ids travel as strings client-side but the batch endpoint takes integers.
pub(crate) fn numeric_ids<S: AsRef<str>>(ids: &[S]) -> Result<Vec<i64>> {
    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            id.trim()
                .parse::<i64>()
                .map_err(|_| ClientError::InvalidArgument(format!("content id {:?} is not numeric", id)))
        })
        .collect()
}

#[async_trait]
impl ContentBackend for ContentApi {
    async fn generate(&self, request: &GenerateRequest) -> Result<ContentRecord> {
        ContentApi::generate(self, request).await
    }

    async fn content(&self, id: &str) -> Result<ContentRecord> {
        ContentApi::content(self, id).await
    }

    async fn contents(&self, query: &ContentQuery) -> Result<Page<ContentRecord>> {
        ContentApi::contents(self, query).await
    }
}
