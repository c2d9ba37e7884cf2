use crate::api::decode;
use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{Page, Template, TemplateQuery};

/// Typed wrappers around the `/templates/*` endpoints.
#[derive(Debug, Clone)]
pub struct TemplateApi {
    client: ApiClient,
}

impl TemplateApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /templates`.
    pub async fn templates(&self, query: &TemplateQuery) -> Result<Page<Template>> {
        let data = self
            .client
            .get_with_query("/templates", &query.to_params())
            .await?;
        decode(data, "template page")
    }

    /// `GET /templates/{id}`.
    pub async fn template(&self, id: &str) -> Result<Template> {
        let data = self.client.get(&format!("/templates/{}", id)).await?;
        decode(data, "template")
    }

    /// `GET /templates/search?keyword=`. A blank keyword falls back to the
    /// plain listing.
    pub async fn search(&self, keyword: &str, query: &TemplateQuery) -> Result<Page<Template>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.templates(query).await;
        }
        let mut params = vec![("keyword", keyword.to_string())];
        params.extend(query.to_params());
        let data = self
            .client
            .get_with_query("/templates/search", &params)
            .await?;
        decode(data, "template search")
    }

    /// `GET /templates/categories`. Category names.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let data = self.client.get("/templates/categories").await?;
        decode(data, "template categories")
    }

    /// `GET /templates/popular?limit=`.
    pub async fn popular(&self, limit: u32) -> Result<Vec<Template>> {
        let data = self
            .client
            .get_with_query("/templates/popular", &[("limit", limit.to_string())])
            .await?;
        decode(data, "popular templates")
    }

    /// `POST /templates/{id}/use`. Bumps the usage counter.
    pub async fn use_template(&self, id: &str) -> Result<()> {
        self.client
            .post_empty(&format!("/templates/{}/use", id))
            .await?;
        Ok(())
    }
}
