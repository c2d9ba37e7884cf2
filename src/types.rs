use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Size used when neither the request nor the backend names one.
pub const DEFAULT_SIZE: &str = "landscape_16_9";

/// Prefix of locally synthesized placeholder ids.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

/// Kind of media a generation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
        }
    }
}

/// Lifecycle of a generation. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Generating,
    Processing,
    Completed,
    Failed,
}

impl ContentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContentStatus::Completed | ContentStatus::Failed)
    }
}

/// One user-visible creation, as held in the generation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub prompt: String,
    pub url: Option<String>,
    pub urls: Vec<String>,
    pub thumbnail: Option<String>,
    pub thumbnails: Vec<String>,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub size: String,
    pub style: Option<String>,
    pub reference_image: Option<String>,
    pub template_id: Option<i64>,
    /// Only set when `status` is `Failed`.
    pub error_message: Option<String>,
}

impl GeneratedContent {
    /// True for locally synthesized entries that the backend has not confirmed.
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_PREFIX)
    }

    /// Normalize a backend record. Fields the record leaves out, the id
    /// included, are taken from `fallback` when given.
    pub fn from_record(
        record: ContentRecord,
        fallback: Option<&GeneratedContent>,
        default_status: ContentStatus,
    ) -> Self {
        let status = record
            .status
            .or_else(|| fallback.map(|f| f.status))
            .unwrap_or(default_status);

        let url = record.url.clone().filter(|u| !u.is_empty());
        let urls = match record.urls {
            Some(urls) if !urls.is_empty() => urls,
            _ => url.iter().cloned().collect(),
        };
        let thumbnail = record.thumbnail.clone().filter(|t| !t.is_empty());
        let thumbnails = match record.thumbnails {
            Some(thumbs) if !thumbs.is_empty() => thumbs,
            _ => thumbnail.iter().cloned().collect(),
        };

        let error_message = if status == ContentStatus::Failed {
            record
                .error_message
                .or_else(|| fallback.and_then(|f| f.error_message.clone()))
        } else {
            None
        };

        Self {
            id: record
                .id
                .or_else(|| fallback.map(|f| f.id.clone()))
                .unwrap_or_default(),
            content_type: record
                .content_type
                .or_else(|| fallback.map(|f| f.content_type))
                .unwrap_or(ContentType::Image),
            prompt: record
                .prompt
                .or_else(|| fallback.map(|f| f.prompt.clone()))
                .unwrap_or_default(),
            url,
            urls,
            thumbnail,
            thumbnails,
            status,
            created_at: record
                .created_at
                .or_else(|| fallback.map(|f| f.created_at))
                .unwrap_or_else(Utc::now),
            size: record
                .size
                .or_else(|| fallback.map(|f| f.size.clone()))
                .unwrap_or_else(|| DEFAULT_SIZE.to_string()),
            style: record.style.or_else(|| fallback.and_then(|f| f.style.clone())),
            reference_image: record
                .reference_image
                .or_else(|| fallback.and_then(|f| f.reference_image.clone())),
            template_id: record
                .template_id
                .or_else(|| fallback.and_then(|f| f.template_id)),
            error_message,
        }
    }
}

/// Generated content as the backend sends it.
///
/// Every field is optional on the wire. Status responses may omit the id;
/// [`ContentApi::generate`](crate::api::ContentApi::generate) insists on one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub prompt: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub urls: Option<Vec<String>>,
    pub thumbnails: Option<Vec<String>>,
    pub size: Option<String>,
    pub style: Option<String>,
    pub reference_image: Option<String>,
    pub template_id: Option<i64>,
    pub generation_params: Option<Value>,
    pub status: Option<ContentStatus>,
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub current: i64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub pages: i64,
    #[serde(default)]
    pub has_previous: bool,
    #[serde(default)]
    pub has_next: bool,
}

/// Filters for the paginated content listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub page: u32,
    pub size: u32,
    pub content_type: Option<ContentType>,
}

impl Default for ContentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 20,
            content_type: None,
        }
    }
}

impl ContentQuery {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.max(1),
            content_type: None,
        }
    }

    pub fn of_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(t) = self.content_type {
            params.push(("type", t.as_str().to_string()));
        }
        params
    }
}

/// Per-user generation counters from `/contents/stats`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentStats {
    pub total_count: u64,
    pub image_count: u64,
    pub video_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub processing_count: u64,
    pub today_count: u64,
}

/// Result of a batch delete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchDeleteResult {
    pub deleted_count: u64,
    pub total_requested: u64,
}

// ── Users ───────────────────────────────────────────────────────────

/// Account as returned by the user endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
}

/// Login/register payload. Both `token` and `user` must be present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

// ── Catalog ─────────────────────────────────────────────────────────

/// A prompt template from the template gallery.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub usage_count: u64,
}

/// Filters for template listing and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateQuery {
    pub page: u32,
    pub size: u32,
    pub category_id: Option<String>,
    pub content_type: Option<ContentType>,
}

impl Default for TemplateQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 20,
            category_id: None,
            content_type: None,
        }
    }
}

impl TemplateQuery {
    pub fn category(mut self, id: impl Into<String>) -> Self {
        self.category_id = Some(id.into());
        self
    }

    pub fn of_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn page(mut self, page: u32, size: u32) -> Self {
        self.page = page.max(1);
        self.size = size.max(1);
        self
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(c) = &self.category_id {
            params.push(("categoryId", c.clone()));
        }
        if let Some(t) = self.content_type {
            params.push(("type", t.as_str().to_string()));
        }
        params
    }
}

/// Which media an art style applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTarget {
    Image,
    Video,
    Both,
}

impl StyleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleTarget::Image => "image",
            StyleTarget::Video => "video",
            StyleTarget::Both => "both",
        }
    }
}

/// Entry of the art style catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtStyle {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub applicable_type: Option<StyleTarget>,
    #[serde(default)]
    pub sort_order: i32,
}

// ── Serde helpers ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(i64),
    Text(String),
}

/// Backend ids are 64-bit integers; the client keeps them as strings.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(n) => Ok(n.to_string()),
        IdRepr::Text(s) if !s.trim().is_empty() => Ok(s),
        IdRepr::Text(_) => Err(serde::de::Error::custom("id is empty")),
    }
}

/// Like [`de_id`], but a missing, `null` or blank id is `None`.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<IdRepr>::deserialize(deserializer)? {
        Some(IdRepr::Number(n)) => Some(n.to_string()),
        Some(IdRepr::Text(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// Accepts RFC 3339 or the backend's zone-less `LocalDateTime` (read as UTC).
/// Unparseable values become `None`.
fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_str().and_then(parse_timestamp)))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    List(Vec<String>),
    Csv(String),
}

fn de_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<TagsRepr>::deserialize(deserializer)? {
        Some(TagsRepr::List(list)) => list,
        Some(TagsRepr::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };
    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
