use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::types::ContentType;

/// Longest prompt the backend accepts, in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Body of `POST /contents/generate`.
///
/// Built with chained setters; unset fields are left out of the request
/// so the backend applies its own defaults.
///
/// # Example
/// ```
/// use textvision_client::GenerateRequest;
///
/// let request = GenerateRequest::image("a red fox in the snow")
///     .size("square")
///     .style("watercolor")
///     .seed(42)
///     .guidance_scale(2.5);
///
/// assert!(request.validate().is_ok());
/// let body = request.to_body().unwrap();
/// assert_eq!(body["type"], "image");
/// assert_eq!(body["seed"], 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<bool>,
    #[serde(flatten)]
    pub image: ImageParams,
    #[serde(flatten)]
    pub video: VideoParams,
}

/// Parameters only meaningful for image generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// `url` or `b64_json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    /// -1 lets the backend pick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
}

/// Parameters only meaningful for video generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// `480p`, `720p` or `1080p`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Aspect ratio such as `16:9`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_fixed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f64>,
    /// Number of videos to produce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd: Option<bool>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            prompt: prompt.into(),
            content_type,
            template_id: None,
            size: None,
            style: None,
            style_id: None,
            reference_image: None,
            watermark: None,
            image: ImageParams::default(),
            video: VideoParams::default(),
        }
    }

    pub fn image(prompt: impl Into<String>) -> Self {
        Self::new(prompt, ContentType::Image)
    }

    pub fn video(prompt: impl Into<String>) -> Self {
        Self::new(prompt, ContentType::Video)
    }

    pub fn template(mut self, id: i64) -> Self {
        self.template_id = Some(id);
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Free-form style name. Ignored on the wire when a style id is set.
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Catalog style id; takes precedence over [`style`](Self::style).
    pub fn style_id(mut self, id: i64) -> Self {
        self.style_id = Some(id);
        self
    }

    pub fn reference_image(mut self, url: impl Into<String>) -> Self {
        self.reference_image = Some(url.into());
        self
    }

    pub fn watermark(mut self, enabled: bool) -> Self {
        self.watermark = Some(enabled);
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.image.quality = Some(quality.into());
        self
    }

    pub fn response_format(mut self, format: impl Into<String>) -> Self {
        self.image.response_format = Some(format.into());
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.image.seed = Some(seed);
        self
    }

    pub fn guidance_scale(mut self, scale: f64) -> Self {
        self.image.guidance_scale = Some(scale);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.video.model = Some(model.into());
        self
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.video.resolution = Some(resolution.into());
        self
    }

    pub fn duration(mut self, seconds: u32) -> Self {
        self.video.duration = Some(seconds);
        self
    }

    pub fn ratio(mut self, ratio: impl Into<String>) -> Self {
        self.video.ratio = Some(ratio.into());
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.video.fps = Some(fps);
        self
    }

    pub fn camera_fixed(mut self, fixed: bool) -> Self {
        self.video.camera_fixed = Some(fixed);
        self
    }

    pub fn cfg_scale(mut self, scale: f64) -> Self {
        self.video.cfg_scale = Some(scale);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.video.count = Some(count);
        self
    }

    pub fn first_frame(mut self, url: impl Into<String>) -> Self {
        self.video.first_frame_image = Some(url.into());
        self
    }

    pub fn last_frame(mut self, url: impl Into<String>) -> Self {
        self.video.last_frame_image = Some(url.into());
        self
    }

    pub fn hd(mut self, hd: bool) -> Self {
        self.video.hd = Some(hd);
        self
    }

    /// Check the limits the backend enforces, so a caller can reject bad
    /// input before submitting. The store never calls this.
    pub fn validate(&self) -> Result<()> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(ClientError::InvalidArgument("prompt must not be empty".into()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(ClientError::InvalidArgument(format!(
                "prompt must be at most {} characters",
                MAX_PROMPT_CHARS
            )));
        }
        if let Some(seed) = self.image.seed {
            check_range("seed", seed as f64, -1.0, i32::MAX as f64)?;
        }
        if let Some(scale) = self.image.guidance_scale {
            check_range("guidanceScale", scale, 1.0, 10.0)?;
        }
        if let Some(duration) = self.video.duration {
            check_range("duration", duration as f64, 5.0, 10.0)?;
        }
        if let Some(scale) = self.video.cfg_scale {
            check_range("cfgScale", scale, 1.0, 20.0)?;
        }
        if let Some(count) = self.video.count {
            check_range("count", count as f64, 1.0, 4.0)?;
        }
        Ok(())
    }

    /// JSON body as sent to the backend.
    pub fn to_body(&self) -> Result<Value> {
        let mut body = serde_json::to_value(self)?;
        if self.style_id.is_some() {
            if let Some(obj) = body.as_object_mut() {
                obj.remove("style");
            }
        }
        Ok(body)
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value < min || value > max {
        return Err(ClientError::InvalidArgument(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(())
}
