//! Domain entities flowing through the generation workflow.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Used when the remote service rejects an image without saying why.
pub const DEFAULT_REJECTION_REASON: &str = "Invalid image content.";

/// Image selected by the user: raw bytes plus declared media type.
#[derive(Debug, Clone)]
pub struct SubmittedImage {
    pub data: Bytes,
    pub mime_type: String,
}

impl SubmittedImage {
    /// Media type is lower-cased and stripped of parameters (`image/PNG; q=1` -> `image/png`).
    pub fn new(data: impl Into<Bytes>, mime_type: &str) -> Self {
        let mime_type = mime_type
            .split(';')
            .next()
            .unwrap_or(mime_type)
            .trim()
            .to_ascii_lowercase();
        Self {
            data: data.into(),
            mime_type,
        }
    }
}

/// Social platforms a caption is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Facebook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPosts {
    pub instagram: String,
    pub tiktok: String,
    pub facebook: String,
}

impl SocialPosts {
    pub fn caption(&self, platform: Platform) -> &str {
        match platform {
            Platform::Instagram => &self.instagram,
            Platform::Tiktok => &self.tiktok,
            Platform::Facebook => &self.facebook,
        }
    }
}

/// Prompt and aspect ratio for one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationDirective {
    pub prompt: String,
    pub aspect_ratio: String,
}

/// Structured output of the analysis stage.
///
/// When `is_valid` is false the content fields are unreliable and must not
/// drive further generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub is_valid: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    pub product_title: String,
    pub seo_description: String,
    pub social_posts: SocialPosts,
    #[serde(rename = "imagen_params")]
    pub image_directive: GenerationDirective,
    #[serde(rename = "veo_params")]
    pub video_directive: GenerationDirective,
}

impl AnalysisResult {
    /// Non-empty rejection reason for an invalid result, `None` for a valid one.
    pub fn rejection_reason(&self) -> Option<String> {
        if self.is_valid {
            return None;
        }
        let reason = self
            .error_message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON);
        Some(reason.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub data: Bytes,
    pub mime_type: String,
    /// Remote content URI the payload was downloaded from.
    pub source_uri: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(is_valid: bool, error_message: Option<&str>) -> String {
        serde_json::json!({
            "is_valid": is_valid,
            "error_message": error_message,
            "product_title": "Aurora Desk Lamp",
            "seo_description": "A warm minimalist lamp.",
            "social_posts": {
                "instagram": "Glow up your desk.",
                "tiktok": "POV: your desk finally looks good",
                "facebook": "Meet Aurora."
            },
            "imagen_params": { "prompt": "lamp on oak desk", "aspect_ratio": "4:3" },
            "veo_params": { "prompt": "slow dolly in", "aspect_ratio": "9:16" }
        })
        .to_string()
    }

    #[test]
    fn test_parse_analysis_result() {
        let result: AnalysisResult = serde_json::from_str(&sample_json(true, None)).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.product_title, "Aurora Desk Lamp");
        assert_eq!(result.image_directive.aspect_ratio, "4:3");
        assert_eq!(result.video_directive.prompt, "slow dolly in");
        assert_eq!(result.social_posts.caption(Platform::Tiktok), "POV: your desk finally looks good");
        assert_eq!(result.rejection_reason(), None);
    }

    #[test]
    fn test_error_message_optional() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_json(true, None)).unwrap();
        value.as_object_mut().unwrap().remove("error_message");
        let result: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(result.error_message, None);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_json(true, None)).unwrap();
        value.as_object_mut().unwrap().remove("veo_params");
        assert!(serde_json::from_value::<AnalysisResult>(value).is_err());
    }

    #[test]
    fn test_rejection_reason() {
        let result: AnalysisResult =
            serde_json::from_str(&sample_json(false, Some("face detected"))).unwrap();
        assert_eq!(result.rejection_reason().as_deref(), Some("face detected"));

        let result: AnalysisResult = serde_json::from_str(&sample_json(false, Some("  "))).unwrap();
        assert_eq!(result.rejection_reason().as_deref(), Some(DEFAULT_REJECTION_REASON));

        let result: AnalysisResult = serde_json::from_str(&sample_json(false, None)).unwrap();
        assert_eq!(result.rejection_reason().as_deref(), Some(DEFAULT_REJECTION_REASON));
    }

    #[test]
    fn test_submitted_image_normalizes_mime() {
        let image = SubmittedImage::new(vec![1u8, 2, 3], "Image/PNG; charset=binary");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data.len(), 3);
    }
}
