use std::env;

use anyhow::{Context, Result};
use tokio::time::Duration;

use crate::polling::{DEFAULT_POLL_INTERVAL_MS, PollPolicy};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Everything the Gemini client needs; credentials travel here, never through globals.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub analysis_model: String,
    pub image_model: String,
    pub video_model: String,
    pub video_poll: PollPolicy,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()).filter(|key: &String| !key.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_video_poll(mut self, policy: PollPolicy) -> Self {
        self.video_poll = policy;
        self
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GEMINI_BASE_URL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            video_poll: PollPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let interval_ms = match get("VIDEO_POLL_INTERVAL_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid VIDEO_POLL_INTERVAL_MS: {raw}"))?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        let max_attempts = match get("VIDEO_POLL_MAX_ATTEMPTS") {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .with_context(|| format!("invalid VIDEO_POLL_MAX_ATTEMPTS: {raw}"))?,
            ),
            None => None,
        };
        let port = match get("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid APP_PORT: {raw}"))?,
            None => DEFAULT_PORT,
        };
        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("invalid MAX_UPLOAD_BYTES: {raw}"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            base_url: get("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            analysis_model: get("GEMINI_ANALYSIS_MODEL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            image_model: get("GEMINI_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            video_model: get("GEMINI_VIDEO_MODEL").unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            video_poll: PollPolicy::new(Duration::from_millis(interval_ms), max_attempts),
        };

        Ok(Self {
            gemini,
            port,
            max_upload_bytes,
        })
    }
}
