use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::aspect_ratio::{normalize_image_aspect_ratio, normalize_video_aspect_ratio};
use crate::client::GenerationClient;
use crate::config::GeminiConfig;
use crate::credentials::{CredentialPrompt, ensure_credential};
use crate::error::GenerationError;
use crate::image_processing;
use crate::polling::{cancellable, pause};
use crate::types::{
    AnalysisResult, DEFAULT_REJECTION_REASON, GeneratedImage, GeneratedVideo, SubmittedImage,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const VIDEO_RESOLUTION: &str = "720p";
const VIDEO_COUNT: u32 = 1;
const DEFAULT_IMAGE_MIME: &str = "image/png";
const DEFAULT_VIDEO_MIME: &str = "video/mp4";

const SYSTEM_INSTRUCTION: &str = concat!(
    "PERSONA: You are a Lead Creative Director and AI Orchestrator.\n\n",
    "CORE TASK: Analyze the uploaded product image.\n",
    "1. SAFETY CHECK: Verify if the image is a commercial product. If it is a person's face, ",
    "a landscape, or inappropriate content, set is_valid: false and explain why in error_message.\n",
    "2. CONTENT GENERATION: If valid, generate:\n",
    "   - A catchy title and 150-word SEO-optimized description.\n",
    "   - 3 platform-specific social media captions (instagram, tiktok, facebook).\n",
    "   - A highly detailed 75-word prompt for a lifestyle product photo (luxury setting), ",
    "with an aspect ratio out of 1:1, 3:4, 4:3, 9:16, 16:9.\n",
    "   - A 5-second cinematic storyboard prompt for a video ad (camera movement + lighting), ",
    "with an aspect ratio of 16:9 or 9:16.\n\n",
    "STRICT OUTPUT FORMAT: Return ONLY a valid JSON object."
);
const ANALYSIS_USER_PROMPT: &str = "Analyze this product image and generate the marketing suite JSON.";

fn analysis_response_schema() -> Value {
    let directive = json!({
        "type": "OBJECT",
        "properties": {
            "prompt": { "type": "STRING" },
            "aspect_ratio": { "type": "STRING" }
        },
        "required": ["prompt", "aspect_ratio"]
    });
    json!({
        "type": "OBJECT",
        "properties": {
            "is_valid": { "type": "BOOLEAN" },
            "error_message": { "type": "STRING", "nullable": true },
            "product_title": { "type": "STRING" },
            "seo_description": { "type": "STRING" },
            "social_posts": {
                "type": "OBJECT",
                "properties": {
                    "instagram": { "type": "STRING" },
                    "tiktok": { "type": "STRING" },
                    "facebook": { "type": "STRING" }
                },
                "required": ["instagram", "tiktok", "facebook"]
            },
            "imagen_params": directive.clone(),
            "veo_params": directive
        },
        "required": [
            "is_valid",
            "product_title",
            "seo_description",
            "social_posts",
            "imagen_params",
            "veo_params"
        ]
    })
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        match (self.status.as_deref(), self.message.as_deref()) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (None, Some(message)) => message.to_string(),
            (Some(status), None) => status.to_string(),
            (None, None) => match self.code {
                Some(code) => format!("error code {code}"),
                None => "unknown error".to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_parts(self) -> Vec<Part> {
        self.candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Some(reason);
        }
        self.candidates
            .as_ref()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.finish_reason.clone())
            .filter(|reason| reason != "STOP")
    }
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoReference>,
}

#[derive(Debug, Deserialize)]
struct VideoReference {
    uri: Option<String>,
}

impl Operation {
    fn video_uri(self) -> Option<String> {
        self.response
            .and_then(|response| response.generate_video_response)
            .and_then(|response| response.generated_samples.into_iter().next())
            .and_then(|sample| sample.video)
            .and_then(|video| video.uri)
            .filter(|uri| !uri.trim().is_empty())
    }
}

async fn assert_ok_response(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
        .ok()
        .and_then(|envelope| envelope.error)
        .map(|error| error.describe())
        .unwrap_or_else(|| format!("{status} {text}").trim().to_string());
    Err(GenerationError::RemoteServiceError {
        status: Some(status.as_u16()),
        message,
    })
}

fn unexpected_body(err: serde_json::Error) -> GenerationError {
    GenerationError::RemoteServiceError {
        status: None,
        message: format!("unexpected response body: {err}"),
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GenerationError> {
    let response = assert_ok_response(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(unexpected_body)
}

/// Decodes the model's JSON answer. An explicit `is_valid: false` is a
/// rejection regardless of which content fields came with it.
fn parse_analysis(raw: &str) -> Result<AnalysisResult, GenerationError> {
    let malformed = |err: serde_json::Error| GenerationError::AnalysisFailed {
        reason: format!("malformed analysis result: {err}"),
    };
    let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(malformed)?;
    if value.get("is_valid").and_then(Value::as_bool) == Some(false) {
        let reason = value
            .get("error_message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON)
            .to_string();
        return Err(GenerationError::ValidationRejected { reason });
    }
    serde_json::from_value(value).map_err(malformed)
}

/// Strips a Markdown code fence the model sometimes wraps JSON in.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Client for the Gemini API covering analysis, image and video generation.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
    credential_prompt: Option<Arc<dyn CredentialPrompt>>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        if config.api_key.is_none() {
            warn!("GEMINI_API_KEY is not set; remote calls will fail");
        }
        Self {
            http: Client::new(),
            config,
            credential_prompt: None,
        }
    }

    /// Installs the host hook consulted before video generation.
    pub fn with_credential_prompt(mut self, prompt: Arc<dyn CredentialPrompt>) -> Self {
        self.credential_prompt = Some(prompt);
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.config.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Returns the raw response body so each caller classifies decode failures.
    async fn generate_content(&self, model: &str, body: &Value) -> Result<String, GenerationError> {
        let response = self
            .authorized(self.http.post(self.model_url(model, "generateContent")))
            .json(body)
            .send()
            .await?;
        let response = assert_ok_response(response).await?;
        Ok(response.text().await?)
    }

    async fn request_analysis(&self, image: &SubmittedImage) -> Result<AnalysisResult, GenerationError> {
        if image.data.is_empty() {
            return Err(GenerationError::EmptyImage);
        }
        let mime_type = image_processing::canonical_mime_type(&image.mime_type).ok_or_else(|| {
            GenerationError::UnsupportedMediaType {
                mime_type: image.mime_type.clone(),
            }
        })?;

        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": mime_type, "data": BASE64_STANDARD.encode(&image.data) } },
                    { "text": ANALYSIS_USER_PROMPT }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": analysis_response_schema()
            }
        });
        debug!(model = %self.config.analysis_model, mime_type, size = image.data.len(), "requesting analysis");

        let raw = self.generate_content(&self.config.analysis_model, &body).await?;
        let payload: GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|err| GenerationError::AnalysisFailed {
                reason: format!("unexpected response body: {err}"),
            })?;
        let block_reason = payload.block_reason();
        let text: String = payload
            .into_parts()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            let reason = match block_reason {
                Some(reason) => format!("no response from analysis model ({reason})"),
                None => "no response from analysis model".to_string(),
            };
            return Err(GenerationError::AnalysisFailed { reason });
        }

        parse_analysis(&text).inspect_err(|err| {
            if let GenerationError::ValidationRejected { reason } = err {
                info!(reason = %reason, "image rejected by analysis model");
            }
        })
    }

    async fn request_image(&self, prompt: &str, aspect_ratio: &str) -> Result<GeneratedImage, GenerationError> {
        let ratio = normalize_image_aspect_ratio(aspect_ratio);
        if ratio != aspect_ratio {
            debug!(requested = aspect_ratio, effective = ratio, "normalized image aspect ratio");
        }
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "imageConfig": { "aspectRatio": ratio }
            }
        });

        let raw = self.generate_content(&self.config.image_model, &body).await?;
        let payload: GenerateContentResponse = serde_json::from_str(&raw).map_err(unexpected_body)?;
        let inline = payload
            .into_parts()
            .into_iter()
            .filter_map(|part| part.inline_data)
            .find(|inline| inline.data.as_deref().is_some_and(|data| !data.is_empty()))
            .ok_or(GenerationError::NoImagePayload)?;

        let encoded = inline.data.unwrap_or_default();
        let data = BASE64_STANDARD.decode(encoded.as_bytes()).map_err(|err| {
            warn!(error = %err, "image payload is not valid base64");
            GenerationError::NoImagePayload
        })?;
        let mime_type = inline
            .mime_type
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        let dimensions = image_processing::read_dimensions(&data, &mime_type).ok();
        info!(size = data.len(), mime_type = %mime_type, ratio, "image generated");

        Ok(GeneratedImage {
            data: Bytes::from(data),
            mime_type,
            width: dimensions.map(|(width, _)| width),
            height: dimensions.map(|(_, height)| height),
            created_at: Utc::now(),
        })
    }

    async fn start_video_operation(&self, prompt: &str, ratio: &str) -> Result<Operation, GenerationError> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "aspectRatio": ratio,
                "resolution": VIDEO_RESOLUTION,
                "sampleCount": VIDEO_COUNT
            }
        });
        let response = self
            .authorized(
                self.http
                    .post(self.model_url(&self.config.video_model, "predictLongRunning")),
            )
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_operation(&self, name: &str) -> Result<Operation, GenerationError> {
        let url = format!("{}/{}", self.config.base_url, name.trim_start_matches('/'));
        let response = self.authorized(self.http.get(url)).send().await?;
        read_json(response).await
    }

    async fn poll_video_operation(
        &self,
        mut operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<Operation, GenerationError> {
        let policy = self.config.video_poll;
        let name = match operation.name.clone() {
            Some(name) => name,
            None if operation.done => return Ok(operation),
            None => {
                return Err(GenerationError::VideoGenerationFailed {
                    reason: "remote service returned no operation handle".to_string(),
                });
            }
        };

        let mut attempts = 0u32;
        while !operation.done {
            if !policy.allows(attempts) {
                warn!(operation = %name, attempts, "video operation did not complete in time");
                return Err(GenerationError::VideoGenerationFailed {
                    reason: format!("operation {name} not done after {attempts} polls"),
                });
            }
            pause(cancel, policy.interval).await?;
            attempts += 1;
            operation = cancellable(cancel, self.fetch_operation(&name)).await?;
            debug!(operation = %name, attempts, done = operation.done, "polled video operation");
        }
        Ok(operation)
    }

    async fn download_video(&self, uri: &str) -> Result<(Bytes, String), GenerationError> {
        let mut url = Url::parse(uri).map_err(|err| GenerationError::VideoGenerationFailed {
            reason: format!("invalid video uri {uri}: {err}"),
        })?;
        if let Some(key) = self.config.api_key.as_deref() {
            url.query_pairs_mut().append_pair("key", key);
        }

        let response = self.authorized(self.http.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown status").to_string();
            return Err(GenerationError::VideoDownloadFailed {
                status: status.as_u16(),
                reason,
            });
        }
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| value.starts_with("video/"))
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());
        let data = response.bytes().await?;
        Ok((data, mime_type))
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn analyze(
        &self,
        image: &SubmittedImage,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, GenerationError> {
        cancellable(cancel, self.request_analysis(image))
            .await
            .inspect_err(|err| warn!(error = %err, "analysis error"))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, GenerationError> {
        cancellable(cancel, self.request_image(prompt, aspect_ratio))
            .await
            .inspect_err(|err| warn!(error = %err, "image generation error"))
    }

    async fn generate_video(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo, GenerationError> {
        let result = async {
            cancellable(cancel, ensure_credential(self.credential_prompt.as_deref())).await?;

            let ratio = normalize_video_aspect_ratio(aspect_ratio);
            let operation = cancellable(cancel, self.start_video_operation(prompt, ratio)).await?;
            info!(operation = ?operation.name, ratio, "video operation started");

            let mut operation = self.poll_video_operation(operation, cancel).await?;
            if let Some(error) = operation.error.take() {
                return Err(GenerationError::VideoGenerationFailed {
                    reason: error.describe(),
                });
            }
            let uri = operation
                .video_uri()
                .ok_or_else(|| GenerationError::VideoGenerationFailed {
                    reason: "video generation failed to return a URI".to_string(),
                })?;

            let (data, mime_type) = cancellable(cancel, self.download_video(&uri)).await?;
            info!(size = data.len(), mime_type = %mime_type, "video downloaded");
            Ok::<_, GenerationError>(GeneratedVideo {
                data,
                mime_type,
                source_uri: uri,
                created_at: Utc::now(),
            })
        }
        .await;
        result.inspect_err(|err| warn!(error = %err, "video generation error"))
    }
}
