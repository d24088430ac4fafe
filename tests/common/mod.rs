//! Shared test utilities: a scriptable generation client and fixtures.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use ecom_visual_suite::{
    AnalysisResult, GeneratedImage, GeneratedVideo, GenerationClient, GenerationDirective,
    GenerationError, SocialPosts, SubmittedImage,
};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Analyze { mime_type: String },
    GenerateImage { prompt: String, aspect_ratio: String },
    GenerateVideo { prompt: String, aspect_ratio: String },
}

/// Mock implementation of the GenerationClient trait.
///
/// Queued results are consumed in order; an empty queue yields a successful
/// default. Blocking flags park the call until its token is cancelled.
#[derive(Default)]
pub struct MockGenerationClient {
    analyses: Mutex<VecDeque<Result<AnalysisResult, GenerationError>>>,
    images: Mutex<VecDeque<Result<GeneratedImage, GenerationError>>>,
    videos: Mutex<VecDeque<Result<GeneratedVideo, GenerationError>>>,
    calls: Mutex<Vec<Call>>,
    block_analysis: AtomicBool,
    block_video: AtomicBool,
    /// Signalled when a blocked call starts waiting.
    pub parked: Notify,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_analysis(&self, result: Result<AnalysisResult, GenerationError>) {
        self.analyses.lock().unwrap().push_back(result);
    }

    pub fn push_image(&self, result: Result<GeneratedImage, GenerationError>) {
        self.images.lock().unwrap().push_back(result);
    }

    pub fn push_video(&self, result: Result<GeneratedVideo, GenerationError>) {
        self.videos.lock().unwrap().push_back(result);
    }

    pub fn block_analysis(&self, block: bool) {
        self.block_analysis.store(block, Ordering::SeqCst);
    }

    pub fn block_video(&self, block: bool) {
        self.block_video.store(block, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn video_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::GenerateVideo { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn park(&self, cancel: &CancellationToken) -> GenerationError {
        self.parked.notify_one();
        cancel.cancelled().await;
        GenerationError::Cancelled
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn analyze(
        &self,
        image: &SubmittedImage,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, GenerationError> {
        self.record(Call::Analyze {
            mime_type: image.mime_type.clone(),
        });
        if self.block_analysis.load(Ordering::SeqCst) {
            return Err(self.park(cancel).await);
        }
        self.analyses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(valid_analysis()))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        _cancel: &CancellationToken,
    ) -> Result<GeneratedImage, GenerationError> {
        self.record(Call::GenerateImage {
            prompt: prompt.to_string(),
            aspect_ratio: aspect_ratio.to_string(),
        });
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(generated_image()))
    }

    async fn generate_video(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo, GenerationError> {
        self.record(Call::GenerateVideo {
            prompt: prompt.to_string(),
            aspect_ratio: aspect_ratio.to_string(),
        });
        if self.block_video.load(Ordering::SeqCst) {
            return Err(self.park(cancel).await);
        }
        self.videos
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(generated_video()))
    }
}

pub fn product_image() -> SubmittedImage {
    let mut data = PNG_SIGNATURE.to_vec();
    data.extend_from_slice(b"product-photo");
    SubmittedImage::new(data, "image/png")
}

pub fn valid_analysis() -> AnalysisResult {
    analysis_with_ratios("1:1", "16:9")
}

pub fn analysis_with_ratios(image_ratio: &str, video_ratio: &str) -> AnalysisResult {
    AnalysisResult {
        is_valid: true,
        error_message: None,
        product_title: "Aurora Desk Lamp".to_string(),
        seo_description: "A warm, minimalist desk lamp in brushed brass.".to_string(),
        social_posts: SocialPosts {
            instagram: "Golden hour, all day.".to_string(),
            tiktok: "POV: your desk finally has a vibe".to_string(),
            facebook: "Meet Aurora, the lamp that works as hard as you do.".to_string(),
        },
        image_directive: GenerationDirective {
            prompt: "brass lamp on a walnut desk, soft evening light".to_string(),
            aspect_ratio: image_ratio.to_string(),
        },
        video_directive: GenerationDirective {
            prompt: "slow dolly in on the lamp as it switches on".to_string(),
            aspect_ratio: video_ratio.to_string(),
        },
    }
}

pub fn rejected_analysis(reason: Option<&str>) -> AnalysisResult {
    AnalysisResult {
        is_valid: false,
        error_message: reason.map(str::to_string),
        ..valid_analysis()
    }
}

pub fn generated_image() -> GeneratedImage {
    GeneratedImage {
        data: Bytes::from_static(b"lifestyle-image"),
        mime_type: "image/png".to_string(),
        width: Some(1024),
        height: Some(1024),
        created_at: Utc::now(),
    }
}

pub fn generated_video() -> GeneratedVideo {
    GeneratedVideo {
        data: Bytes::from_static(b"video-ad"),
        mime_type: "video/mp4".to_string(),
        source_uri: "https://example.com/files/video-1:download?alt=media".to_string(),
        created_at: Utc::now(),
    }
}
