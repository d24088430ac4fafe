use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::types::{AnalysisResult, GeneratedImage, GeneratedVideo, SubmittedImage};

/// The three remote capabilities the workflow drives.
///
/// Implementations must observe `cancel` at every remote call and, for video,
/// at every poll iteration.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Classifies the image and produces marketing copy plus generation directives.
    async fn analyze(
        &self,
        image: &SubmittedImage,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, GenerationError>;

    /// Synthesizes a lifestyle image. Aspect ratio is normalized, never rejected.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, GenerationError>;

    /// Starts a video job, polls it to completion and downloads the result.
    async fn generate_video(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo, GenerationError>;
}
