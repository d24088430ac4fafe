pub mod aspect_ratio;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gemini;
pub mod image_processing;
pub mod polling;
pub mod resources;
pub mod types;
pub mod web_pages;
pub mod workflow;

pub use client::GenerationClient;
pub use config::{AppConfig, GeminiConfig};
pub use error::{GenerationError, WorkflowError};
pub use gemini::GeminiClient;
pub use polling::PollPolicy;
pub use types::{
    AnalysisResult, GeneratedImage, GeneratedVideo, GenerationDirective, Platform, SocialPosts,
    SubmittedImage,
};
pub use workflow::{Workflow, WorkflowSnapshot, WorkflowState};
