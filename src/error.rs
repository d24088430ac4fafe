use thiserror::Error;

use crate::workflow::WorkflowState;

/// Errors raised by a generation client.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The remote service judged the submitted image unsuitable.
    #[error("{reason}")]
    ValidationRejected { reason: String },

    /// The analysis call returned an empty or malformed result.
    #[error("analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    /// Transport, auth or quota failure reported by the remote service.
    #[error("remote service error: {message}")]
    RemoteServiceError {
        status: Option<u16>,
        message: String,
    },

    #[error("no image data found in response")]
    NoImagePayload,

    /// The video operation finished (or gave up) without a usable result.
    #[error("video generation failed: {reason}")]
    VideoGenerationFailed { reason: String },

    #[error("failed to download video: HTTP {status} {reason}")]
    VideoDownloadFailed { status: u16, reason: String },

    #[error("submitted image is empty")]
    EmptyImage,

    #[error("unsupported media type: {mime_type}")]
    UnsupportedMediaType { mime_type: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::RemoteServiceError {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Errors raised when an orchestrator operation is not allowed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot {action} while workflow is {state}")]
    InvalidTransition {
        action: &'static str,
        state: WorkflowState,
    },

    #[error("no analysis result available; submit an image first")]
    MissingAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rejected_displays_reason_only() {
        let err = GenerationError::ValidationRejected {
            reason: "face detected".to_string(),
        };
        assert_eq!(err.to_string(), "face detected");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = WorkflowError::InvalidTransition {
            action: "submit",
            state: WorkflowState::GeneratingVideo,
        };
        assert_eq!(
            err.to_string(),
            "cannot submit while workflow is GENERATING_VIDEO"
        );
    }
}
