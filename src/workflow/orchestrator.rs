//! Drives the generation pipeline and owns its state machine.
//!
//! `submit` and `generate_visuals` are each split into a synchronous *begin*
//! step that validates the transition and a *run* step that performs the
//! remote calls. The session lock is never held across a remote call, so the
//! presentation layer can read snapshots while a run is in flight.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::GenerationClient;
use crate::error::{GenerationError, WorkflowError};
use crate::resources::StoredResource;
use crate::types::{AnalysisResult, GeneratedImage, GeneratedVideo, SubmittedImage};
use crate::workflow::state::{RunTicket, Session, WorkflowSnapshot, WorkflowState};

pub struct Workflow {
    client: Arc<dyn GenerationClient>,
    session: RwLock<Session>,
}

impl Workflow {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            session: RwLock::new(Session::new()),
        }
    }

    pub async fn state(&self) -> WorkflowState {
        self.session.read().await.state
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.session.read().await.snapshot()
    }

    pub async fn analysis(&self) -> Option<AnalysisResult> {
        self.session.read().await.analysis.clone()
    }

    pub async fn submitted_image(&self) -> Option<SubmittedImage> {
        self.session.read().await.submitted_image().cloned()
    }

    pub async fn generated_image(&self) -> Option<GeneratedImage> {
        self.session.read().await.generated_image().cloned()
    }

    pub async fn generated_video(&self) -> Option<GeneratedVideo> {
        self.session.read().await.generated_video().cloned()
    }

    /// Looks up a materialized resource; revoked keys return `None`.
    pub async fn resource(&self, key: &str) -> Option<StoredResource> {
        self.session.read().await.resources.get(key).cloned()
    }

    /// Analyzes `image` and waits for the outcome. Returns the resulting state.
    pub async fn submit(&self, image: SubmittedImage) -> Result<WorkflowState, WorkflowError> {
        let ticket = self.begin_submit(image).await?;
        Ok(self.run_analysis(ticket).await)
    }

    /// Valid from `Idle` or `Error`. Discards everything from the previous
    /// submission and moves to `Analyzing`.
    pub async fn begin_submit(&self, image: SubmittedImage) -> Result<RunTicket, WorkflowError> {
        let mut session = self.session.write().await;
        if !matches!(session.state, WorkflowState::Idle | WorkflowState::Error) {
            return Err(WorkflowError::InvalidTransition {
                action: "submit",
                state: session.state,
            });
        }
        session.clear();
        info!(mime_type = %image.mime_type, size = image.data.len(), "image submitted");
        session.store_submitted(image);
        Ok(session.start_run(WorkflowState::Analyzing))
    }

    pub async fn run_analysis(&self, ticket: RunTicket) -> WorkflowState {
        let image = {
            let session = self.session.read().await;
            if !session.is_current(&ticket) {
                return session.state;
            }
            session.submitted_image().cloned()
        };
        let Some(image) = image else {
            return self
                .fail_run(
                    &ticket,
                    GenerationError::AnalysisFailed {
                        reason: "no submitted image".to_string(),
                    },
                )
                .await;
        };

        let result = self.client.analyze(&image, &ticket.cancel).await;

        let mut session = self.session.write().await;
        if !session.is_current(&ticket) {
            debug!(run = ticket.id, "discarding superseded analysis");
            return session.state;
        }
        match result {
            Ok(analysis) => match analysis.rejection_reason() {
                Some(reason) => {
                    info!(reason = %reason, "image rejected by analysis");
                    session.fail(GenerationError::ValidationRejected { reason }.to_string());
                }
                None => {
                    session.analysis = Some(analysis);
                    session.transition(WorkflowState::Idle);
                }
            },
            Err(err) => session.fail(err.to_string()),
        }
        session.state
    }

    /// Generates the lifestyle image and then the video ad. Returns the resulting state.
    pub async fn generate_visuals(&self) -> Result<WorkflowState, WorkflowError> {
        let ticket = self.begin_generate_visuals().await?;
        Ok(self.run_visuals(ticket).await)
    }

    /// Requires a stored analysis and no run in flight. Clears earlier
    /// visuals and moves to `GeneratingImage`.
    pub async fn begin_generate_visuals(&self) -> Result<RunTicket, WorkflowError> {
        let mut session = self.session.write().await;
        if session.state.is_active() {
            return Err(WorkflowError::InvalidTransition {
                action: "generate visuals",
                state: session.state,
            });
        }
        if session.analysis.is_none() {
            return Err(WorkflowError::MissingAnalysis);
        }
        session.clear_visuals();
        Ok(session.start_run(WorkflowState::GeneratingImage))
    }

    pub async fn run_visuals(&self, ticket: RunTicket) -> WorkflowState {
        let directives = {
            let session = self.session.read().await;
            if !session.is_current(&ticket) {
                return session.state;
            }
            session
                .analysis
                .as_ref()
                .map(|analysis| (analysis.image_directive.clone(), analysis.video_directive.clone()))
        };
        let Some((image_directive, video_directive)) = directives else {
            return self
                .fail_run(
                    &ticket,
                    GenerationError::AnalysisFailed {
                        reason: "no analysis result available".to_string(),
                    },
                )
                .await;
        };

        let image = match self
            .client
            .generate_image(&image_directive.prompt, &image_directive.aspect_ratio, &ticket.cancel)
            .await
        {
            Ok(image) => image,
            Err(err) => return self.fail_run(&ticket, err).await,
        };
        {
            let mut session = self.session.write().await;
            if !session.is_current(&ticket) {
                debug!(run = ticket.id, "discarding superseded image");
                return session.state;
            }
            session.store_generated_image(image);
            session.transition(WorkflowState::GeneratingVideo);
        }

        let video = match self
            .client
            .generate_video(&video_directive.prompt, &video_directive.aspect_ratio, &ticket.cancel)
            .await
        {
            Ok(video) => video,
            Err(err) => return self.fail_run(&ticket, err).await,
        };
        let mut session = self.session.write().await;
        if !session.is_current(&ticket) {
            debug!(run = ticket.id, "discarding superseded video");
            return session.state;
        }
        session.store_generated_video(video);
        session.transition(WorkflowState::Complete);
        session.state
    }

    /// Valid from any state. Cancels the run in flight and clears everything.
    pub async fn reset(&self) -> WorkflowSnapshot {
        let mut session = self.session.write().await;
        session.abandon_run();
        session.clear();
        session.transition(WorkflowState::Idle);
        session.snapshot()
    }

    async fn fail_run(&self, ticket: &RunTicket, err: GenerationError) -> WorkflowState {
        let mut session = self.session.write().await;
        if session.is_current(ticket) {
            session.fail(err.to_string());
        } else {
            debug!(run = ticket.id, error = %err, "ignoring error from superseded run");
        }
        session.state
    }
}
