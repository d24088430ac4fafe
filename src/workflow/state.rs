use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::resources::{ResourceHandle, ResourceStore};
use crate::types::{AnalysisResult, GeneratedImage, GeneratedVideo, SubmittedImage};

/// Pipeline progress. `Complete` and `Error` are terminal until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Idle,
    Analyzing,
    GeneratingImage,
    GeneratingVideo,
    Complete,
    Error,
}

impl WorkflowState {
    /// A remote call is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            WorkflowState::Analyzing | WorkflowState::GeneratingImage | WorkflowState::GeneratingVideo
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "IDLE",
            WorkflowState::Analyzing => "ANALYZING",
            WorkflowState::GeneratingImage => "GENERATING_IMAGE",
            WorkflowState::GeneratingVideo => "GENERATING_VIDEO",
            WorkflowState::Complete => "COMPLETE",
            WorkflowState::Error => "ERROR",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one run of the pipeline. Results are only applied while the
/// ticket is still the session's current run.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub(crate) id: u64,
    pub(crate) cancel: CancellationToken,
}

impl RunTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub error: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub submitted_image: Option<ResourceHandle>,
    pub generated_image: Option<ResourceHandle>,
    pub generated_video: Option<ResourceHandle>,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    handle: Option<ResourceHandle>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            value: None,
            handle: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) state: WorkflowState,
    pub(crate) error: Option<String>,
    run_id: u64,
    cancel: CancellationToken,
    submitted: Slot<SubmittedImage>,
    pub(crate) analysis: Option<AnalysisResult>,
    generated_image: Slot<GeneratedImage>,
    generated_video: Slot<GeneratedVideo>,
    pub(crate) resources: ResourceStore,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
            error: None,
            run_id: 0,
            cancel: CancellationToken::new(),
            submitted: Slot::empty(),
            analysis: None,
            generated_image: Slot::empty(),
            generated_video: Slot::empty(),
            resources: ResourceStore::new(),
        }
    }

    pub(crate) fn transition(&mut self, next: WorkflowState) {
        if self.state != next {
            info!(from = %self.state, to = %next, run = self.run_id, "workflow transition");
        }
        self.state = next;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.transition(WorkflowState::Error);
    }

    /// Cancels whatever run is in flight and opens a new one in `state`.
    pub(crate) fn start_run(&mut self, state: WorkflowState) -> RunTicket {
        self.cancel.cancel();
        self.run_id += 1;
        self.cancel = CancellationToken::new();
        self.error = None;
        self.transition(state);
        RunTicket {
            id: self.run_id,
            cancel: self.cancel.clone(),
        }
    }

    /// Invalidates the current run without starting another one.
    pub(crate) fn abandon_run(&mut self) {
        self.cancel.cancel();
        self.run_id += 1;
        self.cancel = CancellationToken::new();
    }

    pub(crate) fn is_current(&self, ticket: &RunTicket) -> bool {
        self.run_id == ticket.id
    }

    pub(crate) fn submitted_image(&self) -> Option<&SubmittedImage> {
        self.submitted.value.as_ref()
    }

    pub(crate) fn generated_image(&self) -> Option<&GeneratedImage> {
        self.generated_image.value.as_ref()
    }

    pub(crate) fn generated_video(&self) -> Option<&GeneratedVideo> {
        self.generated_video.value.as_ref()
    }

    pub(crate) fn store_submitted(&mut self, image: SubmittedImage) {
        let handle = self.resources.put(image.data.clone(), &image.mime_type);
        self.submitted = Slot {
            value: Some(image),
            handle: Some(handle),
        };
    }

    pub(crate) fn store_generated_image(&mut self, image: GeneratedImage) {
        let handle = self.resources.put(image.data.clone(), &image.mime_type);
        self.generated_image = Slot {
            value: Some(image),
            handle: Some(handle),
        };
    }

    pub(crate) fn store_generated_video(&mut self, video: GeneratedVideo) {
        let handle = self.resources.put(video.data.clone(), &video.mime_type);
        self.generated_video = Slot {
            value: Some(video),
            handle: Some(handle),
        };
    }

    /// Drops generated visuals and revokes their resources.
    pub(crate) fn clear_visuals(&mut self) {
        for slot_handle in [
            self.generated_image.handle.take(),
            self.generated_video.handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            if !self.is_shared(&slot_handle.key) {
                self.resources.revoke(&slot_handle.key);
            }
        }
        self.generated_image = Slot::empty();
        self.generated_video = Slot::empty();
    }

    /// Drops every stored entity and resource.
    pub(crate) fn clear(&mut self) {
        self.submitted = Slot::empty();
        self.analysis = None;
        self.generated_image = Slot::empty();
        self.generated_video = Slot::empty();
        self.resources.clear();
        self.error = None;
    }

    // Identical payloads share a content key; keep the entry while another slot uses it.
    fn is_shared(&self, key: &str) -> bool {
        [
            &self.submitted.handle,
            &self.generated_image.handle,
            &self.generated_video.handle,
        ]
        .into_iter()
        .flatten()
        .any(|handle| handle.key == key)
    }

    pub(crate) fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            state: self.state,
            error: self.error.clone(),
            analysis: self.analysis.clone(),
            submitted_image: self.submitted.handle.clone(),
            generated_image: self.generated_image.handle.clone(),
            generated_video: self.generated_video.handle.clone(),
        }
    }
}
