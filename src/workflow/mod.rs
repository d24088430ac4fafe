pub mod orchestrator;
pub mod state;

pub use orchestrator::Workflow;
pub use state::{RunTicket, WorkflowSnapshot, WorkflowState};
