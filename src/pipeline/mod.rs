pub mod coordinator;
pub mod event;
pub mod producer;
pub mod queue;
pub mod sinks;
pub mod worker;

pub use coordinator::{Coordinator, Pipeline, PipelineReport};
pub use event::{Event, EventKind, Observation};
pub use queue::EventQueue;

/// Lifecycle of a pipeline, driven by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Producers and workers active; waiting for the stop signal.
    Running,
    /// Producers cancelled; waiting for each of them to return.
    Stopping,
    /// Queue closed; workers finishing what is buffered.
    Draining,
    Stopped,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (PipelineState::Running, PipelineState::Stopping)
                | (PipelineState::Stopping, PipelineState::Draining)
                | (PipelineState::Draining, PipelineState::Stopped)
        )
    }
}
