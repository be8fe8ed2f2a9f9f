use tracing::debug;
use uuid::Uuid;

use crate::artifact::ArtifactPath;
use crate::error::PipelineError;

/// Lifecycle of one transformation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Fetching,
    Transforming,
    Persisted,
    Served,
    Deleted,
    Failed,
}

impl JobState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Deleted | JobState::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Fetching, Transforming)
            | (Transforming, Persisted)
            | (Persisted, Served)
            | (Served, Deleted) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// One request's journey through the pipeline.
///
/// Owned by the task executing the request; never shared.
#[derive(Debug)]
pub struct ImageJob {
    source_url: String,
    artifact: ArtifactPath,
    state: JobState,
}

impl ImageJob {
    /// Start a job in the `Fetching` state.
    pub fn new(source_url: impl Into<String>, artifact: ArtifactPath) -> Self {
        Self {
            source_url: source_url.into(),
            artifact,
            state: JobState::Fetching,
        }
    }

    /// Unique job identifier (shared with its artifact).
    pub fn id(&self) -> Uuid {
        self.artifact.id()
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn artifact(&self) -> &ArtifactPath {
        &self.artifact
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`, returning `false` and staying put if the transition is illegal.
    pub fn advance(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        debug!(job = %self.id(), from = ?self.state, to = ?next, "Job state change");
        self.state = next;
        true
    }

    /// Mark the job failed and hand back the error for propagation.
    pub fn fail(&mut self, err: impl Into<PipelineError>) -> PipelineError {
        let err = err.into();
        debug!(job = %self.id(), state = ?self.state, "Job failed: {}", err);
        self.advance(JobState::Failed);
        err
    }
}
