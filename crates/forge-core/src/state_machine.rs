//! Project lifecycle state machine
//!
//! ```text
//! DRAFT -> ANALYZING -> WIREFRAMING -> READY
//!            |              |            |
//!            v              v            |
//!          DRAFT          DRAFT          +--> WIREFRAMING
//! ```
//!
//! The status field doubles as the per-project lease: every change is a
//! compare-and-swap against the status the caller observed, so two runs can
//! never both move a project into a pipeline status.

use crate::error::{PipelineError, StoreError};
use crate::store::ArtifactStore;
use crate::types::{Project, ProjectId, ProjectStatus};
use std::sync::Arc;

/// Statuses reachable from `from` through the pipeline
#[must_use]
pub fn allowed_transitions(from: ProjectStatus) -> &'static [ProjectStatus] {
    use ProjectStatus::*;
    match from {
        Draft => &[Analyzing],
        Analyzing => &[Wireframing, Draft],
        Wireframing => &[Ready, Draft],
        Ready => &[Wireframing],
        InDevelopment | Completed | Archived => &[],
    }
}

/// # Errors
/// - `PipelineError::InvalidTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: ProjectStatus, to: ProjectStatus) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::invalid_transition(from, to))
    }
}

/// Applies validated status changes through the store
#[derive(Clone)]
pub struct ProjectStateMachine {
    store: Arc<dyn ArtifactStore>,
}

impl ProjectStateMachine {
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Move the project from its current status to `requested`
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if the project does not exist
    /// - `PipelineError::InvalidTransition` if the edge is illegal or another
    ///   writer changed the status first
    pub async fn transition(
        &self,
        id: ProjectId,
        requested: ProjectStatus,
    ) -> Result<Project, PipelineError> {
        let current = self
            .store
            .find_project(id)
            .await
            .map_err(|e| not_found_or_persistence(id, e))?
            .status;
        self.transition_from(id, current, requested).await
    }

    /// Move the project from `expected` to `requested`, failing if the stored
    /// status is not `expected`
    ///
    /// # Errors
    /// Same as [`Self::transition`]
    pub async fn transition_from(
        &self,
        id: ProjectId,
        expected: ProjectStatus,
        requested: ProjectStatus,
    ) -> Result<Project, PipelineError> {
        validate_transition(expected, requested)?;

        match self.store.update_project_status(id, expected, requested).await {
            Ok(project) => {
                tracing::debug!(
                    project_id = %id,
                    from = %expected,
                    to = %requested,
                    "status changed"
                );
                Ok(project)
            }
            Err(StoreError::StatusConflict { actual, .. }) => {
                tracing::debug!(
                    project_id = %id,
                    %expected,
                    %actual,
                    %requested,
                    "status changed underneath"
                );
                Err(PipelineError::invalid_transition(actual, requested))
            }
            Err(e) => Err(not_found_or_persistence(id, e)),
        }
    }
}

impl std::fmt::Debug for ProjectStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStateMachine").finish_non_exhaustive()
    }
}

fn not_found_or_persistence(id: ProjectId, error: StoreError) -> PipelineError {
    match error {
        StoreError::ProjectNotFound(_) => PipelineError::ProjectNotFound(id),
        other => PipelineError::PersistenceFailure(other),
    }
}
