//! Error types for Forge
//!
//! Provides error handling for:
//! - Synchronous trigger rejections (admission, illegal transitions)
//! - Pipeline failures caught inside a run
//! - Store operations
//! - Configuration loading

use crate::types::{ProjectId, ProjectStatus, ScreenId};
use std::path::PathBuf;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Tenant quota exhausted
    #[error("admission denied: {reason}")]
    AdmissionDenied { reason: String },

    /// Requested status change is not in the transition graph
    #[error("invalid transition from {current} to {requested}")]
    InvalidTransition {
        current: ProjectStatus,
        requested: ProjectStatus,
    },

    /// Generated payload could not be parsed into the expected structure
    #[error("malformed generation result: {0}")]
    MalformedResult(String),

    /// Generation capability failed (network, provider)
    #[error("generation transport failure: {0}")]
    TransportFailure(String),

    /// Store unavailable or rejected a write
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// Project does not exist or is not owned by the caller
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// Wireframe generation needs at least one screen
    #[error("project {0} has no screens")]
    NoScreens(ProjectId),

    /// A run panicked; caught at the task boundary
    #[error("pipeline run panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    /// Errors returned to the trigger's caller rather than handled by a run
    #[inline]
    #[must_use]
    pub fn is_synchronous(&self) -> bool {
        matches!(
            self,
            Self::AdmissionDenied { .. }
                | Self::InvalidTransition { .. }
                | Self::ProjectNotFound(_)
                | Self::NoScreens(_)
        )
    }

    /// Stable tag for logs and run outcomes
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::AdmissionDenied { .. } => "admission_denied",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::MalformedResult(_) => "malformed_result",
            Self::TransportFailure(_) => "transport_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::NoScreens(_) => "no_screens",
            Self::Panicked(_) => "panicked",
        }
    }

    #[inline]
    pub fn invalid_transition(current: ProjectStatus, requested: ProjectStatus) -> Self {
        Self::InvalidTransition { current, requested }
    }
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("screen not found: {0}")]
    ScreenNotFound(ScreenId),

    /// Compare-and-swap on status lost
    #[error("status conflict: expected {expected}, found {actual}")]
    StatusConflict {
        expected: ProjectStatus,
        actual: ProjectStatus,
    },

    /// Write would break dense 1..K screen ordering
    #[error("invalid screen order: {0}")]
    InvalidOrder(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
