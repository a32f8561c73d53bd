//! Real-time pipeline events
//!
//! Events are ephemeral: they are pushed to live sessions and never stored.
//! The event name and camelCase payload form the contract with clients.

use crate::types::{ProjectId, ProjectStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Event names on the real-time channel
pub mod names {
    pub const ANALYSIS_PROGRESS: &str = "project:analysis-progress";
    pub const ANALYSIS_COMPLETED: &str = "project:analysis-completed";
    pub const WIREFRAME_PROGRESS: &str = "project:wireframe-progress";
    pub const WIREFRAME_COMPLETED: &str = "project:wireframe-completed";
    pub const STATUS_CHANGED: &str = "project:status-changed";
    pub const ERROR: &str = "error";
}

/// Named step of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStep {
    Analyzing,
    Structuring,
    Screens,
}

impl AnalysisStep {
    /// Percent complete when the step starts
    #[must_use]
    pub fn progress(self) -> u8 {
        match self {
            Self::Analyzing => 10,
            Self::Structuring => 50,
            Self::Screens => 80,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Analyzing => "AI analyzing your idea...",
            Self::Structuring => "Structuring features and screens...",
            Self::Screens => "Creating screen structure...",
        }
    }
}

/// Everything a pipeline run can broadcast
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum PipelineEvent {
    AnalysisProgress {
        project_id: ProjectId,
        step: AnalysisStep,
        progress: u8,
        message: String,
        timestamp: DateTime<Utc>,
    },
    AnalysisCompleted {
        project_id: ProjectId,
        features_count: usize,
        screens_count: usize,
        timestamp: DateTime<Utc>,
    },
    WireframeProgress {
        project_id: ProjectId,
        screen_name: String,
        current_screen: usize,
        total_screens: usize,
        timestamp: DateTime<Utc>,
    },
    WireframeCompleted {
        project_id: ProjectId,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        project_id: ProjectId,
        status: ProjectStatus,
        project_name: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
        context: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    #[must_use]
    pub fn analysis_progress(project_id: ProjectId, step: AnalysisStep) -> Self {
        Self::AnalysisProgress {
            project_id,
            step,
            progress: step.progress(),
            message: step.message().to_string(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn analysis_completed(
        project_id: ProjectId,
        features_count: usize,
        screens_count: usize,
    ) -> Self {
        Self::AnalysisCompleted {
            project_id,
            features_count,
            screens_count,
            timestamp: Utc::now(),
        }
    }

    /// `current_screen` is 1-based
    #[must_use]
    pub fn wireframe_progress(
        project_id: ProjectId,
        screen_name: impl Into<String>,
        current_screen: usize,
        total_screens: usize,
    ) -> Self {
        Self::WireframeProgress {
            project_id,
            screen_name: screen_name.into(),
            current_screen,
            total_screens,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn wireframe_completed(project_id: ProjectId) -> Self {
        Self::WireframeCompleted {
            project_id,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn status_changed(
        project_id: ProjectId,
        status: ProjectStatus,
        project_name: impl Into<String>,
    ) -> Self {
        Self::StatusChanged {
            project_id,
            status,
            project_name: project_name.into(),
            timestamp: Utc::now(),
        }
    }

    /// Project-scoped error notification
    #[must_use]
    pub fn project_error(project_id: ProjectId, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            context: format!("project:{project_id}"),
            timestamp: Utc::now(),
        }
    }

    /// Channel event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnalysisProgress { .. } => names::ANALYSIS_PROGRESS,
            Self::AnalysisCompleted { .. } => names::ANALYSIS_COMPLETED,
            Self::WireframeProgress { .. } => names::WIREFRAME_PROGRESS,
            Self::WireframeCompleted { .. } => names::WIREFRAME_COMPLETED,
            Self::StatusChanged { .. } => names::STATUS_CHANGED,
            Self::Error { .. } => names::ERROR,
        }
    }

    /// Wire payload
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Completion and error events end a run
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AnalysisCompleted { .. } | Self::WireframeCompleted { .. } | Self::Error { .. }
        )
    }
}
