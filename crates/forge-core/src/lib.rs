//! Forge Core - project lifecycle for the generation pipeline
//!
//! Shared vocabulary of the pipeline crates:
//! - Entities (projects, features, screens) and the analysis artifact
//! - The project status state machine and its compare-and-swap lease
//! - The artifact store contract plus an in-memory implementation
//! - Real-time event payloads
//! - TOML configuration (tier limits, cache TTLs, naming)
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let project = store.create_project(NewProject::new("tenant-a", "a shelf for books")).await?;
//!
//! let machine = ProjectStateMachine::new(store.clone());
//! machine.transition(project.id, ProjectStatus::Analyzing).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod ordering;
pub mod state_machine;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::{Budget, CacheConfig, ForgeConfig, PipelineSettings, TierLimits, TierTable};
pub use error::{ConfigError, PipelineError, StoreError};
pub use events::{AnalysisStep, PipelineEvent};
pub use memory::MemoryStore;
pub use ordering::{assign_screen_orders, is_contiguous};
pub use state_machine::{allowed_transitions, validate_transition, ProjectStateMachine};
pub use store::{AnalysisUpdate, ArtifactStore};
pub use types::{
    AnalysisResult, Feature, FeatureDescriptor, FeatureId, FeaturePriority, ListQuery, NewProject,
    NewScreen, Project, ProjectId, ProjectStatus, ProjectSummary, ProjectWithRelations, Screen,
    ScreenDescriptor, ScreenId, SortOrder, SubscriptionTier, Tenant, TenantId,
    DEFAULT_PROJECT_NAME,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Forge Core
    pub use crate::{
        AnalysisResult, ArtifactStore, ForgeConfig, MemoryStore, NewProject, PipelineError,
        PipelineEvent, Project, ProjectId, ProjectStateMachine, ProjectStatus, Screen,
        SubscriptionTier, Tenant, TenantId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
