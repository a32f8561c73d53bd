//! Forge Pipeline - asynchronous generation runs
//!
//! Turns a product idea into features, screens and per-screen wireframes:
//! - [`Pipeline`]: triggers that commit a status change and spawn a run
//! - [`AnalysisOrchestrator`] / [`WireframeOrchestrator`]: the run steps
//! - [`GenerationGateway`], [`ProgressChannel`], [`Notifier`]: collaborators
//! - [`SessionRegistry`]: in-process live sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_pipeline::prelude::*;
//!
//! # async fn example(pipeline: Pipeline, tenant: Tenant, project_id: ProjectId)
//! #     -> Result<(), PipelineError> {
//! let handle = pipeline.start_analysis(&tenant, project_id, "a shelf for books").await?;
//! assert!(handle.wait().await.is_completed());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analysis;
pub mod channel;
pub mod context;
pub mod gateway;
pub mod notify;
pub mod pipeline;
pub mod run;
pub mod wireframe;

// Re-exports for convenience
pub use analysis::{AnalysisOrchestrator, AnalysisSummary, ANALYSIS_FAILED_MESSAGE};
pub use channel::{OutboundEvent, ProgressChannel, Session, SessionId, SessionRegistry};
pub use context::PipelineContext;
pub use gateway::{
    parse_generated_text, GeneratedArtifact, GenerationError, GenerationGateway, GenerationKind,
    GenerationRequest,
};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use pipeline::{Pipeline, WireframeStart};
pub use run::{RunHandle, RunKind, RunOutcome};
pub use wireframe::{WireframeOrchestrator, WireframeSummary, WIREFRAME_FAILED_MESSAGE};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the pipeline
    pub use crate::{
        GeneratedArtifact, GenerationError, GenerationGateway, GenerationRequest, Pipeline,
        PipelineContext, ProgressChannel, RunHandle, RunOutcome, SessionRegistry,
    };
    pub use forge_core::{PipelineError, ProjectId, ProjectStatus, Tenant};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
