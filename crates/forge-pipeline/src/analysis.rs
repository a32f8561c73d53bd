//! Analysis pass: idea to features and screens
//!
//! Runs after the trigger has committed `DRAFT -> ANALYZING`, or
//! `READY -> WIREFRAMING` for a re-analysis of a finished project. Commits are
//! incremental (project fields and status, then features, then screens);
//! a failure reverts the status to DRAFT and leaves earlier commits in place
//! until the next analysis start clears them.

use crate::context::PipelineContext;
use crate::gateway::GenerationRequest;
use crate::run::{spawn_run, RunHandle, RunKind};
use forge_core::{
    assign_screen_orders, AnalysisResult, AnalysisStep, AnalysisUpdate, PipelineError,
    PipelineEvent, ProjectId, ProjectStatus, Tenant,
};

/// User-facing message broadcast when an analysis run fails
pub const ANALYSIS_FAILED_MESSAGE: &str = "AI analysis failed. Please try again.";

/// What a successful pass produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub project_name: String,
    pub features_count: usize,
    pub screens_count: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    ctx: PipelineContext,
}

impl AnalysisOrchestrator {
    #[must_use]
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Execute every step of one pass; the project must be ANALYZING
    ///
    /// # Errors
    /// Any pipeline failure; the caller routes it to [`Self::recover`]
    pub async fn run_analysis(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        description: &str,
    ) -> Result<AnalysisSummary, PipelineError> {
        self.run_from(tenant, project_id, description, ProjectStatus::Analyzing)
            .await
    }

    /// Re-run the pass on a project that re-entered through
    /// `READY -> WIREFRAMING`; the project must be WIREFRAMING
    ///
    /// # Errors
    /// Any pipeline failure; the caller routes it to [`Self::recover`]
    pub async fn run_reanalysis(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        description: &str,
    ) -> Result<AnalysisSummary, PipelineError> {
        self.run_from(tenant, project_id, description, ProjectStatus::Wireframing)
            .await
    }

    async fn run_from(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        description: &str,
        entry: ProjectStatus,
    ) -> Result<AnalysisSummary, PipelineError> {
        let ctx = &self.ctx;
        let owner = &tenant.id;
        tracing::info!(
            project_id = %project_id,
            tenant = %owner,
            entry = %entry,
            "analysis started"
        );

        ctx.store.clear_analysis(project_id).await?;

        ctx.emit(owner, PipelineEvent::analysis_progress(project_id, AnalysisStep::Analyzing))
            .await;
        let artifact = ctx
            .metered_generate(
                tenant,
                &GenerationRequest::Analysis {
                    description: description.to_string(),
                },
            )
            .await?;
        let result = parse_analysis(&artifact.payload)?;
        tracing::debug!(
            project_id = %project_id,
            features = result.features.len(),
            screens = result.screens.len(),
            "analysis result parsed"
        );

        ctx.emit(owner, PipelineEvent::analysis_progress(project_id, AnalysisStep::Structuring))
            .await;
        let project_name = result
            .app_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ctx.config.pipeline.fallback_project_name.clone());
        ctx.store
            .record_analysis(
                project_id,
                AnalysisUpdate {
                    name: project_name.clone(),
                    app_type: result.app_type.clone(),
                    analysis: artifact.payload,
                },
            )
            .await?;
        if entry == ProjectStatus::Analyzing {
            ctx.machine
                .transition_from(project_id, ProjectStatus::Analyzing, ProjectStatus::Wireframing)
                .await?;
        }
        let features = ctx.store.bulk_insert_features(project_id, &result.features).await?;
        ctx.emit(
            owner,
            PipelineEvent::status_changed(project_id, ProjectStatus::Wireframing, &project_name),
        )
        .await;

        ctx.emit(owner, PipelineEvent::analysis_progress(project_id, AnalysisStep::Screens))
            .await;
        let screens = ctx
            .store
            .bulk_insert_screens(project_id, &assign_screen_orders(&result.screens))
            .await?;
        ctx.machine
            .transition_from(project_id, ProjectStatus::Wireframing, ProjectStatus::Ready)
            .await?;

        ctx.emit(
            owner,
            PipelineEvent::status_changed(project_id, ProjectStatus::Ready, &project_name),
        )
        .await;
        ctx.emit(
            owner,
            PipelineEvent::analysis_completed(project_id, features.len(), screens.len()),
        )
        .await;

        if ctx.config.pipeline.notify_on_ready {
            ctx.notify_ready(owner, &project_name, project_id);
        }
        ctx.invalidate(project_id, owner).await;

        tracing::info!(
            project_id = %project_id,
            features = features.len(),
            screens = screens.len(),
            "analysis completed"
        );
        Ok(AnalysisSummary {
            project_name,
            features_count: features.len(),
            screens_count: screens.len(),
        })
    }

    /// Revert to DRAFT and tell the tenant
    pub async fn recover(&self, tenant: &Tenant, project_id: ProjectId, error: &PipelineError) {
        let ctx = &self.ctx;
        let owner = &tenant.id;
        tracing::error!(
            project_id = %project_id,
            category = error.category(),
            error = %error,
            "analysis failed"
        );

        match ctx.machine.transition(project_id, ProjectStatus::Draft).await {
            Ok(_) => {
                ctx.emit(
                    owner,
                    PipelineEvent::status_changed(
                        project_id,
                        ProjectStatus::Draft,
                        &ctx.config.pipeline.failed_analysis_name,
                    ),
                )
                .await;
            }
            Err(e) => {
                tracing::error!(
                    project_id = %project_id,
                    error = %e,
                    "could not revert project to DRAFT"
                );
            }
        }
        ctx.emit(owner, PipelineEvent::project_error(project_id, ANALYSIS_FAILED_MESSAGE))
            .await;
        ctx.invalidate(project_id, owner).await;
    }

    /// Spawn a pass; `entry` is the status the trigger committed,
    /// ANALYZING or WIREFRAMING
    pub(crate) fn spawn(
        &self,
        tenant: Tenant,
        project_id: ProjectId,
        description: String,
        entry: ProjectStatus,
    ) -> RunHandle {
        let worker = self.clone();
        let recoverer = self.clone();
        let recover_tenant = tenant.clone();

        spawn_run(
            RunKind::Analysis,
            project_id,
            async move {
                worker
                    .run_from(&tenant, project_id, &description, entry)
                    .await
                    .map(|_| ())
            },
            move |error| async move {
                recoverer.recover(&recover_tenant, project_id, &error).await;
            },
        )
    }
}

fn parse_analysis(payload: &serde_json::Value) -> Result<AnalysisResult, PipelineError> {
    if !payload.is_object() {
        return Err(PipelineError::MalformedResult(
            "analysis result is not a JSON object".to_string(),
        ));
    }
    serde_json::from_value(payload.clone())
        .map_err(|e| PipelineError::MalformedResult(e.to_string()))
}
