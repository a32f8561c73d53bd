//! Trigger surface for external layers
//!
//! Each trigger checks ownership and admission, commits the status change,
//! then spawns the run and returns. Quota denials and illegal transitions
//! come back synchronously; everything after the spawn is handled inside
//! the run.

use crate::analysis::AnalysisOrchestrator;
use crate::context::PipelineContext;
use crate::run::RunHandle;
use crate::wireframe::WireframeOrchestrator;
use forge_cache::ListKey;
use forge_core::{
    ListQuery, PipelineError, PipelineEvent, Project, ProjectId, ProjectStatus, ProjectSummary,
    ProjectWithRelations, Screen, ScreenId, StoreError, Tenant,
};
use std::sync::Arc;

/// A started wireframe run
#[derive(Debug)]
pub struct WireframeStart {
    pub handle: RunHandle,
    pub screen_count: usize,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: PipelineContext,
    analysis: AnalysisOrchestrator,
    wireframes: WireframeOrchestrator,
}

impl Pipeline {
    #[must_use]
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            analysis: AnalysisOrchestrator::new(ctx.clone()),
            wireframes: WireframeOrchestrator::new(ctx.clone()),
            ctx,
        }
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Start an analysis pass on a DRAFT project
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if missing or owned by someone else
    /// - `PipelineError::AdmissionDenied` if the tenant is out of quota
    /// - `PipelineError::InvalidTransition` if the project is not DRAFT
    pub async fn start_analysis(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        description: impl Into<String>,
    ) -> Result<RunHandle, PipelineError> {
        let project = self.owned_project(tenant, project_id).await?;
        self.begin_analysis(tenant, &project, description.into(), ProjectStatus::Analyzing)
            .await
    }

    /// Re-run analysis from the stored description, replacing features,
    /// screens and the analysis result
    ///
    /// A DRAFT project enters through `DRAFT -> ANALYZING`. A READY project
    /// re-enters through `READY -> WIREFRAMING` and the pass runs from there.
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if missing or owned by someone else
    /// - `PipelineError::AdmissionDenied` if the tenant is out of quota
    /// - `PipelineError::InvalidTransition` if the project is neither DRAFT
    ///   nor READY
    pub async fn start_reanalysis(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
    ) -> Result<RunHandle, PipelineError> {
        let project = self.owned_project(tenant, project_id).await?;
        let entry = if project.status == ProjectStatus::Ready {
            ProjectStatus::Wireframing
        } else {
            ProjectStatus::Analyzing
        };
        let description = project.description.clone();
        self.begin_analysis(tenant, &project, description, entry)
            .await
    }

    /// Start a wireframe pass on a READY project with at least one screen
    ///
    /// Only READY may enter WIREFRAMING for a wireframe pass. A failed pass
    /// leaves the project DRAFT with its partial layouts, and the way back is
    /// [`Self::start_reanalysis`], which replaces the screens and so drops
    /// those layouts.
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if missing or owned by someone else
    /// - `PipelineError::AdmissionDenied` if the tenant is out of quota
    /// - `PipelineError::NoScreens` if the project has no screens
    /// - `PipelineError::InvalidTransition` if the project is not READY
    pub async fn start_wireframe_generation(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
    ) -> Result<WireframeStart, PipelineError> {
        let relations = self.owned_relations(tenant, project_id).await?;
        self.ctx.admit(tenant).await?;

        let screen_count = relations.screens.len();
        if screen_count == 0 {
            return Err(PipelineError::NoScreens(project_id));
        }

        let project = relations.project;
        self.ctx
            .machine
            .transition_from(project_id, project.status, ProjectStatus::Wireframing)
            .await?;
        self.ctx
            .emit(
                &tenant.id,
                PipelineEvent::status_changed(
                    project_id,
                    ProjectStatus::Wireframing,
                    &project.name,
                ),
            )
            .await;
        self.ctx.invalidate(project_id, &tenant.id).await;

        tracing::info!(
            project_id = %project_id,
            tenant = %tenant.id,
            screens = screen_count,
            "wireframe generation triggered"
        );
        let handle = self.wireframes.spawn(tenant.clone(), project_id, project.name);
        Ok(WireframeStart {
            handle,
            screen_count,
        })
    }

    /// Project with features and screens, served from the read-through cache
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if missing or owned by someone else
    /// - `PipelineError::PersistenceFailure` if the store read fails
    pub async fn project(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
    ) -> Result<Arc<ProjectWithRelations>, PipelineError> {
        let relations = self
            .ctx
            .cache
            .project(self.ctx.store.as_ref(), project_id)
            .await
            .map_err(|e| lookup_error(project_id, e))?;
        if relations.project.owner == tenant.id {
            Ok(relations)
        } else {
            Err(PipelineError::ProjectNotFound(project_id))
        }
    }

    /// The tenant's projects for `query`, served from the read-through cache
    ///
    /// # Errors
    /// - `PipelineError::PersistenceFailure` if the store read fails
    pub async fn projects(
        &self,
        tenant: &Tenant,
        query: ListQuery,
    ) -> Result<Arc<Vec<ProjectSummary>>, PipelineError> {
        let key = ListKey::new(tenant.id.clone(), query);
        Ok(self
            .ctx
            .cache
            .project_list(self.ctx.store.as_ref(), key)
            .await?)
    }

    /// Renumber the project's screens in the given order
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if missing or owned by someone else
    /// - `PipelineError::PersistenceFailure` if `ordered` is not a
    ///   permutation of the project's screens
    pub async fn reorder_screens(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        ordered: &[ScreenId],
    ) -> Result<Vec<Screen>, PipelineError> {
        self.owned_project(tenant, project_id).await?;
        let screens = self.ctx.store.reorder_screens(project_id, ordered).await?;
        self.ctx.invalidate(project_id, &tenant.id).await;
        Ok(screens)
    }

    /// Delete one screen of the project, closing the gap in the order
    ///
    /// # Errors
    /// - `PipelineError::ProjectNotFound` if missing or owned by someone else
    /// - `PipelineError::PersistenceFailure` if the screen is not part of
    ///   the project
    pub async fn delete_screen(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        screen_id: ScreenId,
    ) -> Result<(), PipelineError> {
        let relations = self.owned_relations(tenant, project_id).await?;
        if !relations.screens.iter().any(|s| s.id == screen_id) {
            return Err(StoreError::ScreenNotFound(screen_id).into());
        }
        self.ctx.store.delete_screen(screen_id).await?;
        self.ctx.invalidate(project_id, &tenant.id).await;
        Ok(())
    }

    async fn begin_analysis(
        &self,
        tenant: &Tenant,
        project: &Project,
        description: String,
        entry: ProjectStatus,
    ) -> Result<RunHandle, PipelineError> {
        self.ctx.admit(tenant).await?;
        self.ctx
            .machine
            .transition_from(project.id, project.status, entry)
            .await?;
        self.ctx.invalidate(project.id, &tenant.id).await;

        tracing::info!(
            project_id = %project.id,
            tenant = %tenant.id,
            entry = %entry,
            "analysis triggered"
        );
        Ok(self
            .analysis
            .spawn(tenant.clone(), project.id, description, entry))
    }

    async fn owned_project(
        &self,
        tenant: &Tenant,
        id: ProjectId,
    ) -> Result<Project, PipelineError> {
        let project = self.ctx.store.find_project(id).await.map_err(|e| lookup_error(id, e))?;
        if project.owner == tenant.id {
            Ok(project)
        } else {
            Err(PipelineError::ProjectNotFound(id))
        }
    }

    async fn owned_relations(
        &self,
        tenant: &Tenant,
        id: ProjectId,
    ) -> Result<ProjectWithRelations, PipelineError> {
        let relations = self
            .ctx
            .store
            .find_project_with_relations(id)
            .await
            .map_err(|e| lookup_error(id, e))?;
        if relations.project.owner == tenant.id {
            Ok(relations)
        } else {
            Err(PipelineError::ProjectNotFound(id))
        }
    }
}

fn lookup_error(id: ProjectId, error: StoreError) -> PipelineError {
    match error {
        StoreError::ProjectNotFound(_) => PipelineError::ProjectNotFound(id),
        other => PipelineError::PersistenceFailure(other),
    }
}
