//! Wireframe pass: one layout per screen
//!
//! Screens are processed in ascending order and each layout is committed as
//! soon as it arrives. The first failure stops the pass; layouts already
//! written are kept.

use crate::context::PipelineContext;
use crate::gateway::GenerationRequest;
use crate::run::{spawn_run, RunHandle, RunKind};
use forge_core::{PipelineError, PipelineEvent, ProjectId, ProjectStatus, Tenant};

/// User-facing message broadcast when a wireframe run fails
pub const WIREFRAME_FAILED_MESSAGE: &str = "Wireframe generation failed. Please try again.";

/// What a successful pass produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireframeSummary {
    pub screens_generated: usize,
}

#[derive(Debug, Clone)]
pub struct WireframeOrchestrator {
    ctx: PipelineContext,
}

impl WireframeOrchestrator {
    #[must_use]
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Generate and store a layout for every screen; the project must be
    /// WIREFRAMING
    ///
    /// # Errors
    /// Any pipeline failure; the caller routes it to [`Self::recover`]
    pub async fn run_wireframe_generation(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
    ) -> Result<WireframeSummary, PipelineError> {
        let ctx = &self.ctx;
        let owner = &tenant.id;

        let relations = ctx.store.find_project_with_relations(project_id).await?;
        let project = relations.project;
        let feature_names: Vec<String> = relations.features.into_iter().map(|f| f.name).collect();
        let mut screens = relations.screens;
        screens.sort_by_key(|s| s.order);
        let total = screens.len();
        tracing::info!(
            project_id = %project_id,
            tenant = %owner,
            screens = total,
            "wireframe generation started"
        );

        for (index, screen) in screens.iter().enumerate() {
            ctx.emit(
                owner,
                PipelineEvent::wireframe_progress(project_id, &screen.name, index + 1, total),
            )
            .await;

            let artifact = ctx
                .metered_generate(
                    tenant,
                    &GenerationRequest::Wireframe {
                        screen_name: screen.name.clone(),
                        screen_type: screen.screen_type.clone(),
                        app_description: project.description.clone(),
                        feature_names: feature_names.clone(),
                    },
                )
                .await?;
            let layout = validate_layout(artifact.payload)?;

            ctx.store.update_screen_wireframe(screen.id, layout).await?;
            ctx.invalidate(project_id, owner).await;
            tracing::debug!(
                project_id = %project_id,
                screen = %screen.name,
                current = index + 1,
                total,
                "wireframe stored"
            );
        }

        ctx.machine
            .transition_from(project_id, ProjectStatus::Wireframing, ProjectStatus::Ready)
            .await?;
        ctx.emit(
            owner,
            PipelineEvent::status_changed(project_id, ProjectStatus::Ready, &project.name),
        )
        .await;
        ctx.emit(owner, PipelineEvent::wireframe_completed(project_id)).await;
        ctx.invalidate(project_id, owner).await;

        tracing::info!(project_id = %project_id, screens = total, "wireframe generation completed");
        Ok(WireframeSummary {
            screens_generated: total,
        })
    }

    /// Revert to DRAFT and tell the tenant; stored layouts stay
    pub async fn recover(
        &self,
        tenant: &Tenant,
        project_id: ProjectId,
        project_name: &str,
        error: &PipelineError,
    ) {
        let ctx = &self.ctx;
        let owner = &tenant.id;
        tracing::error!(
            project_id = %project_id,
            category = error.category(),
            error = %error,
            "wireframe generation failed"
        );

        match ctx.machine.transition(project_id, ProjectStatus::Draft).await {
            Ok(_) => {
                ctx.emit(
                    owner,
                    PipelineEvent::status_changed(project_id, ProjectStatus::Draft, project_name),
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
        ctx.emit(owner, PipelineEvent::project_error(project_id, WIREFRAME_FAILED_MESSAGE))
            .await;
        ctx.invalidate(project_id, owner).await;
    }

    pub(crate) fn spawn(
        &self,
        tenant: Tenant,
        project_id: ProjectId,
        project_name: String,
    ) -> RunHandle {
        let worker = self.clone();
        let recoverer = self.clone();
        let recover_tenant = tenant.clone();

        spawn_run(
            RunKind::Wireframe,
            project_id,
            async move {
                worker
                    .run_wireframe_generation(&tenant, project_id)
                    .await
                    .map(|_| ())
            },
            move |error| async move {
                recoverer
                    .recover(&recover_tenant, project_id, &project_name, &error)
                    .await;
            },
        )
    }
}

/// A layout must be a non-empty JSON object; an empty one is
/// indistinguishable from "not generated"
fn validate_layout(payload: serde_json::Value) -> Result<serde_json::Value, PipelineError> {
    match &payload {
        serde_json::Value::Object(map) if !map.is_empty() => Ok(payload),
        serde_json::Value::Object(_) => Err(PipelineError::MalformedResult(
            "wireframe layout is empty".to_string(),
        )),
        _ => Err(PipelineError::MalformedResult(
            "wireframe layout is not a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layout_validation() {
        assert!(validate_layout(json!({"components": []})).is_ok());
        assert!(validate_layout(json!({})).is_err());
        assert!(validate_layout(json!("grid")).is_err());
        assert!(validate_layout(serde_json::Value::Null).is_err());
    }
}
