//! Artifact store contract
//!
//! Durable storage for projects, features and screens. Each method is one
//! atomic write or read; the pipeline commits incrementally and never holds a
//! transaction across generation calls.

use crate::error::StoreError;
use crate::types::{
    Feature, FeatureDescriptor, ListQuery, NewProject, NewScreen, Project, ProjectId,
    ProjectStatus, ProjectSummary, ProjectWithRelations, Screen, ScreenId, TenantId,
};
use async_trait::async_trait;

/// Fields written to a project by a successful analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    pub name: String,
    pub app_type: Option<String>,
    pub analysis: serde_json::Value,
}

/// Persistence operations used by the pipeline
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Insert a project in DRAFT status
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;

    /// Project with features and screens (screens ascending by order)
    async fn find_project_with_relations(
        &self,
        id: ProjectId,
    ) -> Result<ProjectWithRelations, StoreError>;

    async fn find_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.find_project_with_relations(id)
            .await
            .map(|relations| relations.project)
    }

    /// Compare-and-swap the status
    ///
    /// # Errors
    /// - `StoreError::StatusConflict` if the current status is not `expected`
    async fn update_project_status(
        &self,
        id: ProjectId,
        expected: ProjectStatus,
        next: ProjectStatus,
    ) -> Result<Project, StoreError>;

    /// Write name, type and analysis payload
    async fn record_analysis(
        &self,
        id: ProjectId,
        update: AnalysisUpdate,
    ) -> Result<Project, StoreError>;

    /// Delete features and screens and clear the analysis payload
    async fn clear_analysis(&self, id: ProjectId) -> Result<(), StoreError>;

    async fn bulk_insert_features(
        &self,
        project_id: ProjectId,
        features: &[FeatureDescriptor],
    ) -> Result<Vec<Feature>, StoreError>;

    /// Insert screens with empty wireframes
    ///
    /// # Errors
    /// - `StoreError::InvalidOrder` if the project's orders would not be `1..=K`
    async fn bulk_insert_screens(
        &self,
        project_id: ProjectId,
        screens: &[NewScreen],
    ) -> Result<Vec<Screen>, StoreError>;

    async fn update_screen_wireframe(
        &self,
        screen_id: ScreenId,
        wireframe: serde_json::Value,
    ) -> Result<Screen, StoreError>;

    /// Renumber screens `1..=K` following `ordered`, which must list every
    /// screen of the project exactly once
    async fn reorder_screens(
        &self,
        project_id: ProjectId,
        ordered: &[ScreenId],
    ) -> Result<Vec<Screen>, StoreError>;

    /// Delete one screen and close the gap it leaves
    async fn delete_screen(&self, screen_id: ScreenId) -> Result<(), StoreError>;

    async fn list_projects(
        &self,
        owner: &TenantId,
        query: &ListQuery,
    ) -> Result<Vec<ProjectSummary>, StoreError>;
}
