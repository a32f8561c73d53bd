//! In-memory artifact store
//!
//! Concurrent map-backed [`ArtifactStore`]. Every operation locks one project
//! entry, so each write is atomic per project. Used by tests and the local
//! runner; a database-backed store implements the same trait.

use crate::error::StoreError;
use crate::ordering::is_contiguous;
use crate::store::{AnalysisUpdate, ArtifactStore};
use crate::types::{
    Feature, FeatureDescriptor, FeatureId, ListQuery, NewProject, NewScreen, Project, ProjectId,
    ProjectStatus, ProjectSummary, ProjectWithRelations, Screen, ScreenId, SortOrder, TenantId,
    DEFAULT_PROJECT_NAME,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct ProjectRecord {
    project: Project,
    features: Vec<Feature>,
    screens: Vec<Screen>,
}

impl ProjectRecord {
    fn relations(&self) -> ProjectWithRelations {
        let mut screens = self.screens.clone();
        screens.sort_by_key(|s| s.order);
        ProjectWithRelations {
            project: self.project.clone(),
            features: self.features.clone(),
            screens,
        }
    }

    fn sorted_screens(&self) -> Vec<Screen> {
        let mut screens = self.screens.clone();
        screens.sort_by_key(|s| s.order);
        screens
    }

    fn touch(&mut self) {
        self.project.updated_at = Utc::now();
    }
}

/// Map-backed store
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: DashMap<ProjectId, ProjectRecord>,
    /// Screen id -> owning project
    screen_owners: DashMap<ScreenId, ProjectId>,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    fn with_record<T>(
        &self,
        id: ProjectId,
        f: impl FnOnce(&mut ProjectRecord) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut entry = self
            .projects
            .get_mut(&id)
            .ok_or(StoreError::ProjectNotFound(id))?;
        f(entry.value_mut())
    }

    fn owner_of(&self, screen_id: ScreenId) -> Result<ProjectId, StoreError> {
        self.screen_owners
            .get(&screen_id)
            .map(|entry| *entry.value())
            .ok_or(StoreError::ScreenNotFound(screen_id))
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn create_project(&self, new: NewProject) -> Result<Project, StoreError> {
        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            owner: new.owner,
            description: new.description,
            name: new.name.unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            app_type: None,
            status: ProjectStatus::Draft,
            analysis: None,
            created_at: now,
            updated_at: now,
        };

        self.projects.insert(
            project.id,
            ProjectRecord {
                project: project.clone(),
                features: Vec::new(),
                screens: Vec::new(),
            },
        );
        Ok(project)
    }

    async fn find_project_with_relations(
        &self,
        id: ProjectId,
    ) -> Result<ProjectWithRelations, StoreError> {
        self.projects
            .get(&id)
            .map(|entry| entry.relations())
            .ok_or(StoreError::ProjectNotFound(id))
    }

    async fn find_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.projects
            .get(&id)
            .map(|entry| entry.project.clone())
            .ok_or(StoreError::ProjectNotFound(id))
    }

    async fn update_project_status(
        &self,
        id: ProjectId,
        expected: ProjectStatus,
        next: ProjectStatus,
    ) -> Result<Project, StoreError> {
        self.with_record(id, |record| {
            if record.project.status != expected {
                return Err(StoreError::StatusConflict {
                    expected,
                    actual: record.project.status,
                });
            }
            record.project.status = next;
            record.touch();
            Ok(record.project.clone())
        })
    }

    async fn record_analysis(
        &self,
        id: ProjectId,
        update: AnalysisUpdate,
    ) -> Result<Project, StoreError> {
        self.with_record(id, |record| {
            record.project.name = update.name;
            record.project.app_type = update.app_type;
            record.project.analysis = Some(update.analysis);
            record.touch();
            Ok(record.project.clone())
        })
    }

    async fn clear_analysis(&self, id: ProjectId) -> Result<(), StoreError> {
        let removed: Vec<ScreenId> = self.with_record(id, |record| {
            record.features.clear();
            record.project.analysis = None;
            record.touch();
            Ok(record.screens.drain(..).map(|s| s.id).collect())
        })?;

        for screen_id in removed {
            self.screen_owners.remove(&screen_id);
        }
        Ok(())
    }

    async fn bulk_insert_features(
        &self,
        project_id: ProjectId,
        features: &[FeatureDescriptor],
    ) -> Result<Vec<Feature>, StoreError> {
        self.with_record(project_id, |record| {
            let rows: Vec<Feature> = features
                .iter()
                .map(|d| Feature {
                    id: FeatureId::new(),
                    project_id,
                    name: d.name.clone(),
                    description: d.description.clone(),
                    category: d.category.clone(),
                    priority: d.priority,
                    estimated_hours: d.estimated_hours,
                    complexity: d.complexity,
                })
                .collect();
            record.features.extend(rows.iter().cloned());
            record.touch();
            Ok(rows)
        })
    }

    async fn bulk_insert_screens(
        &self,
        project_id: ProjectId,
        screens: &[NewScreen],
    ) -> Result<Vec<Screen>, StoreError> {
        let rows = self.with_record(project_id, |record| {
            let orders = record
                .screens
                .iter()
                .map(|s| s.order)
                .chain(screens.iter().map(|s| s.order));
            if !is_contiguous(orders) {
                return Err(StoreError::InvalidOrder(format!(
                    "inserting {} screens into project {project_id} would leave gaps or duplicates",
                    screens.len()
                )));
            }

            let rows: Vec<Screen> = screens
                .iter()
                .map(|s| Screen {
                    id: ScreenId::new(),
                    project_id,
                    name: s.name.clone(),
                    screen_type: s.screen_type.clone(),
                    order: s.order,
                    wireframe: serde_json::json!({}),
                    connections: Vec::new(),
                })
                .collect();
            record.screens.extend(rows.iter().cloned());
            record.touch();
            Ok(rows)
        })?;

        for screen in &rows {
            self.screen_owners.insert(screen.id, project_id);
        }
        Ok(rows)
    }

    async fn update_screen_wireframe(
        &self,
        screen_id: ScreenId,
        wireframe: serde_json::Value,
    ) -> Result<Screen, StoreError> {
        let owner = self.owner_of(screen_id)?;
        self.with_record(owner, |record| {
            let screen = record
                .screens
                .iter_mut()
                .find(|s| s.id == screen_id)
                .ok_or(StoreError::ScreenNotFound(screen_id))?;
            screen.wireframe = wireframe;
            let updated = screen.clone();
            record.touch();
            Ok(updated)
        })
    }

    async fn reorder_screens(
        &self,
        project_id: ProjectId,
        ordered: &[ScreenId],
    ) -> Result<Vec<Screen>, StoreError> {
        self.with_record(project_id, |record| {
            let known: HashSet<ScreenId> = record.screens.iter().map(|s| s.id).collect();
            let requested: HashSet<ScreenId> = ordered.iter().copied().collect();
            if requested.len() != ordered.len() || requested != known {
                return Err(StoreError::InvalidOrder(format!(
                    "reorder of project {project_id} must list each of its {} screens exactly once",
                    known.len()
                )));
            }

            for (screen_id, order) in ordered.iter().zip(1u32..) {
                if let Some(screen) = record.screens.iter_mut().find(|s| s.id == *screen_id) {
                    screen.order = order;
                }
            }
            record.touch();
            Ok(record.sorted_screens())
        })
    }

    async fn delete_screen(&self, screen_id: ScreenId) -> Result<(), StoreError> {
        let owner = self.owner_of(screen_id)?;
        self.with_record(owner, |record| {
            let index = record
                .screens
                .iter()
                .position(|s| s.id == screen_id)
                .ok_or(StoreError::ScreenNotFound(screen_id))?;
            let removed = record.screens.remove(index);
            for screen in &mut record.screens {
                if screen.order > removed.order {
                    screen.order -= 1;
                }
            }
            record.touch();
            Ok(())
        })?;

        self.screen_owners.remove(&screen_id);
        Ok(())
    }

    async fn list_projects(
        &self,
        owner: &TenantId,
        query: &ListQuery,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut records: Vec<ProjectRecord> = self
            .projects
            .iter()
            .filter(|entry| &entry.project.owner == owner)
            .filter(|entry| match &needle {
                Some(needle) => {
                    entry.project.name.to_lowercase().contains(needle)
                        || entry.project.description.to_lowercase().contains(needle)
                }
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        match query.sort_by.as_deref() {
            Some("name") => records.sort_by(|a, b| a.project.name.cmp(&b.project.name)),
            Some("updatedAt") => records.sort_by_key(|r| r.project.updated_at),
            _ => records.sort_by_key(|r| r.project.created_at),
        }
        if query.sort_order.unwrap_or_default() == SortOrder::Desc {
            records.reverse();
        }

        let skip = (query.page.max(1) as usize - 1) * query.limit as usize;
        Ok(records
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .map(|r| ProjectSummary {
                id: r.project.id,
                name: r.project.name,
                status: r.project.status,
                feature_count: r.features.len(),
                screen_count: r.screens.len(),
                created_at: r.project.created_at,
            })
            .collect())
    }
}
