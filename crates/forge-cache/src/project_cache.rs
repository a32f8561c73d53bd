//! Project cache using moka
//!
//! Two keyspaces:
//! - single project with relations, keyed by project id
//! - project listings, keyed by tenant and query

use async_trait::async_trait;
use forge_core::{
    ArtifactStore, CacheConfig, ListQuery, ProjectId, ProjectSummary, ProjectWithRelations,
    StoreError, TenantId,
};
use moka::future::Cache;
use std::sync::Arc;

/// Evicts cached reads after pipeline writes
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Drop the project entry and its owner's first-page listing
    async fn invalidate_project(&self, project_id: ProjectId, owner: &TenantId);
}

/// Key of a cached listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub tenant: TenantId,
    pub query: ListQuery,
}

impl ListKey {
    #[must_use]
    pub fn new(tenant: TenantId, query: ListQuery) -> Self {
        Self { tenant, query }
    }

    /// Unfiltered first page, the listing clients load by default
    #[must_use]
    pub fn first_page(tenant: TenantId, limit: u32) -> Self {
        Self::new(tenant, ListQuery::first_page(limit))
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub project_entries: u64,
    pub list_entries: u64,
}

/// Read-through cache over an [`ArtifactStore`]
#[derive(Debug, Clone)]
pub struct ProjectCache {
    projects: Cache<ProjectId, Arc<ProjectWithRelations>>,
    lists: Cache<ListKey, Arc<Vec<ProjectSummary>>>,
    first_page_limit: u32,
}

impl ProjectCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            projects: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.project_ttl())
                .build(),
            lists: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.list_ttl())
                .build(),
            first_page_limit: config.first_page_limit,
        }
    }

    /// Project with relations, loading from `store` on a miss
    ///
    /// # Errors
    /// - `StoreError` from the load; failures are not cached
    pub async fn project(
        &self,
        store: &dyn ArtifactStore,
        id: ProjectId,
    ) -> Result<Arc<ProjectWithRelations>, StoreError> {
        if let Some(cached) = self.projects.get(&id).await {
            return Ok(cached);
        }

        let loaded = Arc::new(store.find_project_with_relations(id).await?);
        self.projects.insert(id, loaded.clone()).await;
        Ok(loaded)
    }

    /// Listing for `key`, loading from `store` on a miss
    ///
    /// # Errors
    /// - `StoreError` from the load; failures are not cached
    pub async fn project_list(
        &self,
        store: &dyn ArtifactStore,
        key: ListKey,
    ) -> Result<Arc<Vec<ProjectSummary>>, StoreError> {
        if let Some(cached) = self.lists.get(&key).await {
            return Ok(cached);
        }

        let loaded = Arc::new(store.list_projects(&key.tenant, &key.query).await?);
        self.lists.insert(key, loaded.clone()).await;
        Ok(loaded)
    }

    #[inline]
    #[must_use]
    pub fn contains_project(&self, id: ProjectId) -> bool {
        self.projects.contains_key(&id)
    }

    #[inline]
    #[must_use]
    pub fn contains_list(&self, key: &ListKey) -> bool {
        self.lists.contains_key(key)
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.projects.invalidate_all();
        self.lists.invalidate_all();
    }

    /// Apply pending evictions so counts are exact
    pub async fn run_pending_tasks(&self) {
        self.projects.run_pending_tasks().await;
        self.lists.run_pending_tasks().await;
    }

    /// Approximate entry counts
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            project_entries: self.projects.entry_count(),
            list_entries: self.lists.entry_count(),
        }
    }
}

impl Default for ProjectCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl CacheInvalidator for ProjectCache {
    async fn invalidate_project(&self, project_id: ProjectId, owner: &TenantId) {
        self.projects.invalidate(&project_id).await;
        self.lists
            .invalidate(&ListKey::first_page(owner.clone(), self.first_page_limit))
            .await;
        tracing::trace!(project_id = %project_id, owner = %owner, "project cache invalidated");
    }
}
