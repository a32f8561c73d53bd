//! Collaborators shared by every run

use crate::channel::ProgressChannel;
use crate::gateway::{GeneratedArtifact, GenerationGateway, GenerationRequest};
use crate::notify::{LogNotifier, Notifier};
use forge_cache::{CacheInvalidator, ProjectCache};
use forge_core::{
    ArtifactStore, ForgeConfig, PipelineError, PipelineEvent, ProjectId, ProjectStateMachine,
    Tenant, TenantId, TierLimits,
};
use forge_quota::{QuotaGate, QuotaLedger};
use std::sync::Arc;

/// Store, gateway, channel and friends, cloned cheaply into spawned runs
#[derive(Clone)]
pub struct PipelineContext {
    pub(crate) store: Arc<dyn ArtifactStore>,
    pub(crate) gateway: Arc<dyn GenerationGateway>,
    pub(crate) channel: Arc<dyn ProgressChannel>,
    pub(crate) gate: QuotaGate,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) invalidator: Arc<dyn CacheInvalidator>,
    pub(crate) cache: Arc<ProjectCache>,
    pub(crate) machine: ProjectStateMachine,
    pub(crate) config: Arc<ForgeConfig>,
}

impl PipelineContext {
    /// Context with a log notifier and a project cache that serves reads
    /// and receives every invalidation
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        gateway: Arc<dyn GenerationGateway>,
        ledger: Arc<dyn QuotaLedger>,
        channel: Arc<dyn ProgressChannel>,
        config: ForgeConfig,
    ) -> Self {
        let cache = Arc::new(ProjectCache::new(&config.cache));
        Self {
            machine: ProjectStateMachine::new(store.clone()),
            store,
            gateway,
            channel,
            gate: QuotaGate::new(ledger),
            notifier: Arc::new(LogNotifier),
            invalidator: cache.clone(),
            cache,
            config: Arc::new(config),
        }
    }

    /// Share `cache` for reads and invalidation
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ProjectCache>) -> Self {
        self.invalidator = cache.clone();
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Read-through cache; evicted by the pipeline unless a custom
    /// invalidator replaced it
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<ProjectCache> {
        &self.cache
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn state_machine(&self) -> &ProjectStateMachine {
        &self.machine
    }

    pub(crate) fn limits(&self, tenant: &Tenant) -> TierLimits {
        *self.config.tiers.limits(tenant.tier)
    }

    /// Admission check for `tenant`
    pub(crate) async fn admit(&self, tenant: &Tenant) -> Result<(), PipelineError> {
        self.gate.require(&tenant.id, &self.limits(tenant)).await
    }

    /// Admit, call the gateway, then debit usage
    ///
    /// A failed call is never debited. A failed debit is logged and
    /// otherwise ignored.
    pub(crate) async fn metered_generate(
        &self,
        tenant: &Tenant,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, PipelineError> {
        self.admit(tenant).await?;

        let kind = request.kind();
        tracing::debug!(tenant = %tenant.id, %kind, "generation call");
        let artifact = self.gateway.generate(request).await?;

        if let Err(e) = self
            .gate
            .ledger()
            .record_usage(&tenant.id, artifact.tokens_used)
            .await
        {
            tracing::warn!(
                tenant = %tenant.id,
                %kind,
                tokens = artifact.tokens_used,
                error = %e,
                "failed to record usage"
            );
        }
        Ok(artifact)
    }

    pub(crate) async fn emit(&self, tenant: &TenantId, event: PipelineEvent) {
        self.channel.emit_to_user(tenant, &event).await;
    }

    pub(crate) async fn invalidate(&self, project_id: ProjectId, owner: &TenantId) {
        self.invalidator.invalidate_project(project_id, owner).await;
    }

    /// Fire-and-forget ready notification
    pub(crate) fn notify_ready(
        &self,
        tenant: &TenantId,
        project_name: &str,
        project_id: ProjectId,
    ) {
        let notifier = self.notifier.clone();
        let tenant = tenant.clone();
        let project_name = project_name.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier
                .send_project_ready_notification(&tenant, &project_name, project_id)
                .await
            {
                tracing::warn!(project_id = %project_id, error = %e, "ready notification failed");
            }
        });
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
