//! Scripted and recording collaborators

use async_trait::async_trait;
use forge_cache::CacheInvalidator;
use forge_core::{
    AnalysisUpdate, ArtifactStore, Feature, FeatureDescriptor, ListQuery, MemoryStore, NewProject,
    NewScreen, PipelineEvent, Project, ProjectId, ProjectStatus, ProjectSummary,
    ProjectWithRelations, Screen, ScreenId, StoreError, TenantId,
};
use forge_pipeline::{
    GeneratedArtifact, GenerationError, GenerationGateway, GenerationRequest, Notifier,
    NotifyError, ProgressChannel,
};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Semaphore;

/// One scripted gateway answer
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(GeneratedArtifact),
    Fail(GenerationError),
    Panic(String),
}

/// Gateway that replays a script, one entry per call
///
/// An exhausted script answers with a transport error. A gated gateway
/// waits for [`ScriptedGateway::release`] before each answer.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<GenerationRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Each call blocks until a permit is released
    #[must_use]
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn then_respond(self, payload: serde_json::Value, tokens_used: u64) -> Self {
        self.push(Scripted::Respond(GeneratedArtifact::new(payload, tokens_used)));
        self
    }

    #[must_use]
    pub fn then_fail(self, error: GenerationError) -> Self {
        self.push(Scripted::Fail(error));
        self
    }

    #[must_use]
    pub fn then_panic(self, message: &str) -> Self {
        self.push(Scripted::Panic(message.to_string()));
        self
    }

    pub fn push(&self, entry: Scripted) {
        self.script.lock().push_back(entry);
    }

    /// Let `n` gated calls proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl GenerationGateway for ScriptedGateway {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        self.calls.lock().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| GenerationError::Transport(e.to_string()))?
                .forget();
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Respond(artifact)) => Ok(artifact),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Panic(message)) => panic!("{message}"),
            None => Err(GenerationError::Transport("script exhausted".to_string())),
        }
    }
}

/// Channel that keeps every emitted event in order
#[derive(Debug, Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<(TenantId, PipelineEvent)>>,
}

impl RecordingChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    #[must_use]
    pub fn events_for(&self, tenant: &TenantId) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| t == tenant)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Event names in emission order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(_, e)| e.name()).collect()
    }

    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|(_, e)| e.name() == name).count()
    }

    /// Statuses broadcast through status-changed events, in order
    #[must_use]
    pub fn statuses(&self) -> Vec<ProjectStatus> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, e)| match e {
                PipelineEvent::StatusChanged { status, .. } => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl ProgressChannel for RecordingChannel {
    async fn emit_to_user(&self, tenant: &TenantId, event: &PipelineEvent) {
        self.events.lock().push((tenant.clone(), event.clone()));
    }
}

/// Notifier that records calls, optionally failing them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(TenantId, String, ProjectId)>>,
    fail: bool,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sent(&self) -> Vec<(TenantId, String, ProjectId)> {
        self.sent.lock().clone()
    }

    /// Notifications run detached; poll until `n` arrived or a second passed
    pub async fn wait_for(&self, n: usize) -> usize {
        for _ in 0..100 {
            let count = self.sent.lock().len();
            if count >= n {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_project_ready_notification(
        &self,
        tenant: &TenantId,
        project_name: &str,
        project_id: ProjectId,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .push((tenant.clone(), project_name.to_string(), project_id));
        if self.fail {
            Err(NotifyError("mail relay down".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Invalidator that records which projects were evicted
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<(ProjectId, TenantId)>>,
}

impl RecordingInvalidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count_for(&self, project_id: ProjectId) -> usize {
        self.calls.lock().iter().filter(|(id, _)| *id == project_id).count()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate_project(&self, project_id: ProjectId, owner: &TenantId) {
        self.calls.lock().push((project_id, owner.clone()));
    }
}

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UpdateStatus,
    RecordAnalysis,
    ClearAnalysis,
    BulkInsertFeatures,
    BulkInsertScreens,
    UpdateScreenWireframe,
}

/// [`MemoryStore`] with switchable failures
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<StoreOp>>,
}

impl FlakyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `op` fail with `StoreError::Unavailable`
    pub fn fail(&self, op: StoreOp) {
        self.failing.lock().insert(op);
    }

    pub fn heal(&self, op: StoreOp) {
        self.failing.lock().remove(&op);
    }

    #[must_use]
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.lock().contains(&op) {
            Err(StoreError::Unavailable(format!("{op:?} disabled")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ArtifactStore for FlakyStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        self.inner.create_project(project).await
    }

    async fn find_project_with_relations(
        &self,
        id: ProjectId,
    ) -> Result<ProjectWithRelations, StoreError> {
        self.inner.find_project_with_relations(id).await
    }

    async fn find_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.inner.find_project(id).await
    }

    async fn update_project_status(
        &self,
        id: ProjectId,
        expected: ProjectStatus,
        next: ProjectStatus,
    ) -> Result<Project, StoreError> {
        self.check(StoreOp::UpdateStatus)?;
        self.inner.update_project_status(id, expected, next).await
    }

    async fn record_analysis(
        &self,
        id: ProjectId,
        update: AnalysisUpdate,
    ) -> Result<Project, StoreError> {
        self.check(StoreOp::RecordAnalysis)?;
        self.inner.record_analysis(id, update).await
    }

    async fn clear_analysis(&self, id: ProjectId) -> Result<(), StoreError> {
        self.check(StoreOp::ClearAnalysis)?;
        self.inner.clear_analysis(id).await
    }

    async fn bulk_insert_features(
        &self,
        project_id: ProjectId,
        features: &[FeatureDescriptor],
    ) -> Result<Vec<Feature>, StoreError> {
        self.check(StoreOp::BulkInsertFeatures)?;
        self.inner.bulk_insert_features(project_id, features).await
    }

    async fn bulk_insert_screens(
        &self,
        project_id: ProjectId,
        screens: &[NewScreen],
    ) -> Result<Vec<Screen>, StoreError> {
        self.check(StoreOp::BulkInsertScreens)?;
        self.inner.bulk_insert_screens(project_id, screens).await
    }

    async fn update_screen_wireframe(
        &self,
        screen_id: ScreenId,
        wireframe: serde_json::Value,
    ) -> Result<Screen, StoreError> {
        self.check(StoreOp::UpdateScreenWireframe)?;
        self.inner.update_screen_wireframe(screen_id, wireframe).await
    }

    async fn reorder_screens(
        &self,
        project_id: ProjectId,
        ordered: &[ScreenId],
    ) -> Result<Vec<Screen>, StoreError> {
        self.inner.reorder_screens(project_id, ordered).await
    }

    async fn delete_screen(&self, screen_id: ScreenId) -> Result<(), StoreError> {
        self.inner.delete_screen(screen_id).await
    }

    async fn list_projects(
        &self,
        owner: &TenantId,
        query: &ListQuery,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        self.inner.list_projects(owner, query).await
    }
}
