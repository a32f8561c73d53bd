//! Project-ready notifications
//!
//! Formatting and delivery (email, push) belong to the implementor; the
//! pipeline only says when.

use async_trait::async_trait;
use forge_core::{ProjectId, TenantId};

/// Notification delivery failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sent once at the end of a successful analysis pass
    async fn send_project_ready_notification(
        &self,
        tenant: &TenantId,
        project_name: &str,
        project_id: ProjectId,
    ) -> Result<(), NotifyError>;
}

/// Writes the notification to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_project_ready_notification(
        &self,
        tenant: &TenantId,
        project_name: &str,
        project_id: ProjectId,
    ) -> Result<(), NotifyError> {
        tracing::info!(tenant = %tenant, project_id = %project_id, project_name, "project ready");
        Ok(())
    }
}
