//! Progress delivery to live sessions
//!
//! Delivery is at-most-once and best-effort: events go to the sessions a
//! tenant has open right now and are never replayed.

use async_trait::async_trait;
use dashmap::DashMap;
use forge_core::{PipelineEvent, TenantId};
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use ulid::Ulid;

/// Pushes pipeline events to a tenant
#[async_trait]
pub trait ProgressChannel: Send + Sync {
    async fn emit_to_user(&self, tenant: &TenantId, event: &PipelineEvent);
}

/// Live session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Ulid);

impl SessionId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event as written to the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    pub event: &'static str,
    pub payload: serde_json::Value,
}

impl From<&PipelineEvent> for OutboundEvent {
    fn from(event: &PipelineEvent) -> Self {
        Self {
            event: event.name(),
            payload: event.payload(),
        }
    }
}

/// Receiving end of one connection
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub tenant: TenantId,
    receiver: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl Session {
    /// Next event, or `None` once the registry dropped this session
    pub async fn recv(&mut self) -> Option<OutboundEvent> {
        self.receiver.recv().await
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<OutboundEvent> {
        self.receiver.try_recv().ok()
    }

    /// Everything queued so far
    pub fn drain(&mut self) -> Vec<OutboundEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[derive(Debug)]
struct SessionSender {
    id: SessionId,
    sender: mpsc::UnboundedSender<OutboundEvent>,
}

/// Process-local registry of connected sessions
///
/// Rebuilt from live connections only; nothing here outlives the process.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<TenantId, Vec<SessionSender>>,
}

impl SessionRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `tenant`
    pub fn connect(&self, tenant: TenantId) -> Session {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SessionId::new();
        self.sessions
            .entry(tenant.clone())
            .or_default()
            .push(SessionSender { id, sender });
        tracing::debug!(tenant = %tenant, session = %id, "session connected");
        Session {
            id,
            tenant,
            receiver,
        }
    }

    /// Remove one connection; dropping the [`Session`] has the same effect
    /// on the next emit
    pub fn disconnect(&self, tenant: &TenantId, session: SessionId) {
        if let Some(mut senders) = self.sessions.get_mut(tenant) {
            senders.retain(|s| s.id != session);
        }
        self.sessions.remove_if(tenant, |_, senders| senders.is_empty());
        tracing::debug!(tenant = %tenant, session = %session, "session disconnected");
    }

    /// Tenants with at least one open session
    #[must_use]
    pub fn online_tenants(&self) -> Vec<TenantId> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().iter().any(|s| !s.sender.is_closed()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    #[must_use]
    pub fn session_count(&self, tenant: &TenantId) -> usize {
        self.sessions
            .get(tenant)
            .map_or(0, |senders| senders.iter().filter(|s| !s.sender.is_closed()).count())
    }

    /// Deliver to every live session of `tenant`, pruning closed ones.
    /// Returns the number of sessions reached.
    pub fn send(&self, tenant: &TenantId, event: &OutboundEvent) -> usize {
        let delivered = match self.sessions.get_mut(tenant) {
            Some(mut senders) => {
                senders.retain(|s| s.sender.send(event.clone()).is_ok());
                senders.len()
            }
            None => 0,
        };
        if delivered == 0 {
            self.sessions.remove_if(tenant, |_, senders| senders.is_empty());
        }
        delivered
    }
}

#[async_trait]
impl ProgressChannel for SessionRegistry {
    async fn emit_to_user(&self, tenant: &TenantId, event: &PipelineEvent) {
        let delivered = self.send(tenant, &OutboundEvent::from(event));
        tracing::trace!(tenant = %tenant, event = event.name(), delivered, "event emitted");
    }
}
