//! Testing utilities for the Forge workspace
//!
//! Shared fakes, fixtures and a wired-up pipeline harness.

#![allow(missing_docs)]

pub mod fakes;

pub use fakes::{
    FlakyStore, RecordingChannel, RecordingInvalidator, RecordingNotifier, Scripted,
    ScriptedGateway, StoreOp,
};

use forge_core::{ArtifactStore, ForgeConfig, NewProject, Project, SubscriptionTier, Tenant};
use forge_pipeline::{Pipeline, PipelineContext};
use forge_quota::MemoryLedger;
use serde_json::json;
use std::sync::Arc;

/// A 25-character product idea
pub const SAMPLE_DESCRIPTION: &str = "A bookshelf app for teens";

/// Analysis payload with features "Auth" and "Catalog" and one "Home" screen
#[must_use]
pub fn sample_analysis() -> serde_json::Value {
    json!({
        "appName": "Shelf",
        "appType": "MOBILE_APP",
        "targetAudience": "teen readers",
        "features": [
            {"name": "Auth", "description": "Sign in and sign up", "category": "Authentication",
             "priority": "MVP", "estimatedHours": 8, "complexity": 2},
            {"name": "Catalog", "description": "Browse books", "category": "Core",
             "priority": "HIGH", "estimatedHours": 16, "complexity": 3}
        ],
        "screens": [
            {"name": "Home", "type": "HOME", "order": 1, "description": "Landing"}
        ]
    })
}

/// Analysis payload with the given feature and screen names, orders 1..
#[must_use]
pub fn analysis_with(features: &[&str], screens: &[&str]) -> serde_json::Value {
    let features: Vec<_> = features
        .iter()
        .map(|name| {
            json!({"name": name, "description": "", "category": "Core", "priority": "MEDIUM"})
        })
        .collect();
    let screens: Vec<_> = screens
        .iter()
        .zip(1u32..)
        .map(|(name, order)| json!({"name": name, "type": "GENERIC", "order": order}))
        .collect();
    json!({"appName": "Generated", "appType": "WEB_APP", "features": features, "screens": screens})
}

/// Non-empty layout for one screen
#[must_use]
pub fn sample_wireframe(screen: &str) -> serde_json::Value {
    json!({
        "layout": "column",
        "components": [
            {"type": "header", "text": screen},
            {"type": "list", "items": 3}
        ]
    })
}

/// Pipeline wired to fakes, plus handles on every fake
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub ledger: Arc<MemoryLedger>,
    pub channel: Arc<RecordingChannel>,
    pub notifier: Arc<RecordingNotifier>,
    pub invalidator: Arc<RecordingInvalidator>,
    pub pipeline: Pipeline,
    pub tenant: Tenant,
}

impl Harness {
    #[must_use]
    pub fn new(gateway: ScriptedGateway) -> Self {
        Self::with_config(gateway, ForgeConfig::default())
    }

    #[must_use]
    pub fn with_config(gateway: ScriptedGateway, config: ForgeConfig) -> Self {
        Self::build(gateway, config, RecordingNotifier::new())
    }

    #[must_use]
    pub fn build(
        gateway: ScriptedGateway,
        config: ForgeConfig,
        notifier: RecordingNotifier,
    ) -> Self {
        let store = Arc::new(FlakyStore::new());
        let gateway = Arc::new(gateway);
        let ledger = Arc::new(MemoryLedger::new());
        let channel = Arc::new(RecordingChannel::new());
        let notifier = Arc::new(notifier);
        let invalidator = Arc::new(RecordingInvalidator::new());

        let ctx = PipelineContext::new(
            store.clone(),
            gateway.clone(),
            ledger.clone(),
            channel.clone(),
            config,
        )
        .with_notifier(notifier.clone())
        .with_invalidator(invalidator.clone());

        Self {
            store,
            gateway,
            ledger,
            channel,
            notifier,
            invalidator,
            pipeline: Pipeline::new(ctx),
            tenant: Tenant::new("tenant-a", SubscriptionTier::Free),
        }
    }

    /// Create a DRAFT project owned by the harness tenant
    ///
    /// # Panics
    /// If the store rejects the insert
    pub async fn create_project(&self) -> Project {
        self.store
            .create_project(NewProject::new(self.tenant.id.clone(), SAMPLE_DESCRIPTION))
            .await
            .expect("create project")
    }
}
