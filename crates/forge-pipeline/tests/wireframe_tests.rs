use forge_core::events::names;
use forge_core::{
    is_contiguous, ArtifactStore, Budget, FeatureDescriptor, ForgeConfig, NewScreen, PipelineError,
    PipelineEvent, Project, ProjectStatus, StoreError, SubscriptionTier, Tenant, TierLimits,
};
use forge_pipeline::{GenerationError, GenerationRequest, RunOutcome, WIREFRAME_FAILED_MESSAGE};
use forge_test_utils::{
    analysis_with, sample_wireframe, Harness, ScriptedGateway, StoreOp, SAMPLE_DESCRIPTION,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

/// Seed features and screens directly and walk the project to READY
async fn ready_project(h: &Harness, screens: &[&str]) -> Project {
    let project = draft_project_with_screens(h, screens).await;
    for (from, to) in [
        (ProjectStatus::Draft, ProjectStatus::Analyzing),
        (ProjectStatus::Analyzing, ProjectStatus::Wireframing),
        (ProjectStatus::Wireframing, ProjectStatus::Ready),
    ] {
        h.store.update_project_status(project.id, from, to).await.unwrap();
    }
    h.store.find_project(project.id).await.unwrap()
}

async fn draft_project_with_screens(h: &Harness, screens: &[&str]) -> Project {
    let project = h.create_project().await;
    let features: Vec<FeatureDescriptor> = serde_json::from_value(json!([
        {"name": "Auth", "priority": "MVP"},
        {"name": "Catalog", "priority": "HIGH"}
    ]))
    .unwrap();
    h.store.bulk_insert_features(project.id, &features).await.unwrap();

    let rows: Vec<NewScreen> = screens
        .iter()
        .zip(1u32..)
        .map(|(name, order)| NewScreen {
            name: (*name).to_string(),
            screen_type: "GENERIC".to_string(),
            order,
        })
        .collect();
    h.store.bulk_insert_screens(project.id, &rows).await.unwrap();
    project
}

fn progress_positions(events: &[PipelineEvent]) -> Vec<(String, usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::WireframeProgress {
                screen_name,
                current_screen,
                total_screens,
                ..
            } => Some((screen_name.clone(), *current_screen, *total_screens)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_every_screen_gets_a_layout() {
    let h = Harness::new(
        ScriptedGateway::new()
            .then_respond(sample_wireframe("Home"), 300)
            .then_respond(sample_wireframe("Catalog"), 400),
    );
    let project = ready_project(&h, &["Home", "Catalog"]).await;

    let start = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap();
    assert_eq!(start.screen_count, 2);
    assert_eq!(start.handle.wait().await, RunOutcome::Completed);

    let relations = h.store.find_project_with_relations(project.id).await.unwrap();
    assert_eq!(relations.project.status, ProjectStatus::Ready);
    assert!(relations.screens.iter().all(|s| s.has_wireframe()));
    assert_eq!(relations.screens[1].wireframe, sample_wireframe("Catalog"));

    assert_eq!(
        h.channel.statuses(),
        vec![ProjectStatus::Wireframing, ProjectStatus::Ready]
    );
    assert_eq!(
        progress_positions(&h.channel.events()),
        vec![("Home".to_string(), 1, 2), ("Catalog".to_string(), 2, 2)]
    );
    assert_eq!(h.channel.names().last(), Some(&names::WIREFRAME_COMPLETED));

    let usage = h.ledger.snapshot(&h.tenant.id);
    assert_eq!(usage.monthly_tokens, 700);
    assert_eq!(usage.daily_requests, 2);
}

#[tokio::test]
async fn test_requests_carry_screen_and_project_context() {
    let h = Harness::new(ScriptedGateway::new().then_respond(sample_wireframe("Home"), 10));
    let project = ready_project(&h, &["Home"]).await;

    h.pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap()
        .handle
        .wait()
        .await;

    assert_eq!(
        h.gateway.calls(),
        vec![GenerationRequest::Wireframe {
            screen_name: "Home".to_string(),
            screen_type: "GENERIC".to_string(),
            app_description: SAMPLE_DESCRIPTION.to_string(),
            feature_names: vec!["Auth".to_string(), "Catalog".to_string()],
        }]
    );
}

#[tokio::test]
async fn test_failure_keeps_earlier_layouts() {
    let h = Harness::new(
        ScriptedGateway::new()
            .then_respond(sample_wireframe("Home"), 300)
            .then_fail(GenerationError::Transport("connection reset".into()))
            .then_respond(sample_wireframe("Profile"), 300),
    );
    let project = ready_project(&h, &["Home", "Catalog", "Profile"]).await;

    let start = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap();
    assert_eq!(
        start.handle.wait().await,
        RunOutcome::Failed {
            category: "transport_failure"
        }
    );

    let relations = h.store.find_project_with_relations(project.id).await.unwrap();
    assert_eq!(relations.project.status, ProjectStatus::Draft);
    let filled: Vec<bool> = relations.screens.iter().map(|s| s.has_wireframe()).collect();
    assert_eq!(filled, vec![true, false, false]);

    // the third screen was never attempted
    assert_eq!(h.gateway.call_count(), 2);
    assert_eq!(progress_positions(&h.channel.events()).len(), 2);

    assert_eq!(
        h.channel.statuses(),
        vec![ProjectStatus::Wireframing, ProjectStatus::Draft]
    );
    assert_eq!(h.channel.count(names::ERROR), 1);
    let events = h.channel.events();
    assert_eq!(events.last().unwrap().payload()["message"], WIREFRAME_FAILED_MESSAGE);

    assert_eq!(h.ledger.snapshot(&h.tenant.id).monthly_tokens, 300);
}

#[tokio::test]
async fn test_empty_layout_is_malformed() {
    let h = Harness::new(ScriptedGateway::new().then_respond(json!({}), 10));
    let project = ready_project(&h, &["Home"]).await;

    let outcome = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap()
        .handle
        .wait()
        .await;
    assert_eq!(
        outcome,
        RunOutcome::Failed {
            category: "malformed_result"
        }
    );
}

#[tokio::test]
async fn test_project_without_screens_is_rejected() {
    let h = Harness::new(ScriptedGateway::new());
    let project = h.create_project().await;

    let err = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoScreens(id) if id == project.id));
    assert!(h.channel.events().is_empty());
}

#[tokio::test]
async fn test_draft_project_cannot_start_wireframes() {
    let h = Harness::new(ScriptedGateway::new());
    let project = draft_project_with_screens(&h, &["Home"]).await;

    let err = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            current: ProjectStatus::Draft,
            requested: ProjectStatus::Wireframing,
        }
    ));
    assert_eq!(
        h.store.find_project(project.id).await.unwrap().status,
        ProjectStatus::Draft
    );
}

#[tokio::test]
async fn test_second_trigger_while_wireframing_is_rejected() {
    let h = Harness::new(
        ScriptedGateway::gated()
            .then_respond(sample_wireframe("Home"), 10)
            .then_respond(sample_wireframe("Catalog"), 10),
    );
    let project = ready_project(&h, &["Home", "Catalog"]).await;

    let first = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap();
    let err = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            current: ProjectStatus::Wireframing,
            ..
        }
    ));

    h.gateway.release(2);
    assert_eq!(first.handle.wait().await, RunOutcome::Completed);
}

#[tokio::test]
async fn test_quota_exhausted_mid_run_stops_pass() {
    let config = ForgeConfig::default().with_tier_limits(
        SubscriptionTier::Free,
        TierLimits::new(Budget::Limited(50_000), Budget::Limited(1), Budget::Limited(3)),
    );
    let h = Harness::with_config(
        ScriptedGateway::new()
            .then_respond(sample_wireframe("Home"), 10)
            .then_respond(sample_wireframe("Catalog"), 10),
        config,
    );
    let project = ready_project(&h, &["Home", "Catalog"]).await;

    let outcome = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap()
        .handle
        .wait()
        .await;
    assert_eq!(
        outcome,
        RunOutcome::Failed {
            category: "admission_denied"
        }
    );

    let relations = h.store.find_project_with_relations(project.id).await.unwrap();
    assert_eq!(relations.project.status, ProjectStatus::Draft);
    assert!(relations.screens[0].has_wireframe());
    assert!(!relations.screens[1].has_wireframe());
    assert_eq!(h.gateway.call_count(), 1);
}

#[tokio::test]
async fn test_ready_project_can_regenerate() {
    let h = Harness::new(
        ScriptedGateway::new()
            .then_respond(json!({"layout": "first"}), 10)
            .then_respond(json!({"layout": "second"}), 10),
    );
    let project = ready_project(&h, &["Home"]).await;

    for _ in 0..2 {
        let outcome = h
            .pipeline
            .start_wireframe_generation(&h.tenant, project.id)
            .await
            .unwrap()
            .handle
            .wait()
            .await;
        assert!(outcome.is_completed());
    }

    let relations = h.store.find_project_with_relations(project.id).await.unwrap();
    assert_eq!(relations.screens[0].wireframe, json!({"layout": "second"}));
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_reorder_and_delete_keep_orders_dense() {
    let h = Harness::new(ScriptedGateway::new());
    let project = ready_project(&h, &["Home", "Catalog", "Profile"]).await;
    let screens = h
        .store
        .find_project_with_relations(project.id)
        .await
        .unwrap()
        .screens;
    let before = h.invalidator.count_for(project.id);

    let reordered = h
        .pipeline
        .reorder_screens(&h.tenant, project.id, &[screens[2].id, screens[0].id, screens[1].id])
        .await
        .unwrap();
    let order: Vec<&str> = reordered.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(order, vec!["Profile", "Home", "Catalog"]);

    h.pipeline
        .delete_screen(&h.tenant, project.id, screens[0].id)
        .await
        .unwrap();
    let remaining = h
        .store
        .find_project_with_relations(project.id)
        .await
        .unwrap()
        .screens;
    let order: Vec<(&str, u32)> = remaining.iter().map(|s| (s.name.as_str(), s.order)).collect();
    assert_eq!(order, vec![("Profile", 1), ("Catalog", 2)]);
    assert!(is_contiguous(remaining.iter().map(|s| s.order)));
    assert_eq!(h.invalidator.count_for(project.id), before + 2);

    let err = h
        .pipeline
        .reorder_screens(&h.tenant, project.id, &[screens[1].id])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::PersistenceFailure(StoreError::InvalidOrder(_))
    ));
}

#[tokio::test]
async fn test_screen_operations_are_scoped_to_owner_and_project() {
    let h = Harness::new(ScriptedGateway::new());
    let project = ready_project(&h, &["Home"]).await;
    let other = ready_project(&h, &["Elsewhere"]).await;
    let foreign = h
        .store
        .find_project_with_relations(other.id)
        .await
        .unwrap()
        .screens[0]
        .id;

    let err = h
        .pipeline
        .delete_screen(&h.tenant, project.id, foreign)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::PersistenceFailure(StoreError::ScreenNotFound(id)) if id == foreign
    ));

    let intruder = Tenant::new("tenant-b", SubscriptionTier::Pro);
    let err = h
        .pipeline
        .reorder_screens(&intruder, project.id, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ProjectNotFound(_)));
}

#[tokio::test]
async fn test_failed_revert_does_not_announce_draft() {
    let h = Harness::new(
        ScriptedGateway::gated().then_fail(GenerationError::Transport("connection reset".into())),
    );
    let project = ready_project(&h, &["Home"]).await;

    let start = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap();
    h.store.fail(StoreOp::UpdateStatus);
    h.gateway.release(1);
    assert_eq!(
        start.handle.wait().await,
        RunOutcome::Failed {
            category: "transport_failure"
        }
    );

    assert_eq!(
        h.store.find_project(project.id).await.unwrap().status,
        ProjectStatus::Wireframing
    );
    assert_eq!(h.channel.statuses(), vec![ProjectStatus::Wireframing]);
    assert_eq!(h.channel.count(names::ERROR), 1);
}

#[tokio::test]
async fn test_failed_pass_is_left_through_reanalysis() {
    let h = Harness::new(
        ScriptedGateway::new()
            .then_respond(sample_wireframe("Home"), 100)
            .then_fail(GenerationError::Transport("connection reset".into()))
            .then_respond(analysis_with(&["Search"], &["List", "Detail"]), 500),
    );
    let project = ready_project(&h, &["Home", "Catalog"]).await;

    let outcome = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap()
        .handle
        .wait()
        .await;
    assert_eq!(
        outcome,
        RunOutcome::Failed {
            category: "transport_failure"
        }
    );
    let relations = h.store.find_project_with_relations(project.id).await.unwrap();
    assert_eq!(relations.project.status, ProjectStatus::Draft);
    assert!(relations.screens[0].has_wireframe());

    let err = h
        .pipeline
        .start_wireframe_generation(&h.tenant, project.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            current: ProjectStatus::Draft,
            requested: ProjectStatus::Wireframing,
        }
    ));

    let outcome = h
        .pipeline
        .start_reanalysis(&h.tenant, project.id)
        .await
        .unwrap()
        .wait()
        .await;
    assert_eq!(outcome, RunOutcome::Completed);

    let relations = h.store.find_project_with_relations(project.id).await.unwrap();
    assert_eq!(relations.project.status, ProjectStatus::Ready);
    let names: Vec<&str> = relations.screens.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["List", "Detail"]);
    assert!(relations.screens.iter().all(|s| !s.has_wireframe()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Failing at screen `k` of `n` keeps layouts `1..k`, leaves the rest
    /// empty and debits exactly the `k - 1` successful calls
    #[test]
    fn prop_failure_at_screen_k_keeps_prefix(
        (n, k) in (1usize..6).prop_flat_map(|n| (Just(n), 1..=n))
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let mut gateway = ScriptedGateway::new();
            for _ in 1..k {
                gateway = gateway.then_respond(sample_wireframe("screen"), 100);
            }
            let h = Harness::new(gateway.then_fail(GenerationError::Transport("down".into())));
            let screen_names: Vec<String> = (1..=n).map(|i| format!("Screen {i}")).collect();
            let screen_refs: Vec<&str> = screen_names.iter().map(String::as_str).collect();
            let project = ready_project(&h, &screen_refs).await;

            let outcome = h
                .pipeline
                .start_wireframe_generation(&h.tenant, project.id)
                .await
                .unwrap()
                .handle
                .wait()
                .await;
            assert_eq!(outcome, RunOutcome::Failed { category: "transport_failure" });

            let relations = h.store.find_project_with_relations(project.id).await.unwrap();
            assert_eq!(relations.project.status, ProjectStatus::Draft);
            let filled: Vec<bool> = relations.screens.iter().map(|s| s.has_wireframe()).collect();
            let expected: Vec<bool> = (1..=n).map(|i| i < k).collect();
            assert_eq!(filled, expected);

            let usage = h.ledger.snapshot(&h.tenant.id);
            let debited = u64::try_from(k - 1).unwrap();
            assert_eq!(usage.daily_requests, debited);
            assert_eq!(usage.monthly_tokens, 100 * debited);
            assert_eq!(h.gateway.call_count(), k);
        });
    }
}
