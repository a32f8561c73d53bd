use forge_core::state_machine::{allowed_transitions, validate_transition};
use forge_core::{
    ArtifactStore, MemoryStore, NewProject, PipelineError, ProjectStateMachine, ProjectStatus,
};
use proptest::prelude::*;
use std::sync::Arc;

fn any_status() -> impl Strategy<Value = ProjectStatus> {
    prop_oneof![
        Just(ProjectStatus::Draft),
        Just(ProjectStatus::Analyzing),
        Just(ProjectStatus::Wireframing),
        Just(ProjectStatus::Ready),
        Just(ProjectStatus::InDevelopment),
        Just(ProjectStatus::Completed),
        Just(ProjectStatus::Archived),
    ]
}

#[test]
fn test_pipeline_edges() {
    assert!(validate_transition(ProjectStatus::Draft, ProjectStatus::Analyzing).is_ok());
    assert!(validate_transition(ProjectStatus::Analyzing, ProjectStatus::Wireframing).is_ok());
    assert!(validate_transition(ProjectStatus::Analyzing, ProjectStatus::Draft).is_ok());
    assert!(validate_transition(ProjectStatus::Wireframing, ProjectStatus::Ready).is_ok());
    assert!(validate_transition(ProjectStatus::Wireframing, ProjectStatus::Draft).is_ok());
    assert!(validate_transition(ProjectStatus::Ready, ProjectStatus::Wireframing).is_ok());

    // Invalid
    assert!(validate_transition(ProjectStatus::Draft, ProjectStatus::Wireframing).is_err());
    assert!(validate_transition(ProjectStatus::Ready, ProjectStatus::Analyzing).is_err());
    assert!(validate_transition(ProjectStatus::Analyzing, ProjectStatus::Analyzing).is_err());
}

#[test]
fn test_busy_statuses_cannot_be_reentered() {
    for busy in [ProjectStatus::Analyzing, ProjectStatus::Wireframing] {
        assert!(!allowed_transitions(busy).contains(&busy));
    }
}

proptest! {
    #[test]
    fn prop_validation_matches_allowed_set(from in any_status(), to in any_status()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_rejected_transition_leaves_status_unchanged(
        path in proptest::collection::vec(any_status(), 1..8),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let project = store
                .create_project(NewProject::new("tenant-a", "idea"))
                .await
                .unwrap();
            let machine = ProjectStateMachine::new(store.clone());

            let mut expected = ProjectStatus::Draft;
            for requested in path {
                let legal = allowed_transitions(expected).contains(&requested);
                match machine.transition(project.id, requested).await {
                    Ok(moved) => {
                        assert!(legal);
                        assert_eq!(moved.status, requested);
                        expected = requested;
                    }
                    Err(PipelineError::InvalidTransition { current, .. }) => {
                        assert!(!legal);
                        assert_eq!(current, expected);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
                let stored = store.find_project(project.id).await.unwrap();
                assert_eq!(stored.status, expected);
            }
        });
    }
}

#[tokio::test]
async fn test_concurrent_transitions_single_winner() {
    let store = Arc::new(MemoryStore::new());
    let project = store
        .create_project(NewProject::new("tenant-a", "idea"))
        .await
        .unwrap();
    let machine = ProjectStateMachine::new(store.clone());

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let machine = machine.clone();
            tokio::spawn(async move {
                machine
                    .transition_from(project.id, ProjectStatus::Draft, ProjectStatus::Analyzing)
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
