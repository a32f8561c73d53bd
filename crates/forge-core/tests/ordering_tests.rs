use forge_core::{is_contiguous, ArtifactStore, MemoryStore, NewProject, NewScreen};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Delete(usize),
    Reverse,
    Rotate(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..4).prop_map(Op::Insert),
        any::<usize>().prop_map(Op::Delete),
        Just(Op::Reverse),
        any::<usize>().prop_map(Op::Rotate),
    ]
}

proptest! {
    #[test]
    fn prop_orders_stay_dense(ops in proptest::collection::vec(op(), 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = MemoryStore::new();
            let project = store
                .create_project(NewProject::new("tenant-a", "idea"))
                .await
                .unwrap();

            for op in ops {
                let screens = store.find_project_with_relations(project.id).await.unwrap().screens;
                let k = u32::try_from(screens.len()).unwrap();
                match op {
                    Op::Insert(n) => {
                        let rows: Vec<NewScreen> = (1..=u32::try_from(n).unwrap())
                            .map(|i| NewScreen {
                                name: format!("screen-{}", k + i),
                                screen_type: "GENERIC".to_string(),
                                order: k + i,
                            })
                            .collect();
                        store.bulk_insert_screens(project.id, &rows).await.unwrap();
                    }
                    Op::Delete(i) if !screens.is_empty() => {
                        store.delete_screen(screens[i % screens.len()].id).await.unwrap();
                    }
                    Op::Reverse => {
                        let ids: Vec<_> = screens.iter().rev().map(|s| s.id).collect();
                        store.reorder_screens(project.id, &ids).await.unwrap();
                    }
                    Op::Rotate(i) if !screens.is_empty() => {
                        let mut ids: Vec<_> = screens.iter().map(|s| s.id).collect();
                        let len = ids.len();
                        ids.rotate_left(i % len);
                        store.reorder_screens(project.id, &ids).await.unwrap();
                    }
                    _ => {}
                }

                let after = store.find_project_with_relations(project.id).await.unwrap().screens;
                assert!(is_contiguous(after.iter().map(|s| s.order)));
            }
        });
    }
}

#[tokio::test]
async fn test_insert_continues_existing_sequence() {
    let store = MemoryStore::new();
    let project = store
        .create_project(NewProject::new("tenant-a", "idea"))
        .await
        .unwrap();
    let screen = |name: &str, order| NewScreen {
        name: name.to_string(),
        screen_type: "GENERIC".to_string(),
        order,
    };

    store
        .bulk_insert_screens(project.id, &[screen("Home", 1)])
        .await
        .unwrap();
    assert!(store
        .bulk_insert_screens(project.id, &[screen("Dup", 1)])
        .await
        .is_err());
    store
        .bulk_insert_screens(project.id, &[screen("List", 2)])
        .await
        .unwrap();
}
