use deckhand_kernel::{TabInput, TabMeta, TabStore};
use proptest::prelude::*;

fn ids(store: &TabStore) -> Vec<String> {
    store.snapshot().tabs.into_iter().map(|t| t.id).collect()
}

#[test]
fn key_based_open_is_idempotent() {
    let store = TabStore::default();
    let first = store.open_tab(TabInput::new("task-detail", "Task 42").with_key("42"));
    store.open_tab(TabInput::new("terminal", "Shell"));
    let second = store.open_tab(TabInput::new("task-detail", "Task 42").with_key("42"));

    assert_eq!(first, second);
    assert_eq!(store.len(), 2);
    assert_eq!(store.active_tab_id(), first);
}

#[test]
fn switching_to_active_tab_does_not_notify() {
    let store = TabStore::default();
    let id = store.open_tab(TabInput::new("terminal", "Shell"));
    let mut rx = store.subscribe();
    rx.borrow_and_update();

    store.switch_tab(&id);
    store.open_tab(TabInput::new("terminal", "Shell").with_id(id.clone()));
    assert!(!rx.has_changed().expect("store alive"));

    store.set_tab_meta(&id, TabMeta::title("Shell"));
    store.set_tab_meta(&id, TabMeta::default());
    store.set_tab_meta("ghost", TabMeta::title("x"));
    assert!(!rx.has_changed().expect("store alive"));

    store.set_tab_meta(&id, TabMeta::title("claude"));
    assert!(rx.has_changed().expect("store alive"));
}

#[test]
fn close_to_right_rehomes_active_to_anchor() {
    let store = TabStore::default();
    for id in ["1", "2", "3", "4"] {
        store.open_tab(TabInput::new("terminal", id).with_id(id));
    }
    assert_eq!(store.active_tab_id(), "4");

    store.close_to_right("2");
    assert_eq!(ids(&store), vec!["1", "2"]);
    assert_eq!(store.active_tab_id(), "2");
}

proptest! {
    #[test]
    fn eviction_keeps_most_recent_tabs(cap in 1usize..10, extra in 0usize..10) {
        let store = TabStore::new(cap);
        let opened: Vec<String> = (0..cap + extra)
            .map(|i| store.open_tab(TabInput::new("terminal", "t").with_id(format!("t{i}"))))
            .collect();

        prop_assert_eq!(store.len(), cap);
        prop_assert_eq!(ids(&store), opened[extra..].to_vec());
        prop_assert_eq!(store.active_tab_id(), opened.last().cloned().unwrap_or_default());
    }

    #[test]
    fn active_id_never_dangles(ops in prop::collection::vec((0u8..6, 0usize..6, 0usize..6), 0..40)) {
        let store = TabStore::new(4);
        for (op, a, b) in ops {
            let id = format!("t{a}");
            match op {
                0 => { store.open_tab(TabInput::new("terminal", "t").with_id(id)); }
                1 => store.close_tab(&id),
                2 => store.switch_tab(&id),
                3 => store.close_to_right(&id),
                4 => store.reorder_tabs(a, b),
                _ => {
                    let pinned = TabInput::new("terminal", "p").with_id(format!("p{a}")).pinned();
                    store.open_tab_after(&id, pinned);
                }
            }
            let state = store.snapshot();
            if state.tabs.is_empty() {
                prop_assert_eq!(state.active_tab_id.as_str(), "");
            } else {
                prop_assert!(state.contains(&state.active_tab_id));
            }
            let mut seen = std::collections::HashSet::new();
            prop_assert!(state.tabs.iter().all(|t| seen.insert(t.id.clone())));
        }
    }
}
