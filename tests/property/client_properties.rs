//! Property tests for client state machines.
//!
//! 1. Protected views redirect to login without a session and allow with one.
//! 2. Entry views redirect to the dashboard with a session.
//! 3. Blank titles are rejected locally for create and update.
//! 4. After any successful mutation the collection equals a fresh list.
//! 5. The inline editor only ever holds the last task put into edit mode.
//! 6. The confirmation gate runs its action once per confirmed open.
//! 7. Only the newest list ticket's response survives any arrival order.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::Cell;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use taskdesk::backend::memory::InMemoryBackend;
use taskdesk::confirm::ConfirmationGate;
use taskdesk::session::{Access, CredentialStore, Gate, MemoryCredentialStore, SessionGuard, View};
use taskdesk::tasks::{InlineEditor, TaskSync};
use taskdesk::validate::Field;
use taskdesk_proto::task::{Task, TaskId};
use taskdesk_proto::user::User;

// --- Strategies ---

fn arb_view() -> impl Strategy<Value = View> {
    prop_oneof![
        Just(View::Landing),
        Just(View::Signup),
        Just(View::Login),
        Just(View::Dashboard),
        Just(View::Profile),
        Just(View::CreateTask),
        Just(View::Todos),
        Just(View::NotFound),
        (1_u64..10_000).prop_map(|id| View::EditTask(TaskId::new(id))),
    ]
}

/// Strings made only of whitespace, including the empty string.
fn blank() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec![' ', '\t', '\n', '\r']), 0..8)
        .prop_map(|chars| chars.into_iter().collect())
}

fn arb_task(id: u64) -> impl Strategy<Value = Task> {
    ("[A-Za-z ]{1,20}", prop::option::of("[a-z ]{0,20}")).prop_map(move |(title, description)| {
        Task {
            id: TaskId::new(id),
            title,
            description,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    })
}

#[derive(Debug, Clone)]
enum Mutation {
    Create(String),
    Update(usize, String),
    Delete(usize),
}

fn arb_mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        "[A-Za-z]{1,12}".prop_map(Mutation::Create),
        (0_usize..8, "[A-Za-z]{1,12}").prop_map(|(i, t)| Mutation::Update(i, t)),
        (0_usize..8).prop_map(Mutation::Delete),
    ]
}

// --- Helpers ---

fn demo_user() -> User {
    User {
        id: 1,
        name: "Demo User".to_string(),
        username: None,
        email: "user@gmail.com".to_string(),
        phone: "9876543210".to_string(),
        profile_image: None,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn signed_in_sync() -> (Arc<InMemoryBackend>, TaskSync<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::seeded());
    let store = MemoryCredentialStore::new();
    store.save(&backend.issue_token(1), &demo_user()).unwrap();
    let store: Arc<dyn CredentialStore> = Arc::new(store);
    (backend.clone(), TaskSync::new(backend, store))
}

fn plain_task(id: u64, title: &str) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: None,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

// --- Properties ---

proptest! {
    #[test]
    fn guard_follows_gate_and_session(view in arb_view(), signed_in in any::<bool>()) {
        let store = MemoryCredentialStore::new();
        if signed_in {
            store.save("opaque-token", &demo_user()).unwrap();
        }
        let guard = SessionGuard::new(Arc::new(store));

        let access = guard.check_view(&view);

        let expected = match (view.gate(), signed_in) {
            (Gate::Protected, false) => Access::Redirect(View::Login),
            (Gate::EntryOnly, true) => Access::Redirect(View::Dashboard),
            _ => Access::Allow,
        };
        prop_assert_eq!(access, expected);
    }

    #[test]
    fn view_paths_resolve_back(view in arb_view(), upper in any::<bool>(), slash in any::<bool>()) {
        let mut path = view.path();
        if upper {
            path = path.to_ascii_uppercase();
        }
        if slash && path != "/" {
            path.push('/');
        }
        prop_assert_eq!(View::parse(&path), view);
    }

    #[test]
    fn blank_title_never_hits_network(title in blank(), description in "[a-z ]{0,20}", raw_id in 1_u64..100) {
        let (backend, mut sync) = signed_in_sync();
        runtime().block_on(async {
            sync.list().await.unwrap();
            let before = sync.tasks().to_vec();
            let calls = backend.call_count();

            let created = sync.create(&title, Some(description.as_str())).await.unwrap_err();
            let updated = sync
                .update(TaskId::new(raw_id), &title, Some(description.as_str()))
                .await
                .unwrap_err();

            for err in [created, updated] {
                let errors = err.field_errors().expect("validation error");
                assert!(errors.get(Field::Title).is_some());
            }
            assert_eq!(backend.call_count(), calls);
            assert_eq!(sync.tasks(), before.as_slice());
        });
    }

    #[test]
    fn collection_matches_fresh_list_after_mutations(ops in prop::collection::vec(arb_mutation(), 1..12)) {
        let (_, mut sync) = signed_in_sync();
        runtime().block_on(async {
            sync.list().await.unwrap();
            for op in ops {
                let pick = |i: usize, tasks: &[Task]| {
                    (!tasks.is_empty()).then(|| tasks[i % tasks.len()].id)
                };
                let result = match op {
                    Mutation::Create(title) => Some(sync.create(&title, None).await),
                    Mutation::Update(i, title) => match pick(i, sync.tasks()) {
                        Some(id) => Some(sync.update(id, &title, Some("edited")).await),
                        None => None,
                    },
                    Mutation::Delete(i) => match pick(i, sync.tasks()) {
                        Some(id) => Some(sync.delete(id).await),
                        None => None,
                    },
                };
                if let Some(outcome) = result {
                    assert!(outcome.unwrap().refresh_error.is_none());
                    let fresh = sync.fetch().await.unwrap();
                    assert_eq!(sync.tasks(), fresh.as_slice());
                }
            }
        });
    }

    #[test]
    fn editor_holds_only_last_begun(ids in prop::collection::vec(1_u64..20, 1..10)) {
        let mut editor = InlineEditor::new();
        for (n, id) in ids.iter().enumerate() {
            let task = plain_task(*id, "original");
            editor.begin_edit(&task);
            editor.set_title(format!("draft {n}"));
        }
        let last = *ids.last().unwrap();

        prop_assert_eq!(editor.editing_id(), Some(TaskId::new(last)));
        editor.begin_edit(&plain_task(last, "original"));
        prop_assert_eq!(&editor.session().unwrap().draft_title, "original");
    }

    #[test]
    fn gate_runs_action_once_per_confirmed_open(steps in prop::collection::vec(0_u8..3, 0..20)) {
        let runs = Cell::new(0_u32);
        let mut expected = 0_u32;
        let mut gate = ConfirmationGate::new();
        let rt = runtime();
        for (n, step) in steps.into_iter().enumerate() {
            match step {
                0 => gate.open(TaskId::new(u64::try_from(n).unwrap()), "Delete?"),
                1 => {
                    gate.cancel();
                }
                _ => {
                    if gate.is_visible() {
                        expected += 1;
                    }
                    let counter = &runs;
                    rt.block_on(gate.confirm(move |_| async move {
                        counter.set(counter.get() + 1);
                    }));
                    prop_assert!(!gate.is_visible());
                }
            }
        }
        prop_assert_eq!(runs.get(), expected);
    }

    #[test]
    fn newest_ticket_wins(
        lists in prop::collection::vec(prop::collection::vec(arb_task(1), 0..4), 1..6),
        order in any::<u64>(),
    ) {
        let (_, mut sync) = signed_in_sync();
        let tickets: Vec<_> = lists.iter().map(|_| sync.issue_ticket()).collect();
        let mut arrivals: Vec<usize> = (0..lists.len()).collect();
        arrivals.sort_by_key(|i| (*i as u64).wrapping_mul(order | 1).rotate_left(7));

        for i in arrivals {
            sync.apply_list(tickets[i], Ok(lists[i].clone())).unwrap();
        }

        prop_assert_eq!(sync.tasks(), lists.last().unwrap().as_slice());
    }
}
