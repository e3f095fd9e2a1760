//! Integration tests for session handling through the `App` controller.
//!
//! Uses a file-backed credential store in a temp directory so a session
//! can outlive one controller and be changed underneath another.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use taskdesk::account::{LoginForm, ProfileForm, SignupForm};
use taskdesk::app::{App, DELETE_ACCOUNT_PROMPT};
use taskdesk::backend::ImageUpload;
use taskdesk::backend::memory::{DEMO_EMAIL, DEMO_PASSWORD, DEMO_TASKS, InMemoryBackend};
use taskdesk::config::AuthFailurePolicy;
use taskdesk::session::{AuthState, CredentialStore, FileCredentialStore, View};
use taskdesk_proto::api::Endpoint;
use taskdesk_proto::codec::ApiError;
use taskdesk_proto::task::TaskId;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

struct Harness {
    _dir: TempDir,
    backend: Arc<InMemoryBackend>,
    store: Arc<FileCredentialStore>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCredentialStore::new(dir.path().join("session.json")));
        Self {
            _dir: dir,
            backend: Arc::new(InMemoryBackend::seeded()),
            store,
        }
    }

    fn app(&self, policy: AuthFailurePolicy) -> App<InMemoryBackend> {
        App::new(self.backend.clone(), self.store.clone(), policy)
    }

    async fn signed_in(&self, policy: AuthFailurePolicy) -> App<InMemoryBackend> {
        let mut app = self.app(policy);
        app.login(&demo_login()).await.unwrap();
        app.drain_notices();
        app
    }
}

fn demo_login() -> LoginForm {
    LoginForm {
        identifier: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
    }
}

fn jane_signup() -> SignupForm {
    SignupForm {
        name: "Jane Doe".to_string(),
        username: "jane_doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "9123456780".to_string(),
        password: "Passw0rd!".to_string(),
        confirm_password: "Passw0rd!".to_string(),
        profile_image: Some(ImageUpload {
            file_name: "jane.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }),
    }
}

// ---------------------------------------------------------------------------
// Guarded navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn protected_views_redirect_to_login_without_session() {
    let h = Harness::new();
    let mut app = h.app(AuthFailurePolicy::default());

    for view in [
        View::Dashboard,
        View::Profile,
        View::CreateTask,
        View::Todos,
        View::EditTask(TaskId::new(1)),
    ] {
        assert_eq!(app.navigate(view).await, View::Login, "{view}");
    }
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn entry_views_redirect_to_dashboard_with_session() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;

    assert_eq!(app.navigate(View::Login).await, View::Dashboard);
    assert_eq!(app.navigate(View::Signup).await, View::Dashboard);
    assert_eq!(app.navigate(View::parse("/nowhere")).await, View::NotFound);
}

#[tokio::test]
async fn login_lands_on_dashboard_with_tasks() {
    let h = Harness::new();
    let mut app = h.app(AuthFailurePolicy::default());

    let user = app.login(&demo_login()).await.unwrap();

    assert_eq!(user.email, DEMO_EMAIL);
    assert_eq!(app.view(), View::Dashboard);
    assert_eq!(app.guard().state(), AuthState::Authenticated);
    assert_eq!(app.tasks().len(), DEMO_TASKS.len());
    assert!(app.notices().contains("Login Successful!"));
}

#[tokio::test]
async fn bad_credentials_show_server_message() {
    let h = Harness::new();
    let mut app = h.app(AuthFailurePolicy::default());
    let form = LoginForm {
        identifier: DEMO_EMAIL.to_string(),
        password: "WrongPass1!".to_string(),
    };

    assert!(app.login(&form).await.is_err());

    assert!(app.notices().contains("Invalid credentials"));
    assert!(h.store.read().is_none());
    assert_eq!(app.view(), View::Landing);
}

#[tokio::test]
async fn unauthorized_signup_reports_server_message() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::ClearSession).await;
    h.backend.fail_next(ApiError::from_status(
        401,
        br#"{"message":"Registration closed"}"#,
    ));

    assert!(app.signup(&jane_signup()).await.is_err());

    let texts: Vec<_> = app.drain_notices().into_iter().map(|n| n.text).collect();
    assert_eq!(texts, ["Registration closed"]);
    assert!(h.store.read().is_some());
    assert_eq!(app.guard().state(), AuthState::Authenticated);
}

#[tokio::test]
async fn session_survives_restart() {
    let h = Harness::new();
    drop(h.signed_in(AuthFailurePolicy::default()).await);

    let mut restarted = h.app(AuthFailurePolicy::default());

    assert_eq!(restarted.guard().state(), AuthState::Authenticated);
    assert_eq!(restarted.navigate(View::Todos).await, View::Todos);
    assert_eq!(restarted.tasks().len(), DEMO_TASKS.len());
}

#[tokio::test]
async fn logout_clears_store_and_guards_again() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;

    app.logout().unwrap();

    assert_eq!(app.view(), View::Login);
    assert!(h.store.read().is_none());
    assert!(app.tasks().is_empty());
    assert_eq!(app.navigate(View::Dashboard).await, View::Login);
}

#[tokio::test]
async fn session_cleared_elsewhere_is_noticed_on_navigation() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;

    h.store.clear().unwrap();

    assert_eq!(app.navigate(View::Todos).await, View::Login);
    assert_eq!(app.guard().state(), AuthState::Anonymous);
}

// ---------------------------------------------------------------------------
// Rejected tokens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_token_clears_session_by_default() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::ClearSession).await;
    h.backend.revoke_token(&h.store.token().unwrap());

    let view = app.navigate(View::Dashboard).await;

    assert_eq!(view, View::Login);
    assert!(h.store.read().is_none());
    assert!(app.notices().contains("Session expired. Please log in again."));
    assert!(app.tasks().is_empty());
}

#[tokio::test]
async fn rejected_token_is_kept_when_configured() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::KeepToken).await;
    let token = h.store.token().unwrap();
    h.backend.revoke_token(&token);

    let view = app.navigate(View::Dashboard).await;

    assert_eq!(view, View::Dashboard);
    assert_eq!(h.store.token().as_deref(), Some(token.as_str()));
    assert!(app.notices().contains("Failed to load tasks."));
    assert_eq!(app.tasks().len(), DEMO_TASKS.len());
}

// ---------------------------------------------------------------------------
// Registration and account lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_moves_to_login_without_session() {
    let h = Harness::new();
    let mut app = h.app(AuthFailurePolicy::default());

    app.signup(&jane_signup()).await.unwrap();

    assert_eq!(app.view(), View::Login);
    assert!(h.store.read().is_none());
    assert!(app.notices().contains("User registered successfully"));

    let form = LoginForm {
        identifier: "jane_doe".to_string(),
        password: "Passw0rd!".to_string(),
    };
    app.login(&form).await.unwrap();
    assert_eq!(app.view(), View::Dashboard);
    assert!(app.tasks().is_empty());
}

#[tokio::test]
async fn invalid_signup_sends_nothing() {
    let h = Harness::new();
    let mut app = h.app(AuthFailurePolicy::default());
    let form = SignupForm {
        confirm_password: "Different1!".to_string(),
        profile_image: None,
        ..jane_signup()
    };

    let err = app.signup(&form).await.unwrap_err();

    assert!(err.field_errors().is_some_and(|e| e.len() >= 2));
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn duplicate_signup_reports_server_message() {
    let h = Harness::new();
    let mut app = h.app(AuthFailurePolicy::default());
    app.signup(&jane_signup()).await.unwrap();

    assert!(app.signup(&jane_signup()).await.is_err());

    assert!(app.notices().contains("User already exists"));
}

#[tokio::test]
async fn unchanged_profile_is_not_submitted() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;
    assert_eq!(app.navigate(View::Profile).await, View::Profile);
    let form = ProfileForm::from_user(app.profile().unwrap());

    app.update_profile(&form).await.unwrap();

    assert!(app.notices().contains("No changes to save."));
    assert!(!h.backend.calls().contains(&Endpoint::UpdateUser));
}

#[tokio::test]
async fn profile_update_refreshes_shown_profile() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;
    app.navigate(View::Profile).await;
    let form = ProfileForm {
        name: "Demo Person".to_string(),
        ..ProfileForm::from_user(app.profile().unwrap())
    };

    app.update_profile(&form).await.unwrap();

    assert_eq!(app.profile().unwrap().name, "Demo Person");
    assert!(app.notices().contains("Profile updated successfully!"));
}

#[tokio::test]
async fn account_deletion_needs_confirmation() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;
    app.navigate(View::Profile).await;

    app.request_account_deletion();
    assert_eq!(app.account_gate().prompt(), Some(DELETE_ACCOUNT_PROMPT));
    app.cancel_account_deletion();
    assert!(!app.confirm_account_deletion().await.unwrap());
    assert!(!h.backend.calls().contains(&Endpoint::DeleteUser));

    app.request_account_deletion();
    assert!(app.confirm_account_deletion().await.unwrap());

    assert_eq!(app.view(), View::Login);
    assert!(h.store.read().is_none());
    assert!(app.login(&demo_login()).await.is_err());
    assert!(app.notices().contains("Invalid credentials"));
}

// ---------------------------------------------------------------------------
// Dedicated edit view
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_view_loads_and_saves_back_to_dashboard() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;
    let id = app.tasks()[1].id;

    assert_eq!(app.navigate(View::EditTask(id)).await, View::EditTask(id));
    let page = app.edit_page_mut().unwrap();
    assert_eq!(page.title, DEMO_TASKS[1]);
    page.set_title("Water the lawn");

    app.save_edit_page().await.unwrap();

    assert_eq!(app.view(), View::Dashboard);
    assert!(app.edit_page().is_none());
    assert!(app.tasks().iter().any(|t| t.id == id && t.title == "Water the lawn"));
}

#[tokio::test]
async fn edit_view_of_missing_task_notifies() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;

    let view = app.navigate(View::parse("/edit/404")).await;

    assert_eq!(view, View::EditTask(TaskId::new(404)));
    assert!(app.edit_page().is_none());
    assert!(app.notices().contains("Failed to fetch task."));
}

#[tokio::test]
async fn inline_edit_hands_off_to_edit_view() {
    let h = Harness::new();
    let mut app = h.signed_in(AuthFailurePolicy::default()).await;
    let id = app.tasks()[0].id;
    assert!(app.begin_edit(id));
    app.editor_mut().set_title("half typed");

    let view = app.edit_elsewhere(id).await;

    assert_eq!(view, View::EditTask(id));
    assert!(app.editor().session().is_none());
    assert_eq!(app.edit_page().unwrap().title, DEMO_TASKS[0]);
}
