//! End-to-end tests of `HttpBackend` against the stub server.
//!
//! Each test starts its own stub on an OS-assigned port, so the REST
//! contract (paths, raw `Authorization` header, multipart forms, response
//! envelopes and error statuses) is exercised over real HTTP.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdesk::account::{LoginForm, SignupForm};
use taskdesk::app::{App, DELETE_TASK_PROMPT};
use taskdesk::backend::http::HttpBackend;
use taskdesk::backend::{Backend, ImageUpload, ProfileUpdate, SignupRequest};
use taskdesk::config::AuthFailurePolicy;
use taskdesk::session::{CredentialStore, MemoryCredentialStore, View};
use taskdesk_proto::codec::ApiErrorKind;
use taskdesk_proto::task::{TaskBody, TaskId};
use taskdesk_proto::user::LoginRequest;
use taskdesk_stub::server::start_server_with_state;
use taskdesk_stub::store::{DEMO_EMAIL, DEMO_PASSWORD, DEMO_TASKS, StubStore};
use tokio::task::JoinHandle;
use url::Url;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

struct Stub {
    url: Url,
    store: Arc<StubStore>,
    handle: JoinHandle<()>,
}

impl Drop for Stub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_stub() -> Stub {
    let store = Arc::new(StubStore::seeded());
    let (addr, handle) = start_server_with_state("127.0.0.1:0", store.clone())
        .await
        .expect("stub should bind");
    Stub {
        url: Url::parse(&format!("http://{addr}")).unwrap(),
        store,
        handle,
    }
}

fn backend(url: &Url) -> HttpBackend {
    HttpBackend::new(url.clone(), Duration::from_secs(5)).unwrap()
}

async fn demo_token(backend: &HttpBackend) -> String {
    let request = LoginRequest {
        identifier: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
    };
    backend.login(&request).await.unwrap().jwt_token
}

fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a],
    }
}

// ---------------------------------------------------------------------------
// Full scenario through the controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_create_and_confirmed_delete() {
    let stub = start_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let mut app = App::new(
        Arc::new(backend(&stub.url)),
        store.clone(),
        AuthFailurePolicy::default(),
    );

    let form = LoginForm {
        identifier: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
    };
    app.login(&form).await.unwrap();
    assert_eq!(app.view(), View::Dashboard);
    assert_eq!(app.tasks().len(), 3);
    assert!(store.token().is_some());

    app.create_task("Buy milk", None).await.unwrap();
    assert_eq!(app.tasks().len(), 4);
    let milk = app
        .tasks()
        .iter()
        .find(|t| t.title == "Buy milk")
        .map(|t| t.id)
        .expect("created task is listed");

    app.request_delete(milk);
    assert_eq!(app.task_gate().prompt(), Some(DELETE_TASK_PROMPT));
    assert!(app.confirm_delete().await.unwrap());

    assert_eq!(app.tasks().len(), 3);
    assert!(app.tasks().iter().all(|t| t.id != milk));
    assert!(app.notices().contains("Task deleted."));
}

#[tokio::test]
async fn expired_session_sends_user_to_login() {
    let stub = start_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let mut app = App::new(
        Arc::new(backend(&stub.url)),
        store.clone(),
        AuthFailurePolicy::ClearSession,
    );
    let form = LoginForm {
        identifier: "demo_user".to_string(),
        password: DEMO_PASSWORD.to_string(),
    };
    let user = app.login(&form).await.unwrap();

    stub.store.expire_sessions(user.id).await;
    let view = app.navigate(View::Todos).await;

    assert_eq!(view, View::Login);
    assert!(store.read().is_none());
}

// ---------------------------------------------------------------------------
// Contract details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tasks_are_listed_oldest_first() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);
    let token = demo_token(&backend).await;

    let tasks = backend.list_tasks(&token).await.unwrap();

    let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, DEMO_TASKS);
    let first = backend.get_task(&token, tasks[0].id).await.unwrap();
    assert_eq!(first, tasks[0]);
}

#[tokio::test]
async fn bad_token_is_unauthorized() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);

    let err = backend.list_tasks("not-a-token").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.status, Some(401));
}

#[tokio::test]
async fn update_replaces_title_and_description() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);
    let token = demo_token(&backend).await;
    let id = backend.list_tasks(&token).await.unwrap()[2].id;
    let body = TaskBody {
        title: "Call the bank today".to_string(),
        description: Some("Ask about the card".to_string()),
    };

    let response = backend.update_task(&token, id, &body).await.unwrap();

    assert_eq!(response.message, "Todo updated successfully");
    let task = backend.get_task(&token, id).await.unwrap();
    assert_eq!(task.title, body.title);
    assert_eq!(task.description, body.description);
}

#[tokio::test]
async fn missing_task_is_not_found_with_message() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);
    let token = demo_token(&backend).await;

    let err = backend.delete_task(&token, TaskId::new(9999)).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::NotFound);
    assert_eq!(err.server_message(), Some("Todo not found"));
}

#[tokio::test]
async fn blank_title_is_rejected_by_server_too() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);
    let token = demo_token(&backend).await;
    let body = TaskBody {
        title: "  ".to_string(),
        description: None,
    };

    let err = backend.create_task(&token, &body).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Rejected);
    assert_eq!(err.server_message(), Some("Title is required"));
}

#[tokio::test]
async fn signup_uploads_avatar_and_allows_login() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);
    let form = SignupForm {
        name: "Jane Doe".to_string(),
        username: "jane_doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "9123456780".to_string(),
        password: "Passw0rd!".to_string(),
        confirm_password: "Passw0rd!".to_string(),
        profile_image: Some(png("jane.png")),
    };
    let request: SignupRequest = form.validate().unwrap();

    let response = backend.signup(&request).await.unwrap();
    assert_eq!(response.message, "User registered successfully");

    let login = LoginRequest {
        identifier: "9123456780".to_string(),
        password: "Passw0rd!".to_string(),
    };
    let user = backend.login(&login).await.unwrap().user;
    assert_eq!(user.username.as_deref(), Some("jane_doe"));

    let avatar = user.avatar_url(stub.url.as_str()).expect("avatar stored");
    let served = reqwest::get(&avatar).await.unwrap();
    assert!(served.status().is_success());
    assert_eq!(served.bytes().await.unwrap().as_ref(), png("jane.png").bytes);

    let again = backend.signup(&request).await.unwrap_err();
    assert_eq!(again.server_message(), Some("User already exists"));
}

#[tokio::test]
async fn profile_update_and_account_deletion() {
    let stub = start_stub().await;
    let backend = backend(&stub.url);
    let token = demo_token(&backend).await;
    let update = ProfileUpdate {
        name: "Demo Person".to_string(),
        phone: "9000000001".to_string(),
        profile_image: Some(png("new.png")),
    };

    let user = backend.update_profile(&token, &update).await.unwrap();
    assert_eq!(user.name, "Demo Person");
    assert_eq!(user.phone, "9000000001");
    assert_eq!(backend.fetch_profile(&token).await.unwrap(), user);

    let response = backend.delete_account(&token).await.unwrap();
    assert_eq!(response.message, "User deleted successfully");
    assert!(backend.fetch_profile(&token).await.unwrap_err().is_unauthorized());
}

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unresponsive_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let holder = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let backend = HttpBackend::new(url, Duration::from_millis(200)).unwrap();

    let err = backend.list_tasks("token").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Timeout);
    holder.abort();
}

#[tokio::test]
async fn closed_port_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let backend = HttpBackend::new(url, Duration::from_secs(2)).unwrap();

    let err = backend.list_tasks("token").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Transport);
}
