//! In-process backend for tests.
//!
//! [`InMemoryBackend`] keeps users, sessions and tasks behind a mutex and
//! answers with the same status codes and messages as the REST API. It
//! records every call so tests can assert that local validation kept a
//! request off the wire, and can be told to fail the next call.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use taskdesk_proto::api::{Endpoint, MessageResponse};
use taskdesk_proto::codec::ApiError;
use taskdesk_proto::task::{Task, TaskBody, TaskId};
use taskdesk_proto::user::{LoginRequest, LoginResponse, User};

use super::{Backend, ProfileUpdate, SignupRequest};

/// Email of the seeded demo account.
pub const DEMO_EMAIL: &str = "user@gmail.com";
/// Password of the seeded demo account.
pub const DEMO_PASSWORD: &str = "Secret1!";
/// Titles of the tasks seeded for the demo account.
pub const DEMO_TASKS: [&str; 3] = ["Plan the week", "Water the plants", "Call the bank"];

struct Account {
    user: User,
    password: String,
}

struct StoredTask {
    owner: u64,
    task: Task,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    sessions: HashMap<String, u64>,
    tasks: BTreeMap<TaskId, StoredTask>,
    next_user_id: u64,
    next_task_id: u64,
    next_token: u64,
    calls: Vec<Endpoint>,
    failure: Option<(usize, ApiError)>,
}

impl State {
    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn record(&mut self, endpoint: Endpoint) -> Result<(), ApiError> {
        tracing::trace!(call = endpoint.name(), "in-memory backend call");
        self.calls.push(endpoint);
        let fire = match &mut self.failure {
            Some((0, _)) => true,
            Some((skip, _)) => {
                *skip -= 1;
                false
            }
            None => false,
        };
        match self.failure.take_if(|_| fire) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn user_for(&self, token: &str) -> Result<u64, ApiError> {
        self.sessions
            .get(token)
            .copied()
            .ok_or_else(|| reject(401, "Unauthorized"))
    }

    fn account_mut(&mut self, user_id: u64) -> Result<&mut Account, ApiError> {
        self.accounts
            .iter_mut()
            .find(|a| a.user.id == user_id)
            .ok_or_else(|| reject(404, "User not found"))
    }

    fn owned_task(&mut self, user_id: u64, id: TaskId) -> Result<&mut StoredTask, ApiError> {
        self.tasks
            .get_mut(&id)
            .filter(|t| t.owner == user_id)
            .ok_or_else(|| reject(404, "Todo not found"))
    }

    fn insert_task(&mut self, owner: u64, body: &TaskBody, created_at: DateTime<Utc>) -> TaskId {
        self.next_task_id += 1;
        let id = TaskId::new(self.next_task_id);
        let task = Task {
            id,
            title: body.title.clone(),
            description: body.description.clone(),
            created_at,
        };
        self.tasks.insert(id, StoredTask { owner, task });
        id
    }
}

/// Builds an error the way the HTTP layer would decode it.
fn reject(status: u16, message: &str) -> ApiError {
    let body = serde_json::json!({ "message": message }).to_string();
    ApiError::from_status(status, body.as_bytes())
}

fn message(text: &str) -> MessageResponse {
    MessageResponse {
        message: text.to_string(),
    }
}

/// Mutex-guarded in-memory implementation of [`Backend`].
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    /// An empty backend with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend holding the demo account and its three tasks.
    #[must_use]
    pub fn seeded() -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            let user_id = 1;
            state.next_user_id = user_id;
            state.accounts.push(Account {
                user: User {
                    id: user_id,
                    name: "Demo User".to_string(),
                    username: Some("demo_user".to_string()),
                    email: DEMO_EMAIL.to_string(),
                    phone: "9876543210".to_string(),
                    profile_image: Some("demo.png".to_string()),
                },
                password: DEMO_PASSWORD.to_string(),
            });
            let epoch = State::epoch();
            for (offset, title) in (0_i64..).zip(DEMO_TASKS) {
                let body = TaskBody {
                    title: title.to_string(),
                    description: None,
                };
                state.insert_task(user_id, &body, epoch + Duration::hours(offset));
            }
        }
        backend
    }

    /// Issues a session token for `user_id` without a login call.
    #[must_use]
    pub fn issue_token(&self, user_id: u64) -> String {
        let mut state = self.state.lock();
        state.next_token += 1;
        let token = format!("mem-{user_id}-{}", state.next_token);
        state.sessions.insert(token.clone(), user_id);
        token
    }

    /// Invalidates a session token, as an expired session would be.
    pub fn revoke_token(&self, token: &str) {
        self.state.lock().sessions.remove(token);
    }

    /// Makes the next call fail with `error` after being recorded.
    pub fn fail_next(&self, error: ApiError) {
        self.fail_after(0, error);
    }

    /// Lets `skip` calls through, then fails the following one with `error`.
    pub fn fail_after(&self, skip: usize, error: ApiError) {
        self.state.lock().failure = Some((skip, error));
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Endpoint> {
        self.state.lock().calls.clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of tasks stored across all users.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

impl Backend for InMemoryBackend {
    async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::Signup)?;
        let taken = state.accounts.iter().any(|a| {
            a.user.email == request.email || a.user.username.as_deref() == Some(&request.username)
        });
        if taken {
            return Err(reject(400, "User already exists"));
        }
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.accounts.push(Account {
            user: User {
                id,
                name: request.name.clone(),
                username: Some(request.username.clone()),
                email: request.email.clone(),
                phone: request.phone.clone(),
                profile_image: Some(request.profile_image.file_name.clone()),
            },
            password: request.password.clone(),
        });
        Ok(message("User registered successfully"))
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::Login)?;
        let identifier = request.identifier.as_str();
        let user = state
            .accounts
            .iter()
            .find(|a| {
                (a.user.email == identifier
                    || a.user.phone == identifier
                    || a.user.username.as_deref() == Some(identifier))
                    && a.password == request.password
            })
            .map(|a| a.user.clone())
            .ok_or_else(|| reject(400, "Invalid credentials"))?;
        state.next_token += 1;
        let token = format!("mem-{}-{}", user.id, state.next_token);
        state.sessions.insert(token.clone(), user.id);
        Ok(LoginResponse {
            jwt_token: token,
            user,
        })
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::GetUser)?;
        let user_id = state.user_for(token)?;
        Ok(state.account_mut(user_id)?.user.clone())
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::UpdateUser)?;
        let user_id = state.user_for(token)?;
        let account = state.account_mut(user_id)?;
        account.user.name.clone_from(&update.name);
        account.user.phone.clone_from(&update.phone);
        if let Some(image) = &update.profile_image {
            account.user.profile_image = Some(image.file_name.clone());
        }
        Ok(account.user.clone())
    }

    async fn delete_account(&self, token: &str) -> Result<MessageResponse, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::DeleteUser)?;
        let user_id = state.user_for(token)?;
        state.accounts.retain(|a| a.user.id != user_id);
        state.sessions.retain(|_, id| *id != user_id);
        state.tasks.retain(|_, t| t.owner != user_id);
        Ok(message("User deleted successfully"))
    }

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::ListTasks)?;
        let user_id = state.user_for(token)?;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.owner == user_id)
            .map(|t| t.task.clone())
            .collect())
    }

    async fn get_task(&self, token: &str, id: TaskId) -> Result<Task, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::GetTask(id))?;
        let user_id = state.user_for(token)?;
        Ok(state.owned_task(user_id, id)?.task.clone())
    }

    async fn create_task(&self, token: &str, body: &TaskBody) -> Result<MessageResponse, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::CreateTask)?;
        let user_id = state.user_for(token)?;
        if body.title.trim().is_empty() {
            return Err(reject(400, "Title is required"));
        }
        state.insert_task(user_id, body, Utc::now());
        Ok(message("Todo created successfully"))
    }

    async fn update_task(
        &self,
        token: &str,
        id: TaskId,
        body: &TaskBody,
    ) -> Result<MessageResponse, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::UpdateTask(id))?;
        let user_id = state.user_for(token)?;
        if body.title.trim().is_empty() {
            return Err(reject(400, "Title is required"));
        }
        let stored = state.owned_task(user_id, id)?;
        stored.task.title.clone_from(&body.title);
        stored.task.description.clone_from(&body.description);
        Ok(message("Todo updated successfully"))
    }

    async fn delete_task(&self, token: &str, id: TaskId) -> Result<MessageResponse, ApiError> {
        let mut state = self.state.lock();
        state.record(Endpoint::DeleteTask(id))?;
        let user_id = state.user_for(token)?;
        state.owned_task(user_id, id)?;
        state.tasks.remove(&id);
        Ok(message("Todo deleted successfully"))
    }
}
