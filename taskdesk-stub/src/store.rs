//! In-memory account, session, task and upload storage.
//!
//! [`StubStore`] mirrors the behaviour of the real backend closely enough
//! for client tests: tasks are scoped to their owner, tokens are opaque
//! strings looked up on every call, and errors carry the same statuses.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskdesk_proto::task::{Task, TaskBody, TaskId};
use taskdesk_proto::user::User;
use tokio::sync::RwLock;

/// Email of the seeded demo account.
pub const DEMO_EMAIL: &str = "user@gmail.com";
/// Password of the seeded demo account.
pub const DEMO_PASSWORD: &str = "Secret1!";
/// Titles of the demo account's seeded tasks, oldest first.
pub const DEMO_TASKS: [&str; 3] = ["Plan the week", "Water the plants", "Call the bank"];

/// Errors returned by store operations, mapped to HTTP statuses by the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StubError {
    /// Malformed or conflicting input (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown token (401).
    #[error("Unauthorized")]
    Unauthorized,

    /// No such record for this user (404).
    #[error("{0}")]
    NotFound(&'static str),
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// MIME type given at upload.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Fields of a registration.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Login handle.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Password.
    pub password: String,
    /// Stored avatar file name.
    pub profile_image: Option<String>,
}

struct Account {
    user: User,
    password: String,
}

struct Owned {
    owner: u64,
    task: Task,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    sessions: HashMap<String, u64>,
    tasks: BTreeMap<TaskId, Owned>,
    uploads: HashMap<String, Upload>,
    next_user_id: u64,
    next_task_id: u64,
}

impl Inner {
    fn user_id(&self, token: &str) -> Result<u64, StubError> {
        self.sessions
            .get(token)
            .copied()
            .ok_or(StubError::Unauthorized)
    }

    fn account_mut(&mut self, user_id: u64) -> Result<&mut Account, StubError> {
        self.accounts
            .iter_mut()
            .find(|a| a.user.id == user_id)
            .ok_or(StubError::NotFound("User not found"))
    }

    fn owned_mut(&mut self, user_id: u64, id: TaskId) -> Result<&mut Owned, StubError> {
        self.tasks
            .get_mut(&id)
            .filter(|o| o.owner == user_id)
            .ok_or(StubError::NotFound("Todo not found"))
    }

    fn insert_task(&mut self, owner: u64, body: TaskBody, created_at: DateTime<Utc>) -> TaskId {
        self.next_task_id += 1;
        let id = TaskId::new(self.next_task_id);
        let task = Task {
            id,
            title: body.title,
            description: body.description,
            created_at,
        };
        self.tasks.insert(id, Owned { owner, task });
        id
    }
}

fn require_title(body: &TaskBody) -> Result<(), StubError> {
    if body.title.trim().is_empty() {
        return Err(StubError::BadRequest("Title is required".to_string()));
    }
    Ok(())
}

/// Shared server state.
#[derive(Default)]
pub struct StubStore {
    inner: RwLock<Inner>,
}

impl StubStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the demo account and its three tasks.
    #[must_use]
    pub fn seeded() -> Self {
        let mut inner = Inner {
            next_user_id: 1,
            ..Inner::default()
        };
        inner.accounts.push(Account {
            user: User {
                id: 1,
                name: "Demo User".to_string(),
                username: Some("demo_user".to_string()),
                email: DEMO_EMAIL.to_string(),
                phone: "9876543210".to_string(),
                profile_image: None,
            },
            password: DEMO_PASSWORD.to_string(),
        });
        let epoch = Utc
            .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        for (offset, title) in (0_i64..).zip(DEMO_TASKS) {
            let body = TaskBody {
                title: title.to_string(),
                description: None,
            };
            inner.insert_task(1, body, epoch + Duration::hours(offset));
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Registers an account.
    ///
    /// # Errors
    ///
    /// [`StubError::BadRequest`] for missing fields or a taken email or
    /// username.
    pub async fn register(&self, new_user: NewUser) -> Result<User, StubError> {
        let required = [
            &new_user.name,
            &new_user.username,
            &new_user.email,
            &new_user.phone,
            &new_user.password,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(StubError::BadRequest("All fields are required".to_string()));
        }
        let mut inner = self.inner.write().await;
        let taken = inner.accounts.iter().any(|a| {
            a.user.email == new_user.email
                || a.user.username.as_deref() == Some(new_user.username.as_str())
        });
        if taken {
            return Err(StubError::BadRequest("User already exists".to_string()));
        }
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            name: new_user.name,
            username: Some(new_user.username),
            email: new_user.email,
            phone: new_user.phone,
            profile_image: new_user.profile_image,
        };
        inner.accounts.push(Account {
            user: user.clone(),
            password: new_user.password,
        });
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Checks credentials and opens a session.
    ///
    /// # Errors
    ///
    /// [`StubError::BadRequest`] when no account matches.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<(String, User), StubError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .accounts
            .iter()
            .find(|a| {
                (a.user.email == identifier
                    || a.user.phone == identifier
                    || a.user.username.as_deref() == Some(identifier))
                    && a.password == password
            })
            .map(|a| a.user.clone())
            .ok_or_else(|| StubError::BadRequest("Invalid credentials".to_string()))?;
        let token = uuid::Uuid::now_v7().simple().to_string();
        inner.sessions.insert(token.clone(), user.id);
        tracing::info!(user_id = user.id, "session opened");
        Ok((token, user))
    }

    /// Ends every session of `user_id`, as an expiry would.
    pub async fn expire_sessions(&self, user_id: u64) {
        self.inner
            .write()
            .await
            .sessions
            .retain(|_, id| *id != user_id);
    }

    /// The profile of the token's user.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`] for an unknown token.
    pub async fn profile(&self, token: &str) -> Result<User, StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        Ok(inner.account_mut(user_id)?.user.clone())
    }

    /// Updates name, phone and optionally the avatar.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`] for an unknown token.
    pub async fn update_profile(
        &self,
        token: &str,
        name: Option<String>,
        phone: Option<String>,
        profile_image: Option<String>,
    ) -> Result<User, StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        let account = inner.account_mut(user_id)?;
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            account.user.name = name;
        }
        if let Some(phone) = phone.filter(|p| !p.trim().is_empty()) {
            account.user.phone = phone;
        }
        if profile_image.is_some() {
            account.user.profile_image = profile_image;
        }
        Ok(account.user.clone())
    }

    /// Deletes the token's user with its sessions and tasks.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`] for an unknown token.
    pub async fn delete_user(&self, token: &str) -> Result<(), StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        inner.accounts.retain(|a| a.user.id != user_id);
        inner.sessions.retain(|_, id| *id != user_id);
        inner.tasks.retain(|_, o| o.owner != user_id);
        tracing::info!(user_id, "user deleted");
        Ok(())
    }

    /// The token's tasks in creation order.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`] for an unknown token.
    pub async fn list(&self, token: &str) -> Result<Vec<Task>, StubError> {
        let inner = self.inner.read().await;
        let user_id = inner.user_id(token)?;
        Ok(inner
            .tasks
            .values()
            .filter(|o| o.owner == user_id)
            .map(|o| o.task.clone())
            .collect())
    }

    /// One of the token's tasks.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`] or [`StubError::NotFound`].
    pub async fn get(&self, token: &str, id: TaskId) -> Result<Task, StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        Ok(inner.owned_mut(user_id, id)?.task.clone())
    }

    /// Creates a task for the token's user.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`], or [`StubError::BadRequest`] for an
    /// empty title.
    pub async fn create(&self, token: &str, body: TaskBody) -> Result<TaskId, StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        require_title(&body)?;
        Ok(inner.insert_task(user_id, body, Utc::now()))
    }

    /// Replaces a task's title and description.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`], [`StubError::BadRequest`] or
    /// [`StubError::NotFound`].
    pub async fn update(&self, token: &str, id: TaskId, body: TaskBody) -> Result<(), StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        require_title(&body)?;
        let owned = inner.owned_mut(user_id, id)?;
        owned.task.title = body.title;
        owned.task.description = body.description;
        Ok(())
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// [`StubError::Unauthorized`] or [`StubError::NotFound`].
    pub async fn delete(&self, token: &str, id: TaskId) -> Result<(), StubError> {
        let mut inner = self.inner.write().await;
        let user_id = inner.user_id(token)?;
        inner.owned_mut(user_id, id)?;
        inner.tasks.remove(&id);
        Ok(())
    }

    /// Stores an uploaded file under a fresh name and returns that name.
    pub async fn save_upload(&self, original_name: &str, upload: Upload) -> String {
        let extension = original_name
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let name = format!("{}{extension}", uuid::Uuid::now_v7().simple());
        self.inner.write().await.uploads.insert(name.clone(), upload);
        name
    }

    /// A stored upload by name.
    pub async fn upload(&self, name: &str) -> Option<Upload> {
        self.inner.read().await.uploads.get(name).cloned()
    }

    /// Removes a stored upload.
    pub async fn discard_upload(&self, name: &str) {
        if self.inner.write().await.uploads.remove(name).is_some() {
            tracing::debug!(name, "upload discarded");
        }
    }

    /// Number of stored uploads.
    pub async fn upload_count(&self) -> usize {
        self.inner.read().await.uploads.len()
    }
}
