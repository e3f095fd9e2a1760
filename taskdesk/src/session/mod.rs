//! Session state: persisted credentials, views and the access guard.

pub mod guard;
pub mod store;

pub use guard::{Access, AuthState, SessionEvent, SessionGuard};
pub use store::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};

use std::fmt;

use taskdesk_proto::task::TaskId;

/// Who may enter a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Anyone (landing and not-found pages).
    Open,
    /// Only visitors without a session (login, signup).
    EntryOnly,
    /// Only signed-in users.
    Protected,
}

/// A navigable client view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// `/`
    Landing,
    /// `/signup`
    Signup,
    /// `/login`
    Login,
    /// `/dashboard`: task list with inline create and edit.
    Dashboard,
    /// `/profile`
    Profile,
    /// `/CreateTask`: dedicated create form.
    CreateTask,
    /// `/Todos`: the task list without the dashboard chrome.
    Todos,
    /// `/Edit/:id`: dedicated edit form for one task.
    EditTask(TaskId),
    /// Anything else.
    NotFound,
}

impl View {
    /// Canonical path of the view.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Landing => "/".to_string(),
            Self::Signup => "/signup".to_string(),
            Self::Login => "/login".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::Profile => "/profile".to_string(),
            Self::CreateTask => "/CreateTask".to_string(),
            Self::Todos => "/Todos".to_string(),
            Self::EditTask(id) => format!("/Edit/{id}"),
            Self::NotFound => "/404".to_string(),
        }
    }

    /// Resolves a path, ignoring case, a trailing slash and any query.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "" => Self::Landing,
            "/signup" => Self::Signup,
            "/login" => Self::Login,
            "/dashboard" => Self::Dashboard,
            "/profile" => Self::Profile,
            "/createtask" => Self::CreateTask,
            "/todos" => Self::Todos,
            other => other
                .strip_prefix("/edit/")
                .and_then(|id| id.parse().ok())
                .map_or(Self::NotFound, Self::EditTask),
        }
    }

    /// Access rule of the view.
    #[must_use]
    pub const fn gate(&self) -> Gate {
        match self {
            Self::Landing | Self::NotFound => Gate::Open,
            Self::Signup | Self::Login => Gate::EntryOnly,
            Self::Dashboard | Self::Profile | Self::CreateTask | Self::Todos | Self::EditTask(_) => {
                Gate::Protected
            }
        }
    }

    /// Whether the view shows the task collection.
    #[must_use]
    pub const fn shows_tasks(&self) -> bool {
        matches!(self, Self::Dashboard | Self::Todos)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
