//! Endpoint table and response envelopes of the REST contract.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Fixed request paths. Parameterized routes take the id as a trailing
/// path segment.
pub mod paths {
    /// `POST`, multipart registration form.
    pub const SIGNUP: &str = "/users/signup";
    /// `POST`, JSON credentials.
    pub const LOGIN: &str = "/users/login";
    /// `GET`, current user.
    pub const GET_USER: &str = "/users/getUser";
    /// `PUT`, multipart profile form.
    pub const UPDATE_USER: &str = "/users/updateUser";
    /// `DELETE`, current account.
    pub const DELETE_USER: &str = "/users/deleteUser";
    /// `GET`, the caller's tasks.
    pub const GET_TODOS: &str = "/todos/getTodos";
    /// `GET /todos/getTodo/:id`.
    pub const GET_TODO: &str = "/todos/getTodo";
    /// `POST`, JSON task body.
    pub const CREATE_TODO: &str = "/todos/createTodo";
    /// `PUT /todos/updateTodo/:id`.
    pub const UPDATE_TODO: &str = "/todos/updateTodo";
    /// `DELETE /todos/deleteTodo/:id`.
    pub const DELETE_TODO: &str = "/todos/deleteTodo";
    /// Static avatar files.
    pub const UPLOADS: &str = "/uploads";
}

/// HTTP verbs used by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// One operation of the backend contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Register a new account.
    Signup,
    /// Exchange credentials for a token.
    Login,
    /// Fetch the current user's profile.
    GetUser,
    /// Update name, phone and avatar.
    UpdateUser,
    /// Delete the current account.
    DeleteUser,
    /// List the caller's tasks.
    ListTasks,
    /// Fetch one task.
    GetTask(TaskId),
    /// Create a task.
    CreateTask,
    /// Replace a task's title and description.
    UpdateTask(TaskId),
    /// Delete a task.
    DeleteTask(TaskId),
}

impl Endpoint {
    /// HTTP method of this operation.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        match self {
            Self::GetUser | Self::ListTasks | Self::GetTask(_) => HttpMethod::Get,
            Self::Signup | Self::Login | Self::CreateTask => HttpMethod::Post,
            Self::UpdateUser | Self::UpdateTask(_) => HttpMethod::Put,
            Self::DeleteUser | Self::DeleteTask(_) => HttpMethod::Delete,
        }
    }

    /// Request path, including the id segment for task routes.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Signup => paths::SIGNUP.to_string(),
            Self::Login => paths::LOGIN.to_string(),
            Self::GetUser => paths::GET_USER.to_string(),
            Self::UpdateUser => paths::UPDATE_USER.to_string(),
            Self::DeleteUser => paths::DELETE_USER.to_string(),
            Self::ListTasks => paths::GET_TODOS.to_string(),
            Self::GetTask(id) => format!("{}/{id}", paths::GET_TODO),
            Self::CreateTask => paths::CREATE_TODO.to_string(),
            Self::UpdateTask(id) => format!("{}/{id}", paths::UPDATE_TODO),
            Self::DeleteTask(id) => format!("{}/{id}", paths::DELETE_TODO),
        }
    }

    /// Whether the request must carry the session token.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        !matches!(self, Self::Signup | Self::Login)
    }

    /// Short stable name for logs and call recording.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Login => "login",
            Self::GetUser => "get_user",
            Self::UpdateUser => "update_user",
            Self::DeleteUser => "delete_user",
            Self::ListTasks => "list_tasks",
            Self::GetTask(_) => "get_task",
            Self::CreateTask => "create_task",
            Self::UpdateTask(_) => "update_task",
            Self::DeleteTask(_) => "delete_task",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

/// `{ "result": ... }` success envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    /// The payload.
    pub result: T,
}

/// `{ "message": ... }` success body of mutating calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Error body; the backend may or may not include a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Optional human-readable reason.
    #[serde(default)]
    pub message: Option<String>,
}
