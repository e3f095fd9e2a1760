//! Backend abstraction.
//!
//! [`Backend`] is the seam between the client controllers and the REST
//! API. Implementations:
//! - [`http::HttpBackend`]: the real API over HTTP
//! - [`memory::InMemoryBackend`]: in-process backend for tests

pub mod http;
pub mod memory;

use std::future::Future;
use std::path::Path;

use taskdesk_proto::api::MessageResponse;
use taskdesk_proto::codec::ApiError;
use taskdesk_proto::task::{Task, TaskBody, TaskId};
use taskdesk_proto::user::{LoginRequest, LoginResponse, User};

/// An image file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name sent with the part.
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Reads an image from disk, deriving the MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => "application/octet-stream",
        };
        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }
}

/// Registration form, sent as multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Login handle.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Ten-digit phone number.
    pub phone: String,
    /// Plain password.
    pub password: String,
    /// Avatar image.
    pub profile_image: ImageUpload,
}

/// Profile changes, sent as multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: String,
    /// New phone number.
    pub phone: String,
    /// Replacement avatar, if any.
    pub profile_image: Option<ImageUpload>,
}

/// Async access to the task-management API.
///
/// Authenticated operations take the raw session token, which is sent
/// unchanged in the `Authorization` header.
pub trait Backend: Send + Sync {
    /// `POST /users/signup`
    fn signup(
        &self,
        request: &SignupRequest,
    ) -> impl Future<Output = Result<MessageResponse, ApiError>> + Send;

    /// `POST /users/login`
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    /// `GET /users/getUser`
    fn fetch_profile(&self, token: &str) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `PUT /users/updateUser`
    fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `DELETE /users/deleteUser`
    fn delete_account(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<MessageResponse, ApiError>> + Send;

    /// `GET /todos/getTodos`
    fn list_tasks(&self, token: &str) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `GET /todos/getTodo/:id`
    fn get_task(
        &self,
        token: &str,
        id: TaskId,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `POST /todos/createTodo`
    fn create_task(
        &self,
        token: &str,
        body: &TaskBody,
    ) -> impl Future<Output = Result<MessageResponse, ApiError>> + Send;

    /// `PUT /todos/updateTodo/:id`
    fn update_task(
        &self,
        token: &str,
        id: TaskId,
        body: &TaskBody,
    ) -> impl Future<Output = Result<MessageResponse, ApiError>> + Send;

    /// `DELETE /todos/deleteTodo/:id`
    fn delete_task(
        &self,
        token: &str,
        id: TaskId,
    ) -> impl Future<Output = Result<MessageResponse, ApiError>> + Send;
}
