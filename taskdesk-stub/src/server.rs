//! HTTP surface of the stub: the TaskDesk REST routes over [`StubStore`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use serde_json::json;
use taskdesk_proto::api::{MessageResponse, ResultEnvelope, paths};
use taskdesk_proto::task::{Task, TaskBody, TaskId};
use taskdesk_proto::user::{LoginRequest, LoginResponse, User, form_fields};
use tokio::task::JoinHandle;

use crate::store::{NewUser, StubError, StubStore, Upload};

type Shared = State<Arc<StubStore>>;
type ApiResult<T> = Result<Json<T>, StubError>;

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

/// The raw `Authorization` header value.
fn token(headers: &HeaderMap) -> Result<&str, StubError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(StubError::Unauthorized)
}

/// Text fields and the optional avatar of a multipart user form.
#[derive(Default)]
struct UserForm {
    fields: std::collections::HashMap<String, String>,
    image: Option<(String, Upload)>,
}

impl UserForm {
    async fn read(mut multipart: Multipart) -> Result<Self, StubError> {
        let bad = |e: axum::extract::multipart::MultipartError| StubError::BadRequest(e.body_text());
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == form_fields::PROFILE_IMAGE {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad)?.to_vec();
                if !bytes.is_empty() {
                    let upload = Upload {
                        content_type,
                        bytes,
                    };
                    form.image = Some((file_name, upload));
                }
            } else {
                let value = field.text().await.map_err(bad)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

async fn store_image(store: &StubStore, image: Option<(String, Upload)>) -> Option<String> {
    match image {
        Some((file_name, upload)) => Some(store.save_upload(&file_name, upload).await),
        None => None,
    }
}

/// Drops the avatar saved for a request whose store call then failed.
async fn discard_on_error<T>(
    store: &StubStore,
    saved: Option<String>,
    result: Result<T, StubError>,
) -> Result<T, StubError> {
    if let (Err(_), Some(name)) = (&result, saved) {
        store.discard_upload(&name).await;
    }
    result
}

async fn signup(State(store): Shared, multipart: Multipart) -> ApiResult<MessageResponse> {
    let mut form = UserForm::read(multipart).await?;
    let profile_image = store_image(&store, form.image.take()).await;
    let new_user = NewUser {
        name: form.take(form_fields::NAME).unwrap_or_default(),
        username: form.take(form_fields::USERNAME).unwrap_or_default(),
        email: form.take(form_fields::EMAIL).unwrap_or_default(),
        phone: form.take(form_fields::PHONE).unwrap_or_default(),
        password: form.take(form_fields::PASSWORD).unwrap_or_default(),
        profile_image: profile_image.clone(),
    };
    let registered = store.register(new_user).await;
    discard_on_error(&store, profile_image, registered).await?;
    Ok(message("User registered successfully"))
}

async fn login(State(store): Shared, Json(request): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let (jwt_token, user) = store.login(&request.identifier, &request.password).await?;
    Ok(Json(LoginResponse { jwt_token, user }))
}

async fn get_user(State(store): Shared, headers: HeaderMap) -> ApiResult<ResultEnvelope<User>> {
    let user = store.profile(token(&headers)?).await?;
    Ok(Json(ResultEnvelope { result: user }))
}

async fn update_user(
    State(store): Shared,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<ResultEnvelope<User>> {
    let token = token(&headers)?;
    store.profile(token).await?;
    let mut form = UserForm::read(multipart).await?;
    let profile_image = store_image(&store, form.image.take()).await;
    let updated = store
        .update_profile(
            token,
            form.take(form_fields::NAME),
            form.take(form_fields::PHONE),
            profile_image.clone(),
        )
        .await;
    let user = discard_on_error(&store, profile_image, updated).await?;
    Ok(Json(ResultEnvelope { result: user }))
}

async fn delete_user(State(store): Shared, headers: HeaderMap) -> ApiResult<MessageResponse> {
    store.delete_user(token(&headers)?).await?;
    Ok(message("User deleted successfully"))
}

async fn get_todos(State(store): Shared, headers: HeaderMap) -> ApiResult<ResultEnvelope<Vec<Task>>> {
    let tasks = store.list(token(&headers)?).await?;
    Ok(Json(ResultEnvelope { result: tasks }))
}

async fn get_todo(
    State(store): Shared,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> ApiResult<ResultEnvelope<Task>> {
    let task = store.get(token(&headers)?, id).await?;
    Ok(Json(ResultEnvelope { result: task }))
}

async fn create_todo(
    State(store): Shared,
    headers: HeaderMap,
    Json(body): Json<TaskBody>,
) -> ApiResult<MessageResponse> {
    let id = store.create(token(&headers)?, body).await?;
    tracing::debug!(%id, "todo created");
    Ok(message("Todo created successfully"))
}

async fn update_todo(
    State(store): Shared,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
    Json(body): Json<TaskBody>,
) -> ApiResult<MessageResponse> {
    store.update(token(&headers)?, id, body).await?;
    Ok(message("Todo updated successfully"))
}

async fn delete_todo(
    State(store): Shared,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> ApiResult<MessageResponse> {
    store.delete(token(&headers)?, id).await?;
    Ok(message("Todo deleted successfully"))
}

async fn uploaded_file(State(store): Shared, Path(file): Path<String>) -> Response {
    match store.upload(&file).await {
        Some(upload) => ([(header::CONTENT_TYPE, upload.content_type)], upload.bytes).into_response(),
        None => StubError::NotFound("File not found").into_response(),
    }
}

/// Builds the router for all API routes.
pub fn router(store: Arc<StubStore>) -> Router {
    Router::new()
        .route(paths::SIGNUP, post(signup))
        .route(paths::LOGIN, post(login))
        .route(paths::GET_USER, get(get_user))
        .route(paths::UPDATE_USER, put(update_user))
        .route(paths::DELETE_USER, delete(delete_user))
        .route(paths::GET_TODOS, get(get_todos))
        .route(&format!("{}/{{id}}", paths::GET_TODO), get(get_todo))
        .route(paths::CREATE_TODO, post(create_todo))
        .route(&format!("{}/{{id}}", paths::UPDATE_TODO), put(update_todo))
        .route(&format!("{}/{{id}}", paths::DELETE_TODO), delete(delete_todo))
        .route(&format!("{}/{{file}}", paths::UPLOADS), get(uploaded_file))
        .with_state(store)
}

/// Starts the server with the seeded demo store.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    start_server_with_state(addr, Arc::new(StubStore::seeded())).await
}

/// Starts the server over a caller-provided store.
///
/// Bind to `127.0.0.1:0` for an OS-assigned port; the bound address is
/// returned with the server task handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    store: Arc<StubStore>,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "stub server error");
        }
    });

    Ok((bound_addr, handle))
}
