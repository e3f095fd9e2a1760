//! HTTP implementation of [`Backend`] on top of `reqwest`.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use taskdesk_proto::api::{Endpoint, HttpMethod, MessageResponse, ResultEnvelope};
use taskdesk_proto::codec::{ApiError, decode_response};
use taskdesk_proto::task::{Task, TaskBody, TaskId};
use taskdesk_proto::user::{LoginRequest, LoginResponse, User, form_fields};
use tracing::Instrument;
use url::Url;

use super::{Backend, ImageUpload, ProfileUpdate, SignupRequest};

/// Talks to the REST API at a base URL.
///
/// Every request carries the client-wide timeout, so a hung call resolves
/// to [`ApiError::timeout`] instead of blocking the caller.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Builds a backend for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.path()
        )
    }

    fn request(&self, endpoint: &Endpoint, token: Option<&str>) -> RequestBuilder {
        let method = match endpoint.method() {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };
        let builder = self.client.request(method, self.url(endpoint));
        match token {
            Some(token) => builder.header(header::AUTHORIZATION, token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(
        endpoint: Endpoint,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let span = tracing::debug_span!("api", call = endpoint.name(), route = %endpoint);
        async move {
            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            tracing::debug!(status, bytes = body.len(), "response received");
            decode_response(status, &body)
                .inspect_err(|e| tracing::warn!(error = %e, "request failed"))
        }
        .instrument(span)
        .await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::timeout()
    } else {
        ApiError::transport(e.to_string())
    }
}

fn image_part(image: &ImageUpload) -> Result<Part, ApiError> {
    Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)
        .map_err(|e| ApiError::transport(format!("invalid image type: {e}")))
}

impl Backend for HttpBackend {
    async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse, ApiError> {
        let form = Form::new()
            .text(form_fields::NAME, request.name.clone())
            .text(form_fields::USERNAME, request.username.clone())
            .text(form_fields::EMAIL, request.email.clone())
            .text(form_fields::PHONE, request.phone.clone())
            .text(form_fields::PASSWORD, request.password.clone())
            .part(form_fields::PROFILE_IMAGE, image_part(&request.profile_image)?);
        let endpoint = Endpoint::Signup;
        let builder = self.request(&endpoint, None).multipart(form);
        Self::execute(endpoint, builder).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let endpoint = Endpoint::Login;
        let builder = self.request(&endpoint, None).json(request);
        Self::execute(endpoint, builder).await
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, ApiError> {
        let endpoint = Endpoint::GetUser;
        let builder = self.request(&endpoint, Some(token));
        let envelope: ResultEnvelope<User> = Self::execute(endpoint, builder).await?;
        Ok(envelope.result)
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, ApiError> {
        let mut form = Form::new()
            .text(form_fields::NAME, update.name.clone())
            .text(form_fields::PHONE, update.phone.clone());
        if let Some(image) = &update.profile_image {
            form = form.part(form_fields::PROFILE_IMAGE, image_part(image)?);
        }
        let endpoint = Endpoint::UpdateUser;
        let builder = self.request(&endpoint, Some(token)).multipart(form);
        let envelope: ResultEnvelope<User> = Self::execute(endpoint, builder).await?;
        Ok(envelope.result)
    }

    async fn delete_account(&self, token: &str) -> Result<MessageResponse, ApiError> {
        let endpoint = Endpoint::DeleteUser;
        let builder = self.request(&endpoint, Some(token));
        Self::execute(endpoint, builder).await
    }

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ApiError> {
        let endpoint = Endpoint::ListTasks;
        let builder = self.request(&endpoint, Some(token));
        let envelope: ResultEnvelope<Vec<Task>> = Self::execute(endpoint, builder).await?;
        Ok(envelope.result)
    }

    async fn get_task(&self, token: &str, id: TaskId) -> Result<Task, ApiError> {
        let endpoint = Endpoint::GetTask(id);
        let builder = self.request(&endpoint, Some(token));
        let envelope: ResultEnvelope<Task> = Self::execute(endpoint, builder).await?;
        Ok(envelope.result)
    }

    async fn create_task(&self, token: &str, body: &TaskBody) -> Result<MessageResponse, ApiError> {
        let endpoint = Endpoint::CreateTask;
        let builder = self.request(&endpoint, Some(token)).json(body);
        Self::execute(endpoint, builder).await
    }

    async fn update_task(
        &self,
        token: &str,
        id: TaskId,
        body: &TaskBody,
    ) -> Result<MessageResponse, ApiError> {
        let endpoint = Endpoint::UpdateTask(id);
        let builder = self.request(&endpoint, Some(token)).json(body);
        Self::execute(endpoint, builder).await
    }

    async fn delete_task(&self, token: &str, id: TaskId) -> Result<MessageResponse, ApiError> {
        let endpoint = Endpoint::DeleteTask(id);
        let builder = self.request(&endpoint, Some(token));
        Self::execute(endpoint, builder).await
    }
}
