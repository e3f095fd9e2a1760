//! Response decoding for the REST contract.
//!
//! The backend reports failures as a non-2xx status with an optional
//! `message` field. [`decode_response`] turns every response into either
//! the typed success body or a tagged [`ApiError`], so nothing downstream
//! has to probe for optional nested fields.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::api::ApiErrorBody;

/// Classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 401/403: the token is absent, expired or rejected.
    Unauthorized,
    /// 404: the addressed record does not exist for this user.
    NotFound,
    /// Any other 4xx: the server refused the input.
    Rejected,
    /// 5xx.
    Server,
    /// The request never produced a response.
    Transport,
    /// The request exceeded the client-side timeout.
    Timeout,
    /// A 2xx body did not match the expected shape.
    Decode,
}

impl ApiErrorKind {
    /// Maps an HTTP status to an error kind; `None` for success codes.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(Self::Unauthorized),
            404 => Some(Self::NotFound),
            400..=499 => Some(Self::Rejected),
            _ => Some(Self::Server),
        }
    }

    const fn default_message(self) -> &'static str {
        match self {
            Self::Unauthorized => "session is missing or no longer valid",
            Self::NotFound => "record not found",
            Self::Rejected => "request rejected by server",
            Self::Server => "server error",
            Self::Transport => "could not reach server",
            Self::Timeout => "request timed out",
            Self::Decode => "unexpected response from server",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::Rejected => write!(f, "rejected"),
            Self::Server => write!(f, "server"),
            Self::Transport => write!(f, "transport"),
            Self::Timeout => write!(f, "timeout"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

/// A failed backend call, decoded once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// What went wrong.
    pub kind: ApiErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Server-supplied message, or a default for the kind.
    pub message: String,
    /// Whether `message` came from the server body.
    pub from_server: bool,
}

impl ApiError {
    /// Creates an error with an explicit message and no status.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            from_server: false,
        }
    }

    /// Network-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, message)
    }

    /// Client-side timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(ApiErrorKind::Timeout, ApiErrorKind::Timeout.default_message())
    }

    /// Builds the error for a non-2xx status from its (possibly empty) body.
    #[must_use]
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let kind = ApiErrorKind::from_status(status).unwrap_or(ApiErrorKind::Decode);
        let server_message = serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty());
        let from_server = server_message.is_some();
        Self {
            kind,
            status: Some(status),
            message: server_message.unwrap_or_else(|| kind.default_message().to_string()),
            from_server,
        }
    }

    /// The server's own message, if it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        self.from_server.then_some(self.message.as_str())
    }

    /// Whether the failure means the session token was rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }
}

/// Decodes a response body given its HTTP status.
///
/// # Errors
///
/// Returns an [`ApiError`] classified from the status for non-2xx
/// responses, or [`ApiErrorKind::Decode`] if a 2xx body does not match `T`.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ApiError> {
    if ApiErrorKind::from_status(status).is_some() {
        return Err(ApiError::from_status(status, body));
    }
    serde_json::from_slice(body).map_err(|e| ApiError {
        kind: ApiErrorKind::Decode,
        status: Some(status),
        message: format!("{}: {e}", ApiErrorKind::Decode.default_message()),
        from_server: false,
    })
}
