//! Client error taxonomy.

use taskdesk_proto::codec::ApiError;
use taskdesk_proto::task::TaskId;

use crate::session::store::StoreError;
use crate::validate::FieldErrors;

/// How a front end should surface a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Show the messages next to the offending inputs.
    Inline,
    /// Leave the current view for the login view.
    RedirectToLogin,
    /// Show a transient, non-blocking notification.
    Notify,
}

/// Errors returned by client operations. None of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Local validation failed; nothing was sent.
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    /// No session token is stored.
    #[error("not signed in")]
    AuthRequired,

    /// `commit_edit` was called while no row was in edit mode.
    #[error("no task is being edited")]
    NotEditing,

    /// The task is not available to the current user.
    #[error("task #{0} could not be loaded")]
    TaskUnavailable(TaskId),

    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The credential store could not be written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Maps the error onto the validation / auth / transport taxonomy.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Validation(_) => Disposition::Inline,
            Self::AuthRequired => Disposition::RedirectToLogin,
            Self::Api(e) if e.is_unauthorized() => Disposition::RedirectToLogin,
            Self::NotEditing | Self::TaskUnavailable(_) | Self::Api(_) | Self::Store(_) => {
                Disposition::Notify
            }
        }
    }

    /// The field errors, for [`Disposition::Inline`] errors.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Whether the server rejected the stored token.
    #[must_use]
    pub fn is_token_rejected(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}

impl From<FieldErrors> for ClientError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}
