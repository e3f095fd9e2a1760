//! Inline edit mode for task rows.
//!
//! At most one row is in edit mode. Starting an edit on another row drops
//! the current draft without saving it.

use taskdesk_proto::task::{Task, TaskId};

use super::sync::{MutationOutcome, TaskSync};
use crate::backend::Backend;
use crate::error::ClientError;
use crate::session::View;
use crate::validate::{self, Field, FieldErrors};

/// Draft state of the row being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// Task under edit.
    pub id: TaskId,
    /// Title as currently typed.
    pub draft_title: String,
    /// Description as currently typed.
    pub draft_description: String,
    /// Field errors from the last commit attempt.
    pub errors: FieldErrors,
}

/// Controller for the single editable row.
#[derive(Debug, Default)]
pub struct InlineEditor {
    session: Option<EditSession>,
}

impl InlineEditor {
    /// An editor with every row in display mode.
    #[must_use]
    pub const fn new() -> Self {
        Self { session: None }
    }

    /// The active draft, if a row is in edit mode.
    #[must_use]
    pub const fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Id of the row in edit mode.
    #[must_use]
    pub fn editing_id(&self) -> Option<TaskId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Whether `id` is the row in edit mode.
    #[must_use]
    pub fn is_editing(&self, id: TaskId) -> bool {
        self.editing_id() == Some(id)
    }

    /// Puts `task` in edit mode, seeding the drafts from it.
    pub fn begin_edit(&mut self, task: &Task) {
        if let Some(previous) = self.editing_id().filter(|id| *id != task.id) {
            tracing::debug!(%previous, next = %task.id, "discarding unsaved draft");
        }
        self.session = Some(EditSession {
            id: task.id,
            draft_title: task.title.clone(),
            draft_description: task.description_text().to_string(),
            errors: FieldErrors::new(),
        });
    }

    /// Leaves edit mode, dropping the draft.
    pub fn cancel_edit(&mut self) {
        self.session = None;
    }

    /// Replaces the draft title and clears its error.
    pub fn set_title(&mut self, title: impl Into<String>) {
        if let Some(session) = &mut self.session {
            session.draft_title = title.into();
            session.errors.clear_field(Field::Title);
        }
    }

    /// Replaces the draft description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        if let Some(session) = &mut self.session {
            session.draft_description = description.into();
        }
    }

    /// Leaves inline mode for the dedicated edit view of `id`.
    pub fn edit_elsewhere(&mut self, id: TaskId) -> View {
        self.cancel_edit();
        View::EditTask(id)
    }

    /// Validates and saves the draft.
    ///
    /// An invalid draft stays in edit mode with its field errors. Otherwise
    /// the row returns to display mode whether the update succeeds or not.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotEditing`] with no active draft,
    /// [`ClientError::Validation`] for an empty title, or the update error.
    pub async fn commit_edit<B: Backend>(
        &mut self,
        sync: &mut TaskSync<B>,
    ) -> Result<MutationOutcome, ClientError> {
        let session = self.session.as_mut().ok_or(ClientError::NotEditing)?;
        if let Err(errors) = validate::task_body(&session.draft_title, &session.draft_description)
        {
            session.errors = errors.clone();
            return Err(ClientError::Validation(errors));
        }
        let Some(session) = self.session.take() else {
            return Err(ClientError::NotEditing);
        };
        let description = Some(session.draft_description.as_str());
        sync.update(session.id, &session.draft_title, description)
            .await
    }
}
