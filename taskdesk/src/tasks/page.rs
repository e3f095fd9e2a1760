//! Dedicated edit view for a single task.

use taskdesk_proto::task::{Task, TaskId};

use super::sync::{MutationOutcome, TaskSync};
use crate::backend::Backend;
use crate::error::ClientError;
use crate::validate::{self, Field, FieldErrors};

/// Form state of the `/Edit/:id` view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPage {
    id: TaskId,
    /// Title as currently typed.
    pub title: String,
    /// Description as currently typed.
    pub description: String,
    /// Field errors from the last save attempt.
    pub errors: FieldErrors,
}

impl EditPage {
    /// Seeds the form from a task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description_text().to_string(),
            errors: FieldErrors::new(),
        }
    }

    /// Loads the task from the server and seeds the form.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, e.g. not-found for a foreign or deleted id.
    pub async fn load<B: Backend>(sync: &TaskSync<B>, id: TaskId) -> Result<Self, ClientError> {
        let task = sync.get(id).await?;
        Ok(Self::from_task(&task))
    }

    /// Id of the task being edited.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Replaces the title and clears its error.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.errors.clear_field(Field::Title);
    }

    /// Validates and saves the form.
    ///
    /// # Errors
    ///
    /// [`ClientError::Validation`] for an empty title (kept in
    /// [`EditPage::errors`]), or the update error.
    pub async fn save<B: Backend>(
        &mut self,
        sync: &mut TaskSync<B>,
    ) -> Result<MutationOutcome, ClientError> {
        if let Err(errors) = validate::task_body(&self.title, &self.description) {
            self.errors = errors.clone();
            return Err(ClientError::Validation(errors));
        }
        sync.update(self.id, &self.title, Some(&self.description))
            .await
    }
}
