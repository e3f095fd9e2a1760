//! Task collection synchronization.
//!
//! The collection is never patched locally. Each successful create, update
//! or delete is followed by a full re-fetch, so the displayed list always
//! equals the last list the server returned. A failed fetch leaves the
//! previous list in place.

use std::sync::Arc;

use taskdesk_proto::task::{Task, TaskId};

use super::sequence::{RequestSequence, Ticket};
use crate::backend::Backend;
use crate::error::ClientError;
use crate::session::store::CredentialStore;
use crate::validate;

/// What happened to a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// The response replaced the collection.
    Applied,
    /// A newer request was issued meanwhile; the response was dropped.
    Stale,
}

/// Result of a successful mutation.
#[derive(Debug)]
pub struct MutationOutcome {
    /// Server confirmation message.
    pub message: String,
    /// Set when the mutation succeeded but the follow-up re-fetch failed.
    pub refresh_error: Option<ClientError>,
}

/// The current user's task collection.
pub struct TaskSync<B> {
    backend: Arc<B>,
    credentials: Arc<dyn CredentialStore>,
    tasks: Vec<Task>,
    sequence: RequestSequence,
    loaded: bool,
}

impl<B: Backend> TaskSync<B> {
    /// Creates an empty, not yet loaded collection.
    pub fn new(backend: Arc<B>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            credentials,
            tasks: Vec::new(),
            sequence: RequestSequence::new(),
            loaded: false,
        }
    }

    /// The last list applied from the server.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Whether any list response has been applied yet.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Looks up a task in the current collection.
    #[must_use]
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Drops the collection, e.g. when the session ends.
    pub fn reset(&mut self) {
        self.sequence.issue();
        self.tasks.clear();
        self.loaded = false;
    }

    fn token(&self) -> Result<String, ClientError> {
        self.credentials.token().ok_or(ClientError::AuthRequired)
    }

    /// Issues a ticket for a list request about to be sent.
    pub const fn issue_ticket(&mut self) -> Ticket {
        self.sequence.issue()
    }

    /// Fetches the list without applying it.
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthRequired`] without a stored token, otherwise the
    /// backend error.
    pub async fn fetch(&self) -> Result<Vec<Task>, ClientError> {
        let token = self.token()?;
        Ok(self.backend.list_tasks(&token).await?)
    }

    /// Applies a list response if `ticket` is still the newest.
    ///
    /// A stale response is dropped whether it succeeded or failed.
    ///
    /// # Errors
    ///
    /// Returns the fetch error of a current response; the collection is
    /// left unchanged.
    pub fn apply_list(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Task>, ClientError>,
    ) -> Result<ListOutcome, ClientError> {
        if !self.sequence.is_latest(ticket) {
            tracing::debug!(ticket = ticket.get(), "dropping stale task list response");
            return Ok(ListOutcome::Stale);
        }
        let tasks = result.inspect_err(|e| tracing::warn!(error = %e, "task list fetch failed"))?;
        tracing::debug!(count = tasks.len(), "task list applied");
        self.tasks = tasks;
        self.loaded = true;
        Ok(ListOutcome::Applied)
    }

    /// Fetches and applies the list.
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthRequired`] without a token, or the backend error.
    /// Either way the collection is unchanged.
    pub async fn list(&mut self) -> Result<&[Task], ClientError> {
        let ticket = self.issue_ticket();
        let result = self.fetch().await;
        self.apply_list(ticket, result)?;
        Ok(&self.tasks)
    }

    async fn refresh_after(&mut self, message: String) -> MutationOutcome {
        let refresh_error = self.list().await.err();
        MutationOutcome {
            message,
            refresh_error,
        }
    }

    /// Creates a task and re-fetches the collection.
    ///
    /// # Errors
    ///
    /// [`ClientError::Validation`] for an empty title (nothing is sent),
    /// [`ClientError::AuthRequired`] without a token, or the backend error.
    pub async fn create(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> Result<MutationOutcome, ClientError> {
        let body = validate::task_body(title, description.unwrap_or_default())?;
        let token = self.token()?;
        let response = self.backend.create_task(&token, &body).await?;
        tracing::info!(title = %body.title, "task created");
        Ok(self.refresh_after(response.message).await)
    }

    /// Replaces a task's title and description and re-fetches.
    ///
    /// # Errors
    ///
    /// As [`TaskSync::create`]; a missing task surfaces as a not-found
    /// [`ClientError::Api`].
    pub async fn update(
        &mut self,
        id: TaskId,
        title: &str,
        description: Option<&str>,
    ) -> Result<MutationOutcome, ClientError> {
        let body = validate::task_body(title, description.unwrap_or_default())?;
        let token = self.token()?;
        let response = self.backend.update_task(&token, id, &body).await?;
        tracing::info!(%id, "task updated");
        Ok(self.refresh_after(response.message).await)
    }

    /// Deletes a task and re-fetches. Callers confirm first.
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthRequired`] without a token, or the backend error.
    pub async fn delete(&mut self, id: TaskId) -> Result<MutationOutcome, ClientError> {
        let token = self.token()?;
        let response = self.backend.delete_task(&token, id).await?;
        tracing::info!(%id, "task deleted");
        Ok(self.refresh_after(response.message).await)
    }

    /// Fetches one task without touching the collection.
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthRequired`] without a token, or the backend error.
    pub async fn get(&self, id: TaskId) -> Result<Task, ClientError> {
        let token = self.token()?;
        Ok(self.backend.get_task(&token, id).await?)
    }
}
