//! Client controller tying the session, task and account state together.
//!
//! [`App`] is what a front end drives: it owns the current [`View`], runs
//! the guard on every navigation, loads data when a view is entered, and
//! turns operation results into notices and redirects.

use std::sync::Arc;

use taskdesk_proto::task::{Task, TaskId};
use taskdesk_proto::user::User;

use crate::account::{Accounts, LoginForm, ProfileForm, SignupForm};
use crate::backend::Backend;
use crate::config::AuthFailurePolicy;
use crate::confirm::ConfirmationGate;
use crate::error::{ClientError, Disposition};
use crate::notify::Notices;
use crate::session::{Access, CredentialStore, SessionEvent, SessionGuard, View};
use crate::tasks::{EditPage, InlineEditor, MutationOutcome, TaskSync};

/// Prompt shown before deleting a task.
pub const DELETE_TASK_PROMPT: &str = "Are you sure you want to delete this task?";
/// Prompt shown before deleting the account.
pub const DELETE_ACCOUNT_PROMPT: &str = "Are you sure you want to delete your account?";

/// Top-level client state.
pub struct App<B> {
    credentials: Arc<dyn CredentialStore>,
    guard: SessionGuard,
    accounts: Accounts<B>,
    sync: TaskSync<B>,
    editor: InlineEditor,
    edit_page: Option<EditPage>,
    task_gate: ConfirmationGate<TaskId>,
    account_gate: ConfirmationGate<()>,
    notices: Notices,
    profile: Option<User>,
    view: View,
    policy: AuthFailurePolicy,
}

impl<B: Backend> App<B> {
    /// Creates the controller on the landing view.
    pub fn new(
        backend: Arc<B>,
        credentials: Arc<dyn CredentialStore>,
        policy: AuthFailurePolicy,
    ) -> Self {
        Self {
            guard: SessionGuard::new(credentials.clone()),
            accounts: Accounts::new(backend.clone(), credentials.clone()),
            sync: TaskSync::new(backend, credentials.clone()),
            credentials,
            editor: InlineEditor::new(),
            edit_page: None,
            task_gate: ConfirmationGate::new(),
            account_gate: ConfirmationGate::new(),
            notices: Notices::new(),
            profile: None,
            view: View::Landing,
            policy,
        }
    }

    // -- Accessors --

    /// The view currently shown.
    #[must_use]
    pub const fn view(&self) -> View {
        self.view
    }

    /// The session guard.
    #[must_use]
    pub const fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// The displayed task collection.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        self.sync.tasks()
    }

    /// The inline editor.
    #[must_use]
    pub const fn editor(&self) -> &InlineEditor {
        &self.editor
    }

    /// Mutable access to the inline editor's drafts.
    pub const fn editor_mut(&mut self) -> &mut InlineEditor {
        &mut self.editor
    }

    /// The dedicated edit form, once loaded.
    #[must_use]
    pub const fn edit_page(&self) -> Option<&EditPage> {
        self.edit_page.as_ref()
    }

    /// Mutable access to the dedicated edit form.
    pub const fn edit_page_mut(&mut self) -> Option<&mut EditPage> {
        self.edit_page.as_mut()
    }

    /// The dedicated edit form, which must have loaded for `id`.
    ///
    /// # Errors
    ///
    /// [`ClientError::TaskUnavailable`] when the form for `id` is not loaded.
    pub fn loaded_edit_page(&mut self, id: TaskId) -> Result<&mut EditPage, ClientError> {
        self.edit_page
            .as_mut()
            .filter(|page| page.id() == id)
            .ok_or(ClientError::TaskUnavailable(id))
    }

    /// The task deletion prompt.
    #[must_use]
    pub const fn task_gate(&self) -> &ConfirmationGate<TaskId> {
        &self.task_gate
    }

    /// The account deletion prompt.
    #[must_use]
    pub const fn account_gate(&self) -> &ConfirmationGate<()> {
        &self.account_gate
    }

    /// The profile shown on the profile view.
    #[must_use]
    pub const fn profile(&self) -> Option<&User> {
        self.profile.as_ref()
    }

    /// Pending notices.
    #[must_use]
    pub const fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Takes all pending notices.
    pub fn drain_notices(&mut self) -> Vec<crate::notify::Notice> {
        self.notices.drain()
    }

    // -- Navigation --

    /// Moves to `requested`, or wherever the guard redirects, and loads
    /// the data the resulting view shows. Returns the view entered.
    pub async fn navigate(&mut self, requested: View) -> View {
        if let Some(event) = self.guard.resync() {
            tracing::debug!(?event, "session resynced before navigation");
        }
        let target = match self.guard.check_view(&requested) {
            Access::Allow => requested,
            Access::Redirect(to) => {
                tracing::info!(from = %requested, %to, "redirected by session guard");
                to
            }
        };
        if target != self.view {
            self.editor.cancel_edit();
            self.edit_page = None;
        }
        self.view = target;
        self.enter(target).await;
        self.view
    }

    async fn enter(&mut self, view: View) {
        match view {
            View::Dashboard | View::Todos => {
                if let Err(e) = self.sync.list().await {
                    self.report(&e, "Failed to load tasks.", false);
                }
            }
            View::Profile => self.load_profile().await,
            View::EditTask(id) => match EditPage::load(&self.sync, id).await {
                Ok(page) => self.edit_page = Some(page),
                Err(e) => self.report(&e, "Failed to fetch task.", false),
            },
            View::Landing
            | View::Signup
            | View::Login
            | View::CreateTask
            | View::NotFound => {}
        }
    }

    async fn load_profile(&mut self) {
        match self.accounts.fetch_profile().await {
            Ok(user) => self.profile = Some(user),
            Err(e) => {
                self.report(&e, "Failed to load profile.", false);
                if self.view == View::Profile {
                    self.profile = self.credentials.read().map(|c| c.user);
                }
            }
        }
    }

    /// Surfaces an error according to its disposition.
    ///
    /// Token rejections follow the configured [`AuthFailurePolicy`]: the
    /// session is cleared with a redirect to login, or kept without one.
    fn report(&mut self, error: &ClientError, fallback: &str, prefer_server: bool) {
        tracing::warn!(%error, "operation failed");
        match error.disposition() {
            Disposition::Inline => {}
            Disposition::RedirectToLogin if error.is_token_rejected() => match self.policy {
                AuthFailurePolicy::ClearSession => {
                    if let Err(e) = self.credentials.clear() {
                        tracing::error!(error = %e, "failed to clear rejected session");
                    }
                    self.notices.error("Session expired. Please log in again.");
                    self.end_session(SessionEvent::TokenRejected);
                }
                AuthFailurePolicy::KeepToken => self.notices.error(fallback),
            },
            Disposition::RedirectToLogin => {
                self.end_session(SessionEvent::SignedOut);
            }
            Disposition::Notify => {
                let text = match error {
                    ClientError::Api(api) if prefer_server => {
                        api.server_message().unwrap_or(fallback).to_string()
                    }
                    _ => fallback.to_string(),
                };
                self.notices.error(text);
            }
        }
    }

    /// Surfaces a failure of a call made without a session token.
    ///
    /// A 401 here rejects the submitted credentials, not a stored session,
    /// so the session and the auth policy are left alone.
    fn report_unauthenticated(&mut self, error: &ClientError, fallback: &str) {
        tracing::warn!(%error, "operation failed");
        match error {
            ClientError::Validation(_) => {}
            ClientError::Api(api) => {
                let text = api.server_message().unwrap_or(fallback).to_string();
                self.notices.error(text);
            }
            _ => self.notices.error(fallback),
        }
    }

    fn end_session(&mut self, event: SessionEvent) {
        self.view = self.guard.apply(event);
        self.sync.reset();
        self.editor.cancel_edit();
        self.edit_page = None;
        self.task_gate.cancel();
        self.account_gate.cancel();
        self.profile = None;
    }

    fn after_mutation(&mut self, outcome: &MutationOutcome, success: &str) {
        self.notices.success(success);
        if let Some(e) = &outcome.refresh_error {
            self.report(e, "Failed to load tasks.", false);
        }
    }

    // -- Session --

    /// Logs in and enters the dashboard.
    ///
    /// # Errors
    ///
    /// Field errors, or the login failure (also queued as a notice).
    pub async fn login(&mut self, form: &LoginForm) -> Result<User, ClientError> {
        match self.accounts.login(form).await {
            Ok(user) => {
                self.notices.success("Login Successful!");
                let next = self.guard.apply(SessionEvent::SignedIn);
                self.navigate(next).await;
                Ok(user)
            }
            Err(e) => {
                self.report_unauthenticated(&e, "Login Failed!");
                Err(e)
            }
        }
    }

    /// Registers an account and moves to the login view.
    ///
    /// # Errors
    ///
    /// Field errors, or the registration failure (also queued as a notice).
    pub async fn signup(&mut self, form: &SignupForm) -> Result<(), ClientError> {
        match self.accounts.signup(form).await {
            Ok(message) => {
                let text = if message.trim().is_empty() {
                    "Sign Up Successful!".to_string()
                } else {
                    message
                };
                self.notices.success(text);
                self.navigate(View::Login).await;
                Ok(())
            }
            Err(e) => {
                self.report_unauthenticated(&e, "Sign Up Failed");
                Err(e)
            }
        }
    }

    /// Ends the session and moves to the login view.
    ///
    /// # Errors
    ///
    /// Returns the store error if the session could not be removed.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.accounts.logout()?;
        self.notices.success("Logout successfully!");
        self.end_session(SessionEvent::SignedOut);
        Ok(())
    }

    // -- Tasks --

    /// Creates a task. From the create view, returns to the dashboard.
    ///
    /// # Errors
    ///
    /// Field errors (nothing sent), or the create failure.
    pub async fn create_task(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), ClientError> {
        match self.sync.create(title, description).await {
            Ok(outcome) => {
                self.after_mutation(&outcome, "Task created successfully!");
                if self.view == View::CreateTask {
                    self.navigate(View::Dashboard).await;
                }
                Ok(())
            }
            Err(e) => {
                self.report(&e, "Failed to create task.", false);
                Err(e)
            }
        }
    }

    /// Puts a displayed task into inline edit mode.
    ///
    /// Returns `false` if the task is not in the collection.
    pub fn begin_edit(&mut self, id: TaskId) -> bool {
        let Some(task) = self.sync.find(id) else {
            return false;
        };
        self.editor.begin_edit(task);
        true
    }

    /// Drops the inline draft.
    pub fn cancel_edit(&mut self) {
        self.editor.cancel_edit();
    }

    /// Saves the inline draft.
    ///
    /// # Errors
    ///
    /// Field errors (the row stays in edit mode), or the update failure.
    pub async fn commit_edit(&mut self) -> Result<(), ClientError> {
        match self.editor.commit_edit(&mut self.sync).await {
            Ok(outcome) => {
                self.after_mutation(&outcome, "Task updated successfully!");
                Ok(())
            }
            Err(e) => {
                self.report(&e, "Failed to update task.", false);
                Err(e)
            }
        }
    }

    /// Leaves inline editing for the dedicated edit view of `id`.
    pub async fn edit_elsewhere(&mut self, id: TaskId) -> View {
        let target = self.editor.edit_elsewhere(id);
        self.navigate(target).await
    }

    /// Saves the dedicated edit form and returns to the dashboard.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotEditing`] if no form is loaded, field errors, or
    /// the update failure.
    pub async fn save_edit_page(&mut self) -> Result<(), ClientError> {
        let Some(page) = self.edit_page.as_mut() else {
            return Err(ClientError::NotEditing);
        };
        match page.save(&mut self.sync).await {
            Ok(outcome) => {
                self.after_mutation(&outcome, "Task updated successfully!");
                self.navigate(View::Dashboard).await;
                Ok(())
            }
            Err(e) => {
                self.report(&e, "Failed to update task.", false);
                Err(e)
            }
        }
    }

    /// Opens the deletion prompt for a task.
    pub fn request_delete(&mut self, id: TaskId) {
        self.task_gate.open(id, DELETE_TASK_PROMPT);
    }

    /// Closes the deletion prompt without deleting.
    pub fn cancel_delete(&mut self) {
        self.task_gate.cancel();
    }

    /// Deletes the task the prompt was opened for.
    ///
    /// Returns `Ok(false)` when no prompt was open.
    ///
    /// # Errors
    ///
    /// Returns the delete failure.
    pub async fn confirm_delete(&mut self) -> Result<bool, ClientError> {
        let sync = &mut self.sync;
        let Some(result) = self
            .task_gate
            .confirm(move |id| async move { sync.delete(id).await })
            .await
        else {
            return Ok(false);
        };
        match result {
            Ok(outcome) => {
                self.after_mutation(&outcome, "Task deleted.");
                Ok(true)
            }
            Err(e) => {
                self.report(&e, "Failed to delete task.", false);
                Err(e)
            }
        }
    }

    // -- Profile --

    /// Submits profile changes. An unchanged form is not sent.
    ///
    /// # Errors
    ///
    /// Field errors, or the update failure.
    pub async fn update_profile(&mut self, form: &ProfileForm) -> Result<(), ClientError> {
        let Some(current) = self
            .profile
            .clone()
            .or_else(|| self.credentials.read().map(|c| c.user))
        else {
            let e = ClientError::AuthRequired;
            self.report(&e, "Failed to update profile.", false);
            return Err(e);
        };
        match self.accounts.update_profile(form, &current).await {
            Ok(Some(user)) => {
                self.profile = Some(user);
                self.notices.success("Profile updated successfully!");
                Ok(())
            }
            Ok(None) => {
                self.notices.info("No changes to save.");
                Ok(())
            }
            Err(e) => {
                self.report(&e, "Failed to update profile.", false);
                Err(e)
            }
        }
    }

    /// Opens the account deletion prompt.
    pub fn request_account_deletion(&mut self) {
        self.account_gate.open((), DELETE_ACCOUNT_PROMPT);
    }

    /// Closes the account deletion prompt.
    pub fn cancel_account_deletion(&mut self) {
        self.account_gate.cancel();
    }

    /// Deletes the account after confirmation and ends the session.
    ///
    /// Returns `Ok(false)` when no prompt was open.
    ///
    /// # Errors
    ///
    /// Returns the deletion failure.
    pub async fn confirm_account_deletion(&mut self) -> Result<bool, ClientError> {
        let accounts = &self.accounts;
        let Some(result) = self
            .account_gate
            .confirm(move |()| async move { accounts.delete_account().await })
            .await
        else {
            return Ok(false);
        };
        match result {
            Ok(_) => {
                self.notices.success("Account deleted successfully.");
                self.end_session(SessionEvent::SignedOut);
                Ok(true)
            }
            Err(e) => {
                self.report(&e, "Failed to delete the account.", true);
                Err(e)
            }
        }
    }
}
