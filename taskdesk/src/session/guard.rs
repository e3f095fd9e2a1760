//! Access control for views.
//!
//! [`SessionGuard::check_access`] re-reads the credential store on every
//! call, so a token removed elsewhere (another process, an expired session
//! cleared by policy) is caught on the next check. Session changes made by
//! this client go through [`SessionGuard::apply`], an explicit state
//! machine whose transitions name the view to move to.

use std::sync::Arc;

use super::store::CredentialStore;
use super::{Gate, View};

/// Result of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Render the requested view.
    Allow,
    /// Leave for another view instead.
    Redirect(View),
}

/// Authentication state tracked by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No usable session.
    Anonymous,
    /// A token is stored.
    Authenticated,
}

/// Session-changing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login succeeded and credentials were saved.
    SignedIn,
    /// The user logged out or deleted the account.
    SignedOut,
    /// The server rejected the stored token and the session was dropped.
    TokenRejected,
}

/// Gatekeeper for protected and entry views.
pub struct SessionGuard {
    credentials: Arc<dyn CredentialStore>,
    state: AuthState,
}

impl SessionGuard {
    /// Creates a guard whose initial state reflects the stored session.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        let state = Self::derive_state(credentials.as_ref());
        Self { credentials, state }
    }

    fn derive_state(credentials: &dyn CredentialStore) -> AuthState {
        if credentials.read().is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    /// Current state of the session machine.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Checks a view that either requires a session or requires its absence.
    ///
    /// Protected views without a stored session redirect to login; entry
    /// views with a stored session redirect to the dashboard.
    #[must_use]
    pub fn check_access(&self, require_auth: bool) -> Access {
        let signed_in = self.credentials.read().is_some();
        match (require_auth, signed_in) {
            (true, false) => Access::Redirect(View::Login),
            (false, true) => Access::Redirect(View::Dashboard),
            _ => Access::Allow,
        }
    }

    /// Checks a view according to its [`Gate`].
    #[must_use]
    pub fn check_view(&self, view: &View) -> Access {
        match view.gate() {
            Gate::Open => Access::Allow,
            Gate::EntryOnly => self.check_access(false),
            Gate::Protected => self.check_access(true),
        }
    }

    /// Advances the session machine and returns the view to show next.
    pub fn apply(&mut self, event: SessionEvent) -> View {
        let (next, view) = match event {
            SessionEvent::SignedIn => (AuthState::Authenticated, View::Dashboard),
            SessionEvent::SignedOut | SessionEvent::TokenRejected => {
                (AuthState::Anonymous, View::Login)
            }
        };
        if next != self.state {
            tracing::info!(from = ?self.state, to = ?next, ?event, "session state changed");
        }
        self.state = next;
        view
    }

    /// Reconciles the machine with the store after an outside change.
    ///
    /// Returns the event that explains the difference, if there was one.
    pub fn resync(&mut self) -> Option<SessionEvent> {
        let stored = Self::derive_state(self.credentials.as_ref());
        if stored == self.state {
            return None;
        }
        let event = match stored {
            AuthState::Authenticated => SessionEvent::SignedIn,
            AuthState::Anonymous => SessionEvent::SignedOut,
        };
        tracing::debug!(?event, "session changed outside this client");
        self.state = stored;
        Some(event)
    }
}
