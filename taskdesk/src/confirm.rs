//! Yes/no confirmation before destructive actions.

use std::future::Future;

#[derive(Debug)]
struct Pending<T> {
    target: T,
    prompt: String,
}

/// A modal prompt guarding one destructive action.
///
/// The target is present exactly while the prompt is visible. Confirming
/// or cancelling closes the prompt and clears the target in one step.
#[derive(Debug)]
pub struct ConfirmationGate<T> {
    pending: Option<Pending<T>>,
}

impl<T> Default for ConfirmationGate<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> ConfirmationGate<T> {
    /// A closed gate.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Shows the prompt for `target`, replacing any open one.
    pub fn open(&mut self, target: T, prompt: impl Into<String>) {
        self.pending = Some(Pending {
            target,
            prompt: prompt.into(),
        });
    }

    /// Whether the prompt is showing.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending target.
    #[must_use]
    pub fn target(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.target)
    }

    /// The question shown to the user.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.prompt.as_str())
    }

    /// Closes the prompt without running anything.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.target)
    }

    /// Closes the prompt and runs `action` on the target exactly once.
    ///
    /// Returns `None`, running nothing, when the gate is closed.
    pub async fn confirm<F, Fut>(&mut self, action: F) -> Option<Fut::Output>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future,
    {
        let target = self.pending.take()?.target;
        Some(action(target).await)
    }
}
