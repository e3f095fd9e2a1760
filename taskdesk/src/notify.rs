//! Transient user-facing notices.

use std::collections::VecDeque;
use std::fmt;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// An operation completed.
    Success,
    /// Informational, e.g. nothing to save.
    Info,
    /// An operation failed; the view stays usable.
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "ok"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One toast-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub text: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}

/// Most notices kept before the oldest is dropped.
pub const MAX_NOTICES: usize = 32;

/// Queue of notices waiting to be shown, capped at [`MAX_NOTICES`].
#[derive(Debug, Default)]
pub struct Notices {
    queue: VecDeque<Notice>,
}

impl Notices {
    /// An empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    fn push(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(%level, %text, "notice");
        if self.queue.len() == MAX_NOTICES {
            self.queue.pop_front();
        }
        self.queue.push_back(Notice { level, text });
    }

    /// Number of queued notices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues a success notice.
    pub fn success(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Success, text);
    }

    /// Queues an informational notice.
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Info, text);
    }

    /// Queues an error notice.
    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Error, text);
    }

    /// The most recent notice.
    #[must_use]
    pub fn latest(&self) -> Option<&Notice> {
        self.queue.back()
    }

    /// Whether any queued notice has `text`.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.queue.iter().any(|n| n.text == text)
    }

    /// Removes and returns every queued notice, oldest first.
    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }
}
