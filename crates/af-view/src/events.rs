//! Everything the controller tells the outside world: toasts, route changes
//! and sign-in prompts.

use af_core::Route;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// The complete set of user-facing outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    ThreadsLoadFailed,
    ThreadCreated,
    ThreadCreateFailed,
    ReplyPosted,
    ReplyPostFailed,
    ThreadNotFound,
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Notification::ThreadsLoadFailed => "Failed to load threads",
            Notification::ThreadCreated => "Thread created!",
            Notification::ThreadCreateFailed => "Failed to create thread",
            Notification::ReplyPosted => "Reply posted!",
            Notification::ReplyPostFailed => "Failed to post reply",
            Notification::ThreadNotFound => "Thread not found",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Notification::ThreadCreated | Notification::ReplyPosted => Severity::Success,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForumEvent {
    /// Show a toast.
    Notify(Notification),
    /// The controller moved to `Route`; the host router should follow.
    /// Feeding it back through `navigate` is a no-op.
    Navigate(Route),
    /// A write was attempted without a user. Open the sign-in flow.
    SignInRequested,
}
