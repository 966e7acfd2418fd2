//! One-shot user-facing notices.
//!
//! Notices are for failures that must be shown once but must not stick in
//! `AuthState` (a failed logout). Each receiver sees a notice at most once;
//! receivers created after it was sent never see it.

use tokio::sync::broadcast;

use crate::errors::AuthError;

const NOTICE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    LogoutFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn logout_failed(cause: AuthError) -> Self {
        Self { kind: NoticeKind::LogoutFailed, message: format!("Could not log out. {cause}") }
    }
}

#[derive(Clone)]
pub struct NoticeSender {
    tx: broadcast::Sender<Notice>,
}

impl NoticeSender {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Deliver `notice` to current receivers. Returns how many got it.
    pub fn publish(&self, notice: Notice) -> usize {
        match self.tx.send(notice) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(notice)) => {
                tracing::warn!(kind = ?notice.kind, message = %notice.message, "notice dropped: no receivers");
                0
            }
        }
    }
}

impl Default for NoticeSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "notice_test.rs"]
mod tests;
