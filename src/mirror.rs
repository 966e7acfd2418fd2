//! Session mirror: the only consumer of provider notifications.
//!
//! Each notification is applied in one `send_if_modified` call, so observers
//! never see `session` and `resolution` out of step with each other.

use std::sync::Arc;

use crate::provider::{SessionListener, SessionNotification};
use crate::state::{SessionResolution, SharedState};

#[derive(Clone)]
pub struct SessionMirror {
    state: SharedState,
}

impl SessionMirror {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Apply one provider notification. A stream error counts as signed out.
    pub fn apply(&self, notification: SessionNotification) {
        let session = match notification {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "session stream error; treating as signed out");
                None
            }
        };
        let resolution = SessionResolution::from_session(session.as_ref());
        let subject = session.as_ref().map(|s| s.subject_id.clone());

        let mut previous = SessionResolution::Pending;
        let changed = self.state.send_if_modified(|state| {
            previous = state.resolution;
            if state.session == session && state.resolution == resolution {
                return false;
            }
            state.session = session;
            state.resolution = resolution;
            true
        });

        if changed {
            tracing::info!(?previous, ?resolution, subject = subject.as_deref().unwrap_or("-"), "session updated");
        }
    }

    /// Back to `Pending` with no session, for a fresh mount.
    pub(crate) fn reset(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.session.is_some() || !state.resolution.is_pending();
            state.session = None;
            state.resolution = SessionResolution::Pending;
            changed
        });
    }

    /// Listener handed to the provider at subscription time.
    pub(crate) fn listener(&self) -> SessionListener {
        let mirror = self.clone();
        Arc::new(move |notification| mirror.apply(notification))
    }
}

#[cfg(test)]
#[path = "mirror_test.rs"]
mod tests;
