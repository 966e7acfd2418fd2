//! Observable auth-session state.
//!
//! DESIGN
//! ======
//! `AuthState` is one tuple with a single writer per field: the session mirror
//! owns `session` and `resolution`, the action gateway owns the in-flight
//! count and `error`. It is published through a `watch` channel so the route
//! guard and the UI only ever read whole snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::AuthError;

/// Writer side of the shared state, held by the mirror and the gateway.
pub(crate) type SharedState = Arc<watch::Sender<AuthState>>;

// =============================================================================
// SESSION
// =============================================================================

/// The authenticated identity reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, stable identifier assigned by the provider.
    pub subject_id: String,
    /// Email the identity signed in with, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self { subject_id: subject_id.into(), email: None }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

// =============================================================================
// FLAGS
// =============================================================================

/// Whether the provider has reported the session yet, and what it said.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionResolution {
    /// No notification received since mount.
    #[default]
    Pending,
    Authenticated,
    Unauthenticated,
}

impl SessionResolution {
    #[must_use]
    pub fn from_session(session: Option<&Session>) -> Self {
        if session.is_some() { Self::Authenticated } else { Self::Unauthenticated }
    }

    #[must_use]
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

/// Whether a gateway action is currently awaiting the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    InFlight,
}

// =============================================================================
// AUTH STATE
// =============================================================================

/// Snapshot of everything the UI and the route guard may read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Current session; `None` before resolution and when signed out.
    pub session: Option<Session>,
    pub resolution: SessionResolution,
    /// Error of the last failed login/register, cleared when a new one starts.
    pub error: Option<AuthError>,
    /// Number of gateway calls that have started but not settled.
    pub(crate) in_flight: usize,
}

impl AuthState {
    #[must_use]
    pub fn action(&self) -> ActionState {
        if self.in_flight == 0 { ActionState::Idle } else { ActionState::InFlight }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.subject_id.as_str())
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
