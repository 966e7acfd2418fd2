//! Action gateway: login, register and logout against the identity provider.
//!
//! DESIGN
//! ======
//! Every action runs inside an [`InFlight`] scope guard. Creating it clears
//! the last error and counts the action as in flight; dropping it releases
//! the count. Because release happens in `Drop`, it also runs when the
//! provider fails synchronously, panics, or the action future is dropped.
//!
//! The gateway never writes `session`. A successful sign-in becomes visible
//! only when the provider's own notification reaches the session mirror.

use std::sync::Arc;

use crate::errors::{AuthError, ProviderError};
use crate::notice::{Notice, NoticeSender};
use crate::provider::IdentityProvider;
use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Login,
    Register,
    Logout,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Logout => "logout",
        }
    }
}

/// Marks one action as in flight for as long as it lives.
struct InFlight {
    state: SharedState,
    action: Action,
}

impl InFlight {
    fn begin(state: SharedState, action: Action) -> Self {
        state.send_modify(|s| {
            s.error = None;
            s.in_flight += 1;
        });
        tracing::debug!(action = action.as_str(), "auth action started");
        Self { state, action }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
        tracing::debug!(action = self.action.as_str(), "auth action settled");
    }
}

#[derive(Clone)]
pub struct ActionGateway {
    provider: Arc<dyn IdentityProvider>,
    state: SharedState,
    notices: NoticeSender,
}

impl ActionGateway {
    pub(crate) fn new(provider: Arc<dyn IdentityProvider>, state: SharedState, notices: NoticeSender) -> Self {
        Self { provider, state, notices }
    }

    /// Sign in. Failures are mapped, stored in `AuthState::error`, and returned.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        let _in_flight = InFlight::begin(self.state.clone(), Action::Login);
        let result = self.provider.create_session(identifier, secret).await;
        self.record(Action::Login, result)
    }

    /// Create an identity. Same bookkeeping as [`ActionGateway::login`].
    pub async fn register(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        let _in_flight = InFlight::begin(self.state.clone(), Action::Register);
        let result = self.provider.create_identity(identifier, secret).await;
        self.record(Action::Register, result)
    }

    /// Sign out. A failure is published as a [`Notice`] instead of being
    /// stored in `AuthState::error`.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _in_flight = InFlight::begin(self.state.clone(), Action::Logout);
        let err = match self.provider.destroy_session().await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let kind = map_failure(Action::Logout, &err);
        self.notices.publish(Notice::logout_failed(kind));
        Err(kind)
    }

    /// Store the settled outcome. The last call to settle wins.
    fn record(&self, action: Action, result: Result<(), ProviderError>) -> Result<(), AuthError> {
        let outcome = result.map_err(|err| map_failure(action, &err));
        let error = outcome.err();
        self.state.send_if_modified(|s| {
            if s.error == error {
                return false;
            }
            s.error = error;
            true
        });
        outcome
    }
}

fn map_failure(action: Action, err: &ProviderError) -> AuthError {
    let kind = AuthError::from(err);
    tracing::warn!(action = action.as_str(), error = %err, code = kind.error_code(), "auth action failed");
    kind
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
