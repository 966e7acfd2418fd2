//! Identity provider boundary.
//!
//! DESIGN
//! ======
//! The controller only talks to an `Arc<dyn IdentityProvider>`. Concrete
//! adapters live in submodules: `firebase` (Firebase Auth REST) and `memory`
//! (in-process accounts). Both publish session changes through
//! [`SessionBroadcaster`], which owns the listener registry and the
//! "notify only on actual transition" rule.

pub mod firebase;
pub mod memory;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::errors::ProviderError;
use crate::state::Session;

/// One provider notification: the new session, or a stream failure.
pub type SessionNotification = Result<Option<Session>, ProviderError>;

/// Callback invoked for every provider notification.
pub type SessionListener = Arc<dyn Fn(SessionNotification) + Send + Sync>;

// =============================================================================
// TRAIT
// =============================================================================

/// Operations the auth controller consumes from an identity provider.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Attach a listener. It fires at least once with the initial state, then
    /// once per session transition, until the returned handle is released.
    async fn subscribe(&self, listener: SessionListener) -> Result<Subscription, ProviderError>;

    /// Sign in with an email-like identifier and secret.
    async fn create_session(&self, identifier: &str, secret: &str) -> Result<(), ProviderError>;

    /// Create a new identity. Providers may sign it in as part of creation.
    async fn create_identity(&self, identifier: &str, secret: &str) -> Result<(), ProviderError>;

    /// Sign out the current session.
    async fn destroy_session(&self) -> Result<(), ProviderError>;
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle for an attached listener. Detaches exactly once, either through
/// [`Subscription::unsubscribe`] or on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self { detach: Some(Box::new(detach)) }
    }

    pub fn unsubscribe(mut self) {
        self.run_detach();
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("attached", &self.detach.is_some()).finish()
    }
}

// =============================================================================
// BROADCASTER
// =============================================================================

/// Listener registry plus the provider's current session.
#[derive(Clone, Default)]
pub struct SessionBroadcaster {
    inner: Arc<Mutex<BroadcasterInner>>,
}

#[derive(Default)]
struct BroadcasterInner {
    next_id: u64,
    listeners: HashMap<u64, SessionListener>,
    current: Option<Session>,
}

impl SessionBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BroadcasterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.lock().current.clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Register `listener` and immediately report the current session to it.
    pub fn attach(&self, listener: SessionListener) -> Subscription {
        let (id, current) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener.clone());
            (id, inner.current.clone())
        };
        listener(Ok(current));

        let weak: Weak<Mutex<BroadcasterInner>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().unwrap_or_else(PoisonError::into_inner).listeners.remove(&id);
            }
        })
    }

    /// Replace the current session. Listeners are notified only when the
    /// subject actually changes. Returns whether a notification went out.
    pub fn publish(&self, next: Option<Session>) -> bool {
        let listeners = {
            let mut inner = self.lock();
            let prev_subject = inner.current.as_ref().map(|s| s.subject_id.as_str());
            let next_subject = next.as_ref().map(|s| s.subject_id.as_str());
            if prev_subject == next_subject {
                inner.current = next;
                return false;
            }
            inner.current.clone_from(&next);
            inner.listeners.values().cloned().collect::<Vec<_>>()
        };
        for listener in listeners {
            listener(Ok(next.clone()));
        }
        true
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
