//! `AuthSessionController`: session mirror, action gateway and route guard
//! behind one injected instance.
//!
//! SYSTEM CONTEXT
//! ==============
//! The owning UI root creates one controller, calls [`AuthSessionController::mount`]
//! when it mounts and [`AuthSessionController::unmount`] when it goes away.
//! Screens read [`AuthSessionController::state`] or watch it, trigger the
//! gateway actions, and listen for [`Notice`]s.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::errors::{AuthError, ControllerError};
use crate::gateway::ActionGateway;
use crate::guard::{RouteGuard, RouteTable};
use crate::mirror::SessionMirror;
use crate::notice::{Notice, NoticeSender};
use crate::provider::{IdentityProvider, Subscription};
use crate::router::Router;
use crate::state::{AuthState, SharedState};

#[derive(Default)]
struct Lifecycle {
    mounted: bool,
    /// Bumped by every mount; a mount that resumes under a newer
    /// generation discards what it set up.
    generation: u64,
    subscription: Option<Subscription>,
    guard_task: Option<JoinHandle<()>>,
}

pub struct AuthSessionController {
    provider: Arc<dyn IdentityProvider>,
    router: Arc<dyn Router>,
    state: SharedState,
    notices: NoticeSender,
    mirror: SessionMirror,
    gateway: ActionGateway,
    guard: RouteGuard,
    lifecycle: Mutex<Lifecycle>,
}

impl AuthSessionController {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, router: Arc<dyn Router>, routes: RouteTable) -> Self {
        let (tx, _) = watch::channel(AuthState::default());
        let state: SharedState = Arc::new(tx);
        let notices = NoticeSender::new();
        Self {
            mirror: SessionMirror::new(state.clone()),
            gateway: ActionGateway::new(provider.clone(), state.clone(), notices.clone()),
            guard: RouteGuard::new(routes),
            provider,
            router,
            state,
            notices,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the route guard and subscribe to the provider.
    ///
    /// The session starts out `Pending` and stays so until the provider's
    /// first notification. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::AlreadyMounted`] on a second mount, and
    /// [`ControllerError::Subscribe`] if the provider refuses the subscription.
    pub async fn mount(&self) -> Result<(), ControllerError> {
        let generation = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.mounted {
                return Err(ControllerError::AlreadyMounted);
            }
            lifecycle.mounted = true;
            lifecycle.generation += 1;
            lifecycle.generation
        };
        self.mirror.reset();

        // The guard starts first so it sees the very first resolution.
        let guard_task = self.guard.clone().spawn(self.state.subscribe(), self.router.clone());

        let subscription = match self.provider.subscribe(self.mirror.listener()).await {
            Ok(subscription) => subscription,
            Err(err) => {
                guard_task.abort();
                let mut lifecycle = self.lifecycle();
                if lifecycle.generation == generation {
                    lifecycle.mounted = false;
                }
                drop(lifecycle);
                tracing::error!(error = %err, "auth controller mount failed");
                return Err(ControllerError::Subscribe(err));
            }
        };

        let mut lifecycle = self.lifecycle();
        if !lifecycle.mounted || lifecycle.generation != generation {
            // Unmounted, and possibly remounted, while the subscription was
            // being set up.
            drop(lifecycle);
            subscription.unsubscribe();
            guard_task.abort();
            return Ok(());
        }
        lifecycle.subscription = Some(subscription);
        lifecycle.guard_task = Some(guard_task);
        tracing::info!(login = self.guard.routes().login(), landing = self.guard.routes().landing(), "auth controller mounted");
        Ok(())
    }

    /// Unsubscribe from the provider and stop the route guard. Idempotent.
    pub fn unmount(&self) {
        let (subscription, guard_task) = {
            let mut lifecycle = self.lifecycle();
            if !lifecycle.mounted {
                return;
            }
            lifecycle.mounted = false;
            (lifecycle.subscription.take(), lifecycle.guard_task.take())
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        if let Some(task) = guard_task {
            task.abort();
        }
        tracing::info!("auth controller unmounted");
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.lifecycle().mounted
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every future snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        self.guard.routes()
    }

    /// See [`ActionGateway::login`].
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        self.gateway.login(identifier, secret).await
    }

    /// See [`ActionGateway::register`].
    pub async fn register(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        self.gateway.register(identifier, secret).await
    }

    /// See [`ActionGateway::logout`].
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.gateway.logout().await
    }
}

impl Drop for AuthSessionController {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
