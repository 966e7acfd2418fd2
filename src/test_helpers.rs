//! Test-only collaborators: a provider whose behavior the test scripts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::errors::ProviderError;
use crate::provider::{IdentityProvider, SessionListener, SessionNotification, Subscription};
use crate::state::Session;

/// Let spawned tasks (the route guard, background actions) run to idle.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Provider driven entirely by the test.
///
/// - Notifications are sent only by [`ScriptedProvider::emit`]; subscribing
///   does not report an initial state unless `emit_on_subscribe` is set.
/// - Each call pops the next scripted result (default `Ok`).
/// - With [`ScriptedProvider::hold_calls`], calls block until
///   [`ScriptedProvider::release`].
#[derive(Default)]
pub struct ScriptedProvider {
    listeners: Arc<Mutex<Vec<(usize, SessionListener)>>>,
    results: Mutex<VecDeque<Result<(), ProviderError>>>,
    calls: Mutex<Vec<String>>,
    emit_on_subscribe: Mutex<Option<Option<Session>>>,
    fail_subscribe: AtomicBool,
    panic_next: AtomicBool,
    hold: Mutex<Option<Arc<Semaphore>>>,
    subscribe_hold: Mutex<Option<Arc<Semaphore>>>,
    subscribes: AtomicUsize,
    unsubscribes: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emit(&self, notification: SessionNotification) {
        let listeners: Vec<SessionListener> = self.listeners.lock().unwrap().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(notification.clone());
        }
    }

    pub fn emit_session(&self, subject_id: &str) {
        self.emit(Ok(Some(Session::new(subject_id))));
    }

    pub fn emit_signed_out(&self) {
        self.emit(Ok(None));
    }

    pub fn report_on_subscribe(&self, session: Option<Session>) {
        *self.emit_on_subscribe.lock().unwrap() = Some(session);
    }

    pub fn push_result(&self, result: Result<(), ProviderError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn fail_next(&self, code: &str) {
        self.push_result(Err(ProviderError::rejected(code)));
    }

    pub fn fail_subscribe(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn hold_calls(&self) {
        *self.hold.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held call complete.
    pub fn release(&self) {
        if let Some(sem) = self.hold.lock().unwrap().as_ref() {
            sem.add_permits(1);
        }
    }

    /// Make `subscribe` block until [`ScriptedProvider::release_subscribes`].
    pub fn hold_subscribes(&self) {
        *self.subscribe_hold.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_subscribes(&self, count: usize) {
        if let Some(sem) = self.subscribe_hold.lock().unwrap().as_ref() {
            sem.add_permits(count);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    async fn call(&self, name: String) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(name);
        let hold = self.hold.lock().unwrap().clone();
        if let Some(sem) = hold {
            sem.acquire().await.unwrap().forget();
        }
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scripted provider panic");
        }
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn subscribe(&self, listener: SessionListener) -> Result<Subscription, ProviderError> {
        let hold = self.subscribe_hold.lock().unwrap().clone();
        if let Some(sem) = hold {
            sem.acquire().await.unwrap().forget();
        }
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("subscribe refused".into()));
        }
        let id = self.subscribes.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, listener.clone()));
        if let Some(initial) = self.emit_on_subscribe.lock().unwrap().clone() {
            listener(Ok(initial));
        }

        let unsubscribes = self.unsubscribes.clone();
        let listeners = self.listeners.clone();
        Ok(Subscription::new(move || {
            unsubscribes.fetch_add(1, Ordering::SeqCst);
            listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
        }))
    }

    async fn create_session(&self, identifier: &str, _secret: &str) -> Result<(), ProviderError> {
        self.call(format!("create_session {identifier}")).await
    }

    async fn create_identity(&self, identifier: &str, _secret: &str) -> Result<(), ProviderError> {
        self.call(format!("create_identity {identifier}")).await
    }

    async fn destroy_session(&self) -> Result<(), ProviderError> {
        self.call("destroy_session".to_owned()).await
    }
}
