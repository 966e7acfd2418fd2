//! Router boundary and an in-memory router.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// The two router capabilities the auth controller depends on.
pub trait Router: Send + Sync {
    /// Observable of the current route path.
    fn current_location(&self) -> watch::Receiver<String>;

    /// Redirect without keeping the current location in history.
    fn navigate_replace(&self, path: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub kind: NavigationKind,
    pub path: String,
}

/// Router that keeps its location in memory and records every navigation.
pub struct MemoryRouter {
    location: watch::Sender<String>,
    history: Mutex<Vec<Navigation>>,
}

impl MemoryRouter {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        let (location, _) = watch::channel(initial.into());
        Self { location, history: Mutex::new(Vec::new()) }
    }

    fn history_mut(&self) -> MutexGuard<'_, Vec<Navigation>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn go(&self, kind: NavigationKind, path: &str) {
        self.history_mut().push(Navigation { kind, path: path.to_owned() });
        self.location.send_replace(path.to_owned());
    }

    /// User-initiated navigation.
    pub fn push(&self, path: &str) {
        self.go(NavigationKind::Push, path);
    }

    #[must_use]
    pub fn location(&self) -> String {
        self.location.borrow().clone()
    }

    #[must_use]
    pub fn history(&self) -> Vec<Navigation> {
        self.history_mut().clone()
    }

    /// Paths of all replace-navigations, oldest first.
    #[must_use]
    pub fn replacements(&self) -> Vec<String> {
        self.history_mut()
            .iter()
            .filter(|n| n.kind == NavigationKind::Replace)
            .map(|n| n.path.clone())
            .collect()
    }
}

impl Router for MemoryRouter {
    fn current_location(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    fn navigate_replace(&self, path: &str) {
        self.go(NavigationKind::Replace, path);
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
