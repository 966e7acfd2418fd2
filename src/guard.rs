//! Route guard: keeps the current location consistent with session state.
//!
//! DESIGN
//! ======
//! `RouteGuard::evaluate` is a pure decision over the auth snapshot and the
//! current location. `RouteGuard::spawn` runs it on every change of either
//! input and performs the resulting replace-navigation.
//!
//! | resolution      | route class | action             |
//! |-----------------|-------------|--------------------|
//! | pending         | any         | none               |
//! | authenticated   | public      | replace to landing |
//! | unauthenticated | protected   | replace to login   |
//! | otherwise       |             | none               |
//!
//! `RouteTable::new` refuses tables where a redirect target would itself be
//! redirected, so one redirect always settles the guard.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::router::Router;
use crate::state::AuthState;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_REGISTER_ROUTE: &str = "/register";
pub const DEFAULT_LANDING_ROUTE: &str = "/";

// =============================================================================
// ROUTE TABLE
// =============================================================================

/// Whether a screen may be shown without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteTableError {
    #[error("route must start with '/': {0}")]
    NotAbsolute(String),
    #[error("landing route {0} is public; signed-in users would be redirected away from it")]
    PublicLanding(String),
}

/// The login and landing routes plus the set of public route prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    login: String,
    landing: String,
    public: Vec<String>,
}

impl RouteTable {
    /// Build a route table. The login route is always public; the landing
    /// route must be protected.
    pub fn new<I, S>(login: &str, landing: &str, public: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let login = absolute(login)?;
        let landing = absolute(landing)?;
        let mut routes = vec![login.clone()];
        for route in public {
            let route = absolute(route.as_ref())?;
            if !routes.contains(&route) {
                routes.push(route);
            }
        }
        let table = Self { login, landing, public: routes };
        if table.classify(&table.landing) == RouteClass::Public {
            return Err(RouteTableError::PublicLanding(table.landing));
        }
        Ok(table)
    }

    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    #[must_use]
    pub fn landing(&self) -> &str {
        &self.landing
    }

    #[must_use]
    pub fn public_routes(&self) -> &[String] {
        &self.public
    }

    /// Classify a location. A location is public when it equals a public
    /// route or is nested below one (`/login/reset` under `/login`).
    #[must_use]
    pub fn classify(&self, location: &str) -> RouteClass {
        let path = normalize_path(location);
        let public = self.public.iter().any(|route| {
            route == "/" || path == *route || path.strip_prefix(route.as_str()).is_some_and(|rest| rest.starts_with('/'))
        });
        if public { RouteClass::Public } else { RouteClass::Protected }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_ROUTE.to_owned(),
            landing: DEFAULT_LANDING_ROUTE.to_owned(),
            public: vec![DEFAULT_LOGIN_ROUTE.to_owned(), DEFAULT_REGISTER_ROUTE.to_owned()],
        }
    }
}

fn absolute(route: &str) -> Result<String, RouteTableError> {
    let trimmed = route.trim();
    if !trimmed.starts_with('/') {
        return Err(RouteTableError::NotAbsolute(trimmed.to_owned()));
    }
    Ok(normalize_path(trimmed))
}

/// Strip query and fragment, trim trailing slashes, and map empty to `/`.
#[must_use]
pub fn normalize_path(location: &str) -> String {
    let path = location.split(['?', '#']).next().unwrap_or_default().trim();
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// Signed in while on a public screen.
    SignedIn,
    /// Signed out while on a protected screen.
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub reason: RedirectReason,
}

#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    routes: RouteTable,
}

impl RouteGuard {
    #[must_use]
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide whether `location` must be left, and for where.
    #[must_use]
    pub fn evaluate(&self, state: &AuthState, location: &str) -> Option<Redirect> {
        if state.resolution.is_pending() {
            return None;
        }
        match (state.is_authenticated(), self.routes.classify(location)) {
            (true, RouteClass::Public) => {
                Some(Redirect { target: self.routes.landing.clone(), reason: RedirectReason::SignedIn })
            }
            (false, RouteClass::Protected) => {
                Some(Redirect { target: self.routes.login.clone(), reason: RedirectReason::SignedOut })
            }
            _ => None,
        }
    }

    /// Run the guard until either input channel closes or the task is aborted.
    pub fn spawn(self, state: watch::Receiver<AuthState>, router: Arc<dyn Router>) -> JoinHandle<()> {
        tokio::spawn(self.run(state, router))
    }

    async fn run(self, mut state: watch::Receiver<AuthState>, router: Arc<dyn Router>) {
        let mut location = router.current_location();
        // (location, target) of the last redirect issued, so state churn
        // that lands before the router moves does not repeat it. Any new
        // location version clears it.
        let mut last_issued: Option<(String, String)> = None;

        loop {
            let current = location.borrow_and_update().clone();
            let decision = self.evaluate(&state.borrow_and_update(), &current);

            match decision {
                Some(redirect) => {
                    let key = (current, redirect.target);
                    if last_issued.as_ref() != Some(&key) {
                        tracing::info!(from = %key.0, to = %key.1, reason = ?redirect.reason, "route guard redirect");
                        router.navigate_replace(&key.1);
                        last_issued = Some(key);
                    }
                }
                None => last_issued = None,
            }

            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = location.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    last_issued = None;
                }
            }
        }
        tracing::debug!("route guard stopped");
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
