//! In-process identity provider.
//!
//! Keeps accounts in memory with SHA-256 secret digests and rejects requests
//! with the same codes Firebase Auth uses, so the controller's error mapping
//! behaves identically against either adapter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{IdentityProvider, SessionBroadcaster, SessionListener, Subscription};
use crate::errors::ProviderError;
use crate::state::Session;

const MIN_SECRET_LEN: usize = 6;
const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);

struct Account {
    subject_id: String,
    secret_hash: String,
    failed_attempts: u32,
    locked_until: Option<Instant>,
}

pub struct MemoryProvider {
    accounts: Mutex<HashMap<String, Account>>,
    sessions: SessionBroadcaster,
    lockout: Duration,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_lockout(DEFAULT_LOCKOUT)
    }

    /// Provider whose accounts stay locked for `lockout` after too many
    /// failed sign-ins.
    #[must_use]
    pub fn with_lockout(lockout: Duration) -> Self {
        Self { accounts: Mutex::new(HashMap::new()), sessions: SessionBroadcaster::new(), lockout }
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account without signing it in. Returns its subject id.
    ///
    /// # Errors
    ///
    /// Rejects with `INVALID_EMAIL`, `WEAK_PASSWORD` or `EMAIL_EXISTS`.
    pub fn seed_account(&self, identifier: &str, secret: &str) -> Result<String, ProviderError> {
        let email = normalize_email(identifier).ok_or_else(|| ProviderError::rejected("INVALID_EMAIL"))?;
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(ProviderError::rejected("WEAK_PASSWORD"));
        }
        let mut accounts = self.accounts();
        if accounts.contains_key(&email) {
            return Err(ProviderError::rejected("EMAIL_EXISTS"));
        }
        let subject_id = Uuid::new_v4().to_string();
        accounts.insert(
            email,
            Account {
                subject_id: subject_id.clone(),
                secret_hash: hash_secret(secret),
                failed_attempts: 0,
                locked_until: None,
            },
        );
        Ok(subject_id)
    }

    /// Session the provider currently considers signed in.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.sessions.current()
    }

    fn verify(&self, email: &str, secret: &str) -> Result<String, ProviderError> {
        let mut accounts = self.accounts();
        let Some(account) = accounts.get_mut(email) else {
            return Err(ProviderError::rejected("INVALID_LOGIN_CREDENTIALS"));
        };
        let now = Instant::now();
        match account.locked_until {
            Some(until) if now < until => return Err(ProviderError::rejected("TOO_MANY_ATTEMPTS_TRY_LATER")),
            Some(_) => {
                account.locked_until = None;
                account.failed_attempts = 0;
            }
            None => {}
        }
        if account.secret_hash != hash_secret(secret) {
            account.failed_attempts += 1;
            if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                account.locked_until = Some(now + self.lockout);
            }
            return Err(ProviderError::rejected("INVALID_LOGIN_CREDENTIALS"));
        }
        account.failed_attempts = 0;
        Ok(account.subject_id.clone())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryProvider {
    async fn subscribe(&self, listener: SessionListener) -> Result<Subscription, ProviderError> {
        Ok(self.sessions.attach(listener))
    }

    async fn create_session(&self, identifier: &str, secret: &str) -> Result<(), ProviderError> {
        let email = normalize_email(identifier).ok_or_else(|| ProviderError::rejected("INVALID_EMAIL"))?;
        if secret.is_empty() {
            return Err(ProviderError::rejected("MISSING_PASSWORD"));
        }
        let subject_id = self.verify(&email, secret)?;
        tracing::debug!(%subject_id, "memory provider: signed in");
        self.sessions.publish(Some(Session::new(subject_id).with_email(email)));
        Ok(())
    }

    async fn create_identity(&self, identifier: &str, secret: &str) -> Result<(), ProviderError> {
        let subject_id = self.seed_account(identifier, secret)?;
        let email = normalize_email(identifier).ok_or_else(|| ProviderError::rejected("INVALID_EMAIL"))?;
        tracing::debug!(%subject_id, "memory provider: identity created");
        self.sessions.publish(Some(Session::new(subject_id).with_email(email)));
        Ok(())
    }

    async fn destroy_session(&self) -> Result<(), ProviderError> {
        self.sessions.publish(None);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
