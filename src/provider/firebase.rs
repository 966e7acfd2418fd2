//! Firebase Auth (Identity Toolkit REST) provider.
//!
//! Thin HTTP wrapper over `accounts:signInWithPassword` and `accounts:signUp`.
//! Sign-out is local: the tokens are dropped and, when a session file is
//! configured, the file is removed. Pure parsing lives in `parse_auth_response`
//! and `parse_error` for testability.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::{IdentityProvider, SessionBroadcaster, SessionListener, Subscription};
use crate::config::FirebaseConfig;
use crate::errors::ProviderError;
use crate::state::Session;

const SIGN_IN_PATH: &str = "accounts:signInWithPassword";
const SIGN_UP_PATH: &str = "accounts:signUp";

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed-in user plus the tokens Firebase issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: Session,
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_auth_response(json: &str) -> Result<StoredSession, ProviderError> {
    let api: AuthResponse =
        serde_json::from_str(json).map_err(|e| ProviderError::Response { status: 200, body: e.to_string() })?;
    let mut session = Session::new(api.local_id);
    session.email = api.email;
    Ok(StoredSession { session, id_token: api.id_token, refresh_token: api.refresh_token })
}

/// Turn a non-200 response into a provider error. Firebase reports its code
/// in `error.message`, sometimes followed by `" : detail"`.
fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message;
            let code = message.split(':').next().unwrap_or_default().trim().to_owned();
            ProviderError::Rejected { code, message }
        }
        Err(_) => ProviderError::Response { status, body: body.to_owned() },
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirebaseProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    session_file: Option<PathBuf>,
    sessions: SessionBroadcaster,
    tokens: Mutex<Option<StoredSession>>,
    /// Outcome of restoring `session_file`, computed on first subscribe.
    restored: OnceCell<Option<ProviderError>>,
}

impl FirebaseProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            session_file: config.session_file,
            sessions: SessionBroadcaster::new(),
            tokens: Mutex::new(None),
            restored: OnceCell::new(),
        })
    }

    fn tokens(&self) -> MutexGuard<'_, Option<StoredSession>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ID token of the signed-in user, for authorizing backend calls.
    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.tokens().as_ref().map(|t| t.id_token.clone())
    }

    async fn post_password(&self, path: &str, email: &str, password: &str) -> Result<StoredSession, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let body = PasswordRequest { email, password, return_secure_token: true };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if status != 200 {
            return Err(parse_error(status, &text));
        }

        parse_auth_response(&text)
    }

    async fn sign_in(&self, stored: StoredSession) -> Result<(), ProviderError> {
        self.persist(Some(&stored)).await?;
        let session = stored.session.clone();
        *self.tokens() = Some(stored);
        tracing::debug!(subject_id = %session.subject_id, "firebase: signed in");
        self.sessions.publish(Some(session));
        Ok(())
    }

    async fn persist(&self, stored: Option<&StoredSession>) -> Result<(), ProviderError> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };
        match stored {
            Some(stored) => {
                let json = serde_json::to_string(stored).map_err(|e| ProviderError::Storage(e.to_string()))?;
                tokio::fs::write(path, json)
                    .await
                    .map_err(|e| ProviderError::Storage(format!("{}: {e}", path.display())))
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ProviderError::Storage(format!("{}: {e}", path.display()))),
            },
        }
    }

    async fn load(&self) -> Result<Option<StoredSession>, ProviderError> {
        let Some(path) = &self.session_file else {
            return Ok(None);
        };
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProviderError::Storage(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ProviderError::Storage(format!("{}: {e}", path.display())))
    }

    /// Restore the persisted session once. Returns the restore failure, if any.
    async fn restore(&self) -> Option<ProviderError> {
        self.restored
            .get_or_init(|| async {
                match self.load().await {
                    Ok(Some(stored)) => {
                        tracing::info!(subject_id = %stored.session.subject_id, "firebase: session restored");
                        let session = stored.session.clone();
                        *self.tokens() = Some(stored);
                        self.sessions.publish(Some(session));
                        None
                    }
                    Ok(None) => None,
                    Err(err) => {
                        tracing::warn!(error = %err, "firebase: session restore failed");
                        Some(err)
                    }
                }
            })
            .await
            .clone()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseProvider {
    async fn subscribe(&self, listener: SessionListener) -> Result<Subscription, ProviderError> {
        let failure = self.restore().await;
        let subscription = self.sessions.attach(listener.clone());
        if let Some(err) = failure {
            listener(Err(err));
        }
        Ok(subscription)
    }

    async fn create_session(&self, identifier: &str, secret: &str) -> Result<(), ProviderError> {
        let stored = self.post_password(SIGN_IN_PATH, identifier, secret).await?;
        self.sign_in(stored).await
    }

    async fn create_identity(&self, identifier: &str, secret: &str) -> Result<(), ProviderError> {
        let stored = self.post_password(SIGN_UP_PATH, identifier, secret).await?;
        self.sign_in(stored).await
    }

    async fn destroy_session(&self) -> Result<(), ProviderError> {
        self.persist(None).await?;
        *self.tokens() = None;
        tracing::debug!("firebase: signed out");
        self.sessions.publish(None);
        Ok(())
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
