//! Auth configuration parsed from environment variables.

use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use crate::guard::{DEFAULT_LANDING_ROUTE, DEFAULT_LOGIN_ROUTE, DEFAULT_REGISTER_ROUTE, RouteTable, RouteTableError};

pub const DEFAULT_FIREBASE_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;

const ENV_KEYS: &[&str] = &[
    "AUTH_PROVIDER",
    "FIREBASE_API_KEY",
    "FIREBASE_AUTH_BASE_URL",
    "AUTH_REQUEST_TIMEOUT_SECS",
    "AUTH_CONNECT_TIMEOUT_SECS",
    "AUTH_SESSION_FILE",
    "AUTH_LOGIN_ROUTE",
    "AUTH_LANDING_ROUTE",
    "AUTH_PUBLIC_ROUTES",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),

    /// A variable required by the selected provider is not set.
    #[error("missing config: env var {var} not set")]
    Missing { var: String },

    #[error("invalid routes: {0}")]
    Routes(#[from] RouteTableError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Firebase,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for AuthTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_AUTH_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_AUTH_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeouts: AuthTimeouts,
    /// Where the signed-in session is kept between runs, if anywhere.
    pub session_file: Option<PathBuf>,
}

impl FirebaseConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_FIREBASE_AUTH_BASE_URL.to_owned(),
            timeouts: AuthTimeouts::default(),
            session_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub provider: ProviderKind,
    /// Present whenever `provider` is `Firebase`.
    pub firebase: Option<FirebaseConfig>,
    pub routes: RouteTable,
}

impl AuthConfig {
    /// Build typed auth config from environment variables.
    ///
    /// Optional:
    /// - `AUTH_PROVIDER`: `firebase` or `memory` (default: `firebase` when
    ///   `FIREBASE_API_KEY` is set, `memory` otherwise)
    /// - `FIREBASE_API_KEY`: required for `firebase`
    /// - `FIREBASE_AUTH_BASE_URL`: Identity Toolkit base URL
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `AUTH_SESSION_FILE`: persist the signed-in session to this path
    /// - `AUTH_LOGIN_ROUTE`: default `/login`
    /// - `AUTH_LANDING_ROUTE`: default `/`
    /// - `AUTH_PUBLIC_ROUTES`: comma-separated, default `/login,/register`
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable values, a missing API key, or an
    /// inconsistent route table.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for key in ENV_KEYS {
            match std::env::var(key) {
                Ok(value) => {
                    vars.insert((*key).to_owned(), value);
                }
                Err(VarError::NotPresent) => {}
                Err(VarError::NotUnicode(_)) => {
                    return Err(ConfigError::Parse(format!("{key} is not valid unicode")));
                }
            }
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build config from an arbitrary key lookup. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`AuthConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let api_key = get("FIREBASE_API_KEY");
        let provider = parse_provider(get("AUTH_PROVIDER").as_deref(), api_key.is_some())?;

        let firebase = match provider {
            ProviderKind::Memory => None,
            ProviderKind::Firebase => {
                let api_key = api_key.ok_or_else(|| ConfigError::Missing { var: "FIREBASE_API_KEY".into() })?;
                Some(FirebaseConfig {
                    api_key,
                    base_url: get("FIREBASE_AUTH_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_FIREBASE_AUTH_BASE_URL.to_owned())
                        .trim_end_matches('/')
                        .to_owned(),
                    timeouts: AuthTimeouts {
                        request_secs: parse_u64(&get, "AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS)?,
                        connect_secs: parse_u64(&get, "AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS)?,
                    },
                    session_file: get("AUTH_SESSION_FILE").map(PathBuf::from),
                })
            }
        };

        let login = get("AUTH_LOGIN_ROUTE").unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_owned());
        let landing = get("AUTH_LANDING_ROUTE").unwrap_or_else(|| DEFAULT_LANDING_ROUTE.to_owned());
        let public = get("AUTH_PUBLIC_ROUTES").unwrap_or_else(|| format!("{DEFAULT_LOGIN_ROUTE},{DEFAULT_REGISTER_ROUTE}"));
        let routes = RouteTable::new(&login, &landing, public.split(',').map(str::trim).filter(|r| !r.is_empty()))?;

        Ok(Self { provider, firebase, routes })
    }
}

fn parse_provider(raw: Option<&str>, has_api_key: bool) -> Result<ProviderKind, ConfigError> {
    match raw {
        None if has_api_key => Ok(ProviderKind::Firebase),
        None => Ok(ProviderKind::Memory),
        Some("firebase") => Ok(ProviderKind::Firebase),
        Some("memory") => Ok(ProviderKind::Memory),
        Some(other) => Err(ConfigError::Parse(format!("unknown AUTH_PROVIDER: {other}"))),
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|e| ConfigError::Parse(format!("{key}={value}: {e}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
