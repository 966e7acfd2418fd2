//! Error types: provider failures, the normalized UI taxonomy, and
//! controller lifecycle errors.

// =============================================================================
// PROVIDER ERROR
// =============================================================================

/// Errors produced by identity provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider rejected the request with one of its own error codes.
    #[error("provider rejected request: {code}")]
    Rejected { code: String, message: String },

    /// The request never reached the provider or the connection failed.
    #[error("provider request failed: {0}")]
    Transport(String),

    /// The provider answered with something that could not be understood.
    #[error("provider response error: status {status}")]
    Response { status: u16, body: String },

    /// Local session storage could not be read or written.
    #[error("session storage failed: {0}")]
    Storage(String),
}

impl ProviderError {
    #[must_use]
    pub fn rejected(code: impl Into<String>) -> Self {
        let code = code.into();
        Self::Rejected { message: code.clone(), code }
    }

    /// Provider error code, if the provider rejected the request.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

// =============================================================================
// AUTH ERROR
// =============================================================================

/// Normalized failure kinds surfaced to the UI.
///
/// `Display` yields the message shown next to the login/register form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Too many attempts. Please try again later.")]
    TooManyAttempts,
    #[error("An account with this email already exists.")]
    IdentityAlreadyExists,
    #[error("Password should be at least 6 characters.")]
    WeakSecret,
    #[error("Please enter a valid email address.")]
    InvalidIdentifier,
    #[error("Something went wrong. Please try again.")]
    Unknown,
}

impl AuthError {
    /// Map a provider error code to its kind.
    ///
    /// Accepts both REST codes (`EMAIL_EXISTS`, optionally followed by
    /// `" : detail"`) and SDK codes (`auth/email-already-in-use`).
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let code = code.split(':').next().unwrap_or_default().trim();
        match code {
            "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND"
            | "USER_DISABLED"
            | "MISSING_PASSWORD"
            | "auth/invalid-credential"
            | "auth/wrong-password"
            | "auth/user-not-found"
            | "auth/user-disabled" => Self::InvalidCredentials,
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "auth/too-many-requests" => Self::TooManyAttempts,
            "EMAIL_EXISTS" | "auth/email-already-in-use" => Self::IdentityAlreadyExists,
            "WEAK_PASSWORD" | "auth/weak-password" => Self::WeakSecret,
            "INVALID_EMAIL" | "MISSING_EMAIL" | "auth/invalid-email" | "auth/missing-email" => {
                Self::InvalidIdentifier
            }
            _ => Self::Unknown,
        }
    }

    /// Stable machine-readable code, used in logs.
    #[must_use]
    pub fn error_code(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::TooManyAttempts => "E_TOO_MANY_ATTEMPTS",
            Self::IdentityAlreadyExists => "E_IDENTITY_EXISTS",
            Self::WeakSecret => "E_WEAK_SECRET",
            Self::InvalidIdentifier => "E_INVALID_IDENTIFIER",
            Self::Unknown => "E_UNKNOWN",
        }
    }
}

impl From<&ProviderError> for AuthError {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::Rejected { code, .. } => Self::from_code(code),
            ProviderError::Transport(_) | ProviderError::Response { .. } | ProviderError::Storage(_) => {
                Self::Unknown
            }
        }
    }
}

// =============================================================================
// CONTROLLER ERROR
// =============================================================================

/// Lifecycle failures; not part of the recoverable UI taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("controller is already mounted")]
    AlreadyMounted,
    #[error("session subscription failed: {0}")]
    Subscribe(#[source] ProviderError),
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod tests;
