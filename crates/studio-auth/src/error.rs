//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity provider's token endpoint refused the grant
    #[error("Token endpoint returned HTTP {status} ({body})")]
    TokenEndpoint { status: u16, body: String },

    /// The identity provider's GetUser call failed
    #[error("User info request returned HTTP {status} ({body})")]
    UserInfo { status: u16, body: String },

    /// The backend `checkUsr` call failed
    #[error("User check returned HTTP {status} ({body})")]
    CheckUser { status: u16, body: String },

    /// Profile fetch failed
    #[error("Profile request returned HTTP {status} ({body})")]
    Profile { status: u16, body: String },

    /// Site configuration fetch failed
    #[error("Site config request returned HTTP {status} ({body})")]
    SiteConfig { status: u16, body: String },

    /// Signup confirmation call failed
    #[error("Signup confirmation returned HTTP {status} ({body})")]
    SignUp { status: u16, body: String },

    /// Backend validated the user but did not approve access
    #[error("User is not approved")]
    NotApproved,

    /// No refresh token in the session record
    #[error("No refresh token stored")]
    MissingRefreshToken,

    /// A response did not match its schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The session was cleared while the flow was in flight
    #[error("Flow cancelled by session clear")]
    Cancelled,

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Invalid state transition in the refresh-cycle FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] studio_config_and_utils::CoreError),

    /// Cookie jar error
    #[error("Storage error: {0}")]
    Storage(#[from] session_store::StorageError),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - HTTP errors with 5xx status codes
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Timeout => true,
            AuthError::TokenEndpoint { status, .. }
            | AuthError::UserInfo { status, .. }
            | AuthError::CheckUser { status, .. }
            | AuthError::Profile { status, .. }
            | AuthError::SiteConfig { status, .. }
            | AuthError::SignUp { status, .. } => *status >= 500,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }

    /// True when the flow stopped because the session was cleared under it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuthError::Cancelled)
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
