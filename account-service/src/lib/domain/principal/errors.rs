use credentials::AuthenticationError;
use credentials::CredentialChangeError;
use credentials::PasswordError;
use credentials::TokenError;
use thiserror::Error;

/// Error for PrincipalId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrincipalIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for Username validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Username too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error(
        "Username contains invalid characters (only alphanumeric, underscore, and hyphen allowed)"
    )]
    InvalidCharacters,
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for Role label validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Role label cannot be empty")]
    Empty,

    #[error("Role label contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// Failures reported by the principal and credential stores.
#[derive(Debug, Clone, Error)]
pub enum PrincipalError {
    #[error("Principal not found: {0}")]
    NotFound(String),

    #[error("Principal already exists: {0}")]
    AlreadyExists(String),

    #[error("Principal store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for PrincipalError {
    fn from(err: anyhow::Error) -> Self {
        PrincipalError::Unknown(err.to_string())
    }
}

/// Error for notification delivery
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Failed to compose notification: {0}")]
    ComposeFailed(String),

    #[error("Failed to deliver notification: {0}")]
    DeliveryFailed(String),
}

/// Top-level error for credential operations (registration, login, password change).
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username is already taken!")]
    UsernameTaken,

    #[error("Email is already in use!")]
    EmailTaken,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Current password is required")]
    CurrentPasswordRequired,

    #[error("New password is required")]
    NewPasswordRequired,

    /// Refused change; the message is safe to show to the caller.
    #[error("{0}")]
    Rejected(#[from] CredentialChangeError),

    #[error("Principal not found: {0}")]
    NotFound(String),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Store error: {0}")]
    Store(#[from] PrincipalError),
}

impl From<AuthenticationError> for CredentialError {
    fn from(err: AuthenticationError) -> Self {
        match err {
            AuthenticationError::InvalidCredentials => CredentialError::InvalidCredentials,
            AuthenticationError::PasswordError(e) => CredentialError::Password(e),
            AuthenticationError::TokenError(e) => CredentialError::Token(e),
        }
    }
}
