use thiserror::Error;

/// Error type for password hashing operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Password verification failed: {0}")]
    VerificationFailed(String),
}

/// Reason a candidate password was rejected by the policy.
///
/// The display text is shown to the user as is, so it never includes the
/// candidate or any account data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Password cannot be empty")]
    Empty,

    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("Password must be no more than {max} characters")]
    TooLong { max: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one number")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSymbol,

    #[error("Password is too common or weak. Please choose a stronger password")]
    TooCommon,

    #[error("Password cannot contain sequential characters (e.g., abc, 123, qwe)")]
    SequentialCharacters,

    #[error("Password cannot contain repeated characters (e.g., aaaa, 1111)")]
    RepeatedCharacters,

    #[error("Password cannot contain repeated patterns (e.g., ababab, Ab1!Ab1!Ab1!)")]
    RepeatedPattern,

    #[error("Password cannot contain your username")]
    ContainsUsername,

    #[error("Password cannot contain your email")]
    ContainsEmail,
}
