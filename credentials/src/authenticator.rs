use std::collections::HashMap;
use std::sync::OnceLock;

use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::password::PasswordPolicy;
use crate::password::PolicyContext;
use crate::password::PolicyViolation;
use crate::token::claims::ROLES_CLAIM;
use crate::token::Claims;
use crate::token::TokenError;
use crate::token::TokenService;

/// Authentication coordinator combining password hashing, the password
/// policy and token issuance.
///
/// Plaintext passwords pass through here but are never logged or stored.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_service: TokenService,
    policy: PasswordPolicy,
    decoy_hash: OnceLock<Option<String>>,
}

const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Result of successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    /// Signed session token
    pub access_token: String,

    /// Seconds until the token expires
    pub expires_in: i64,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

/// Reasons a password change is refused.
///
/// Display text is safe to return to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialChangeError {
    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    #[error("New password must be different from current password")]
    Unchanged,

    #[error("{0}")]
    PolicyViolation(#[from] PolicyViolation),

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),
}

impl Authenticator {
    /// Create an authenticator with the standard password policy and the
    /// default token validity.
    ///
    /// # Errors
    /// * `KeyTooShort` - Signing secret is shorter than 32 bytes
    pub fn new(jwt_secret: &[u8]) -> Result<Self, TokenError> {
        Ok(Self::from_parts(
            PasswordHasher::new(),
            TokenService::new(jwt_secret)?,
            PasswordPolicy::standard(),
        ))
    }

    /// Assemble an authenticator from configured components.
    pub fn from_parts(
        password_hasher: PasswordHasher,
        token_service: TokenService,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            password_hasher,
            token_service,
            policy,
            decoy_hash: OnceLock::new(),
        }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.token_service
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Spend one password verification on a throwaway hash.
    ///
    /// Login calls this when there is no stored hash to check against, so an
    /// unknown username takes as long to refuse as a wrong password.
    pub fn verify_decoy(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_init(|| self.password_hasher.hash(DECOY_PASSWORD).ok());

        if let Some(hash) = decoy {
            let _ = self.password_hasher.verify(password, hash);
        }
    }

    /// Verify credentials and issue a token carrying the subject's roles.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `subject` - Principal identifier for the token's `sub`
    /// * `roles` - Role labels embedded in the token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash could not be parsed
    /// * `TokenError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        subject: &str,
        roles: &[String],
    ) -> Result<AuthenticationResult, AuthenticationError> {
        if !self.password_hasher.verify(password, stored_hash)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        let access_token = self.generate_token(subject, roles)?;

        Ok(AuthenticationResult {
            access_token,
            expires_in: self.token_service.validity().num_seconds(),
        })
    }

    /// Issue a token without password verification, e.g. right after
    /// registration.
    ///
    /// # Errors
    /// * `TokenError` - Token generation failed
    pub fn generate_token(&self, subject: &str, roles: &[String]) -> Result<String, TokenError> {
        let mut extra = HashMap::new();
        if !roles.is_empty() {
            extra.insert(ROLES_CLAIM.to_string(), serde_json::json!(roles));
        }

        self.token_service.issue(subject, extra)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    /// * `Malformed`, `BadSignature`, `Expired` - see [`TokenService::verify`]
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.token_service.verify(token)
    }

    /// Evaluate a candidate password against the policy.
    pub fn validate_password(
        &self,
        candidate: &str,
        context: &PolicyContext<'_>,
    ) -> Option<PolicyViolation> {
        self.policy.validate(candidate, context)
    }

    /// Replace a stored credential.
    ///
    /// Checks, in order: `current` matches `stored_hash`; `candidate` does not
    /// match `stored_hash`; `candidate` satisfies the policy.
    ///
    /// # Returns
    /// New hash to persist
    ///
    /// # Errors
    /// * `CurrentPasswordIncorrect` - `current` does not match
    /// * `Unchanged` - `candidate` is the current password
    /// * `PolicyViolation` - First failing policy rule
    /// * `PasswordError` - Stored hash is invalid or hashing failed
    pub fn change_password(
        &self,
        current: &str,
        candidate: &str,
        stored_hash: &str,
        context: &PolicyContext<'_>,
    ) -> Result<String, CredentialChangeError> {
        if !self.password_hasher.verify(current, stored_hash)? {
            return Err(CredentialChangeError::CurrentPasswordIncorrect);
        }

        if self.password_hasher.verify(candidate, stored_hash)? {
            return Err(CredentialChangeError::Unchanged);
        }

        if let Some(violation) = self.policy.validate(candidate, context) {
            return Err(violation.into());
        }

        Ok(self.password_hasher.hash(candidate)?)
    }
}
