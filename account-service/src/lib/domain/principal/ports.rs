use async_trait::async_trait;
use credentials::AuthenticationResult;
use credentials::Authenticator;
use credentials::Claims;
use credentials::TokenError;
use credentials::TokenService;

use crate::domain::principal::models::ChangePasswordCommand;
use crate::domain::principal::models::EmailAddress;
use crate::domain::principal::models::LoginCommand;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::models::RegisterCommand;
use crate::domain::principal::models::Registration;
use crate::domain::principal::notifications::Notification;
use crate::principal::errors::CredentialError;
use crate::principal::errors::NotificationError;
use crate::principal::errors::PrincipalError;

/// Port for credential domain service operations.
#[async_trait]
pub trait CredentialServicePort: Send + Sync + 'static {
    /// Create an account with the `USER` role and issue its first token.
    ///
    /// The password is hashed as given; the policy applies to later changes.
    ///
    /// # Errors
    /// * `PasswordRequired` - Blank password
    /// * `UsernameTaken` - Username belongs to another principal
    /// * `EmailTaken` - Email belongs to another principal
    /// * `Password` - Hashing failed
    /// * `Token` - Token generation failed
    /// * `Store` - Lookup or insert failed
    async fn register(&self, command: RegisterCommand) -> Result<Registration, CredentialError>;

    /// Verify a username and password and issue a session token.
    ///
    /// # Arguments
    /// * `command` - Username and plaintext password
    ///
    /// # Returns
    /// Signed token and its lifetime in seconds
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown username, missing credential or wrong password
    /// * `Password` - Stored hash could not be parsed
    /// * `Token` - Token generation failed
    /// * `Store` - Lookup failed
    async fn login(&self, command: LoginCommand) -> Result<AuthenticationResult, CredentialError>;

    /// Replace the principal's password.
    ///
    /// # Arguments
    /// * `principal` - Authenticated principal changing its own password
    /// * `command` - Current and new plaintext passwords
    ///
    /// # Errors
    /// * `CurrentPasswordRequired` / `NewPasswordRequired` - Blank input
    /// * `Rejected` - Wrong current password, unchanged password or policy violation
    /// * `NotFound` - No stored credential for the principal
    /// * `Store` - Credential store failed
    async fn change_password(
        &self,
        principal: &Principal,
        command: ChangePasswordCommand,
    ) -> Result<(), CredentialError>;

    /// Issue a token for an already authenticated principal.
    ///
    /// # Errors
    /// * `Token` - Token generation failed
    fn issue_token(&self, principal: &Principal) -> Result<String, CredentialError>;
}

/// Resolves token subjects to principals.
#[async_trait]
pub trait PrincipalLookup: Send + Sync + 'static {
    /// Find the principal a token subject refers to.
    ///
    /// # Arguments
    /// * `subject` - Token subject (the username)
    ///
    /// # Returns
    /// Optional principal (None if the subject is unknown)
    ///
    /// # Errors
    /// * `StoreUnavailable` - Backing store could not be reached
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Principal>, PrincipalError>;
}

/// Persist principals and their password hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Insert a principal together with its password hash.
    ///
    /// # Errors
    /// * `AlreadyExists` - Username or email is already stored
    /// * `StoreUnavailable` - Backing store could not be reached
    async fn create(
        &self,
        principal: Principal,
        password_hash: String,
    ) -> Result<Principal, PrincipalError>;

    /// Find the principal registered with `email`.
    ///
    /// # Errors
    /// * `StoreUnavailable` - Backing store could not be reached
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Principal>, PrincipalError>;

    /// Load the stored password hash.
    ///
    /// # Returns
    /// PHC-format hash, or None if the principal has no credential
    ///
    /// # Errors
    /// * `StoreUnavailable` - Backing store could not be reached
    async fn find_password_hash(&self, id: &PrincipalId) -> Result<Option<String>, PrincipalError>;

    /// Replace the stored password hash.
    ///
    /// # Errors
    /// * `NotFound` - Principal does not exist
    /// * `StoreUnavailable` - Backing store could not be reached
    async fn update_password_hash(
        &self,
        id: &PrincipalId,
        password_hash: String,
    ) -> Result<(), PrincipalError>;
}

/// Compose and deliver notifications to principals.
#[async_trait]
pub trait NotificationSender: Send + Sync + 'static {
    /// # Errors
    /// * `ComposeFailed` - Message could not be built
    /// * `DeliveryFailed` - Transport refused the message
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Synchronous token verification used by the authentication interceptor.
pub trait TokenVerifier: Send + Sync + 'static {
    /// # Errors
    /// * `Malformed`, `BadSignature`, `Expired`
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

impl TokenVerifier for TokenService {
    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        TokenService::verify(self, token)
    }
}

impl TokenVerifier for Authenticator {
    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_token(token)
    }
}
