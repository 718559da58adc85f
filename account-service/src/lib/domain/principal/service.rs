use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use credentials::AuthenticationResult;
use credentials::Authenticator;
use secrecy::ExposeSecret;

use crate::domain::principal::models::ChangePasswordCommand;
use crate::domain::principal::models::LoginCommand;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::models::RegisterCommand;
use crate::domain::principal::models::Registration;
use crate::domain::principal::models::Role;
use crate::domain::principal::notifications::Notification;
use crate::principal::errors::CredentialError;
use crate::principal::ports::CredentialServicePort;
use crate::principal::ports::CredentialStore;
use crate::principal::ports::NotificationSender;
use crate::principal::ports::PrincipalLookup;

/// Domain service implementation for credential operations.
///
/// Concrete implementation of CredentialServicePort with dependency injection.
pub struct CredentialService<PL, CS, NS>
where
    PL: PrincipalLookup,
    CS: CredentialStore,
    NS: NotificationSender,
{
    principals: Arc<PL>,
    credentials: Arc<CS>,
    notifications: Arc<NS>,
    authenticator: Arc<Authenticator>,
}

impl<PL, CS, NS> CredentialService<PL, CS, NS>
where
    PL: PrincipalLookup,
    CS: CredentialStore,
    NS: NotificationSender,
{
    /// Create a new credential service with injected dependencies.
    ///
    /// # Arguments
    /// * `principals` - Principal lookup implementation
    /// * `credentials` - Password hash persistence implementation
    /// * `notifications` - Notification delivery implementation
    /// * `authenticator` - Hashing, policy and token issuance
    pub fn new(
        principals: Arc<PL>,
        credentials: Arc<CS>,
        notifications: Arc<NS>,
        authenticator: Arc<Authenticator>,
    ) -> Self {
        Self {
            principals,
            credentials,
            notifications,
            authenticator,
        }
    }
}

#[async_trait]
impl<PL, CS, NS> CredentialServicePort for CredentialService<PL, CS, NS>
where
    PL: PrincipalLookup,
    CS: CredentialStore,
    NS: NotificationSender,
{
    async fn register(&self, command: RegisterCommand) -> Result<Registration, CredentialError> {
        let password = command.password.expose_secret();
        if password.trim().is_empty() {
            return Err(CredentialError::PasswordRequired);
        }

        if self
            .principals
            .find_by_subject(command.username.as_str())
            .await?
            .is_some()
        {
            tracing::debug!(username = %command.username, "Registration for taken username");
            return Err(CredentialError::UsernameTaken);
        }

        if self
            .credentials
            .find_by_email(&command.email)
            .await?
            .is_some()
        {
            tracing::debug!(username = %command.username, "Registration for email in use");
            return Err(CredentialError::EmailTaken);
        }

        let password_hash = self.authenticator.hash_password(password)?;
        let principal = Principal {
            id: PrincipalId::new(),
            username: command.username,
            email: command.email,
            roles: vec![Role::user()],
            created_at: Utc::now(),
        };

        let principal = self.credentials.create(principal, password_hash).await?;
        let access_token = self
            .authenticator
            .generate_token(principal.subject(), &principal.role_labels())?;
        tracing::info!(principal_id = %principal.id, "Principal registered");

        Ok(Registration {
            principal,
            session: AuthenticationResult {
                access_token,
                expires_in: self.authenticator.token_service().validity().num_seconds(),
            },
        })
    }

    async fn login(&self, command: LoginCommand) -> Result<AuthenticationResult, CredentialError> {
        let Some(principal) = self
            .principals
            .find_by_subject(command.username.as_str())
            .await?
        else {
            tracing::debug!(username = %command.username, "Login for unknown username");
            self.authenticator.verify_decoy(command.password.expose_secret());
            return Err(CredentialError::InvalidCredentials);
        };

        let Some(stored_hash) = self.credentials.find_password_hash(&principal.id).await? else {
            tracing::warn!(principal_id = %principal.id, "Login for principal without a credential");
            self.authenticator.verify_decoy(command.password.expose_secret());
            return Err(CredentialError::InvalidCredentials);
        };

        let result = self
            .authenticator
            .authenticate(
                command.password.expose_secret(),
                &stored_hash,
                principal.subject(),
                &principal.role_labels(),
            )
            .inspect_err(|e| {
                tracing::debug!(principal_id = %principal.id, error = %e, "Login refused")
            })?;

        tracing::info!(principal_id = %principal.id, "Login succeeded");
        Ok(result)
    }

    async fn change_password(
        &self,
        principal: &Principal,
        command: ChangePasswordCommand,
    ) -> Result<(), CredentialError> {
        let current = command.current_password.expose_secret();
        let candidate = command.new_password.expose_secret();

        if current.trim().is_empty() {
            return Err(CredentialError::CurrentPasswordRequired);
        }
        if candidate.trim().is_empty() {
            return Err(CredentialError::NewPasswordRequired);
        }

        let stored_hash = self
            .credentials
            .find_password_hash(&principal.id)
            .await?
            .ok_or(CredentialError::NotFound(principal.id.to_string()))?;

        let new_hash = self
            .authenticator
            .change_password(current, candidate, &stored_hash, &principal.policy_context())
            .inspect_err(|e| {
                tracing::info!(principal_id = %principal.id, reason = %e, "Password change refused")
            })?;

        self.credentials
            .update_password_hash(&principal.id, new_hash)
            .await?;
        tracing::info!(principal_id = %principal.id, "Password changed");

        let notification = Notification::password_changed(principal);
        if let Err(e) = self.notifications.send(&notification).await {
            tracing::error!(
                principal_id = %principal.id,
                error = %e,
                "Failed to send password change notification"
            );
        }

        Ok(())
    }

    fn issue_token(&self, principal: &Principal) -> Result<String, CredentialError> {
        Ok(self
            .authenticator
            .generate_token(principal.subject(), &principal.role_labels())?)
    }
}
