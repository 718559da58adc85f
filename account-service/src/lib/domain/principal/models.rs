use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use credentials::AuthenticationResult;
use credentials::PolicyContext;
use secrecy::SecretString;
use uuid::Uuid;

use crate::principal::errors::EmailError;
use crate::principal::errors::PrincipalIdError;
use crate::principal::errors::RoleError;
use crate::principal::errors::UsernameError;

/// Authenticated identity resolved from a token subject.
///
/// Carries the role labels used by downstream authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: Username,
    pub email: EmailAddress,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Token subject identifying this principal.
    pub fn subject(&self) -> &str {
        self.username.as_str()
    }

    /// Check for a role label (case-insensitive, `ROLE_` prefix optional).
    pub fn has_role(&self, role: &str) -> bool {
        match Role::new(role) {
            Ok(role) => self.roles.contains(&role),
            Err(_) => false,
        }
    }

    /// Role labels as plain strings, in stored order.
    pub fn role_labels(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }

    /// Account data the password policy compares candidates against.
    pub fn policy_context(&self) -> PolicyContext<'_> {
        PolicyContext::new(self.username.as_str(), self.email.as_str())
    }
}

/// Principal unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    /// Generate a new random principal ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a principal ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, PrincipalIdError> {
        Uuid::parse_str(s)
            .map(PrincipalId)
            .map_err(|e| PrincipalIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Ensures username is 3-32 characters and contains only alphanumeric, underscore, and hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 32;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Username shorter than 3 characters
    /// * `TooLong` - Username longer than 32 characters
    /// * `InvalidCharacters` - Contains non-alphanumeric characters (except _ and -)
    pub fn new(username: String) -> Result<Self, UsernameError> {
        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(UsernameError::InvalidCharacters);
        }

        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Authorization role label.
///
/// Stored upper-case without the `ROLE_` prefix, so `role_admin`, `ROLE_ADMIN`
/// and `admin` are the same role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role(String);

impl Role {
    const PREFIX: &'static str = "ROLE_";

    /// # Errors
    /// * `Empty` - Label is blank or only the prefix
    /// * `InvalidCharacters` - Label has characters other than alphanumeric and underscore
    pub fn new(label: &str) -> Result<Self, RoleError> {
        let upper = label.trim().to_uppercase();
        let name = upper.strip_prefix(Self::PREFIX).unwrap_or(&upper);

        if name.is_empty() {
            return Err(RoleError::Empty);
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(RoleError::InvalidCharacters(label.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn user() -> Self {
        Self("USER".to_string())
    }

    pub fn admin() -> Self {
        Self("ADMIN".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Command to log in with a username and password.
#[derive(Debug)]
pub struct LoginCommand {
    pub username: Username,
    pub password: SecretString,
}

impl LoginCommand {
    pub fn new(username: Username, password: SecretString) -> Self {
        Self { username, password }
    }
}

/// Command to open a new account.
#[derive(Debug)]
pub struct RegisterCommand {
    pub username: Username,
    pub email: EmailAddress,
    pub password: SecretString,
}

impl RegisterCommand {
    pub fn new(username: Username, email: EmailAddress, password: SecretString) -> Self {
        Self {
            username,
            email,
            password,
        }
    }
}

/// A newly created principal with its first session token.
#[derive(Debug, Clone)]
pub struct Registration {
    pub principal: Principal,
    pub session: AuthenticationResult,
}

/// Command to replace the caller's password.
///
/// Both values are secrets so they never show up in `Debug` output or logs.
#[derive(Debug)]
pub struct ChangePasswordCommand {
    pub current_password: SecretString,
    pub new_password: SecretString,
}

impl ChangePasswordCommand {
    pub fn new(current_password: SecretString, new_password: SecretString) -> Self {
        Self {
            current_password,
            new_password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            id: PrincipalId::new(),
            username: Username::new("alice".to_string()).unwrap(),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            roles: vec![Role::user()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_username_validation() {
        assert!(Username::new("alice".to_string()).is_ok());
        assert_eq!(
            Username::new("al".to_string()),
            Err(UsernameError::TooShort { min: 3, actual: 2 })
        );
        assert_eq!(
            Username::new("a".repeat(33)),
            Err(UsernameError::TooLong {
                max: 32,
                actual: 33
            })
        );
        assert_eq!(
            Username::new("alice smith".to_string()),
            Err(UsernameError::InvalidCharacters)
        );
    }

    #[test]
    fn test_email_validation() {
        let email = EmailAddress::new("alice.smith@example.com".to_string()).unwrap();
        assert_eq!(email.as_str(), "alice.smith@example.com");
        assert!(EmailAddress::new("not-an-email".to_string()).is_err());
    }

    #[test]
    fn test_principal_id_round_trip() {
        let id = PrincipalId::new();
        assert_eq!(PrincipalId::from_string(&id.to_string()), Ok(id));
        assert!(PrincipalId::from_string("nope").is_err());
    }

    #[test]
    fn test_role_normalization() {
        assert_eq!(Role::new("admin"), Ok(Role::admin()));
        assert_eq!(Role::new("ROLE_ADMIN"), Ok(Role::admin()));
        assert_eq!(Role::new(" role_user "), Ok(Role::user()));
        assert_eq!(Role::new("ROLE_"), Err(RoleError::Empty));
        assert!(matches!(
            Role::new("ad min"),
            Err(RoleError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn test_has_role() {
        let principal = principal();

        assert!(principal.has_role("USER"));
        assert!(principal.has_role("role_user"));
        assert!(!principal.has_role("ADMIN"));
        assert!(!principal.has_role(""));
        assert_eq!(principal.role_labels(), vec!["USER".to_string()]);
    }

    #[test]
    fn test_policy_context() {
        let principal = principal();
        let context = principal.policy_context();

        assert_eq!(context.username, "alice");
        assert_eq!(context.email, "alice@example.com");
    }

    #[test]
    fn test_commands_redact_passwords() {
        let command = ChangePasswordCommand::new(
            SecretString::from("Tr0ub4dor&3xqz".to_string()),
            SecretString::from("Velvet#Lamp82q".to_string()),
        );

        let debug = format!("{:?}", command);
        assert!(!debug.contains("Tr0ub4dor"));
        assert!(!debug.contains("Velvet"));
    }
}
