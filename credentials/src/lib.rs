//! Credential security library
//!
//! Provides the security-sensitive building blocks of the account service:
//! - Session tokens (HS256 JWT issuance and verification)
//! - Password hashing (Argon2id) and the password policy
//! - Password-based encryption of configuration secrets
//! - Authentication coordination (login, password change)
//!
//! Everything here is synchronous and free of shared mutable state, so a
//! single instance of each component can serve concurrent requests.
//!
//! # Examples
//!
//! ## Session Tokens
//! ```
//! use std::collections::HashMap;
//!
//! use credentials::TokenService;
//!
//! let tokens = TokenService::new(b"secret_key_at_least_32_bytes_long!").unwrap();
//! let token = tokens.issue("alice", HashMap::new()).unwrap();
//! let claims = tokens.verify(&token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```
//!
//! ## Password Policy
//! ```
//! use credentials::{PasswordPolicy, PolicyContext};
//!
//! let policy = PasswordPolicy::standard();
//! let context = PolicyContext::new("alice", "alice@example.com");
//!
//! assert!(policy.validate("Tr0ub4dor&3xqz", &context).is_none());
//! let reason = policy.validate("Password123!", &context).unwrap();
//! println!("Rejected: {}", reason);
//! ```
//!
//! ## Configuration Secrets
//! ```
//! use credentials::SecretCipher;
//!
//! let cipher = SecretCipher::new();
//! let sealed = cipher.seal("hunter2", "master-key").unwrap();
//! // store `ENC(...)` in a config file
//! let stored = sealed.to_string();
//! assert_eq!(cipher.resolve(&stored, "master-key").unwrap(), "hunter2");
//! ```

pub mod authenticator;
pub mod cipher;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::AuthenticationResult;
pub use authenticator::Authenticator;
pub use authenticator::CredentialChangeError;
pub use cipher::CipherError;
pub use cipher::EncryptedSecret;
pub use cipher::SecretCipher;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use password::PolicyContext;
pub use password::PolicyRule;
pub use password::PolicyViolation;
pub use token::Claims;
pub use token::TokenError;
pub use token::TokenService;
