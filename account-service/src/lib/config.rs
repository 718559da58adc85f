use std::env;

use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use credentials::Authenticator;
use credentials::CipherError;
use credentials::EncryptedSecret;
use credentials::PasswordHasher;
use credentials::PasswordPolicy;
use credentials::SecretCipher;
use credentials::TokenError;
use credentials::TokenService;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the master key for `ENC(...)` values.
pub const MASTER_KEY_ENV: &str = "SECRETS_MASTER_KEY";

const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Resolved service configuration. Every `ENC(...)` value has been decrypted.
#[derive(Debug)]
pub struct Config {
    pub jwt: JwtConfig,
    pub mail: Option<MailConfig>,
}

#[derive(Debug)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub expiration_hours: i64,
    pub issuer: Option<String>,
}

#[derive(Debug)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("{field} is encrypted but no master key is set (SECRETS_MASTER_KEY or secrets.master_key)")]
    MissingMasterKey { field: &'static str },

    #[error("Failed to decrypt {field}: {source}")]
    Secret {
        field: &'static str,
        #[source]
        source: CipherError,
    },

    #[error("jwt.secret is required")]
    MissingJwtSecret,

    #[error("jwt.expiration_hours must be positive, got {0}")]
    InvalidExpiration(i64),

    #[error("Invalid jwt.secret: {0}")]
    InvalidJwtSecret(#[from] TokenError),
}

#[derive(Debug, Deserialize)]
struct Settings {
    jwt: JwtSettings,
    #[serde(default)]
    secrets: SecretsSettings,
    mail: Option<MailSettings>,
}

#[derive(Debug, Deserialize)]
struct JwtSettings {
    #[serde(default)]
    secret: String,
    #[serde(default = "default_expiration_hours")]
    expiration_hours: i64,
    issuer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SecretsSettings {
    master_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MailSettings {
    host: String,
    port: u16,
    username: String,
    password: String,
}

fn default_expiration_hours() -> i64 {
    DEFAULT_EXPIRATION_HOURS
}

/// Decrypts `ENC(...)` values with the resolved master key.
struct SecretResolver {
    cipher: SecretCipher,
    master_key: Option<SecretString>,
}

impl SecretResolver {
    fn new(configured_key: Option<String>) -> Self {
        let master_key = env::var(MASTER_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or(configured_key.filter(|key| !key.trim().is_empty()))
            .map(SecretString::from);

        Self {
            cipher: SecretCipher::new(),
            master_key,
        }
    }

    fn resolve(&self, field: &'static str, value: String) -> Result<SecretString, ConfigurationError> {
        let Some(secret) = EncryptedSecret::parse(&value) else {
            return Ok(SecretString::from(value));
        };

        let master_key = self
            .master_key
            .as_ref()
            .ok_or(ConfigurationError::MissingMasterKey { field })?;

        let plaintext = self
            .cipher
            .open(&secret, master_key.expose_secret())
            .map_err(|source| ConfigurationError::Secret { field, source })?;

        tracing::debug!(field, "Decrypted configuration secret");
        Ok(SecretString::from(plaintext))
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, MAIL__PASSWORD, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    ///
    /// The master key for encrypted values comes from `SECRETS_MASTER_KEY`,
    /// falling back to `secrets.master_key`.
    pub fn load() -> Result<Self, ConfigurationError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(Environment::default().separator("__"))
            .build()?;

        Self::from_configuration(configuration)
    }

    /// Resolve an already assembled configuration.
    ///
    /// # Errors
    /// * `Load` - Missing or mistyped settings
    /// * `MissingMasterKey` - An encrypted value needs a master key and none is set
    /// * `Secret` - An encrypted value could not be decrypted
    /// * `MissingJwtSecret`, `InvalidJwtSecret`, `InvalidExpiration` - Unusable token settings
    pub fn from_configuration(configuration: ConfigBuilder) -> Result<Self, ConfigurationError> {
        let settings: Settings = configuration.try_deserialize()?;
        let resolver = SecretResolver::new(settings.secrets.master_key);

        if settings.jwt.secret.trim().is_empty() {
            return Err(ConfigurationError::MissingJwtSecret);
        }
        if settings.jwt.expiration_hours <= 0 {
            return Err(ConfigurationError::InvalidExpiration(
                settings.jwt.expiration_hours,
            ));
        }

        let jwt = JwtConfig {
            secret: resolver.resolve("jwt.secret", settings.jwt.secret)?,
            expiration_hours: settings.jwt.expiration_hours,
            issuer: settings.jwt.issuer,
        };

        let mail = settings
            .mail
            .map(|mail| -> Result<MailConfig, ConfigurationError> {
                Ok(MailConfig {
                    password: resolver.resolve("mail.password", mail.password)?,
                    host: mail.host,
                    port: mail.port,
                    username: mail.username,
                })
            })
            .transpose()?;

        let config = Config { jwt, mail };
        config.token_service()?;

        Ok(config)
    }

    /// Build the token service for the configured key, validity and issuer.
    ///
    /// # Errors
    /// * `KeyTooShort` - Signing secret is shorter than 32 bytes
    pub fn token_service(&self) -> Result<TokenService, TokenError> {
        let service = TokenService::with_validity(
            self.jwt.secret.expose_secret().as_bytes(),
            Duration::hours(self.jwt.expiration_hours),
        )?;

        Ok(match &self.jwt.issuer {
            Some(issuer) => service.with_issuer(issuer),
            None => service,
        })
    }

    /// # Errors
    /// * `KeyTooShort` - Signing secret is shorter than 32 bytes
    pub fn authenticator(&self) -> Result<Authenticator, TokenError> {
        Ok(Authenticator::from_parts(
            PasswordHasher::new(),
            self.token_service()?,
            PasswordPolicy::standard(),
        ))
    }
}
