use std::collections::HashMap;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::crypto;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::claims::RESERVED_CLAIMS;
use super::errors::TokenError;

/// Session token issuer and verifier.
///
/// Uses HS256 (HMAC with SHA-256). Keys are read-only after construction, so
/// one instance can be shared across request handlers behind an `Arc`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validity: Duration,
    issuer: Option<String>,
}

impl TokenService {
    /// Minimum signing key length for HS256.
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Default validity window of an issued token.
    pub const DEFAULT_VALIDITY_HOURS: i64 = 24;

    /// Create a token service with a secret key and the default validity window.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens
    ///
    /// # Errors
    /// * `KeyTooShort` - Secret is shorter than 32 bytes
    pub fn new(secret: &[u8]) -> Result<Self, TokenError> {
        Self::with_validity(secret, Duration::hours(Self::DEFAULT_VALIDITY_HOURS))
    }

    /// Create a token service with an explicit validity window.
    ///
    /// # Errors
    /// * `KeyTooShort` - Secret is shorter than 32 bytes
    pub fn with_validity(secret: &[u8], validity: Duration) -> Result<Self, TokenError> {
        if secret.len() < Self::MIN_SECRET_LENGTH {
            return Err(TokenError::KeyTooShort {
                min: Self::MIN_SECRET_LENGTH,
                actual: secret.len(),
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            validity,
            issuer: None,
        })
    }

    /// Stamp issued tokens with an issuer and require it on verification.
    pub fn with_issuer(mut self, issuer: impl ToString) -> Self {
        self.issuer = Some(issuer.to_string());
        self
    }

    /// Validity window applied to issued tokens.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a signed token for `subject`, valid from now for the configured window.
    ///
    /// # Arguments
    /// * `subject` - Principal identifier to embed as `sub`
    /// * `extra` - Optional claims (roles, custom fields) flattened into the token
    ///
    /// # Errors
    /// * `ReservedClaim` - `extra` sets a registered claim such as `sub` or `exp`
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(
        &self,
        subject: impl ToString,
        extra: HashMap<String, serde_json::Value>,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, extra, Utc::now())
    }

    /// Issue a signed token as if the current time were `issued_at`.
    ///
    /// # Errors
    /// * `ReservedClaim` - `extra` sets a registered claim such as `sub` or `exp`
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue_at(
        &self,
        subject: impl ToString,
        extra: HashMap<String, serde_json::Value>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if let Some(key) = extra.keys().find(|key| RESERVED_CLAIMS.contains(&key.as_str())) {
            return Err(TokenError::ReservedClaim(key.clone()));
        }

        let mut claims = Claims::for_subject(subject, issued_at, self.validity).with_extras(extra);
        if let Some(issuer) = &self.issuer {
            claims = claims.with_issuer(issuer);
        }

        self.sign(&claims)
    }

    /// Sign prepared claims as they are.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked over the raw `header.payload` text before any
    /// segment is decoded, so tampering anywhere in a well-formed token is
    /// reported as `BadSignature`.
    ///
    /// # Errors
    /// * `Malformed` - Token is not three dot-separated segments, or its content
    ///   does not decode into valid claims
    /// * `BadSignature` - Signature does not match the active key
    /// * `Expired` - Expiry is in the past
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (message, signature) = split_token(token)?;

        let signature_matches = crypto::verify(
            signature,
            message.as_bytes(),
            &self.decoding_key,
            self.algorithm,
        )
        .map_err(|e| TokenError::Malformed(e.to_string()))?;

        if !signature_matches {
            return Err(TokenError::BadSignature);
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation()).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::BadSignature,
                    _ => TokenError::Malformed(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

fn split_token(token: &str) -> Result<(&str, &str), TokenError> {
    let (message, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| TokenError::Malformed("missing signature segment".to_string()))?;

    let mut segments = message.split('.');
    let well_formed = matches!(
        (segments.next(), segments.next(), segments.next()),
        (Some(header), Some(payload), None) if !header.is_empty() && !payload.is_empty()
    );

    if !well_formed || signature.is_empty() {
        return Err(TokenError::Malformed(
            "expected three non-empty segments".to_string(),
        ));
    }

    Ok((message, signature))
}
