use std::fmt;
use std::str::FromStr;

use super::errors::CipherError;

/// An encrypted configuration value in its stored `ENC(<base64>)` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    const PREFIX: &'static str = "ENC(";
    const SUFFIX: &'static str = ")";

    /// Wrap a base64 payload produced by `SecretCipher::encrypt`.
    pub fn from_payload(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Recognise an `ENC(...)` value, ignoring surrounding whitespace.
    ///
    /// # Returns
    /// `None` when the value is plain text
    pub fn parse(value: &str) -> Option<Self> {
        let payload = value
            .trim()
            .strip_prefix(Self::PREFIX)?
            .strip_suffix(Self::SUFFIX)?
            .trim();

        if payload.is_empty() {
            None
        } else {
            Some(Self(payload.to_string()))
        }
    }

    /// Whether a configuration value is in encrypted form.
    pub fn is_encrypted(value: &str) -> bool {
        Self::parse(value).is_some()
    }

    /// The base64 payload between the parentheses.
    pub fn payload(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", Self::PREFIX, self.0, Self::SUFFIX)
    }
}

impl FromStr for EncryptedSecret {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(CipherError::NotEncrypted)
    }
}
