use thiserror::Error;

/// Error type for secret encryption and decryption.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Master key is empty")]
    EmptyMasterKey,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed")]
    EncryptionFailed,

    /// Wrong master key, or ciphertext that was altered after encryption.
    #[error("Decryption failed: wrong master key or corrupted ciphertext")]
    DecryptionFailed,

    #[error("Ciphertext is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("Ciphertext is truncated: expected at least {min} bytes, got {actual}")]
    Truncated { min: usize, actual: usize },

    #[error("Unsupported ciphertext version: {0}")]
    UnsupportedVersion(u8),

    #[error("Decrypted secret is not valid UTF-8")]
    InvalidUtf8,

    #[error("Value is not wrapped in ENC(...)")]
    NotEncrypted,
}
