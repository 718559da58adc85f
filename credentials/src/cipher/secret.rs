use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::Aead;
use aes_gcm::aead::AeadCore;
use aes_gcm::aead::KeyInit;
use aes_gcm::aead::OsRng;
use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::envelope::EncryptedSecret;
use super::errors::CipherError;

/// Payload tag: Argon2id key derivation feeding AES-256-GCM.
const VERSION_ARGON2ID_AES256GCM: u8 = 1;

const SALT_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;
const KEY_LENGTH: usize = 32;
const TAG_LENGTH: usize = 16;
const MIN_PAYLOAD_LENGTH: usize = 1 + SALT_LENGTH + NONCE_LENGTH + TAG_LENGTH;

// Argon2id cost for version 1 payloads. Changing these requires a new version tag.
const KDF_MEMORY_KIB: u32 = 19 * 1024;
const KDF_ITERATIONS: u32 = 2;
const KDF_PARALLELISM: u32 = 1;

/// Password-based encryption for short configuration secrets.
///
/// Every call draws a fresh salt and nonce, so encrypting the same value twice
/// gives different ciphertexts. Payload layout before base64:
///
/// ```text
/// version (1) | salt (16) | nonce (12) | ciphertext + GCM tag
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretCipher;

impl SecretCipher {
    pub fn new() -> Self {
        Self
    }

    /// Encrypt `plaintext` under `master_key`.
    ///
    /// # Returns
    /// Base64 payload (standard alphabet, padded)
    ///
    /// # Errors
    /// * `EmptyMasterKey` - Master key is empty
    /// * `KeyDerivationFailed` - Argon2 rejected its inputs
    /// * `EncryptionFailed` - AEAD encryption failed
    pub fn encrypt(&self, plaintext: &str, master_key: &str) -> Result<String, CipherError> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);

        let cipher = Self::cipher_for(master_key, &salt)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(1 + SALT_LENGTH + NONCE_LENGTH + ciphertext.len());
        payload.push(VERSION_ARGON2ID_AES256GCM);
        payload.extend_from_slice(&salt);
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(payload))
    }

    /// Decrypt a base64 payload produced by [`SecretCipher::encrypt`].
    ///
    /// # Errors
    /// * `InvalidEncoding` - Payload is not base64
    /// * `UnsupportedVersion` - Payload carries an unknown version tag
    /// * `Truncated` - Payload is too short to hold salt, nonce and tag
    /// * `DecryptionFailed` - Wrong master key or tampered ciphertext
    /// * `InvalidUtf8` - Decrypted bytes are not a string
    pub fn decrypt(&self, ciphertext: &str, master_key: &str) -> Result<String, CipherError> {
        let payload = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| CipherError::InvalidEncoding(e.to_string()))?;

        match payload.first() {
            None => {
                return Err(CipherError::Truncated {
                    min: MIN_PAYLOAD_LENGTH,
                    actual: 0,
                })
            }
            Some(&VERSION_ARGON2ID_AES256GCM) => {}
            Some(&other) => return Err(CipherError::UnsupportedVersion(other)),
        }

        if payload.len() < MIN_PAYLOAD_LENGTH {
            return Err(CipherError::Truncated {
                min: MIN_PAYLOAD_LENGTH,
                actual: payload.len(),
            });
        }

        let (salt, rest) = payload[1..].split_at(SALT_LENGTH);
        let (nonce, sealed) = rest.split_at(NONCE_LENGTH);

        let cipher = Self::cipher_for(master_key, salt)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }

    /// Encrypt and wrap the result as `ENC(...)`.
    ///
    /// # Errors
    /// Same as [`SecretCipher::encrypt`]
    pub fn seal(&self, plaintext: &str, master_key: &str) -> Result<EncryptedSecret, CipherError> {
        self.encrypt(plaintext, master_key)
            .map(EncryptedSecret::from_payload)
    }

    /// Decrypt an `ENC(...)` value.
    ///
    /// # Errors
    /// Same as [`SecretCipher::decrypt`]
    pub fn open(&self, secret: &EncryptedSecret, master_key: &str) -> Result<String, CipherError> {
        self.decrypt(secret.payload(), master_key)
    }

    /// Resolve a configuration value: `ENC(...)` is decrypted, anything else
    /// is returned unchanged.
    ///
    /// # Errors
    /// Same as [`SecretCipher::decrypt`] for encrypted values
    pub fn resolve(&self, value: &str, master_key: &str) -> Result<String, CipherError> {
        match EncryptedSecret::parse(value) {
            Some(secret) => self.open(&secret, master_key),
            None => Ok(value.to_string()),
        }
    }

    fn cipher_for(master_key: &str, salt: &[u8]) -> Result<Aes256Gcm, CipherError> {
        if master_key.is_empty() {
            return Err(CipherError::EmptyMasterKey);
        }

        let params = Params::new(
            KDF_MEMORY_KIB,
            KDF_ITERATIONS,
            KDF_PARALLELISM,
            Some(KEY_LENGTH),
        )
        .map_err(|e| CipherError::KeyDerivationFailed(e.to_string()))?;

        let mut key = [0u8; KEY_LENGTH];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(master_key.as_bytes(), salt, &mut key)
            .map_err(|e| CipherError::KeyDerivationFailed(e.to_string()))?;

        Aes256Gcm::new_from_slice(&key).map_err(|e| CipherError::KeyDerivationFailed(e.to_string()))
    }
}
