pub mod envelope;
pub mod errors;
pub mod secret;

pub use envelope::EncryptedSecret;
pub use errors::CipherError;
pub use secret::SecretCipher;
