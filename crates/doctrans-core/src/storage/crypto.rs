//! Symmetric content encryption — age (scrypt passphrase) for encrypting
//! and decrypting byte payloads before they reach the database.
//!
//! Each call is stateless; the passphrase is configured once at startup
//! and held in a `SecretString` so it is zeroised on drop.

use std::io::{Read, Write};

use age::secrecy::SecretString;
use tracing::debug;

use crate::error::{Error, Result};

/// Passphrase-based cipher backed by the `age` crate.
pub struct ContentCipher {
    passphrase: SecretString,
}

impl ContentCipher {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
        }
    }

    /// Encrypt `plaintext` and return the ciphertext.
    ///
    /// The output is a complete age file (header + encrypted payload).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let encryptor = age::Encryptor::with_user_passphrase(self.passphrase.clone());
        let mut ciphertext = Vec::new();

        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|e| Error::Encryption(e.to_string()))?;
        writer
            .write_all(plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| Error::Encryption(e.to_string()))?;

        debug!(
            plaintext_len = plaintext.len(),
            ciphertext_len = ciphertext.len(),
            "content encrypted"
        );
        Ok(ciphertext)
    }

    /// Decrypt `ciphertext` back to the original plaintext bytes.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let decryptor =
            age::Decryptor::new(ciphertext).map_err(|e| Error::Encryption(e.to_string()))?;

        let identity = age::scrypt::Identity::new(self.passphrase.clone());

        let mut reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        Ok(plaintext)
    }
}
