//! Encryption/decryption using PBKDF2-HMAC-SHA256 + AES-256-GCM
//!
//! This module implements passphrase-based encryption using:
//! - PBKDF2 with an HMAC-SHA-256 PRF for key derivation from passphrase
//! - AES-256-GCM for authenticated encryption
//!
//! The result of encryption is an [`Envelope`], which records every
//! parameter needed to decrypt it except the passphrase. Decryption always
//! uses the envelope's own salt and iteration count.

use crate::envelope::{Envelope, IV_LEN};
use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, SALT_LEN};
use crate::random;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

/// Encrypt plaintext with a passphrase using random salt and IV
pub fn encrypt(plaintext: &[u8], passphrase: &[u8], iterations: u32) -> Result<Envelope> {
    let salt: [u8; SALT_LEN] = random::random_array()?;
    let iv: [u8; IV_LEN] = random::random_array()?;

    encrypt_deterministic(plaintext, passphrase, iterations, &salt, &iv)
}

/// Encrypt plaintext with a passphrase using provided salt and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/IV.
pub fn encrypt_deterministic(
    plaintext: &[u8],
    passphrase: &[u8],
    iterations: u32,
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Envelope> {
    let key = kdf::derive_key(passphrase, salt, iterations)?;
    let cipher = Aes256Gcm::new(key.as_slice().into());

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| {
            DiaryboxError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "AES-GCM refused to encrypt the plaintext",
            )
        })?;

    Ok(Envelope::new(iterations, *salt, *iv, ciphertext))
}

/// Decrypt an envelope with a passphrase
///
/// A wrong passphrase and a corrupted or tampered envelope produce the same
/// `AuthenticationFailure`; no partial plaintext is ever returned.
pub fn decrypt(envelope: &Envelope, passphrase: &[u8]) -> Result<Vec<u8>> {
    let key = kdf::derive_key(passphrase, envelope.salt(), envelope.kdf_iterations())?;
    let cipher = Aes256Gcm::new(key.as_slice().into());
    drop(key);

    cipher
        .decrypt(Nonce::from_slice(envelope.iv()), envelope.ciphertext())
        .map_err(|_| {
            DiaryboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailure,
                "corrupt input, tampered-with data, or bad passphrase",
            )
        })
}

/// Parse serialized envelope text and decrypt it to a UTF-8 string.
///
/// This is the shape the diary viewer consumes: envelope text in,
/// diary text out.
pub fn decrypt_text(envelope_json: &str, passphrase: &[u8]) -> Result<String> {
    let envelope = Envelope::from_json(envelope_json)?;
    let plaintext = decrypt(&envelope, passphrase)?;
    String::from_utf8(plaintext).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8,
            "decrypted plaintext is not valid UTF-8",
            e,
        )
    })
}
