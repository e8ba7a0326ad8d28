//! Passphrase to key derivation using PBKDF2 with an HMAC-SHA-256 PRF.

use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Name recorded in the `kdf` field of every envelope we produce.
pub const KDF_NAME: &str = "PBKDF2-SHA256";

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Iteration count used when encrypting unless configured otherwise.
///
/// OWASP's current minimum for PBKDF2-HMAC-SHA256.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Iteration count assumed for envelopes written before `kdf_iter` was
/// recorded. This is the historical default of the original encrypting
/// tool and must never follow `DEFAULT_ITERATIONS`.
pub const LEGACY_DEFAULT_ITERATIONS: u32 = 100_000;

/// Derive a 32-byte key from a passphrase and salt.
///
/// Deterministic in its inputs; nothing is cached between calls.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    check_iterations(i64::from(iterations))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, key.as_mut_slice());
    Ok(key)
}

/// Validate an iteration count, which may come from untrusted envelope
/// input and therefore arrives as a wide signed integer.
pub fn check_iterations(iterations: i64) -> Result<u32> {
    if iterations <= 0 {
        return Err(DiaryboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidIterationCount,
            format!("iteration count must be positive (got {})", iterations),
        ));
    }
    u32::try_from(iterations).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidIterationCount,
            format!("iteration count {} is too large", iterations),
            e,
        )
    })
}
