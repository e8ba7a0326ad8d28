//! Secure random bytes from the operating system's CSPRNG.
//!
//! There is no fallback generator. If the OS source fails, the caller gets
//! `EntropySourceUnavailable` and must abort.

use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Fill `buf` entirely with bytes from the OS CSPRNG.
pub fn fill(buf: &mut [u8]) -> Result<()> {
    fill_from(&mut OsRng, buf)
}

pub(crate) fn fill_from<R: RngCore + ?Sized>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::EntropySourceUnavailable,
            "operating system random source unavailable",
            e,
        )
    })
}

/// Return a fresh array of `N` random bytes.
pub fn random_array<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    fill(&mut out)?;
    Ok(out)
}
