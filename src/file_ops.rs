//! File encryption/decryption operations
//!
//! This module provides the file-level building blocks used by the batch
//! tool and by the decrypting consumer: encrypt one file into an envelope
//! file, read and decrypt one envelope file, and replace a file atomically.

use crate::envelope::Envelope;
use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::SessionSecret;
use crate::secretcrypt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Encrypt a file with a passphrase
///
/// Reads plaintext from `input_path`, encrypts it with `iterations` rounds of
/// key derivation, and atomically writes the serialized envelope to
/// `output_path`. The input file is never modified.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase: &[u8],
    iterations: u32,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let envelope = secretcrypt::encrypt(&plaintext, passphrase, iterations)
        .map_err(|e| e.with_context("encryption failed"))?;
    let serialized = envelope.to_json()?;
    write_atomic(output_path, serialized.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    Ok(())
}

/// Read and parse an envelope file without decrypting it.
pub fn read_envelope(path: &Path) -> Result<Envelope> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedPackage,
            "envelope file is not valid UTF-8",
            e,
        )
    })?;
    Envelope::from_json(&text)
}

/// Decrypt an envelope file with the passphrase held by a session
///
/// Returns the plaintext as text. The passphrase is borrowed from `session`
/// for the duration of the call only.
pub fn decrypt_file(input_path: &Path, session: &mut SessionSecret) -> Result<String> {
    let envelope = read_envelope(input_path)
        .map_err(|e| e.with_context(format!("failed to read {}", input_path.display())))?;
    let plaintext = secretcrypt::decrypt(&envelope, session.get()?)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    String::from_utf8(plaintext).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8,
            "decrypted plaintext is not valid UTF-8",
            e,
        )
    })
}

/// Replace `path` with `contents` atomically (tempfile + fsync + rename)
///
/// Either the old file or the complete new file exists afterwards, never a
/// partial one. On Unix the result is mode 0o644: artifacts are published
/// by a static web server and must be world-readable.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| {
                DiaryboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

pub(crate) fn read_error(path: &Path, err: io::Error) -> DiaryboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    DiaryboxError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
