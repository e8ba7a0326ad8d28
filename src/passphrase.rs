//! Passphrase reading functionality

use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use std::io::{self, BufRead, IsTerminal, Write};
use std::time::{Duration, Instant};
use zeroize::Zeroizing;

pub const PROMPT: &str = "Passphrase: ";
pub const CONFIRM_PROMPT: &str = "Confirm passphrase: ";

/// Trait for reading passphrases from various sources
pub trait PassphraseReader {
    /// Read a passphrase as arbitrary bytes (not necessarily UTF-8)
    ///
    /// `prompt` is shown to the user by interactive readers and ignored by
    /// the others. Returns the passphrase wrapped in `Zeroizing` to ensure it
    /// is securely wiped from memory when dropped.
    fn read_passphrase(&mut self, prompt: &str) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed passphrase (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self, _prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads one passphrase per line from any buffered source
///
/// Each call consumes one line; the trailing `\n` or `\r\n` is stripped.
/// Used for `--passphrase-stdin`, where the passphrase and its confirmation
/// arrive as two consecutive lines.
pub struct LinePassphraseReader {
    reader: Box<dyn BufRead>,
}

impl LinePassphraseReader {
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for LinePassphraseReader {
    fn read_passphrase(&mut self, _prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mut line = Zeroizing::new(Vec::new());
        let n = self.reader.read_until(b'\n', &mut line).map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading passphrase: {}", e),
                e,
            )
        })?;
        if n == 0 {
            return Err(DiaryboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "end of input reached before a passphrase was read",
            ));
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// Reads passphrase from terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read passphrase from terminal.
    ///
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    /// For non-UTF-8 passphrases, use --passphrase-stdin instead.
    fn read_passphrase(&mut self, prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(DiaryboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(prompt.as_bytes())
            .and_then(|_| stderr.flush())
            .map_err(|e| {
                DiaryboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // Read password *without echo*
        let passphrase = Zeroizing::new(rpassword::read_password().map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?);

        Ok(Zeroizing::new(passphrase.as_bytes().to_vec()))
    }
}

/// Ask for the passphrase twice and return it only if both entries match.
pub fn read_confirmed_passphrase(
    reader: &mut dyn PassphraseReader,
) -> Result<Zeroizing<Vec<u8>>> {
    let first = reader.read_passphrase(PROMPT)?;
    let second = reader.read_passphrase(CONFIRM_PROMPT)?;
    if *first != *second {
        return Err(DiaryboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphraseMismatch,
            "passphrases do not match",
        ));
    }
    Ok(first)
}

/// Holds a passphrase for the lifetime of a viewing session.
///
/// The secret lives only in process memory, is wiped on `clear()` or drop,
/// and optionally expires after a fixed time-to-live. Once cleared or
/// expired it cannot be read again; the caller must ask the user anew.
pub struct SessionSecret {
    secret: Option<Zeroizing<Vec<u8>>>,
    expires_at: Option<Instant>,
}

impl SessionSecret {
    /// A secret that lives until cleared or dropped.
    pub fn new(passphrase: Zeroizing<Vec<u8>>) -> Self {
        Self {
            secret: Some(passphrase),
            expires_at: None,
        }
    }

    /// A secret that additionally expires `ttl` after creation. A `ttl` too
    /// large to represent as a deadline never expires.
    pub fn with_ttl(passphrase: Zeroizing<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: Some(passphrase),
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// Returns the passphrase, wiping it first if it has expired.
    pub fn get(&mut self) -> Result<&[u8]> {
        if self.expires_at.is_some_and(|deadline| Instant::now() >= deadline) {
            self.clear();
        }
        match &self.secret {
            Some(secret) => Ok(secret.as_slice()),
            None => Err(DiaryboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "session passphrase has been cleared or has expired",
            )),
        }
    }

    /// Wipe the passphrase immediately.
    pub fn clear(&mut self) {
        self.secret = None;
        self.expires_at = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.secret.is_none()
    }
}
