//! Diarybox - passphrase-derived encryption envelopes for diary text
//!
//! Plaintext diary files are sealed with AES-256-GCM under a key derived
//! from a passphrase with PBKDF2-HMAC-SHA256. Each sealed file is a
//! self-describing JSON envelope; a manifest lists the envelopes a viewer
//! should fetch.

#![forbid(unsafe_code)]

pub mod batch;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod logging;
pub mod manifest;
pub mod passphrase;
pub mod random;
pub mod secretcrypt;

pub use envelope::Envelope;
pub use error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
