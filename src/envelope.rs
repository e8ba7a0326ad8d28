//! Versioned envelope package
//!
//! An envelope is the unit of ciphertext at rest. It is serialized as a
//! single JSON object whose byte fields are standard base64 (with padding):
//!
//! ```text
//! {"v":1,"kdf":"PBKDF2-SHA256","kdf_iter":600000,"salt":"…","iv":"…","ct":"…"}
//! ```
//!
//! Parsing is strict and fails closed. The version gate runs before
//! anything else is looked at, so a future version is always reported as
//! such even if its other fields would not parse today.

use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, KDF_NAME, LEGACY_DEFAULT_ITERATIONS, SALT_LEN};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// The only envelope version this crate reads or writes.
pub const ENVELOPE_VERSION: u64 = 1;

/// Length of the AES-GCM nonce in bytes
pub const IV_LEN: usize = 12;

/// Length of the AES-GCM authentication tag appended to the ciphertext
pub const TAG_LEN: usize = 16;

/// A parsed, validated envelope.
///
/// Fields are private: an envelope is never patched after it is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    kdf_iterations: u32,
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

#[derive(Serialize)]
struct WireOut<'a> {
    v: u64,
    kdf: &'a str,
    kdf_iter: u32,
    salt: String,
    iv: String,
    ct: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireIn {
    #[allow(dead_code)]
    v: Value,
    #[serde(default)]
    kdf: Option<String>,
    #[serde(default)]
    kdf_iter: Option<Number>,
    #[serde(default)]
    salt: Option<String>,
    #[serde(default)]
    iv: Option<String>,
    #[serde(default)]
    ct: Option<String>,
}

impl Envelope {
    pub(crate) fn new(
        kdf_iterations: u32,
        salt: [u8; SALT_LEN],
        iv: [u8; IV_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            kdf_iterations,
            salt,
            iv,
            ciphertext,
        }
    }

    pub fn version(&self) -> u64 {
        ENVELOPE_VERSION
    }

    pub fn kdf_name(&self) -> &'static str {
        KDF_NAME
    }

    /// Iteration count the key for this envelope was derived with.
    pub fn kdf_iterations(&self) -> u32 {
        self.kdf_iterations
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Ciphertext with the authentication tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Serialize to the compact JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        let wire = WireOut {
            v: ENVELOPE_VERSION,
            kdf: KDF_NAME,
            kdf_iter: self.kdf_iterations,
            salt: STANDARD.encode(self.salt),
            iv: STANDARD.encode(self.iv),
            ct: STANDARD.encode(&self.ciphertext),
        };
        serde_json::to_string(&wire).map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "failed to serialize envelope",
                e,
            )
        })
    }

    /// Parse an envelope from its serialized JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::MalformedPackage,
                "envelope is not valid JSON",
                e,
            )
        })?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON document as an envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(DiaryboxError::malformed("envelope is not a JSON object"));
        };

        match object.get("v") {
            None | Some(Value::Null) => {
                return Err(DiaryboxError::malformed("envelope has no version field"));
            }
            Some(v) if v.as_u64() == Some(ENVELOPE_VERSION) => {}
            Some(v) => {
                return Err(DiaryboxError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::UnsupportedVersion,
                    format!("unsupported envelope version {}", v),
                ));
            }
        }

        let wire: WireIn = serde_json::from_value(value).map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::MalformedPackage,
                format!("invalid envelope: {}", e),
                e,
            )
        })?;

        let (Some(salt), Some(iv), Some(ct)) = (wire.salt, wire.iv, wire.ct) else {
            return Err(DiaryboxError::malformed(
                "envelope is missing one of the salt, iv or ct fields",
            ));
        };

        if let Some(name) = wire.kdf {
            if name != KDF_NAME {
                return Err(DiaryboxError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::UnsupportedKdf,
                    format!("unsupported key derivation function {:?}", name),
                ));
            }
        }

        let kdf_iterations = match wire.kdf_iter {
            None => LEGACY_DEFAULT_ITERATIONS,
            Some(n) => parse_iterations(&n)?,
        };

        let salt: [u8; SALT_LEN] = decode_fixed("salt", &salt)?;
        let iv: [u8; IV_LEN] = decode_fixed("iv", &iv)?;
        let ciphertext = decode_field("ct", &ct)?;
        if ciphertext.len() < TAG_LEN {
            return Err(DiaryboxError::malformed(format!(
                "ct is {} bytes, shorter than the {}-byte authentication tag",
                ciphertext.len(),
                TAG_LEN
            )));
        }

        Ok(Self::new(kdf_iterations, salt, iv, ciphertext))
    }
}

impl TryFrom<Value> for Envelope {
    type Error = DiaryboxError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

fn parse_iterations(n: &Number) -> Result<u32> {
    match (n.as_i64(), n.as_u64()) {
        (Some(i), _) => kdf::check_iterations(i),
        (None, Some(_)) => Err(DiaryboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidIterationCount,
            format!("iteration count {} is too large", n),
        )),
        _ => Err(DiaryboxError::malformed(format!(
            "kdf_iter must be an integer (got {})",
            n
        ))),
    }
}

fn decode_field(name: &str, encoded: &str) -> Result<Vec<u8>> {
    STANDARD.decode(encoded).map_err(|e| {
        DiaryboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedPackage,
            format!("base64 decoding of {} failed: {}", name, e),
            e,
        )
    })
}

fn decode_fixed<const N: usize>(name: &str, encoded: &str) -> Result<[u8; N]> {
    let bytes = decode_field(name, encoded)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        DiaryboxError::malformed(format!("{} must be {} bytes (got {})", name, N, len))
    })
}
