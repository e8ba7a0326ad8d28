//! Manifest of encrypted artifacts
//!
//! The manifest is what the viewer fetches to discover which envelopes
//! exist. It is rebuilt from scratch on every batch run and overwrites the
//! previous one; names from earlier runs that are not in the current set
//! are dropped.

use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// File name of the manifest inside the target directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    files: Vec<String>,
}

/// Build a manifest from output file names in any order.
///
/// Names are sorted lexicographically (by byte value) and de-duplicated.
pub fn build<I, S>(file_names: I) -> Manifest
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut files: Vec<String> = file_names.into_iter().map(Into::into).collect();
    files.sort();
    files.dedup();
    Manifest { files }
}

impl Manifest {
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Serialize as pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self).map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "failed to serialize manifest",
                e,
            )
        })?;
        out.push('\n');
        Ok(out)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::MalformedPackage,
                format!("invalid manifest: {}", e),
                e,
            )
        })
    }
}
