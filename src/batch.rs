//! Batch encryption of a diary directory
//!
//! Turns every plaintext diary file in one directory into a sibling
//! envelope file under a single passphrase, then rewrites the manifest.
//! Files are processed strictly one after another.

use crate::error::{DiaryboxError, ErrorCategory, ErrorKind, Result};
use crate::file_ops::{self, read_error};
use crate::kdf::{self, DEFAULT_ITERATIONS};
use crate::manifest::{self, MANIFEST_FILE_NAME};
use crate::passphrase::{self, PassphraseReader};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory encrypted when none is given.
pub const DEFAULT_DIR: &str = "./diaries";

/// Extension that marks a file as plaintext diary input.
pub const PLAINTEXT_EXTENSION: &str = "txt";

/// Suffix appended to a plaintext file name to name its envelope.
pub const ENCRYPTED_SUFFIX: &str = ".enc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub dir: PathBuf,
    pub iterations: u32,
}

impl BatchConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DIR)
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// Names of the envelope files written, in processing order.
    pub encrypted: Vec<String>,
    /// Path of the manifest, or `None` when there was nothing to do.
    pub manifest: Option<PathBuf>,
}

/// Encrypt every plaintext file in `config.dir`.
///
/// The passphrase is requested twice from `reader` only once there is
/// something to encrypt; a mismatch aborts before any file is read or
/// written. The manifest is overwritten with exactly the names produced by
/// this run.
pub fn encrypt_directory(
    config: &BatchConfig,
    reader: &mut dyn PassphraseReader,
) -> Result<BatchReport> {
    kdf::check_iterations(i64::from(config.iterations))?;
    let dir = resolve_dir(&config.dir)?;

    let inputs = find_plaintext_files(&dir)?;
    if inputs.is_empty() {
        warn!(dir = %dir.display(), "no .txt files found; nothing to do");
        return Ok(BatchReport::default());
    }
    debug!(count = inputs.len(), iterations = config.iterations, "found plaintext files");

    let passphrase = passphrase::read_confirmed_passphrase(reader)?;

    let mut encrypted = Vec::with_capacity(inputs.len());
    for (input_path, name) in &inputs {
        let output_name = format!("{}{}", name, ENCRYPTED_SUFFIX);
        let output_path = dir.join(&output_name);
        file_ops::encrypt_file(input_path, &output_path, &passphrase, config.iterations)
            .map_err(|e| e.with_context(format!("failed to encrypt {}", input_path.display())))?;
        info!(file = %output_name, "encrypted");
        encrypted.push(output_name);
    }

    let manifest = manifest::build(encrypted.iter().cloned());
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    file_ops::write_atomic(&manifest_path, manifest.to_json()?.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write {}", manifest_path.display())))?;
    info!(path = %manifest_path.display(), files = manifest.files().len(), "manifest written");

    Ok(BatchReport {
        encrypted,
        manifest: Some(manifest_path),
    })
}

fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    let not_found = || {
        DiaryboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::DirectoryNotFound,
            format!("{} is not a directory", dir.display()),
        )
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(dir.to_path_buf()),
        Ok(_) => Err(not_found()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
        Err(e) => Err(read_error(dir, e)),
    }
}

/// List plaintext inputs directly inside `dir`, sorted by file name.
///
/// Only regular files named `*.txt` qualify. Symlinks are never followed,
/// so nothing outside `dir` can end up in the published set. Symlinks,
/// entries whose type cannot be read, and names that are not valid UTF-8
/// are skipped with a warning.
pub fn find_plaintext_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let entries = fs::read_dir(dir).map_err(|e| read_error(dir, e))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| read_error(dir, e))?;
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != PLAINTEXT_EXTENSION) {
            continue;
        }
        // Unlike fs::metadata, this does not traverse symlinks.
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if file_type.is_symlink() {
            warn!(path = %path.display(), "skipping symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };
        found.push((path, name));
    }
    found.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(found)
}
