//! CLI integration tests
//!
//! Tests the command-line interfaces end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const ITERATIONS: &str = "1000";

/// Run a binary, feeding `stdin` to it.
fn run_with_stdin(bin: &str, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("DIARYBOX_ITERATIONS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");

    {
        let child_stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., directory not found)
        let _ = child_stdin.write_all(stdin.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for binary")
}

fn run_diarybox(dir: &Path, passphrase_lines: &str) -> Output {
    run_with_stdin(
        env!("CARGO_BIN_EXE_diarybox"),
        &[
            "--passphrase-stdin",
            "--iterations",
            ITERATIONS,
            dir.to_str().unwrap(),
        ],
        passphrase_lines,
    )
}

fn run_open(file: &Path, passphrase: &str) -> Output {
    run_with_stdin(
        env!("CARGO_BIN_EXE_diarybox-open"),
        &["--passphrase-stdin", file.to_str().unwrap()],
        &format!("{}\n", passphrase),
    )
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_encrypt_then_open() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    fs::write(dir.join("1980.txt"), "Hello 1980").unwrap();
    fs::write(dir.join("1981.txt"), "Hello 1981").unwrap();

    let result = run_diarybox(dir, "correct-horse\ncorrect-horse\n");
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(
        file_names(dir),
        ["1980.txt", "1980.txt.enc", "1981.txt", "1981.txt.enc", "manifest.json"]
    );

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(
        manifest,
        serde_json::json!({"files": ["1980.txt.enc", "1981.txt.enc"]})
    );

    let result = run_open(&dir.join("1981.txt.enc"), "correct-horse");
    assert!(
        result.status.success(),
        "open failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&result.stdout), "Hello 1981");
}

#[test]
fn test_envelope_records_configured_iterations() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    fs::write(dir.join("1980.txt"), "Hello 1980").unwrap();

    let result = run_diarybox(dir, "pw\npw\n");
    assert!(result.status.success());

    let envelope: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("1980.txt.enc")).unwrap()).unwrap();
    assert_eq!(envelope["v"], 1);
    assert_eq!(envelope["kdf"], "PBKDF2-SHA256");
    assert_eq!(envelope["kdf_iter"], 1000);
}

#[test]
fn test_passphrase_mismatch_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    fs::write(dir.join("1980.txt"), "Hello 1980").unwrap();

    let result = run_diarybox(dir, "correct-horse\nwrong-pass\n");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("passphrases do not match"), "got: {}", stderr);
    assert!(!stderr.contains("correct-horse") && !stderr.contains("wrong-pass"));
    assert_eq!(file_names(dir), ["1980.txt"]);
}

#[test]
fn test_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("diaries");

    let result = run_diarybox(&missing, "pw\npw\n");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("is not a directory"), "got: {}", stderr);
    assert!(!missing.exists());
}

#[test]
fn test_empty_directory_is_success() {
    let temp_dir = TempDir::new().unwrap();

    let result = run_diarybox(temp_dir.path(), "");

    assert!(
        result.status.success(),
        "expected success: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert!(file_names(temp_dir.path()).is_empty());
}

#[test]
fn test_zero_iterations_rejected() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("1980.txt"), "Hello").unwrap();

    let result = run_with_stdin(
        env!("CARGO_BIN_EXE_diarybox"),
        &[
            "--passphrase-stdin",
            "--iterations",
            "0",
            temp_dir.path().to_str().unwrap(),
        ],
        "pw\npw\n",
    );

    assert!(!result.status.success());
    assert_eq!(file_names(temp_dir.path()), ["1980.txt"]);
}

/// Decrypt known ciphertext produced by an independent implementation.
#[test]
fn test_open_known_ciphertext() {
    let result = run_open(&testdata_path("hello.txt.enc"), "test");

    assert!(
        result.status.success(),
        "open failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let expected = fs::read_to_string(testdata_path("hello.txt")).unwrap();
    assert_eq!(String::from_utf8_lossy(&result.stdout), expected);
}

/// An envelope without `kdf` or `kdf_iter` uses the legacy iteration count.
#[test]
fn test_open_legacy_envelope() {
    let result = run_open(&testdata_path("legacy.txt.enc"), "test");

    assert!(
        result.status.success(),
        "open failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&result.stdout), "Legacy entry\n");
}

#[test]
fn test_wrong_passphrase_and_tampering_look_identical() {
    let temp_dir = TempDir::new().unwrap();

    let wrong = run_open(&testdata_path("hello.txt.enc"), "not-test");
    assert!(!wrong.status.success());
    assert!(wrong.stdout.is_empty());

    let mut envelope: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(testdata_path("hello.txt.enc")).unwrap()).unwrap();
    let ct = envelope["ct"].as_str().unwrap().to_string();
    let flipped = if ct.starts_with('A') { "B" } else { "A" };
    envelope["ct"] = serde_json::Value::String(format!("{}{}", flipped, &ct[1..]));
    let tampered_path = temp_dir.path().join("tampered.txt.enc");
    fs::write(&tampered_path, envelope.to_string()).unwrap();

    let tampered = run_open(&tampered_path, "test");
    assert!(!tampered.status.success());
    assert!(tampered.stdout.is_empty());

    let wrong_stderr = String::from_utf8_lossy(&wrong.stderr);
    let tampered_stderr = String::from_utf8_lossy(&tampered.stderr);
    assert!(wrong_stderr.contains("corrupt input, tampered-with data, or bad passphrase"));
    assert_eq!(
        wrong_stderr.replace(testdata_path("hello.txt.enc").to_str().unwrap(), "FILE"),
        tampered_stderr.replace(tampered_path.to_str().unwrap(), "FILE")
    );
}

#[test]
fn test_open_future_version_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("future.txt.enc");
    fs::write(&path, r#"{"v":2,"kdf":"argon2id","blob":"AAAA"}"#).unwrap();

    let result = run_open(&path, "test");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("unsupported envelope version 2"), "got: {}", stderr);
}

#[test]
fn test_open_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = run_open(&temp_dir.path().join("nonexistent.enc"), "test");
    assert!(!result.status.success());
    assert!(result.stdout.is_empty());
}
