#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};

/// Creates a `Command` for the `folio` binary with a clean environment that
/// points at the given document file.
pub fn base_folio_command(data_file: &Path) -> Command {
    let mut cmd = Command::cargo_bin("folio").expect("folio binary not built");
    configure_folio_command(&mut cmd, data_file);
    cmd
}

/// Applies the standard test environment to an existing `Command`.
pub fn configure_folio_command(cmd: &mut Command, data_file: &Path) {
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    if let Ok(tmpdir) = std::env::var("TMPDIR") {
        cmd.env("TMPDIR", tmpdir);
    }
    if let Some(home) = data_file.parent() {
        cmd.env("HOME", home);
    }
    cmd.env("FOLIO_DATA_FILE", data_file);
}

/// The document path used inside a test's temporary directory.
pub fn data_file_in(dir: &Path) -> PathBuf {
    dir.join("folio_data.json")
}

/// Reads the saved document as JSON.
pub fn read_document(data_file: &Path) -> serde_json::Value {
    let raw = std::fs::read_to_string(data_file).expect("read document");
    serde_json::from_str(&raw).expect("parse document")
}
