//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Writes an executable shell script standing in for `vsql`.
#[cfg(unix)]
pub fn fake_vsql(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("vsql");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// A fake `vsql` that prints each argument on its own line.
pub const ECHO_ARGS: &str = r#"for arg in "$@"; do printf '%s\n' "$arg"; done"#;

/// Decompresses a gzip file with the system `gzip`.
pub fn gunzip(path: &Path) -> String {
    let output = Command::new("gzip")
        .arg("-dc")
        .arg(path)
        .output()
        .expect("gzip should be installed");
    assert!(output.status.success(), "gzip -dc failed");
    String::from_utf8(output.stdout).unwrap()
}
