//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Whether a usable `git` binary is on the PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A throwaway git repository with a work tree.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Self { dir };
        repo.git(&["init", "-q"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run git in the repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.dir.path())
            .args([
                "-c",
                "user.name=Mirror Test",
                "-c",
                "user.email=mirror@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
            ])
            .args(args)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write `name`, commit it, and return the commit id.
    pub fn commit_file(&self, name: &str, content: &[u8]) -> String {
        std::fs::write(self.dir.path().join(name), content).expect("Failed to write file");
        self.git(&["add", name]);
        self.git(&["commit", "-q", "-m", &format!("update {}", name)]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Write a file whose name is raw bytes, commit everything, and return
    /// the commit id.
    #[cfg(unix)]
    pub fn commit_raw_name(&self, name: &[u8], content: &[u8]) -> String {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::fs::write(self.dir.path().join(OsStr::from_bytes(name)), content)
            .expect("Failed to write file");
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", "add raw-named file"]);
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn tag_lightweight(&self, name: &str) {
        self.git(&["tag", name]);
    }

    pub fn tag_annotated(&self, name: &str, message: &str) {
        self.git(&["tag", "-a", name, "-m", message]);
    }

    pub fn delete_tag(&self, name: &str) {
        self.git(&["tag", "-d", name]);
    }
}
