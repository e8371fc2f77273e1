#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.path().join(".weblodge.json")
    }

    pub fn write_state(&self, content: &str) {
        fs::write(self.state_path(), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn read_state(&self) -> Option<String> {
        fs::read_to_string(self.state_path()).ok()
    }

    #[allow(dead_code)]
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// `weblodge` running inside the project, isolated from the caller's environment
    pub fn weblodge(&self) -> Command {
        let mut cmd = Command::cargo_bin("weblodge").unwrap();
        cmd.current_dir(self.root.path())
            .env_remove("WEBLODGE_CONFIG_FILE")
            .env_remove("RUST_LOG");
        cmd
    }
}
