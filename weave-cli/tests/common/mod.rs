//! Shared testing utilities for weave CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated working directory for CLI runs.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    work_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create test work directory");
        Self { root, work_dir }
    }

    /// Directory CLI invocations run in.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Default memory directory relative to the work directory.
    pub fn memory_dir(&self) -> PathBuf {
        self.work_dir.join(".github/agents/memory")
    }

    /// Command for the compiled `weave` binary with provider variables cleared.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("weave").expect("Failed to locate weave binary");
        cmd.current_dir(self.work_dir())
            .env_remove("OPENAI_API_KEY")
            .env_remove("OPENAI_BASE_URL")
            .env_remove("OPENAI_MODEL")
            .env_remove("WEAVE_CONFIG_PATH")
            .env("RUST_LOG", "warn");
        cmd
    }
}
