//! Common test utilities for cairn integration tests.
//!
//! Provides `TestEnv` for isolated data directories that don't touch the
//! user's real cairn data.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with an isolated data directory.
///
/// The `cairn()` method returns a `Command` that sets `CAIRN_DATA_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize cairn.
    pub fn init() -> Self {
        let env = Self::new();
        env.cairn().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the cairn binary with isolated data directory.
    pub fn cairn(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cairn"));
        cmd.env("CAIRN_DATA_DIR", self.data_dir.path());
        cmd
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Run a command, assert success, and return the first `"id"` value
    /// from its JSON output.
    pub fn run_for_id(&self, args: &[&str]) -> String {
        let output = self.cairn().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "command failed: {:?}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        extract_id(&output)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the first `"id"` value out of a command's JSON stdout.
pub fn extract_id(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split("\"id\":\"")
        .nth(1)
        .expect("no id in output")
        .split('"')
        .next()
        .unwrap()
        .to_string()
}
