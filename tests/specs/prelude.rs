// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI specs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// `cmt` with colors off and logging quiet, run from the current directory.
pub fn cli() -> CliBuilder {
    CliBuilder::new(None)
}

/// Scratch workspace holding a `cmt.toml` and any source trees a spec needs.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn empty() -> Self {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => panic!("failed to create temp dir: {}", e),
        };
        Self { dir }
    }

    /// Workspace with `cmt.toml` already written.
    pub fn with_config(config: &str) -> Self {
        let ws = Self::empty();
        ws.file("cmt.toml", config);
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("cmt.toml")
    }

    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir {:?}: {}", parent, e));
        }
        std::fs::write(&path, contents).unwrap_or_else(|e| panic!("write {:?}: {}", path, e));
    }

    /// `cmt` running inside the workspace, so `cmt.toml` is found by default.
    pub fn cmt(&self) -> CliBuilder {
        CliBuilder::new(Some(self.path().to_path_buf()))
    }
}

pub struct CliBuilder {
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CliBuilder {
    fn new(cwd: Option<PathBuf>) -> Self {
        Self { args: Vec::new(), cwd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = match Command::cargo_bin("cmt") {
            Ok(cmd) => cmd,
            Err(e) => panic!("cmt binary not built: {}", e),
        };
        cmd.args(&self.args).env("NO_COLOR", "1").env_remove("COLOR").env_remove("CMT_LOG");
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn output(&self) -> RunAssert {
        let output = match self.command().output() {
            Ok(output) => output,
            Err(e) => panic!("failed to run cmt: {}", e),
        };
        RunAssert {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        }
    }

    /// Run and assert exit code 0.
    pub fn passes(self) -> RunAssert {
        let run = self.output();
        assert_eq!(run.code, Some(0), "expected success\nstdout:\n{}\nstderr:\n{}", run.stdout, run.stderr);
        run
    }

    /// Run and assert a specific non-zero exit code.
    pub fn exits_with(self, code: i32) -> RunAssert {
        let run = self.output();
        assert_eq!(
            run.code,
            Some(code),
            "unexpected exit code\nstdout:\n{}\nstderr:\n{}",
            run.stdout,
            run.stderr
        );
        run
    }
}

pub struct RunAssert {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl RunAssert {
    pub fn stdout_eq(self, expected: &str) -> Self {
        assert_eq!(self.stdout, expected, "stdout mismatch");
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {:?}:\n{}", needle, self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {:?}:\n{}", needle, self.stderr);
        self
    }

    pub fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({}):\n{}", e, self.stdout))
    }
}
