// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot cmake invocations (`--build` and file-API configure).
//!
//! Output is read line by line from both pipes while the process runs and
//! forwarded to an [`OutputSink`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use cmt_core::ProjectSettings;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with code {code}")]
    Failed { program: String, code: i32 },
    #[error("{program} terminated by signal {signal}")]
    Signaled { program: String, signal: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

cmt_core::simple_display! {
    OutputStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Receives process output one line at a time.
pub trait OutputSink: Send + Sync {
    fn line(&self, source: &str, stream: OutputStream, line: &str);
}

/// Default sink: stdout lines at info, stderr lines at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, source: &str, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => tracing::info!(%source, "{}", line),
            OutputStream::Stderr => tracing::warn!(%source, "{}", line),
        }
    }
}

/// A process to run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited environment
    pub env: HashMap<String, String>,
    /// Name passed to the sink with each line
    pub label: String,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            label: program.clone(),
            program,
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    cmt_core::setters! {
        into {
            label: String,
        }
        set {
            env: HashMap<String, String>,
        }
        option {
            cwd: PathBuf,
        }
    }
}

/// `cmake --build <dir> --config <type> [--target <t>]`
pub fn build_command(settings: &ProjectSettings, target: Option<&str>) -> ProcessSpec {
    let mut spec = ProcessSpec::new(&settings.cmake_path)
        .arg("--build")
        .arg(settings.build_directory.display().to_string())
        .arg("--config")
        .arg(&settings.build_type);
    if let Some(target) = target {
        spec = spec.arg("--target").arg(target);
    }
    spec.cwd(settings.build_directory.clone())
        .env(settings.environment.clone())
        .label(settings.name.clone())
}

/// `cmake -S <src> -B <build> -G <generator> ... -DCMAKE_BUILD_TYPE=<type> -D<k>=<v>...`
pub fn configure_command(settings: &ProjectSettings, extra_args: &[String]) -> ProcessSpec {
    let mut spec = ProcessSpec::new(&settings.cmake_path)
        .arg("-S")
        .arg(settings.source_directory.display().to_string())
        .arg("-B")
        .arg(settings.build_directory.display().to_string())
        .arg("-G")
        .arg(&settings.generator);
    if let Some(platform) = &settings.platform {
        spec = spec.arg("-A").arg(platform);
    }
    if let Some(toolset) = &settings.toolset {
        spec = spec.arg("-T").arg(toolset);
    }
    spec.arg(format!("-DCMAKE_BUILD_TYPE={}", settings.build_type))
        .args(settings.cache_arguments())
        .args(extra_args.iter().cloned())
        .cwd(settings.source_directory.clone())
        .env(settings.environment.clone())
        .label(settings.name.clone())
}

/// Runs processes and streams their output to a sink.
#[derive(Clone)]
pub struct BuildRunner {
    sink: Arc<dyn OutputSink>,
}

impl BuildRunner {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    /// Run `spec` to completion.
    ///
    /// Succeeds only when the process exits with code 0. A process killed by
    /// a signal is a failure regardless of its exit code.
    pub async fn run(&self, spec: &ProcessSpec) -> Result<(), BuildError> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        tracing::info!(program = %spec.program, args = ?spec.args, label = %spec.label, "spawning process");
        let mut child = cmd
            .spawn()
            .map_err(|source| BuildError::Spawn { program: spec.program.clone(), source })?;

        let sink = self.sink.as_ref();
        let stdout = forward_lines(child.stdout.take(), OutputStream::Stdout, sink, &spec.label);
        let stderr = forward_lines(child.stderr.take(), OutputStream::Stderr, sink, &spec.label);
        let (stdout, stderr, status) = tokio::join!(stdout, stderr, child.wait());
        stdout?;
        stderr?;
        let status = status?;
        tracing::info!(program = %spec.program, %status, "process exited");
        check_status(&spec.program, status)
    }

    pub async fn build(
        &self,
        settings: &ProjectSettings,
        target: Option<&str>,
    ) -> Result<(), BuildError> {
        self.run(&build_command(settings, target)).await
    }

    pub async fn configure(
        &self,
        settings: &ProjectSettings,
        extra_args: &[String],
    ) -> Result<(), BuildError> {
        self.run(&configure_command(settings, extra_args)).await
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(
    reader: Option<R>,
    stream: OutputStream,
    sink: &dyn OutputSink,
    source: &str,
) -> std::io::Result<()> {
    let Some(reader) = reader else {
        return Ok(());
    };
    let mut lines = BufReader::new(reader).split(b'\n');
    while let Some(line) = lines.next_segment().await? {
        let line = String::from_utf8_lossy(&line);
        sink.line(source, stream, line.trim_end_matches('\r'));
    }
    Ok(())
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), BuildError> {
    if let Some(signal) = termination_signal(&status) {
        return Err(BuildError::Signaled { program: program.to_string(), signal });
    }
    match status.code() {
        Some(0) => Ok(()),
        code => Err(BuildError::Failed { program: program.to_string(), code: code.unwrap_or(-1) }),
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    let number = status.signal()?;
    Some(match nix::sys::signal::Signal::try_from(number) {
        Ok(signal) => signal.as_str().to_string(),
        Err(_) => number.to_string(),
    })
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<String> {
    None
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{OutputSink, OutputStream};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct OutputLine {
        pub source: String,
        pub stream: OutputStream,
        pub line: String,
    }

    /// Sink that keeps every line it receives
    #[derive(Clone, Default)]
    pub struct FakeSink {
        lines: Arc<Mutex<Vec<OutputLine>>>,
    }

    impl FakeSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<OutputLine> {
            self.lines.lock().clone()
        }

        /// Text of the lines written to one stream
        pub fn text(&self, stream: OutputStream) -> Vec<String> {
            self.lines.lock().iter().filter(|l| l.stream == stream).map(|l| l.line.clone()).collect()
        }
    }

    impl OutputSink for FakeSink {
        fn line(&self, source: &str, stream: OutputStream, line: &str) {
            self.lines.lock().push(OutputLine {
                source: source.to_string(),
                stream,
                line: line.to_string(),
            });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSink, OutputLine};

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
