// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `cmake -E server` child process and its pipe.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cmt_core::ProjectSettings;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;

use super::ServerError;

static PIPE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A running server process. Killed when dropped.
pub struct ServerProcess {
    child: Child,
    pipe: PathBuf,
}

impl ServerProcess {
    /// Spawn the server and connect to its pipe.
    #[cfg(unix)]
    pub async fn spawn(
        settings: &ProjectSettings,
    ) -> Result<(Self, tokio::net::UnixStream), ServerError> {
        let pipe = pipe_path();
        // Remove stale socket from a previous run
        let _ = std::fs::remove_file(&pipe);

        let mut cmd = tokio::process::Command::new(&settings.cmake_path);
        cmd.arg("-E")
            .arg("server")
            .arg("--experimental")
            .arg(format!("--pipe={}", pipe.display()))
            .envs(&settings.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = cmd.spawn().map_err(ServerError::Spawn)?;
        tracing::info!(
            project = %settings.name,
            pipe = %pipe.display(),
            pid = child.id(),
            "cmake server spawned"
        );

        forward_output(child.stdout.take(), settings.name.clone());
        forward_output(child.stderr.take(), settings.name.clone());

        let mut process = Self { child, pipe };
        let stream = process.connect().await?;
        Ok((process, stream))
    }

    #[cfg(not(unix))]
    pub async fn spawn(
        _settings: &ProjectSettings,
    ) -> Result<(Self, tokio::io::DuplexStream), ServerError> {
        Err(ServerError::Unsupported)
    }

    /// Connect to the pipe, retrying while the server starts up.
    #[cfg(unix)]
    async fn connect(&mut self) -> Result<tokio::net::UnixStream, ServerError> {
        let poll_ms: u64 =
            std::env::var("CMT_SERVER_POLL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(50);
        let max_attempts: usize = std::env::var("CMT_SERVER_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200); // 200 * 50ms = 10s default

        for i in 0..max_attempts {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(poll_ms)).await;
            }
            match tokio::net::UnixStream::connect(&self.pipe).await {
                Ok(stream) => {
                    tracing::info!(pipe = %self.pipe.display(), attempt = i, "connected to cmake server");
                    return Ok(stream);
                }
                Err(e) => {
                    if let Some(status) = self.child.try_wait().map_err(ServerError::Spawn)? {
                        return Err(ServerError::Exited(status.to_string()));
                    }
                    tracing::trace!(pipe = %self.pipe.display(), error = %e, "server pipe not ready");
                }
            }
        }
        tracing::error!(pipe = %self.pipe.display(), max_attempts, poll_ms, "cmake server never opened its pipe");
        Err(ServerError::ConnectTimeout(self.pipe.clone()))
    }

    pub fn pipe(&self) -> &Path {
        &self.pipe
    }

    /// Kill the process and wait for it to exit.
    pub async fn kill(mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "cmake server already gone");
        }
        match self.child.wait().await {
            Ok(status) => tracing::info!(%status, "cmake server exited"),
            Err(e) => tracing::warn!(error = %e, "failed to wait on cmake server"),
        }
        let _ = std::fs::remove_file(&self.pipe);
    }
}

fn pipe_path() -> PathBuf {
    let n = PIPE_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("cmt-server-{}-{}.sock", std::process::id(), n))
}

fn forward_output<R: AsyncRead + Unpin + Send + 'static>(reader: Option<R>, project: String) {
    let Some(reader) = reader else {
        return;
    };
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(%project, "cmake server: {}", line);
        }
    });
}
