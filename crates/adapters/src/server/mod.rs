// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CMake server protocol client.
//!
//! ```text
//! Stopped ─attach─▶ Connected ─hello/handshake─▶ Running ─configure─▶ Configured ─generate─▶ Generated
//!    ▲                                                                                      │
//!    └──────────────────────────────── dispose / restart ───────────────────────────────────┘
//! ```
//!
//! `configure` and `generate` called before `Running` do nothing and send
//! nothing. Callers fire these without checking the state first.

mod codemodel;
mod process;

pub use process::ServerProcess;

use std::sync::Arc;

use async_trait::async_trait;
use cmt_core::{CacheMap, CodeModel, ProjectSettings};
use cmt_wire::{Hello, Message, NotificationKind, Signal};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, watch};

use crate::build::{BuildRunner, OutputSink};
use crate::connection::{ConnectionError, FramedConnection, PendingReply, ReplyPayload};
use crate::driver::{Driver, DriverError, ModelChannel};

const SIGNAL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("malformed {kind} reply: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("server offered no protocol version")]
    NoProtocolVersion,
    #[error("connection closed before hello")]
    NoHello,
    #[error("failed to start cmake server: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("cmake server exited during startup: {0}")]
    Exited(String),
    #[error("timed out connecting to {}", .0.display())]
    ConnectTimeout(std::path::PathBuf),
    #[error("cmake server pipes are not supported on this platform")]
    Unsupported,
}

/// Connection lifecycle. Ordered: a state satisfies every requirement of
/// the states before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerState {
    Stopped,
    Connected,
    Running,
    Configured,
    Generated,
}

cmt_core::simple_display! {
    ServerState {
        Stopped => "stopped",
        Connected => "connected",
        Running => "running",
        Configured => "configured",
        Generated => "generated",
    }
}

pub struct ServerClient {
    settings: ProjectSettings,
    state: ServerState,
    connection: Option<FramedConnection>,
    hello: Option<mpsc::UnboundedReceiver<Hello>>,
    process: Option<ServerProcess>,
    cache: CacheMap,
    models: ModelChannel,
    signals: broadcast::Sender<Signal>,
}

impl ServerClient {
    pub fn new(settings: ProjectSettings) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            settings,
            state: ServerState::Stopped,
            connection: None,
            hello: None,
            process: None,
            cache: CacheMap::new(),
            models: ModelChannel::new(),
            signals,
        }
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn cache(&self) -> &CacheMap {
        &self.cache
    }

    pub fn code_model(&self) -> Option<Arc<CodeModel>> {
        self.models.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CodeModel>>> {
        self.models.subscribe()
    }

    /// Server `signal` notifications (`dirty`, `fileChange`, ...).
    pub fn signals(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Spawn `cmake -E server` and attach to its pipe.
    pub async fn spawn(&mut self) -> Result<(), ServerError> {
        let (process, stream) = ServerProcess::spawn(&self.settings).await?;
        let (reader, writer) = tokio::io::split(stream);
        self.process = Some(process);
        self.attach(reader, writer);
        Ok(())
    }

    /// Attach to an already connected byte stream: `Stopped → Connected`.
    pub fn attach<R, W>(&mut self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let connection = FramedConnection::new(reader, writer);
        let project = self.settings.name.clone();

        let (hello_tx, hello_rx) = mpsc::unbounded_channel();
        connection.on_notification(NotificationKind::Hello, move |message| {
            if let Message::Hello(hello) = message {
                let _ = hello_tx.send(hello);
            }
        });

        let p = project.clone();
        connection.on_notification(NotificationKind::Progress, move |message| {
            if let Message::Progress(progress) = message {
                tracing::debug!(
                    project = %p,
                    in_reply_to = %progress.in_reply_to,
                    current = progress.progress_current,
                    maximum = progress.progress_maximum,
                    "{}",
                    progress.progress_message
                );
            }
        });

        let p = project.clone();
        connection.on_notification(NotificationKind::Message, move |message| {
            if let Message::Message(notice) = message {
                match notice.title {
                    Some(title) => tracing::info!(project = %p, %title, "{}", notice.message),
                    None => tracing::info!(project = %p, "{}", notice.message),
                }
            }
        });

        let signals = self.signals.clone();
        connection.on_notification(NotificationKind::Signal, move |message| {
            if let Message::Signal(signal) = message {
                tracing::info!(project = %project, signal = %signal.name, "server signal");
                let _ = signals.send(signal);
            }
        });

        connection.listen();
        self.connection = Some(connection);
        self.hello = Some(hello_rx);
        self.transition(ServerState::Connected);
    }

    /// Wait for `hello`, handshake, then generate: `Connected → Running → Generated`.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Connected {
            tracing::debug!(state = %self.state, "start ignored: not connected");
            return Ok(());
        }
        let hello = match self.hello.as_mut() {
            Some(rx) => rx.recv().await.ok_or(ServerError::NoHello)?,
            None => return Err(ServerError::NoHello),
        };
        self.handshake(hello).await?;
        self.transition(ServerState::Running);
        self.generate().await
    }

    async fn handshake(&mut self, hello: Hello) -> Result<(), ServerError> {
        let version =
            hello.supported_protocol_versions.first().ok_or(ServerError::NoProtocolVersion)?;
        tracing::info!(
            project = %self.settings.name,
            major = version.major,
            minor = version.minor,
            "handshake"
        );
        let params = self.handshake_params(version.major, version.minor);
        self.request("handshake", params)?.await?;
        Ok(())
    }

    fn handshake_params(&self, major: u32, minor: u32) -> ReplyPayload {
        let settings = &self.settings;
        let mut params = Map::new();
        params.insert("protocolVersion".into(), json!({ "major": major, "minor": minor }));
        params.insert("sourceDirectory".into(), path_value(&settings.source_directory));
        params.insert("buildDirectory".into(), path_value(&settings.build_directory));
        params.insert("generator".into(), Value::String(settings.generator.clone()));
        for (key, value) in [
            ("extraGenerator", &settings.extra_generator),
            ("platform", &settings.platform),
            ("toolset", &settings.toolset),
        ] {
            if let Some(value) = value {
                params.insert(key.into(), Value::String(value.clone()));
            }
        }
        params
    }

    /// Send `configure` with cache arguments, then refresh the cache.
    pub async fn configure(&mut self, extra_args: &[String]) -> Result<(), ServerError> {
        if self.state < ServerState::Running {
            tracing::debug!(state = %self.state, "configure ignored: server not running");
            return Ok(());
        }
        let mut arguments = vec![format!("-DCMAKE_BUILD_TYPE={}", self.settings.build_type)];
        arguments.extend(self.settings.cache_arguments());
        arguments.extend(extra_args.iter().cloned());

        let mut params = Map::new();
        params.insert("cacheArguments".into(), json!(arguments));
        self.request("configure", params)?.await?;
        self.transition(self.state.max(ServerState::Configured));

        let reply = self.request("cache", Map::new())?.await?;
        self.cache = codemodel::cache_from_reply(reply)?;
        Ok(())
    }

    /// `compute` then `codemodel`; publishes a fresh model.
    ///
    /// A server that is `Running` but never configured is configured first.
    pub async fn generate(&mut self) -> Result<(), ServerError> {
        if self.state < ServerState::Running {
            tracing::debug!(state = %self.state, "generate ignored: server not running");
            return Ok(());
        }
        if self.state == ServerState::Running {
            self.configure(&[]).await?;
        }
        self.request("compute", Map::new())?.await?;
        let reply = self.request("codemodel", Map::new())?.await?;
        let model = codemodel::code_model_from_reply(reply)?;
        tracing::info!(
            project = %self.settings.name,
            projects = model.projects.len(),
            "code model updated"
        );
        self.models.publish(model);
        self.transition(ServerState::Generated);
        Ok(())
    }

    /// Drop the connection and kill the process: back to `Stopped`.
    pub async fn dispose(&mut self) {
        self.connection = None;
        self.hello = None;
        if let Some(process) = self.process.take() {
            process.kill().await;
        }
        self.transition(ServerState::Stopped);
    }

    /// Kill the server, wait for it to exit, then spawn and start a new one.
    pub async fn restart(&mut self) -> Result<(), ServerError> {
        tracing::info!(project = %self.settings.name, "restarting cmake server");
        self.dispose().await;
        self.spawn().await?;
        self.start().await
    }

    fn request(&self, kind: &str, params: ReplyPayload) -> Result<PendingReply, ServerError> {
        let connection = self.connection.as_ref().ok_or(ConnectionError::Closed)?;
        Ok(connection.send(kind, params))
    }

    fn transition(&mut self, state: ServerState) {
        if self.state != state {
            tracing::debug!(project = %self.settings.name, from = %self.state, to = %state, "server state");
            self.state = state;
        }
    }
}

fn path_value(path: &std::path::Path) -> Value {
    Value::String(path.display().to_string())
}

/// [`Driver`] over the server protocol. Spawns the server on first use.
pub struct ServerDriver {
    client: ServerClient,
    runner: BuildRunner,
}

impl ServerDriver {
    pub fn new(settings: ProjectSettings, sink: Arc<dyn OutputSink>) -> Self {
        Self { client: ServerClient::new(settings), runner: BuildRunner::new(sink) }
    }

    pub fn client(&self) -> &ServerClient {
        &self.client
    }

    pub fn signals(&self) -> broadcast::Receiver<Signal> {
        self.client.signals()
    }

    pub async fn restart(&mut self) -> Result<(), ServerError> {
        self.client.restart().await
    }

    /// Returns `true` when this call started the server, which also generates.
    ///
    /// A server that fails to start is disposed, so the next call spawns a
    /// fresh one instead of stopping at the `Connected` guard.
    async fn ensure_started(&mut self) -> Result<bool, ServerError> {
        match self.client.state() {
            ServerState::Stopped => self.client.spawn().await?,
            ServerState::Connected => {}
            _ => return Ok(false),
        }
        if let Err(e) = self.client.start().await {
            tracing::warn!(project = %self.client.settings().name, error = %e, "cmake server failed to start");
            self.client.dispose().await;
            return Err(e);
        }
        Ok(true)
    }
}

#[async_trait]
impl Driver for ServerDriver {
    fn settings(&self) -> &ProjectSettings {
        self.client.settings()
    }

    async fn configure(&mut self, extra_args: &[String]) -> Result<(), DriverError> {
        self.ensure_started().await?;
        Ok(self.client.configure(extra_args).await?)
    }

    async fn generate(&mut self) -> Result<(), DriverError> {
        if !self.ensure_started().await? {
            self.client.generate().await?;
        }
        Ok(())
    }

    async fn build(&mut self, target: Option<&str>) -> Result<(), DriverError> {
        Ok(self.runner.build(self.client.settings(), target).await?)
    }

    fn code_model(&self) -> Option<Arc<CodeModel>> {
        self.client.code_model()
    }

    fn cache(&self) -> &CacheMap {
        self.client.cache()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Arc<CodeModel>>> {
        self.client.subscribe()
    }

    async fn dispose(&mut self) {
        self.client.dispose().await;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
