// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framed request/reply connection to a CMake server.
//!
//! One background task owns the stream halves, the frame buffer, the
//! cookie → pending-reply table and the notification handlers. Handles talk
//! to it over a command channel, so nothing here is shared behind a lock.
//!
//! ```text
//! send() ──Command::Send──▶ task ──frame──▶ writer
//!                            │
//! PendingReply ◀──oneshot────┘◀──reply/error── reader
//! handler(msg) ◀─────────────────hello/progress/signal/message
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use cmt_wire::{FrameScanner, Message, NotificationKind, Request, WireError};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Reply payload: the reply object minus `type`, `cookie` and `inReplyTo`.
pub type ReplyPayload = Map<String, Value>;

/// Callback for one notification type.
pub type NotificationHandler = Box<dyn FnMut(Message) + Send>;

type ReplySender = oneshot::Sender<Result<ReplyPayload, ConnectionError>>;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server answered with an `error` message.
    #[error("server error: {0}")]
    Remote(String),
    /// The connection task stopped before a reply arrived.
    #[error("connection closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] WireError),
}

enum Command {
    Send { kind: String, params: ReplyPayload, reply: ReplySender },
    Handle { kind: NotificationKind, handler: NotificationHandler },
    Listen,
}

/// Handle to a framed connection.
///
/// Dropping the handle stops the background task; requests still waiting
/// for a reply resolve to [`ConnectionError::Closed`].
pub struct FramedConnection {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl FramedConnection {
    /// Start the connection task. Writes are possible immediately; incoming
    /// bytes are not consumed until [`listen`](Self::listen) is called.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(ConnectionTask::new(reader, writer, rx).run());
        Self { commands: tx, task }
    }

    /// Send a request; the cookie is assigned in call order.
    ///
    /// The request is queued before this returns, so several calls can be
    /// outstanding at once and their replies may arrive in any order.
    pub fn send(&self, kind: impl Into<String>, params: ReplyPayload) -> PendingReply {
        let (reply, rx) = oneshot::channel();
        let kind = kind.into();
        if self.commands.send(Command::Send { kind, params, reply }).is_err() {
            tracing::debug!("send on closed connection");
        }
        PendingReply { rx }
    }

    /// Register the handler for one notification type, replacing any previous one.
    pub fn on_notification(
        &self,
        kind: NotificationKind,
        handler: impl FnMut(Message) + Send + 'static,
    ) {
        let _ = self.commands.send(Command::Handle { kind, handler: Box::new(handler) });
    }

    /// Begin consuming the input stream.
    pub fn listen(&self) {
        let _ = self.commands.send(Command::Listen);
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FramedConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Future resolving to the reply for one request.
#[must_use = "the reply is only observable by awaiting it"]
pub struct PendingReply {
    rx: oneshot::Receiver<Result<ReplyPayload, ConnectionError>>,
}

impl Future for PendingReply {
    type Output = Result<ReplyPayload, ConnectionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ConnectionError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

struct ConnectionTask<R, W> {
    reader: R,
    writer: W,
    commands: mpsc::UnboundedReceiver<Command>,
    scanner: FrameScanner,
    next_cookie: u64,
    pending: HashMap<String, ReplySender>,
    handlers: HashMap<NotificationKind, NotificationHandler>,
    listening: bool,
}

impl<R, W> ConnectionTask<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn new(reader: R, writer: W, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            reader,
            writer,
            commands,
            scanner: FrameScanner::new(),
            next_cookie: 0,
            pending: HashMap::new(),
            handlers: HashMap::new(),
            listening: false,
        }
    }

    async fn run(mut self) {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                read = self.reader.read(&mut buf), if self.listening => match read {
                    Ok(0) => {
                        tracing::info!(pending = self.pending.len(), "connection stream ended");
                        break;
                    }
                    Ok(n) => {
                        self.scanner.push(&buf[..n]);
                        self.dispatch_frames();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "connection read failed");
                        break;
                    }
                },
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { kind, params, reply } => {
                let cookie = self.next_cookie.to_string();
                self.next_cookie += 1;
                let request = Message::Request(Request::new(kind.clone(), cookie.clone(), params));
                let json = match request.encode() {
                    Ok(json) => json,
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                        return;
                    }
                };
                // Incoming frames are not read until this write completes.
                if let Err(e) = cmt_wire::write_frame(&mut self.writer, &json).await {
                    tracing::warn!(%kind, %cookie, error = %e, "failed to write request");
                    let _ = reply.send(Err(e.into()));
                    return;
                }
                tracing::debug!(%kind, %cookie, "request sent");
                self.pending.insert(cookie, reply);
            }
            Command::Handle { kind, handler } => {
                self.handlers.insert(kind, handler);
            }
            Command::Listen => {
                self.listening = true;
            }
        }
    }

    fn dispatch_frames(&mut self) {
        while let Some(frame) = self.scanner.next_frame() {
            match Message::decode(&frame) {
                Ok(message) => self.dispatch(message),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        frame = %String::from_utf8_lossy(&frame),
                        "dropping malformed frame"
                    );
                }
            }
        }
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::Reply(reply) => match self.pending.remove(&reply.cookie) {
                Some(tx) => {
                    let _ = tx.send(Ok(reply.payload));
                }
                None => {
                    tracing::warn!(
                        cookie = %reply.cookie,
                        in_reply_to = %reply.in_reply_to,
                        "reply for unknown cookie"
                    );
                }
            },
            Message::Error(error) => match self.pending.remove(&error.cookie) {
                Some(tx) => {
                    let _ = tx.send(Err(ConnectionError::Remote(error.error_message)));
                }
                None => {
                    tracing::warn!(
                        cookie = %error.cookie,
                        message = %error.error_message,
                        "error for unknown cookie"
                    );
                }
            },
            Message::Request(request) => {
                tracing::warn!(kind = %request.kind, "unexpected request from server");
            }
            notification => {
                let Some(kind) = notification.notification_kind() else {
                    return;
                };
                match self.handlers.get_mut(&kind) {
                    Some(handler) => handler(notification),
                    None => tracing::debug!(kind = kind.as_str(), "unhandled notification"),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
