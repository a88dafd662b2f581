// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory stand-in for the server end of a connection.

use std::time::Duration;

use cmt_wire::{encode_frame, FrameScanner, Message, Reply};
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

pub(crate) struct Peer {
    stream: DuplexStream,
    scanner: FrameScanner,
}

/// Client halves plus the peer driving the other end.
pub(crate) fn pair() -> (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>, Peer) {
    let (client, server) = tokio::io::duplex(256 * 1024);
    let (reader, writer) = tokio::io::split(client);
    (reader, writer, Peer { stream: server, scanner: FrameScanner::new() })
}

impl Peer {
    /// Next decoded message written by the client, `None` once it hangs up.
    async fn read_message(&mut self) -> Option<Message> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(frame) = self.scanner.next_frame() {
                return Some(Message::decode(&frame).unwrap());
            }
            let n = self.stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return None;
            }
            self.scanner.push(&buf[..n]);
        }
    }

    pub(crate) async fn next(&mut self) -> Message {
        self.read_message().await.expect("client closed the stream")
    }

    /// Next message, or `None` if the client writes nothing for a short while.
    pub(crate) async fn try_next(&mut self) -> Option<Message> {
        tokio::time::timeout(Duration::from_millis(100), self.read_message()).await.ok().flatten()
    }

    /// Next request as `(kind, cookie, params)`.
    pub(crate) async fn request(&mut self) -> (String, String, Map<String, Value>) {
        match self.next().await {
            Message::Request(r) => (r.kind, r.cookie, r.params),
            other => panic!("expected request, got {:?}", other),
        }
    }

    pub(crate) async fn send(&mut self, message: Message) {
        self.write_raw(&encode_frame(&message.encode().unwrap())).await;
    }

    pub(crate) async fn reply(&mut self, cookie: &str, in_reply_to: &str, payload: Value) {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.send(Message::Reply(Reply {
            cookie: cookie.to_string(),
            in_reply_to: in_reply_to.to_string(),
            payload,
        }))
        .await;
    }

    pub(crate) async fn write_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }
}
