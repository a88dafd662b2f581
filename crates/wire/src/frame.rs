// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marker-delimited framing.

use std::sync::LazyLock;

use regex::bytes::Regex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const START_MARKER: &str = "[== \"CMake Server\" ==[";
pub const END_MARKER: &str = "]== \"CMake Server\" ==]";

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static FRAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\[== "CMake Server" ==\[(.*?)\]== "CMake Server" ==\]"#)
        .expect("constant regex pattern is valid")
});

/// Wrap a JSON payload between the frame markers.
pub fn encode_frame(json: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(json.len() + START_MARKER.len() + END_MARKER.len() + 3);
    out.extend_from_slice(START_MARKER.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(json);
    out.push(b'\n');
    out.extend_from_slice(END_MARKER.as_bytes());
    out.push(b'\n');
    out
}

/// Write one framed payload and flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, json: &[u8]) -> std::io::Result<()> {
    writer.write_all(&encode_frame(json)).await?;
    writer.flush().await
}

/// Accumulates stream bytes and yields complete frame payloads.
///
/// Bytes that arrive before a start marker are discarded together with the
/// frame that follows them; a trailing partial frame stays buffered until
/// the rest of it arrives.
#[derive(Debug, Default)]
pub struct FrameScanner {
    buffer: Vec<u8>,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Remove and return the next complete payload, trimmed of surrounding whitespace.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let (end, payload) = {
            let caps = FRAME_PATTERN.captures(&self.buffer)?;
            let whole = caps.get(0)?;
            let body = caps.get(1).map(|m| m.as_bytes()).unwrap_or_default();
            (whole.end(), body.trim_ascii().to_vec())
        };
        self.buffer.drain(..end);
        Some(payload)
    }

    /// Number of buffered bytes not yet consumed as a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
