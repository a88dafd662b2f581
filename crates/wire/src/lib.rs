// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CMake server wire protocol.
//!
//! Wire format: JSON payload wrapped between the literal
//! `[== "CMake Server" ==[` and `]== "CMake Server" ==]` markers, each on
//! its own line.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod message;

pub use frame::{encode_frame, write_frame, FrameScanner, END_MARKER, START_MARKER};
pub use message::{
    ErrorReply, Hello, Message, Notice, NotificationKind, Progress, ProtocolVersion, Reply,
    Request, Signal, WireError,
};
