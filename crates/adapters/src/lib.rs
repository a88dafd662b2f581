// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cmt-adapters: the two CMake transports and the processes behind them.

pub mod build;
pub mod connection;
pub mod driver;
pub mod file_api;
pub mod server;

#[cfg(test)]
mod test_peer;

pub use build::{
    build_command, configure_command, BuildError, BuildRunner, OutputSink, OutputStream,
    ProcessSpec, TracingSink,
};
pub use connection::{ConnectionError, FramedConnection, PendingReply, ReplyPayload};
pub use driver::{create_driver, Driver, DriverError};
pub use file_api::{read_reply, FileApiDriver, FileApiError, ReplySnapshot};
pub use server::{ServerClient, ServerDriver, ServerError, ServerProcess, ServerState};

#[cfg(any(test, feature = "test-support"))]
pub use build::{FakeSink, OutputLine};
#[cfg(any(test, feature = "test-support"))]
pub use driver::{CallLog, DriverCall, FakeDriver};
