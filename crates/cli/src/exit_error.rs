// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

/// Invalid or missing configuration
pub const EXIT_CONFIG: i32 = 2;
/// The dependency graph has a cycle
pub const EXIT_CYCLE: i32 = 3;
/// configure, generate or build failed
pub const EXIT_BUILD: i32 = 4;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn config(err: impl fmt::Display) -> Self {
        Self::new(EXIT_CONFIG, err.to_string())
    }

    pub fn build(err: impl fmt::Display) -> Self {
        Self::new(EXIT_BUILD, err.to_string())
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<cmt_engine::ResolveError> for ExitError {
    fn from(err: cmt_engine::ResolveError) -> Self {
        Self::new(EXIT_CYCLE, err.to_string())
    }
}
