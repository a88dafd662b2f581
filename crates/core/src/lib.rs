// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cmt-core: normalized build model, dependency declarations, configuration
//! and variable expansion shared by every transport.

pub mod macros;

pub mod config;
pub mod dependency;
pub mod expand;
pub mod model;

pub use config::{Config, ConfigError, ProjectSettings, Transport, WorkspaceDefaults};
pub use dependency::{Dependency, DependencySpec};
pub use expand::{expand, expand_environment, ExpansionContext};
pub use model::{
    cache_from_entries, split_flags, CacheEntry, CacheEntryType, CacheMap, CodeModel,
    CompileGroup, IncludePath, Language, Project, Target, TargetType,
};
