// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod build;
pub mod configure;
pub mod model;
pub mod plan;

use std::path::Path;
use std::sync::Arc;

use cmt_adapters::{create_driver, Driver, TracingSink};
use cmt_core::config::CONFIG_FILE;
use cmt_core::{Config, ExpansionContext};

use crate::exit_error::ExitError;

/// Load `path`, or `cmt.toml` in the current directory.
pub fn load_config(path: Option<&Path>) -> Result<Config, ExitError> {
    let path = path.unwrap_or(Path::new(CONFIG_FILE));
    Config::load(path).map_err(ExitError::config)
}

/// Driver for one configured project, using the process environment.
pub fn driver_for(config: &Config, project: &str) -> Result<Box<dyn Driver>, ExitError> {
    let settings = config
        .project_settings(project, &ExpansionContext::from_process_env())
        .map_err(ExitError::config)?;
    tracing::debug!(
        project,
        source = %settings.source_directory.display(),
        build = %settings.build_directory.display(),
        "project settings"
    );
    Ok(create_driver(settings, Arc::new(TracingSink)))
}
