// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cmt plan` — print the layered build order.

use anyhow::Result;
use clap::Args;
use cmt_core::{Config, Dependency};
use cmt_engine::{BuildPlan, DependencyResolver};

use crate::exit_error::ExitError;
use crate::output::{format_plan, OutputFormat};

#[derive(Args)]
pub struct PlanArgs {
    /// Project to plan a build for
    pub project: String,
    /// Restrict the request to one target of the project
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl PlanArgs {
    pub fn request(&self) -> Dependency {
        Dependency { project: self.project.clone(), target: self.target.clone() }
    }
}

/// Resolve the build order for `request` from the config's dependency table.
pub fn resolve(config: &Config, request: &Dependency) -> Result<BuildPlan, ExitError> {
    let resolver = DependencyResolver::new(&config.dependencies);
    Ok(resolver.resolve_for(request)?)
}

pub fn handle(config: &Config, args: PlanArgs) -> Result<()> {
    let plan = resolve(config, &args.request())?;
    print!("{}", format_plan(&plan, args.format)?);
    Ok(())
}
