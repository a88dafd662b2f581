// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cmt build` — build a project after everything it depends on.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::Args;
use cmt_core::{Config, Dependency};
use cmt_engine::PlanRunner;

use super::{driver_for, plan::resolve};
use crate::exit_error::ExitError;

#[derive(Args)]
pub struct BuildArgs {
    pub project: String,
    #[arg(long)]
    pub target: Option<String>,
}

pub async fn handle(config: &Config, args: BuildArgs) -> Result<()> {
    let request = Dependency { project: args.project, target: args.target };
    let plan = resolve(config, &request)?;

    let projects: BTreeSet<&str> = plan.dependencies().map(|d| d.project.as_str()).collect();
    let mut runner = PlanRunner::new();
    for project in projects {
        runner.insert(driver_for(config, project)?);
    }

    let result = runner.run(&plan).await;
    runner.dispose().await;
    result.map_err(ExitError::build)?;

    println!("Built {} in {} step(s)", request, plan.len());
    Ok(())
}
