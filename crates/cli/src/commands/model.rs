// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cmt model` — generate and print the normalized code model.

use anyhow::Result;
use clap::Args;
use cmt_core::Config;

use super::driver_for;
use crate::exit_error::ExitError;
use crate::output::{format_model, OutputFormat};

#[derive(Args)]
pub struct ModelArgs {
    pub project: String,
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn handle(config: &Config, args: ModelArgs) -> Result<()> {
    let mut driver = driver_for(config, &args.project)?;
    let result = driver.generate().await;
    let model = driver.code_model();
    driver.dispose().await;
    result.map_err(ExitError::build)?;

    match model {
        Some(model) => print!("{}", format_model(&model, args.format)?),
        None => {
            let message = format!("{}: cmake produced no code model", args.project);
            return Err(ExitError::build(message).into());
        }
    }
    Ok(())
}
