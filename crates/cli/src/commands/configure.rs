// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cmt configure` — configure and generate one project.

use anyhow::Result;
use clap::Args;
use cmt_core::Config;

use super::driver_for;
use crate::exit_error::ExitError;
use crate::output::model_summary;

#[derive(Args)]
pub struct ConfigureArgs {
    pub project: String,
    /// Extra arguments passed to cmake (e.g. `-DFOO=ON`)
    #[arg(last = true)]
    pub cmake_args: Vec<String>,
}

pub async fn handle(config: &Config, args: ConfigureArgs) -> Result<()> {
    let mut driver = driver_for(config, &args.project)?;
    let result = async {
        driver.configure(&args.cmake_args).await?;
        if driver.code_model().is_none() {
            driver.generate().await?;
        }
        Ok::<_, cmt_adapters::DriverError>(())
    }
    .await;
    let model = driver.code_model();
    driver.dispose().await;
    result.map_err(ExitError::build)?;

    println!("{}", model_summary(&args.project, model.as_deref()));
    Ok(())
}
