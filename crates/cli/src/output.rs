// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use cmt_core::{CodeModel, Target};
use cmt_engine::BuildPlan;

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a build plan, one heading per step.
pub fn format_plan(plan: &BuildPlan, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(plan)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for (i, step) in plan.steps.iter().enumerate() {
                out.push_str(&color::header(&format!("Step {}", i + 1)));
                out.push('\n');
                for dependency in &step.dependencies {
                    out.push_str(&format!("  {}\n", dependency));
                }
            }
            Ok(out)
        }
    }
}

/// Render a code model: projects, then one aligned line per target.
pub fn format_model(model: &CodeModel, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(model)?),
        OutputFormat::Text => {
            let mut out = String::new();
            let name_w = model.targets().map(|(_, t)| t.name.len()).max().unwrap_or(0);
            for project in &model.projects {
                let heading = match &model.configuration {
                    Some(config) => format!("{} ({})", project.name, config),
                    None => project.name.clone(),
                };
                out.push_str(&color::header(&heading));
                out.push('\n');
                for target in &project.targets {
                    out.push_str(&format!(
                        "  {:<name_w$}  {}{}\n",
                        target.name,
                        color::context(&target.target_type.to_string()),
                        source_count(target),
                    ));
                }
            }
            Ok(out)
        }
    }
}

fn source_count(target: &Target) -> String {
    let n: usize = target.compile_groups.iter().map(|g| g.sources.len()).sum();
    match n {
        0 => String::new(),
        1 => "  1 source".to_string(),
        n => format!("  {} sources", n),
    }
}

/// One-line summary printed after configure.
pub fn model_summary(project: &str, model: Option<&CodeModel>) -> String {
    match model {
        Some(model) => {
            let targets = model.targets().count();
            format!("{}: {} project(s), {} target(s)", project, model.projects.len(), targets)
        }
        None => format!("{}: configured, no code model available", project),
    }
}
