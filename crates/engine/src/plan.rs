// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes a [`BuildPlan`] against one driver per project.

use std::collections::HashMap;

use cmt_adapters::{Driver, DriverError};
use cmt_core::Dependency;
use thiserror::Error;

use crate::resolver::BuildPlan;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no source tree configured for project {0}")]
    UnknownProject(String),
    #[error("generating {project} failed: {source}")]
    Generate {
        project: String,
        #[source]
        source: DriverError,
    },
    #[error("building {dependency} failed: {source}")]
    Build {
        dependency: Dependency,
        #[source]
        source: DriverError,
    },
}

/// Drivers keyed by project name.
#[derive(Default)]
pub struct PlanRunner {
    drivers: HashMap<String, Box<dyn Driver>>,
}

impl PlanRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver under its project name, replacing any previous one.
    pub fn insert(&mut self, driver: Box<dyn Driver>) {
        self.drivers.insert(driver.settings().name.clone(), driver);
    }

    pub fn driver(&self, project: &str) -> Option<&dyn Driver> {
        self.drivers.get(project).map(|d| d.as_ref())
    }

    pub fn driver_mut(&mut self, project: &str) -> Option<&mut Box<dyn Driver>> {
        self.drivers.get_mut(project)
    }

    /// Build every dependency of `plan`, step by step.
    ///
    /// Drivers without a model are generated before their first build. Stops
    /// at the first failure; nothing is built when a project has no driver.
    pub async fn run(&mut self, plan: &BuildPlan) -> Result<(), PlanError> {
        if let Some(missing) =
            plan.dependencies().find(|d| !self.drivers.contains_key(&d.project))
        {
            return Err(PlanError::UnknownProject(missing.project.clone()));
        }

        for (index, step) in plan.steps.iter().enumerate() {
            tracing::info!(step = index + 1, of = plan.len(), size = step.dependencies.len(), "build step");
            for dependency in &step.dependencies {
                let driver = self
                    .drivers
                    .get_mut(&dependency.project)
                    .ok_or_else(|| PlanError::UnknownProject(dependency.project.clone()))?;
                if driver.code_model().is_none() {
                    driver.generate().await.map_err(|source| PlanError::Generate {
                        project: dependency.project.clone(),
                        source,
                    })?;
                }
                tracing::info!(%dependency, "building");
                driver.build(dependency.target.as_deref()).await.map_err(|source| {
                    PlanError::Build { dependency: dependency.clone(), source }
                })?;
            }
        }
        Ok(())
    }

    /// Dispose every driver.
    pub async fn dispose(&mut self) {
        for driver in self.drivers.values_mut() {
            driver.dispose().await;
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
