// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declared build dependencies between projects and targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A project, or a single target of a project.
///
/// A dependency without a target refers to every target of the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Dependency {
    pub fn project(project: impl Into<String>) -> Self {
        Self { project: project.into(), target: None }
    }

    pub fn target(project: impl Into<String>, target: impl Into<String>) -> Self {
        Self { project: project.into(), target: Some(target.into()) }
    }

    pub fn is_project(&self) -> bool {
        self.target.is_none()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}:{}", self.project, target),
            None => f.write_str(&self.project),
        }
    }
}

/// One entry of the dependency specification: a project or target together
/// with its direct dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl DependencySpec {
    pub fn new(dependency: Dependency, dependencies: Vec<Dependency>) -> Self {
        Self { project: dependency.project, target: dependency.target, dependencies }
    }

    /// The dependency this entry declares.
    pub fn dependency(&self) -> Dependency {
        Dependency { project: self.project.clone(), target: self.target.clone() }
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
