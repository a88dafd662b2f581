// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace configuration (`cmt.toml`).
//!
//! The file lists the source trees (`[[project]]`), shared defaults
//! (`[workspace]`) and the dependency specification (`[[dependency]]`).
//! [`Config::project_settings`] resolves one project into the fully
//! expanded [`ProjectSettings`] a transport is constructed from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::DependencySpec;
use crate::expand::{expand, expand_environment, ExpansionContext};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "cmt.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error("duplicate project: {0}")]
    DuplicateProject(String),
}

/// How a source tree's build model is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Long-lived `cmake -E server` process
    Server,
    /// One-shot configure plus `.cmake/api/v1` reply files
    #[default]
    FileApi,
}

crate::simple_display! {
    Transport {
        Server => "server",
        FileApi => "file-api",
    }
}

/// Defaults shared by every project; each field can be overridden per project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceDefaults {
    pub cmake_path: Option<String>,
    pub build_type: Option<String>,
    pub generator: Option<String>,
    pub transport: Option<Transport>,
    pub build_directory: Option<String>,
    pub environment: IndexMap<String, String>,
    pub configure_settings: IndexMap<String, String>,
}

/// One `[[project]]` table as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub source_directory: PathBuf,
    #[serde(default)]
    pub cmake_path: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub extra_generator: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub toolset: Option<String>,
    #[serde(default)]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub build_directory: Option<String>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub configure_settings: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceDefaults,
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectConfig>,
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencySpec>,
    /// Directory relative source paths resolve against
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, root).map_err(|e| match e {
            ConfigError::Parse { source, .. } => {
                ConfigError::Parse { path: path.to_path_buf(), source }
            }
            other => other,
        })
    }

    /// Parse configuration text; relative paths resolve against `root`.
    pub fn parse(text: &str, root: PathBuf) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: PathBuf::from(CONFIG_FILE), source })?;
        config.root = root;
        let mut seen = std::collections::HashSet::new();
        for project in &config.projects {
            if !seen.insert(project.name.as_str()) {
                return Err(ConfigError::DuplicateProject(project.name.clone()));
            }
        }
        Ok(config)
    }

    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Resolve a project's settings, expanding every `${...}` placeholder.
    pub fn project_settings(
        &self,
        name: &str,
        base: &ExpansionContext,
    ) -> Result<ProjectSettings, ConfigError> {
        let project =
            self.project(name).ok_or_else(|| ConfigError::UnknownProject(name.to_string()))?;
        let defaults = &self.workspace;

        let source_directory = if project.source_directory.is_absolute() {
            project.source_directory.clone()
        } else {
            self.root.join(&project.source_directory)
        };
        let build_type = project
            .build_type
            .clone()
            .or_else(|| defaults.build_type.clone())
            .unwrap_or_else(|| "Debug".to_string());
        let generator = project
            .generator
            .clone()
            .or_else(|| defaults.generator.clone())
            .unwrap_or_else(|| "Ninja".to_string());

        let ctx = base
            .clone()
            .with_var("buildType", build_type.clone())
            .with_var("generator", generator.clone())
            .with_var("projectName", project.name.clone())
            .with_var("sourceDirectory", source_directory.display().to_string())
            .with_var("workspaceFolder", self.root.display().to_string());

        let build_template = project
            .build_directory
            .as_deref()
            .or(defaults.build_directory.as_deref())
            .unwrap_or("${sourceDirectory}/build");
        let build_directory = PathBuf::from(expand(build_template, &ctx));

        let mut overrides = defaults.environment.clone();
        overrides.extend(project.environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        let environment = expand_environment(&overrides, &ctx);

        // Cache values see the project environment, overrides included
        let settings_ctx = ExpansionContext { env: environment.clone(), vars: ctx.vars.clone() };
        let mut configure_settings = IndexMap::new();
        for (key, value) in defaults.configure_settings.iter().chain(&project.configure_settings) {
            configure_settings.insert(key.clone(), expand(value, &settings_ctx));
        }

        Ok(ProjectSettings {
            name: project.name.clone(),
            source_directory,
            build_directory,
            build_type,
            generator,
            extra_generator: project.extra_generator.clone(),
            platform: project.platform.clone(),
            toolset: project.toolset.clone(),
            cmake_path: project
                .cmake_path
                .clone()
                .or_else(|| defaults.cmake_path.clone())
                .unwrap_or_else(|| "cmake".to_string()),
            transport: project.transport.or(defaults.transport).unwrap_or_default(),
            environment,
            configure_settings,
        })
    }
}

/// Fully resolved settings for one source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    pub name: String,
    pub source_directory: PathBuf,
    pub build_directory: PathBuf,
    pub build_type: String,
    pub generator: String,
    pub extra_generator: Option<String>,
    pub platform: Option<String>,
    pub toolset: Option<String>,
    pub cmake_path: String,
    pub transport: Transport,
    /// Complete environment for spawned processes
    pub environment: HashMap<String, String>,
    /// `-D` cache overrides passed on configure
    pub configure_settings: IndexMap<String, String>,
}

impl ProjectSettings {
    pub fn new(
        name: impl Into<String>,
        source_directory: impl Into<PathBuf>,
        build_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source_directory: source_directory.into(),
            build_directory: build_directory.into(),
            build_type: "Debug".to_string(),
            generator: "Ninja".to_string(),
            extra_generator: None,
            platform: None,
            toolset: None,
            cmake_path: "cmake".to_string(),
            transport: Transport::default(),
            environment: HashMap::new(),
            configure_settings: IndexMap::new(),
        }
    }

    crate::setters! {
        into {
            build_type: String,
            generator: String,
            cmake_path: String,
        }
        set {
            transport: Transport,
            environment: HashMap<String, String>,
            configure_settings: IndexMap<String, String>,
        }
        option {
            extra_generator: String,
            platform: String,
            toolset: String,
        }
    }

    /// `-D<name>=<value>` arguments for the configure settings.
    pub fn cache_arguments(&self) -> Vec<String> {
        self.configure_settings.iter().map(|(k, v)| format!("-D{}={}", k, v)).collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
