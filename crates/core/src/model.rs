// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized build model.
//!
//! Both transports (server protocol and file API) populate these shapes.
//! A [`CodeModel`] is rebuilt from scratch on every generate; nothing here
//! supports patching a previous snapshot.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Kind of buildable unit, as reported by CMake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
    ModuleLibrary,
    ObjectLibrary,
    Utility,
    InterfaceLibrary,
}

crate::simple_display! {
    TargetType {
        Executable => "EXECUTABLE",
        StaticLibrary => "STATIC_LIBRARY",
        SharedLibrary => "SHARED_LIBRARY",
        ModuleLibrary => "MODULE_LIBRARY",
        ObjectLibrary => "OBJECT_LIBRARY",
        Utility => "UTILITY",
        InterfaceLibrary => "INTERFACE_LIBRARY",
    }
}

/// Source language of a compile group.
///
/// Languages CMake reports beyond the four known ones are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cxx,
    Cuda,
    Fortran,
    Other(String),
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => f.write_str("C"),
            Language::Cxx => f.write_str("CXX"),
            Language::Cuda => f.write_str("CUDA"),
            Language::Fortran => f.write_str("Fortran"),
            Language::Other(name) => f.write_str(name),
        }
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "C" => Language::C,
            "CXX" => Language::Cxx,
            "CUDA" => Language::Cuda,
            "FORTRAN" => Language::Fortran,
            _ => Language::Other(s.to_string()),
        })
    }
}

impl Serialize for Language {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Language::from_str(&s).unwrap_or_else(|never| match never {}))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludePath {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_system: bool,
}

impl IncludePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), is_system: false }
    }
}

/// Sources of one target sharing a language and one set of flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileGroup {
    pub language: Language,
    pub compile_flags: Vec<String>,
    pub defines: Vec<String>,
    pub include_paths: Vec<IncludePath>,
    pub sysroot: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub source_directory: PathBuf,
    pub compile_groups: Vec<CompileGroup>,
}

impl Target {
    pub fn new(name: impl Into<String>, target_type: TargetType, source_directory: PathBuf) -> Self {
        Self { name: name.into(), target_type, source_directory, compile_groups: Vec::new() }
    }

    /// Synthetic utility target with no compile groups (`all`, `install`).
    pub fn utility(name: impl Into<String>, source_directory: PathBuf) -> Self {
        Self::new(name, TargetType::Utility, source_directory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub targets: Vec<Target>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), targets: Vec::new() }
    }

    /// Append a target, keeping names unique within the project.
    ///
    /// Returns `false` (and drops `target`) when the name is already taken.
    pub fn push_target(&mut self, target: Target) -> bool {
        if self.target(&target.name).is_some() {
            return false;
        }
        self.targets.push(target);
        true
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }
}

/// One snapshot of the project/target graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeModel {
    /// Name of the configuration the snapshot describes (e.g. `Debug`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    pub projects: Vec<Project>,
}

impl CodeModel {
    /// Append a project, keeping names unique within the snapshot.
    ///
    /// Returns `false` (and drops `project`) when the name is already taken.
    pub fn push_project(&mut self, project: Project) -> bool {
        if self.project(&project.name).is_some() {
            return false;
        }
        self.projects.push(project);
        true
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Every target across all projects, in model order.
    pub fn targets(&self) -> impl Iterator<Item = (&Project, &Target)> {
        self.projects.iter().flat_map(|p| p.targets.iter().map(move |t| (p, t)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheEntryType {
    Bool,
    Filepath,
    Path,
    String,
    Internal,
    Static,
    Uninitialized,
}

impl CacheEntryType {
    /// Parse the type name CMake writes for a cache entry.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BOOL" => Some(Self::Bool),
            "FILEPATH" => Some(Self::Filepath),
            "PATH" => Some(Self::Path),
            "STRING" => Some(Self::String),
            "INTERNAL" => Some(Self::Internal),
            "STATIC" => Some(Self::Static),
            "UNINITIALIZED" => Some(Self::Uninitialized),
            _ => None,
        }
    }
}

crate::simple_display! {
    CacheEntryType {
        Bool => "BOOL",
        Filepath => "FILEPATH",
        Path => "PATH",
        String => "STRING",
        Internal => "INTERNAL",
        Static => "STATIC",
        Uninitialized => "UNINITIALIZED",
    }
}

/// A persisted CMake configuration variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<CacheEntryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub advanced: bool,
}

impl CacheEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), entry_type: None, help: None, advanced: false }
    }

    /// Interpret the value with CMake's truthiness rules.
    pub fn as_bool(&self) -> bool {
        let upper = self.value.trim().to_ascii_uppercase();
        match upper.as_str() {
            "ON" | "YES" | "TRUE" | "Y" => true,
            "" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" | "NOTFOUND" => false,
            other if other.ends_with("-NOTFOUND") => false,
            other => other.parse::<f64>().map(|n| n != 0.0).unwrap_or(false),
        }
    }
}

/// Split a compiler command fragment into flag tokens.
///
/// Tokens are separated by whitespace; double quotes group a token and are
/// removed, and a backslash inside quotes escapes the next character.
pub fn split_flags(fragment: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = fragment.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Cache entries keyed by name, in the order CMake reported them.
pub type CacheMap = IndexMap<String, CacheEntry>;

/// Build a fresh cache map; later entries with the same name win.
pub fn cache_from_entries(entries: impl IntoIterator<Item = CacheEntry>) -> CacheMap {
    entries.into_iter().map(|e| (e.name.clone(), e)).collect()
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
