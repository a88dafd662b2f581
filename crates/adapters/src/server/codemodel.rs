// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server protocol reply shapes and their normalization.

use std::path::{Path, PathBuf};

use cmt_core::{
    cache_from_entries, split_flags, CacheEntry, CacheEntryType, CacheMap, CodeModel,
    CompileGroup, IncludePath, Language, Project, Target, TargetType,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ServerError;
use crate::connection::ReplyPayload;

#[derive(Debug, Deserialize)]
struct CodeModelReply {
    #[serde(default)]
    configurations: Vec<ConfigurationShape>,
}

#[derive(Debug, Deserialize)]
struct ConfigurationShape {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    projects: Vec<ProjectShape>,
}

#[derive(Debug, Deserialize)]
struct ProjectShape {
    name: String,
    #[serde(default)]
    targets: Vec<TargetShape>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetShape {
    name: String,
    #[serde(rename = "type")]
    target_type: TargetType,
    #[serde(default)]
    source_directory: PathBuf,
    #[serde(default)]
    sysroot: Option<PathBuf>,
    #[serde(default)]
    file_groups: Vec<FileGroupShape>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileGroupShape {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    compile_flags: String,
    #[serde(default)]
    defines: Vec<String>,
    #[serde(default)]
    include_path: Vec<IncludeShape>,
    #[serde(default)]
    sources: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncludeShape {
    path: PathBuf,
    #[serde(default)]
    is_system: bool,
}

#[derive(Debug, Deserialize)]
struct CacheReply {
    #[serde(default)]
    cache: Vec<CacheEntryShape>,
}

#[derive(Debug, Deserialize)]
struct CacheEntryShape {
    key: String,
    #[serde(default)]
    value: String,
    #[serde(rename = "type", default)]
    entry_type: Option<String>,
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

fn parse<T: DeserializeOwned>(kind: &'static str, payload: ReplyPayload) -> Result<T, ServerError> {
    serde_json::from_value(Value::Object(payload))
        .map_err(|source| ServerError::Payload { kind, source })
}

/// Normalize a `codemodel` reply. Only the first configuration is read.
pub(crate) fn code_model_from_reply(payload: ReplyPayload) -> Result<CodeModel, ServerError> {
    let reply: CodeModelReply = parse("codemodel", payload)?;
    let mut model = CodeModel::default();
    let Some(configuration) = reply.configurations.into_iter().next() else {
        tracing::warn!("codemodel reply has no configurations");
        return Ok(model);
    };
    model.configuration = configuration.name;

    for shape in configuration.projects {
        let mut project = Project::new(shape.name);
        for target in shape.targets {
            let target = normalize_target(target);
            let name = target.name.clone();
            if !project.push_target(target) {
                tracing::warn!(project = %project.name, target = %name, "duplicate target dropped");
            }
        }
        let name = project.name.clone();
        if !model.push_project(project) {
            tracing::warn!(project = %name, "duplicate project dropped");
        }
    }
    Ok(model)
}

fn normalize_target(shape: TargetShape) -> Target {
    let mut target = Target::new(shape.name, shape.target_type, shape.source_directory);
    for group in shape.file_groups {
        // Header-only groups carry no language
        let Some(language) = group.language else {
            continue;
        };
        let group = CompileGroup {
            language: language.parse::<Language>().unwrap_or_else(|never| match never {}),
            compile_flags: split_flags(&group.compile_flags),
            defines: group.defines,
            include_paths: group
                .include_path
                .into_iter()
                .map(|i| IncludePath { path: i.path, is_system: i.is_system })
                .collect(),
            sysroot: shape.sysroot.clone(),
            sources: group
                .sources
                .into_iter()
                .map(|s| resolve(&target.source_directory, s))
                .collect(),
        };
        target.compile_groups.push(group);
    }
    target
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

/// Normalize a `cache` reply into a fresh map.
pub(crate) fn cache_from_reply(payload: ReplyPayload) -> Result<CacheMap, ServerError> {
    let reply: CacheReply = parse("cache", payload)?;
    Ok(cache_from_entries(reply.cache.into_iter().map(|shape| {
        let mut entry = CacheEntry::new(shape.key, shape.value);
        entry.entry_type = shape.entry_type.as_deref().and_then(CacheEntryType::parse);
        entry.help = shape.properties.get("HELPSTRING").and_then(Value::as_str).map(String::from);
        entry.advanced = match shape.properties.get("ADVANCED") {
            Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("ON"),
            Some(Value::Bool(b)) => *b,
            _ => false,
        };
        entry
    })))
}

#[cfg(test)]
#[path = "codemodel_tests.rs"]
mod tests;
