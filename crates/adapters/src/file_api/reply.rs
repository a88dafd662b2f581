// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply files under `.cmake/api/v1/reply`.
//!
//! ```text
//! index-<stamp>.json ─reply.client-<id>─┬─ codemodel-v2 ─▶ codemodel-v2-*.json ─targets[i]─▶ target-*.json
//!                                       ├─ cache-v2 ─────▶ cache-v2-*.json
//!                                       └─ cmakeFiles-v1 ▶ cmakeFiles-v1-*.json (optional)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cmt_core::{
    cache_from_entries, split_flags, CacheEntry, CacheEntryType, CacheMap, CodeModel,
    CompileGroup, IncludePath, Language, Project, Target, TargetType,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::query::{reply_dir, CACHE_V2, CMAKE_FILES_V1, CODEMODEL_V2};
use super::{io_error, FileApiError};

/// Everything read from one reply snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplySnapshot {
    pub model: CodeModel,
    pub cache: CacheMap,
    pub generator: Option<String>,
    pub cmake_version: Option<String>,
    /// CMake input files (`CMakeLists.txt`, included modules)
    pub cmake_inputs: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Index {
    #[serde(default)]
    cmake: IndexCmake,
    #[serde(default)]
    reply: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndexCmake {
    generator: Option<Named>,
    version: Option<Version>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Version {
    string: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ObjectRef {
    json_file: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodeModelFile {
    #[serde(default)]
    configurations: Vec<ConfigurationFile>,
    #[serde(default)]
    paths: Paths,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Paths {
    source: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ConfigurationFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    projects: Vec<ProjectEntry>,
    #[serde(default)]
    targets: Vec<TargetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectEntry {
    name: String,
    #[serde(default)]
    target_indexes: Vec<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetEntry {
    name: String,
    json_file: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetFile {
    name: String,
    #[serde(rename = "type")]
    target_type: TargetType,
    #[serde(default)]
    paths: Paths,
    #[serde(default)]
    sources: Vec<SourceEntry>,
    #[serde(default)]
    compile_groups: Vec<CompileGroupEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompileGroupEntry {
    #[serde(default)]
    source_indexes: Vec<usize>,
    language: String,
    #[serde(default)]
    compile_command_fragments: Vec<Fragment>,
    #[serde(default)]
    includes: Vec<IncludeEntry>,
    #[serde(default)]
    defines: Vec<DefineEntry>,
    #[serde(default)]
    sysroot: Option<SysrootEntry>,
}

#[derive(Debug, Deserialize)]
struct Fragment {
    fragment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncludeEntry {
    path: PathBuf,
    #[serde(default)]
    is_system: bool,
}

#[derive(Debug, Deserialize)]
struct DefineEntry {
    define: String,
}

#[derive(Debug, Deserialize)]
struct SysrootEntry {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CacheFile {
    #[serde(default)]
    entries: Vec<CacheFileEntry>,
}

#[derive(Debug, Deserialize)]
struct CacheFileEntry {
    name: String,
    #[serde(default)]
    value: String,
    #[serde(rename = "type", default)]
    entry_type: Option<String>,
    #[serde(default)]
    properties: Vec<CacheProperty>,
}

#[derive(Debug, Deserialize)]
struct CacheProperty {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct CmakeFilesFile {
    #[serde(default)]
    inputs: Vec<SourceEntry>,
    #[serde(default)]
    paths: Paths,
}

/// Read the most recent reply for `client_id`.
///
/// Returns `Ok(None)` when cmake has not written a reply directory yet. Any
/// unreadable or malformed file fails the whole read.
pub fn read_reply(build_dir: &Path, client_id: &str) -> Result<Option<ReplySnapshot>, FileApiError> {
    let dir = reply_dir(build_dir);
    if !dir.is_dir() {
        return Ok(None);
    }
    let index_path = latest_index(&dir)?;
    tracing::debug!(index = %index_path.display(), "reading file-api reply");
    let index: Index = read_json(&index_path)?;

    let client_key = format!("client-{}", client_id);
    let client = index
        .reply
        .get(&client_key)
        .ok_or_else(|| FileApiError::MissingClient(client_key.clone()))?;
    let object = |kind: &'static str| -> Result<Option<String>, FileApiError> {
        let Some(value) = client.get(kind) else {
            return Ok(None);
        };
        let reference: ObjectRef = serde_json::from_value(value.clone())
            .map_err(|source| FileApiError::Json { path: index_path.clone(), source })?;
        match (reference.json_file, reference.error) {
            (Some(file), _) => Ok(Some(file)),
            (None, Some(error)) => Err(FileApiError::ObjectFailed { kind, error }),
            (None, None) => Ok(None),
        }
    };

    let codemodel_file = object(CODEMODEL_V2)?.ok_or(FileApiError::MissingObject(CODEMODEL_V2))?;
    let cache_file = object(CACHE_V2)?.ok_or(FileApiError::MissingObject(CACHE_V2))?;
    let cmake_files = match object(CMAKE_FILES_V1) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(error = %e, "cmakeFiles reply unavailable");
            None
        }
    };

    let cache = read_cache(&dir.join(cache_file))?;
    let model = read_code_model(&dir, &dir.join(codemodel_file))?;
    let cmake_inputs = match cmake_files {
        Some(file) => read_cmake_files(&dir.join(file))?,
        None => Vec::new(),
    };

    Ok(Some(ReplySnapshot {
        model,
        cache,
        generator: index.cmake.generator.map(|g| g.name),
        cmake_version: index.cmake.version.map(|v| v.string),
        cmake_inputs,
    }))
}

/// The lexicographically last `index*.json`.
fn latest_index(dir: &Path) -> Result<PathBuf, FileApiError> {
    let mut indexes = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("index") && name.ends_with(".json") {
            indexes.push(name);
        }
    }
    indexes.sort();
    indexes.pop().map(|name| dir.join(name)).ok_or_else(|| FileApiError::MissingIndex(dir.to_path_buf()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FileApiError> {
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    serde_json::from_slice(&bytes).map_err(|source| FileApiError::Json { path: path.to_path_buf(), source })
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

fn read_cache(path: &Path) -> Result<CacheMap, FileApiError> {
    let file: CacheFile = read_json(path)?;
    Ok(cache_from_entries(file.entries.into_iter().map(|e| {
        let mut entry = CacheEntry::new(e.name, e.value);
        entry.entry_type = e.entry_type.as_deref().and_then(CacheEntryType::parse);
        for property in e.properties {
            match property.name.as_str() {
                "HELPSTRING" => entry.help = Some(property.value),
                "ADVANCED" => entry.advanced = property.value == "1",
                _ => {}
            }
        }
        entry
    })))
}

/// Build the model from configuration 0 of the codemodel file.
fn read_code_model(dir: &Path, path: &Path) -> Result<CodeModel, FileApiError> {
    let file: CodeModelFile = read_json(path)?;
    let source_root = file.paths.source;
    let mut model = CodeModel::default();
    let Some(configuration) = file.configurations.into_iter().next() else {
        tracing::warn!(file = %path.display(), "codemodel has no configurations");
        return Ok(model);
    };
    model.configuration = configuration.name;

    for entry in &configuration.projects {
        let mut project = Project::new(entry.name.clone());
        for &index in &entry.target_indexes {
            let target_ref = configuration
                .targets
                .get(index)
                .ok_or(FileApiError::BadTargetIndex { project: entry.name.clone(), index })?;
            let target = read_target(&dir.join(&target_ref.json_file), &source_root)?;
            if !project.push_target(target) {
                tracing::warn!(project = %entry.name, target = %target_ref.name, "duplicate target dropped");
            }
        }
        for name in ["all", "install"] {
            project.push_target(Target::utility(name, source_root.clone()));
        }
        if !model.push_project(project) {
            tracing::warn!(project = %entry.name, "duplicate project dropped");
        }
    }
    Ok(model)
}

fn read_target(path: &Path, source_root: &Path) -> Result<Target, FileApiError> {
    let file: TargetFile = read_json(path)?;
    let mut target =
        Target::new(file.name, file.target_type, resolve(source_root, file.paths.source));
    for group in file.compile_groups {
        let sources = group
            .source_indexes
            .iter()
            .map(|&i| {
                file.sources.get(i).map(|s| resolve(source_root, s.path.clone())).ok_or_else(|| {
                    FileApiError::BadSourceIndex { target: target.name.clone(), index: i }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let group = CompileGroup {
            language: group.language.parse::<Language>().unwrap_or_else(|never| match never {}),
            compile_flags: group
                .compile_command_fragments
                .iter()
                .flat_map(|f| split_flags(&f.fragment))
                .collect(),
            defines: group.defines.into_iter().map(|d| d.define).collect(),
            include_paths: group
                .includes
                .into_iter()
                .map(|i| IncludePath { path: i.path, is_system: i.is_system })
                .collect(),
            sysroot: group.sysroot.map(|s| s.path),
            sources,
        };
        target.compile_groups.push(group);
    }
    Ok(target)
}

fn read_cmake_files(path: &Path) -> Result<Vec<PathBuf>, FileApiError> {
    let file: CmakeFilesFile = read_json(path)?;
    let root = file.paths.source;
    Ok(file.inputs.into_iter().map(|i| resolve(&root, i.path)).collect())
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
