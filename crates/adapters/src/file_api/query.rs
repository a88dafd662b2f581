// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query markers under `.cmake/api/v1/query`.

use std::path::{Path, PathBuf};

use super::{io_error, FileApiError};

/// Client name used for `query/client-<id>` and the index `reply` key.
pub const CLIENT_ID: &str = "cmt";

pub const CODEMODEL_V2: &str = "codemodel-v2";
pub const CACHE_V2: &str = "cache-v2";
pub const CMAKE_FILES_V1: &str = "cmakeFiles-v1";

/// Object kinds requested on every configure.
pub const QUERY_KINDS: [&str; 3] = [CODEMODEL_V2, CACHE_V2, CMAKE_FILES_V1];

pub fn api_dir(build_dir: &Path) -> PathBuf {
    build_dir.join(".cmake").join("api").join("v1")
}

pub fn query_dir(build_dir: &Path, client_id: &str) -> PathBuf {
    api_dir(build_dir).join("query").join(format!("client-{}", client_id))
}

pub fn reply_dir(build_dir: &Path) -> PathBuf {
    api_dir(build_dir).join("reply")
}

/// Ensure one empty marker file exists per kind.
///
/// Markers for other kinds are removed, but only from a directory that
/// already existed; a freshly created directory has nothing stale in it.
pub async fn write_query(
    build_dir: &Path,
    client_id: &str,
    kinds: &[&str],
) -> Result<(), FileApiError> {
    let dir = query_dir(build_dir, client_id);
    if tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
        remove_stale(&dir, kinds).await?;
    } else {
        tokio::fs::create_dir_all(&dir).await.map_err(io_error(&dir))?;
    }
    for kind in kinds {
        let marker = dir.join(kind);
        if !tokio::fs::try_exists(&marker).await.unwrap_or(false) {
            tokio::fs::write(&marker, b"").await.map_err(io_error(&marker))?;
        }
    }
    Ok(())
}

async fn remove_stale(dir: &Path, kinds: &[&str]) -> Result<(), FileApiError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error(dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        let wanted = entry.file_name().to_str().is_some_and(|name| kinds.contains(&name));
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if !wanted && is_file {
            tracing::debug!(marker = %path.display(), "removing stale query");
            tokio::fs::remove_file(&path).await.map_err(io_error(&path))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
