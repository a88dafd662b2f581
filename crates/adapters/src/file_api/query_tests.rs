// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn markers(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn creates_one_empty_marker_per_kind() {
    let build = TempDir::new().unwrap();

    write_query(build.path(), CLIENT_ID, &QUERY_KINDS).await.unwrap();

    let dir = query_dir(build.path(), CLIENT_ID);
    assert!(dir.ends_with(".cmake/api/v1/query/client-cmt"));
    assert_eq!(markers(&dir), vec!["cache-v2", "cmakeFiles-v1", "codemodel-v2"]);
    assert_eq!(std::fs::read(dir.join(CODEMODEL_V2)).unwrap(), b"");
}

#[tokio::test]
async fn removes_stale_markers_from_existing_directory() {
    let build = TempDir::new().unwrap();
    let dir = query_dir(build.path(), CLIENT_ID);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("toolchains-v1"), b"").unwrap();
    std::fs::write(dir.join(CACHE_V2), b"").unwrap();

    write_query(build.path(), CLIENT_ID, &[CODEMODEL_V2, CACHE_V2]).await.unwrap();

    assert_eq!(markers(&dir), vec!["cache-v2", "codemodel-v2"]);
}

#[tokio::test]
async fn leaves_subdirectories_alone() {
    let build = TempDir::new().unwrap();
    let dir = query_dir(build.path(), CLIENT_ID);
    std::fs::create_dir_all(dir.join("nested")).unwrap();

    write_query(build.path(), CLIENT_ID, &[CODEMODEL_V2]).await.unwrap();

    assert_eq!(markers(&dir), vec!["codemodel-v2", "nested"]);
}

#[tokio::test]
async fn rewriting_is_idempotent() {
    let build = TempDir::new().unwrap();

    write_query(build.path(), CLIENT_ID, &QUERY_KINDS).await.unwrap();
    write_query(build.path(), CLIENT_ID, &QUERY_KINDS).await.unwrap();

    assert_eq!(markers(&query_dir(build.path(), CLIENT_ID)).len(), 3);
}
