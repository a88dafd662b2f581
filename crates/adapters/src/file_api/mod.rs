// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CMake file API transport.
//!
//! No long-lived process: configure writes query markers, runs cmake once,
//! then rebuilds the model from the reply files cmake left behind.

mod query;
mod reply;

#[cfg(test)]
mod fixture;

pub use query::{
    query_dir, reply_dir, write_query, CACHE_V2, CLIENT_ID, CMAKE_FILES_V1, CODEMODEL_V2,
    QUERY_KINDS,
};
pub use reply::{read_reply, ReplySnapshot};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cmt_core::{CacheMap, CodeModel, ProjectSettings};
use thiserror::Error;
use tokio::sync::watch;

use crate::build::{BuildRunner, OutputSink};
use crate::driver::{Driver, DriverError, ModelChannel};

#[derive(Debug, Error)]
pub enum FileApiError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no index file in {}", .0.display())]
    MissingIndex(PathBuf),
    #[error("index has no reply for {0}")]
    MissingClient(String),
    #[error("reply has no {0} object")]
    MissingObject(&'static str),
    #[error("cmake could not produce {kind}: {error}")]
    ObjectFailed { kind: &'static str, error: String },
    #[error("project {project} references missing target {index}")]
    BadTargetIndex { project: String, index: usize },
    #[error("target {target} references missing source {index}")]
    BadSourceIndex { target: String, index: usize },
    #[error("reply reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FileApiError + '_ {
    move |source| FileApiError::Io { path: path.to_path_buf(), source }
}

/// [`Driver`] over the file API.
pub struct FileApiDriver {
    settings: ProjectSettings,
    runner: BuildRunner,
    client_id: String,
    cache: CacheMap,
    models: ModelChannel,
    generator: Option<String>,
    cmake_version: Option<String>,
    cmake_inputs: Vec<PathBuf>,
}

impl FileApiDriver {
    pub fn new(settings: ProjectSettings, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            settings,
            runner: BuildRunner::new(sink),
            client_id: CLIENT_ID.to_string(),
            cache: CacheMap::new(),
            models: ModelChannel::new(),
            generator: None,
            cmake_version: None,
            cmake_inputs: Vec::new(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Generator named by the last reply read.
    pub fn generator(&self) -> Option<&str> {
        self.generator.as_deref()
    }

    pub fn cmake_version(&self) -> Option<&str> {
        self.cmake_version.as_deref()
    }

    pub fn cmake_inputs(&self) -> &[PathBuf] {
        &self.cmake_inputs
    }

    /// Rebuild the model from the reply directory, if there is one.
    ///
    /// The directory scan and JSON parsing run on the blocking pool. On
    /// error nothing is replaced.
    pub async fn read_model(&mut self) -> Result<(), FileApiError> {
        let build_dir = self.settings.build_directory.clone();
        let client_id = self.client_id.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || read_reply(&build_dir, &client_id)).await??;
        let Some(snapshot) = snapshot else {
            tracing::debug!(project = %self.settings.name, "no file-api reply yet");
            return Ok(());
        };
        self.cache = snapshot.cache;
        self.generator = snapshot.generator;
        self.cmake_version = snapshot.cmake_version;
        self.cmake_inputs = snapshot.cmake_inputs;
        let model = self.models.publish(snapshot.model);
        tracing::info!(
            project = %self.settings.name,
            projects = model.projects.len(),
            "code model updated"
        );
        Ok(())
    }
}

#[async_trait]
impl Driver for FileApiDriver {
    fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Write the query, run cmake, then read the reply even if cmake failed.
    async fn configure(&mut self, extra_args: &[String]) -> Result<(), DriverError> {
        write_query(&self.settings.build_directory, &self.client_id, &QUERY_KINDS).await?;
        let run = self.runner.configure(&self.settings, extra_args).await;
        let read = self.read_model().await;
        match (run, read) {
            (Ok(()), read) => Ok(read?),
            (Err(e), Err(read_error)) => {
                tracing::warn!(project = %self.settings.name, error = %read_error, "reply unreadable after failed configure");
                Err(e.into())
            }
            (Err(e), Ok(())) => Err(e.into()),
        }
    }

    async fn generate(&mut self) -> Result<(), DriverError> {
        self.configure(&[]).await
    }

    async fn build(&mut self, target: Option<&str>) -> Result<(), DriverError> {
        Ok(self.runner.build(&self.settings, target).await?)
    }

    fn code_model(&self) -> Option<Arc<CodeModel>> {
        self.models.current()
    }

    fn cache(&self) -> &CacheMap {
        &self.cache
    }

    fn subscribe(&self) -> watch::Receiver<Option<Arc<CodeModel>>> {
        self.models.subscribe()
    }

    async fn dispose(&mut self) {
        tracing::debug!(project = %self.settings.name, "file-api driver disposed");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
