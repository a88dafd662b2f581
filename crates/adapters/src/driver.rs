// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capability every transport implements.

use std::sync::Arc;

use async_trait::async_trait;
use cmt_core::{CacheMap, CodeModel, ProjectSettings, Transport};
use thiserror::Error;
use tokio::sync::watch;

use crate::build::{BuildError, OutputSink};
use crate::file_api::{FileApiDriver, FileApiError};
use crate::server::{ServerDriver, ServerError};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    FileApi(#[from] FileApiError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Configure, generate and build one source tree.
///
/// Callers hold a `Box<dyn Driver>` chosen once by [`create_driver`] and
/// never look at the concrete transport.
#[async_trait]
pub trait Driver: Send {
    fn settings(&self) -> &ProjectSettings;

    /// Run configure with extra cache arguments.
    async fn configure(&mut self, extra_args: &[String]) -> Result<(), DriverError>;

    /// Rebuild the code model from scratch and publish it.
    async fn generate(&mut self) -> Result<(), DriverError>;

    /// Build one target, or everything when `target` is `None`.
    async fn build(&mut self, target: Option<&str>) -> Result<(), DriverError>;

    /// Most recently published model.
    fn code_model(&self) -> Option<Arc<CodeModel>>;

    fn cache(&self) -> &CacheMap;

    /// Receiver that changes every time a new model is published.
    fn subscribe(&self) -> watch::Receiver<Option<Arc<CodeModel>>>;

    async fn dispose(&mut self);
}

/// Pick the transport named by `settings.transport`.
pub fn create_driver(settings: ProjectSettings, sink: Arc<dyn OutputSink>) -> Box<dyn Driver> {
    tracing::debug!(project = %settings.name, transport = %settings.transport, "creating driver");
    match settings.transport {
        Transport::Server => Box::new(ServerDriver::new(settings, sink)),
        Transport::FileApi => Box::new(FileApiDriver::new(settings, sink)),
    }
}

/// Holds the current model and notifies subscribers when it is replaced.
pub(crate) struct ModelChannel {
    tx: watch::Sender<Option<Arc<CodeModel>>>,
}

impl ModelChannel {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub(crate) fn publish(&self, model: CodeModel) -> Arc<CodeModel> {
        let model = Arc::new(model);
        self.tx.send_replace(Some(model.clone()));
        model
    }

    pub(crate) fn current(&self) -> Option<Arc<CodeModel>> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<Arc<CodeModel>>> {
        self.tx.subscribe()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use cmt_core::{Project, Target};
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Recorded driver call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DriverCall {
        Configure(Vec<String>),
        Generate,
        Build(Option<String>),
        Dispose,
    }

    /// `(project, call)` pairs, shareable between fakes to observe ordering
    pub type CallLog = Arc<Mutex<Vec<(String, DriverCall)>>>;

    /// Fake driver for testing
    ///
    /// Clones share their call log and failure set.
    #[derive(Clone)]
    pub struct FakeDriver {
        settings: ProjectSettings,
        model: CodeModel,
        cache: CacheMap,
        log: CallLog,
        failing: Arc<Mutex<HashSet<Option<String>>>>,
        models: Arc<ModelChannel>,
    }

    impl FakeDriver {
        /// Driver whose generate publishes one project with an `all` target.
        pub fn new(project: &str) -> Self {
            let mut model = CodeModel::default();
            let mut p = Project::new(project);
            p.push_target(Target::utility("all", project.into()));
            model.push_project(p);
            Self {
                settings: ProjectSettings::new(project, project, format!("{project}/build")),
                model,
                cache: CacheMap::new(),
                log: CallLog::default(),
                failing: Arc::default(),
                models: Arc::new(ModelChannel::new()),
            }
        }

        pub fn with_model(mut self, model: CodeModel) -> Self {
            self.model = model;
            self
        }

        pub fn with_log(mut self, log: CallLog) -> Self {
            self.log = log;
            self
        }

        /// Make `build(target)` fail.
        pub fn fail_build(&self, target: Option<&str>) {
            self.failing.lock().insert(target.map(String::from));
        }

        /// Calls made on this project, in order
        pub fn calls(&self) -> Vec<DriverCall> {
            self.log
                .lock()
                .iter()
                .filter(|(project, _)| *project == self.settings.name)
                .map(|(_, call)| call.clone())
                .collect()
        }

        fn record(&self, call: DriverCall) {
            self.log.lock().push((self.settings.name.clone(), call));
        }
    }

    #[async_trait]
    impl Driver for FakeDriver {
        fn settings(&self) -> &ProjectSettings {
            &self.settings
        }

        async fn configure(&mut self, extra_args: &[String]) -> Result<(), DriverError> {
            self.record(DriverCall::Configure(extra_args.to_vec()));
            Ok(())
        }

        async fn generate(&mut self) -> Result<(), DriverError> {
            self.record(DriverCall::Generate);
            self.models.publish(self.model.clone());
            Ok(())
        }

        async fn build(&mut self, target: Option<&str>) -> Result<(), DriverError> {
            self.record(DriverCall::Build(target.map(String::from)));
            if self.failing.lock().contains(&target.map(String::from)) {
                return Err(DriverError::Build(BuildError::Failed {
                    program: "cmake".to_string(),
                    code: 1,
                }));
            }
            Ok(())
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
            self.record(DriverCall::Dispose);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{CallLog, DriverCall, FakeDriver};

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
