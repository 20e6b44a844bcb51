//! Explicit core context.
//!
//! # Responsibility
//! - Carry configuration, the note-graph handle and the shared classifier to
//!   every component constructor.
//! - Replace process-wide mutable plugin state with one owned value.
//!
//! # Invariants
//! - The note-graph handle is always wrapped in `GuardedNoteGraph`, so no
//!   component can block on the graph past `graph_timeout_ms`.

use crate::classifier::{ClassifierResult, SharedClassifier, TermFrequencyClassifier};
use crate::config::{ConfigError, CoreConfig};
use crate::db::{open_db, open_db_in_memory};
use crate::graph::{GuardedNoteGraph, NoteGraphStore, RetryPolicy};
use crate::service::dual_store::{DualStoreRepository, StoreResult};
use log::info;
use std::sync::Arc;

pub struct CoreContext {
    config: CoreConfig,
    graph: Arc<dyn NoteGraphStore>,
    classifier: Arc<SharedClassifier>,
}

impl CoreContext {
    /// Validates `config` and guards `graph` with the configured timeout.
    ///
    /// The classifier slot starts empty; call `install_default_classifier`
    /// (or install a custom model) before classifying.
    pub fn new(config: CoreConfig, graph: Arc<dyn NoteGraphStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        let guarded = GuardedNoteGraph::new(graph, config.graph_timeout());
        Ok(Self {
            config,
            graph: Arc::new(guarded),
            classifier: Arc::new(SharedClassifier::uninitialized()),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn graph(&self) -> Arc<dyn NoteGraphStore> {
        Arc::clone(&self.graph)
    }

    pub fn classifier(&self) -> Arc<SharedClassifier> {
        Arc::clone(&self.classifier)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry_policy()
    }

    /// Installs a fresh `TermFrequencyClassifier`.
    pub fn install_default_classifier(&self) -> ClassifierResult<()> {
        self.classifier
            .install(Box::new(TermFrequencyClassifier::new()))
    }

    /// Opens the configured local store and wraps it in a dual-store repository.
    pub fn open_repository(&self) -> StoreResult<DualStoreRepository> {
        let conn = match &self.config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        info!(
            "event=repository_open module=context status=ok persistent={}",
            self.config.db_path.is_some()
        );
        DualStoreRepository::new(conn, self)
    }
}
