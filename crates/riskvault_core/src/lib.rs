//! Core domain logic for riskvault.
//! Risk ranking, document classification and the dual-store consistency
//! rules live here; frontends only call into this crate.

pub mod classifier;
pub mod config;
pub mod context;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod parser;
pub mod ranking;
pub mod repo;
pub mod service;

pub use classifier::{
    ClassifierError, ClassifierResult, IncrementalClassifier, SharedClassifier,
    TermFrequencyClassifier,
};
pub use config::{ConfigError, CoreConfig};
pub use context::CoreContext;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use graph::{
    GraphError, GraphResult, GuardedNoteGraph, InMemoryNoteGraph, NoteGraphStore, RetryPolicy,
};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::contact::Contact;
pub use model::document::{Classification, Document, Label, NewDocument};
pub use model::note::{Note, NotePatch, RISK_TAG};
pub use model::risk::{NewRisk, RankingTier, Risk, RiskMatrix, RiskPatch};
pub use model::RecordId;
pub use parser::note_parser::{format_note, parse_note, MalformedNoteError, MalformedReason};
pub use ranking::rank;
pub use repo::{RepoError, RepoResult};
pub use service::classification_service::{
    ClassificationError, ClassificationResult, ClassificationService,
};
pub use service::dual_store::{
    BatchFailure, BatchReport, ContactPatch, DocumentPatch, DualStoreRepository, StoreError,
    StoreResult,
};
pub use service::ingest_service::{
    IngestError, IngestOutcome, IngestStage, RiskIngestor, RiskObserved,
};

/// Minimal health-check API for frontends.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
