//! Event-driven risk ingestion.
//!
//! # Responsibility
//! - Turn `RiskObserved` events into ranked, persisted risks.
//! - Report the stage at which each failed event stopped.
//!
//! # Invariants
//! - Events are handled strictly in arrival order, one at a time.
//! - Ranking always uses a connectivity count fetched for that event.
//! - A failure in one event never prevents later events from running.
//! - Re-ingesting a known risk keeps its locally stored category in memory.

use crate::context::CoreContext;
use crate::graph::{GraphError, NoteGraphStore, RetryPolicy};
use crate::model::note::Note;
use crate::model::risk::Risk;
use crate::model::RecordId;
use crate::parser::note_parser::{parse_note, MalformedNoteError};
use crate::ranking::rank;
use crate::service::dual_store::{BatchFailure, BatchReport, DualStoreRepository, StoreError};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// External notification that a risk note appeared or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskObserved {
    pub note: Note,
}

impl RiskObserved {
    pub fn new(note: Note) -> Self {
        Self { note }
    }
}

/// Per-event lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestStage {
    Received,
    Parsed,
    Ranked,
    Appended,
    Persisted,
}

impl IngestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Parsed => "parsed",
            Self::Ranked => "ranked",
            Self::Appended => "appended",
            Self::Persisted => "persisted",
        }
    }
}

impl Display for IngestStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum IngestError {
    Malformed(MalformedNoteError),
    Connectivity(GraphError),
    Store(StoreError),
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_note",
            Self::Connectivity(err) => err.code(),
            Self::Store(err) => err.code(),
        }
    }
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Connectivity(err) => write!(f, "connectivity lookup failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Connectivity(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

/// Final result of one event.
#[derive(Debug)]
pub enum IngestOutcome {
    Persisted(Risk),
    /// `stage` is the step that failed; earlier steps completed.
    Failed {
        note_id: RecordId,
        stage: IngestStage,
        error: IngestError,
    },
}

impl IngestOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }

    pub fn risk(&self) -> Option<&Risk> {
        match self {
            Self::Persisted(risk) => Some(risk),
            Self::Failed { .. } => None,
        }
    }
}

/// FIFO coordinator between note events, ranking and the repository.
pub struct RiskIngestor {
    graph: Arc<dyn NoteGraphStore>,
    retry: RetryPolicy,
    queue: VecDeque<RiskObserved>,
}

impl RiskIngestor {
    pub fn new(context: &CoreContext) -> Self {
        Self::with_parts(context.graph(), context.retry_policy())
    }

    pub fn with_parts(graph: Arc<dyn NoteGraphStore>, retry: RetryPolicy) -> Self {
        Self {
            graph,
            retry,
            queue: VecDeque::new(),
        }
    }

    /// Queues one event; it is handled after every earlier event.
    pub fn submit(&mut self, event: RiskObserved) {
        debug!(
            "event=ingest_submit module=ingest status=ok note_id={} queued={}",
            event.note.id,
            self.queue.len() + 1
        );
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Handles the oldest queued event; `None` when the queue is empty.
    pub fn process_next(&mut self, repo: &mut DualStoreRepository) -> Option<IngestOutcome> {
        let event = self.queue.pop_front()?;
        Some(self.handle(event, repo))
    }

    /// Handles every queued event in arrival order.
    pub fn drain(&mut self, repo: &mut DualStoreRepository) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(outcome) = self.process_next(repo) {
            outcomes.push(outcome);
        }
        let persisted = outcomes.iter().filter(|o| o.is_persisted()).count();
        info!(
            "event=ingest_drain module=ingest status=ok processed={} persisted={} failed={}",
            outcomes.len(),
            persisted,
            outcomes.len() - persisted
        );
        outcomes
    }

    /// Runs one event through every stage immediately, bypassing the queue.
    pub fn handle(&self, event: RiskObserved, repo: &mut DualStoreRepository) -> IngestOutcome {
        let note_id = event.note.id.clone();
        debug!(
            "event=ingest_event module=ingest status=start note_id={note_id} stage={}",
            IngestStage::Received
        );

        let mut risk = match parse_note(&event.note) {
            Ok(risk) => risk,
            Err(err) => return fail(note_id, IngestStage::Parsed, IngestError::Malformed(err)),
        };

        let connections = match self.connectivity(&risk.id) {
            Ok(count) => count,
            Err(err) => return fail(note_id, IngestStage::Ranked, IngestError::Connectivity(err)),
        };
        let tier = rank(connections);
        risk.ranking_tier = Some(tier);

        // Notes never carry a category; the local store owns it.
        risk.category = match repo.stored_category(&risk.id) {
            Ok(category) => category,
            Err(err) => return fail(note_id, IngestStage::Appended, IngestError::Store(err)),
        };
        repo.append_risk(risk.clone());

        if let Err(err) = repo.persist_risk(&risk.id) {
            return fail(note_id, IngestStage::Persisted, IngestError::Store(err));
        }

        info!(
            "event=ingest_event module=ingest status=ok note_id={note_id} stage={} connections={connections} tier={tier}",
            IngestStage::Persisted
        );
        IngestOutcome::Persisted(risk)
    }

    /// Re-ranks every in-memory risk from fresh connectivity counts and
    /// persists each one. Failures are collected per risk.
    pub fn rerank_all(&self, repo: &mut DualStoreRepository) -> BatchReport {
        let risks: Vec<Risk> = repo.in_memory_risks().to_vec();
        let mut report = BatchReport::default();
        for mut risk in risks {
            report.attempted += 1;
            let result = self
                .connectivity(&risk.id)
                .map_err(StoreError::Graph)
                .and_then(|connections| {
                    risk.ranking_tier = Some(rank(connections));
                    repo.append_risk(risk.clone());
                    repo.persist_risk(&risk.id)
                });
            match result {
                Ok(()) => report.persisted.push(risk.id),
                Err(error) => {
                    warn!(
                        "event=risk_rerank_item module=ingest status=error risk_id={} error_code={} error={}",
                        risk.id,
                        error.code(),
                        error
                    );
                    report.failures.push(BatchFailure {
                        record_id: risk.id,
                        error,
                    });
                }
            }
        }
        info!(
            "event=risks_rerank module=ingest status={} attempted={} persisted={} failed={}",
            if report.is_complete() { "ok" } else { "partial" },
            report.attempted,
            report.persisted.len(),
            report.failures.len()
        );
        report
    }

    fn connectivity(&self, note_id: &str) -> Result<u32, GraphError> {
        self.retry.run("count_connections", note_id, || {
            self.graph.count_connections(note_id)
        })
    }
}

fn fail(note_id: RecordId, stage: IngestStage, error: IngestError) -> IngestOutcome {
    warn!(
        "event=ingest_event module=ingest status=error note_id={} stage={} error_code={} error={}",
        note_id,
        stage,
        error.code(),
        error
    );
    IngestOutcome::Failed {
        note_id,
        stage,
        error,
    }
}
