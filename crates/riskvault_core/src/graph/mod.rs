//! Note-graph store boundary.
//!
//! # Responsibility
//! - Define the `NoteGraphStore` collaborator contract used by core services.
//! - Bound slow stores with a timeout guard and retry transient failures.
//!
//! # Invariants
//! - Implementations must be `Send + Sync`; services share them via `Arc`.
//! - Only `Timeout` and `Unavailable` failures are retried.

pub mod guard;
pub mod memory;
pub mod retry;

use crate::model::note::{Note, NotePatch};
use crate::model::RecordId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use guard::GuardedNoteGraph;
pub use memory::InMemoryNoteGraph;
pub use retry::RetryPolicy;

pub type GraphResult<T> = Result<T, GraphError>;

/// Failures reported by a note-graph store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Call did not finish within the configured bound.
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    /// Store could not be reached.
    Unavailable(String),
    /// Target note does not exist in the graph.
    NoteNotFound(RecordId),
    /// Store refused the request.
    Rejected(String),
}

impl GraphError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }

    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "store_timeout",
            Self::Unavailable(_) => "store_unavailable",
            Self::NoteNotFound(_) => "note_not_found",
            Self::Rejected(_) => "store_rejected",
        }
    }
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout {
                operation,
                timeout_ms,
            } => write!(f, "note graph `{operation}` timed out after {timeout_ms}ms"),
            Self::Unavailable(message) => write!(f, "note graph unavailable: {message}"),
            Self::NoteNotFound(id) => write!(f, "note not found in graph: {id}"),
            Self::Rejected(message) => write!(f, "note graph rejected request: {message}"),
        }
    }
}

impl Error for GraphError {}

/// Collaborator contract for the external note-graph store.
pub trait NoteGraphStore: Send + Sync {
    /// Returns notes matching `query` (core issues tag queries such as `#risk`).
    fn search(&self, query: &str) -> GraphResult<Vec<Note>>;

    /// Creates a note; fails with `Rejected` when the id already exists.
    fn create_note(&self, note: &Note) -> GraphResult<()>;

    /// Applies a partial field update to an existing note.
    fn update_note(&self, note_id: &str, patch: &NotePatch) -> GraphResult<()>;

    /// Removes a note and its links.
    fn delete_note(&self, note_id: &str) -> GraphResult<()>;

    /// Number of inbound plus outbound links of a note.
    fn count_connections(&self, note_id: &str) -> GraphResult<u32>;
}
