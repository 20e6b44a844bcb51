#![allow(dead_code)]

use riskvault_core::db::open_db_in_memory;
use riskvault_core::{
    DualStoreRepository, GraphError, GraphResult, InMemoryNoteGraph, Note, NoteGraphStore,
    NotePatch, RetryPolicy,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Note-graph double with scripted failures on top of `InMemoryNoteGraph`.
#[derive(Default)]
pub struct ScriptedGraph {
    pub inner: InMemoryNoteGraph,
    rejected_updates: Mutex<HashSet<String>>,
    rejected_creates: Mutex<HashSet<String>>,
    unavailable_left: Mutex<HashMap<String, u32>>,
    connections: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_note(&self, id: &str, title: &str, body: &str) {
        self.inner.insert_note(Note::new(id, title, body)).unwrap();
    }

    /// Every `update_note` for `id` fails permanently.
    pub fn reject_updates_for(&self, id: &str) {
        self.rejected_updates.lock().unwrap().insert(id.to_string());
    }

    /// Every `create_note` for `id` fails permanently.
    pub fn reject_creates_for(&self, id: &str) {
        self.rejected_creates.lock().unwrap().insert(id.to_string());
    }

    /// The next `times` calls touching `id` fail with `Unavailable`.
    pub fn unavailable_for(&self, id: &str, times: u32) {
        self.unavailable_left
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }

    /// Overrides the link-derived connectivity count for `id`.
    pub fn set_connections(&self, id: &str, count: u32) {
        self.connections.lock().unwrap().insert(id.to_string(), count);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, operation: &str, id: &str) -> usize {
        let needle = format!("{operation}:{id}");
        self.calls().iter().filter(|call| **call == needle).count()
    }

    fn record(&self, operation: &str, id: &str) -> GraphResult<()> {
        self.calls.lock().unwrap().push(format!("{operation}:{id}"));
        let mut left = self.unavailable_left.lock().unwrap();
        if let Some(remaining) = left.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GraphError::Unavailable(format!("{operation} {id}")));
            }
        }
        Ok(())
    }
}

impl NoteGraphStore for ScriptedGraph {
    fn search(&self, query: &str) -> GraphResult<Vec<Note>> {
        self.record("search", query)?;
        self.inner.search(query)
    }

    fn create_note(&self, note: &Note) -> GraphResult<()> {
        self.record("create_note", &note.id)?;
        if self.rejected_creates.lock().unwrap().contains(&note.id) {
            return Err(GraphError::Rejected(format!("create {}", note.id)));
        }
        self.inner.create_note(note)
    }

    fn update_note(&self, note_id: &str, patch: &NotePatch) -> GraphResult<()> {
        self.record("update_note", note_id)?;
        if self.rejected_updates.lock().unwrap().contains(note_id) {
            return Err(GraphError::Rejected(format!("update {note_id}")));
        }
        self.inner.update_note(note_id, patch)
    }

    fn delete_note(&self, note_id: &str) -> GraphResult<()> {
        self.record("delete_note", note_id)?;
        self.inner.delete_note(note_id)
    }

    fn count_connections(&self, note_id: &str) -> GraphResult<u32> {
        self.record("count_connections", note_id)?;
        if let Some(count) = self.connections.lock().unwrap().get(note_id) {
            return Ok(*count);
        }
        self.inner.count_connections(note_id)
    }
}

/// Retries quickly so tests exercising backoff stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    }
}

pub fn repo_over(graph: &Arc<ScriptedGraph>, retry: RetryPolicy) -> DualStoreRepository {
    let handle: Arc<dyn NoteGraphStore> = graph.clone();
    DualStoreRepository::with_parts(open_db_in_memory().unwrap(), handle, retry, "#risk").unwrap()
}

pub fn risk_body(description: &str, impact: &str) -> String {
    format!("{description}\n{impact}\n#risk")
}
