//! In-process note-graph store.
//!
//! # Invariants
//! - Notes iterate in id order, so `search` results are deterministic.
//! - A link is an ordered `(from, to)` pair; self-links are ignored.
//! - Title/tier patches on `#risk` notes keep the `"<Title> - <Tier>"` convention.

use super::{GraphError, GraphResult, NoteGraphStore};
use crate::model::note::{Note, NotePatch, RISK_TAG};
use crate::model::risk::RankingTier;
use crate::model::RecordId;
use crate::parser::note_parser::{format_title, TITLE_SEPARATOR};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Note plus store-side properties not carried in its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub note: Note,
    pub classification: Option<String>,
}

#[derive(Debug, Default)]
struct GraphState {
    notes: BTreeMap<RecordId, StoredNote>,
    links: BTreeSet<(RecordId, RecordId)>,
}

/// Thread-safe in-memory `NoteGraphStore`.
#[derive(Debug, Default)]
pub struct InMemoryNoteGraph {
    state: Mutex<GraphState>,
}

impl InMemoryNoteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user-authored note.
    pub fn insert_note(&self, note: Note) -> GraphResult<()> {
        let mut state = self.lock()?;
        state.notes.insert(
            note.id.clone(),
            StoredNote {
                note,
                classification: None,
            },
        );
        Ok(())
    }

    /// Adds a directed link between two existing notes.
    pub fn link(&self, from: &str, to: &str) -> GraphResult<()> {
        let mut state = self.lock()?;
        for id in [from, to] {
            if !state.notes.contains_key(id) {
                return Err(GraphError::NoteNotFound(id.to_string()));
            }
        }
        if from != to {
            state.links.insert((from.to_string(), to.to_string()));
        }
        Ok(())
    }

    /// Returns a snapshot of one note.
    pub fn note(&self, note_id: &str) -> Option<Note> {
        self.stored(note_id).map(|stored| stored.note)
    }

    /// Returns a snapshot of one note with store-side properties.
    pub fn stored(&self, note_id: &str) -> Option<StoredNote> {
        self.lock().ok()?.notes.get(note_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.notes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> GraphResult<MutexGuard<'_, GraphState>> {
        self.state
            .lock()
            .map_err(|_| GraphError::Unavailable("note graph state lock poisoned".to_string()))
    }
}

impl NoteGraphStore for InMemoryNoteGraph {
    fn search(&self, query: &str) -> GraphResult<Vec<Note>> {
        let state = self.lock()?;
        Ok(state
            .notes
            .values()
            .filter(|stored| stored.note.has_tag(query))
            .map(|stored| stored.note.clone())
            .collect())
    }

    fn create_note(&self, note: &Note) -> GraphResult<()> {
        let mut state = self.lock()?;
        if state.notes.contains_key(&note.id) {
            return Err(GraphError::Rejected(format!(
                "note already exists: {}",
                note.id
            )));
        }
        state.notes.insert(
            note.id.clone(),
            StoredNote {
                note: note.clone(),
                classification: None,
            },
        );
        Ok(())
    }

    fn update_note(&self, note_id: &str, patch: &NotePatch) -> GraphResult<()> {
        let mut state = self.lock()?;
        let stored = state
            .notes
            .get_mut(note_id)
            .ok_or_else(|| GraphError::NoteNotFound(note_id.to_string()))?;

        if let Some(classification) = &patch.classification {
            stored.classification = Some(classification.clone());
        }
        if patch.description.is_some() || patch.impact.is_some() {
            stored.note.body = patch_body_lines(
                &stored.note.body,
                patch.description.as_deref(),
                patch.impact.as_deref(),
            );
        }
        if patch.title.is_some() || patch.ranking_tier.is_some() {
            stored.note.title = if stored.note.has_tag(RISK_TAG) {
                patch_risk_title(&stored.note.title, patch.title.as_deref(), patch.ranking_tier)
            } else {
                patch.title.clone().unwrap_or_else(|| stored.note.title.clone())
            };
        }
        Ok(())
    }

    fn delete_note(&self, note_id: &str) -> GraphResult<()> {
        let mut state = self.lock()?;
        if state.notes.remove(note_id).is_none() {
            return Err(GraphError::NoteNotFound(note_id.to_string()));
        }
        state
            .links
            .retain(|(from, to)| from != note_id && to != note_id);
        Ok(())
    }

    fn count_connections(&self, note_id: &str) -> GraphResult<u32> {
        let state = self.lock()?;
        if !state.notes.contains_key(note_id) {
            return Err(GraphError::NoteNotFound(note_id.to_string()));
        }
        let count = state
            .links
            .iter()
            .filter(|(from, to)| from == note_id || to == note_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

fn patch_risk_title(current: &str, title: Option<&str>, tier: Option<RankingTier>) -> String {
    let mut segments = current.split(TITLE_SEPARATOR);
    let current_title = segments.next().unwrap_or_default().trim();
    let current_tier = segments.next().and_then(|value| value.parse::<RankingTier>().ok());
    format_title(title.unwrap_or(current_title), tier.or(current_tier))
}

fn patch_body_lines(body: &str, description: Option<&str>, impact: Option<&str>) -> String {
    let mut lines: Vec<String> = body.split('\n').map(str::to_string).collect();
    while lines.len() < 2 {
        lines.push(String::new());
    }
    if let Some(description) = description {
        lines[0] = description.to_string();
    }
    if let Some(impact) = impact {
        lines[1] = impact.to_string();
    }
    lines.join("\n")
}
