//! Domain records shared by parser, ranking, classifier and repositories.
//!
//! # Responsibility
//! - Define explicit structural types for notes, risks, documents and contacts.
//! - Keep identity rules in one place (`RecordId`, id generation).
//!
//! # Invariants
//! - Every record is identified by a stable, non-empty `RecordId`.
//! - Records are plain data; persistence and derivation live elsewhere.

pub mod contact;
pub mod document;
pub mod note;
pub mod risk;

/// Stable identifier shared by local records and their note-graph notes.
///
/// Note ids are opaque strings owned by the note-graph store, so this is not
/// a `Uuid`. Locally created records receive a UUID v4 string.
pub type RecordId = String;

/// Generates a fresh record id for records created on the local side.
pub fn new_record_id() -> RecordId {
    uuid::Uuid::new_v4().to_string()
}

/// Returns `Some(id)` with surrounding whitespace removed, or `None` when blank.
pub fn normalize_record_id(id: &str) -> Option<RecordId> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
