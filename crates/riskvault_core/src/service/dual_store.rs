//! Dual-store repository for risks, documents and contacts.
//!
//! # Responsibility
//! - Keep the in-memory risk collection, the local SQLite store and the
//!   note-graph store in step.
//! - Report every write-through failure; never hide one.
//!
//! # Invariants
//! - Writes go local first, then write-through to the note graph. A failed
//!   write-through is reported but the local write is kept.
//! - `update`/`delete` on an unknown id fail with `NotFound` before touching
//!   either store or the in-memory collection.
//! - Batch operations attempt every item and collect per-item failures.
//! - The note graph is authoritative for note-derived risk fields; the local
//!   store is authoritative for categories.
//! - A `Corrected` document label is only ever replaced by another correction.
//!
//! # See also
//! - `crate::service::ingest_service` for event-driven risk ingestion.

use crate::classifier::{ClassifierError, SharedClassifier};
use crate::context::CoreContext;
use crate::db::DbError;
use crate::graph::{GraphError, NoteGraphStore, RetryPolicy};
use crate::model::contact::Contact;
use crate::model::document::{Classification, Document, NewDocument};
use crate::model::note::{Note, NotePatch};
use crate::model::risk::{NewRisk, Risk, RiskMatrix, RiskPatch};
use crate::model::{new_record_id, normalize_record_id, RecordId};
use crate::parser::note_parser::{format_note, parse_note, validate_note_fields, MalformedNoteError};
use crate::repo::contact_repo::{ContactStore, SqliteContactStore};
use crate::repo::document_repo::{DocumentStore, SqliteDocumentStore};
use crate::repo::risk_repo::{RiskStore, SqliteRiskStore};
use crate::repo::{ensure_schema_ready, RepoError};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

const DOCUMENT_TITLE_MAX_CHARS: usize = 80;

pub type StoreResult<T> = Result<T, StoreError>;

/// Dual-store operation errors.
#[derive(Debug)]
pub enum StoreError {
    /// Record id is unknown to the local store.
    NotFound(RecordId),
    /// Record id already exists in the local store.
    Duplicate(RecordId),
    /// Risk references a category that was never added.
    UnknownCategory(String),
    /// Category name is blank.
    InvalidCategory(String),
    /// Record text would not survive the note text convention.
    Malformed(MalformedNoteError),
    /// Local store failure; nothing was written to the note graph.
    Local(RepoError),
    /// Local write kept, note-graph write failed after retries.
    WriteThrough {
        record_id: RecordId,
        error: GraphError,
    },
    /// Note-graph read failed after retries.
    Graph(GraphError),
    /// Retraining on an edited corrected document failed; nothing was written.
    Classifier(ClassifierError),
}

impl StoreError {
    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Duplicate(_) => "duplicate",
            Self::UnknownCategory(_) => "unknown_category",
            Self::InvalidCategory(_) => "invalid_category",
            Self::Malformed(_) => "malformed_note",
            Self::Local(_) => "local_store_failed",
            Self::WriteThrough { error, .. } | Self::Graph(error) => error.code(),
            Self::Classifier(_) => "classifier_failed",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Duplicate(id) => write!(f, "record already exists: {id}"),
            Self::UnknownCategory(name) => write!(f, "unknown risk category: {name}"),
            Self::InvalidCategory(name) => write!(f, "invalid risk category: `{name}`"),
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Local(err) => write!(f, "local store: {err}"),
            Self::WriteThrough { record_id, error } => write!(
                f,
                "record `{record_id}` saved locally but note graph write failed: {error}"
            ),
            Self::Graph(err) => write!(f, "{err}"),
            Self::Classifier(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Local(err) => Some(err),
            Self::WriteThrough { error, .. } | Self::Graph(error) => Some(error),
            Self::Classifier(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Duplicate(id) => Self::Duplicate(id),
            other => Self::Local(other),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Local(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Local(RepoError::from(value))
    }
}

impl From<MalformedNoteError> for StoreError {
    fn from(value: MalformedNoteError) -> Self {
        Self::Malformed(value)
    }
}

/// One failed item inside a batch operation.
#[derive(Debug)]
pub struct BatchFailure {
    pub record_id: RecordId,
    pub error: StoreError,
}

/// Outcome of a batch operation that never stops at the first failure.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub persisted: Vec<RecordId>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_ids(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.record_id.as_str())
            .collect()
    }

    fn record(&mut self, record_id: &str, result: StoreResult<()>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.persisted.push(record_id.to_string()),
            Err(error) => self.failures.push(BatchFailure {
                record_id: record_id.to_string(),
                error,
            }),
        }
    }
}

/// Partial update for one document. Classification can change but never clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub content: Option<String>,
    pub classification: Option<Classification>,
}

/// Partial update for one contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub set: BTreeMap<String, String>,
    pub unset: Vec<String>,
}

/// Reconciles in-memory records with the local store and the note graph.
pub struct DualStoreRepository {
    conn: Connection,
    graph: Arc<dyn NoteGraphStore>,
    retry: RetryPolicy,
    risk_query: String,
    risks: Vec<Risk>,
    classifier: Option<Arc<SharedClassifier>>,
}

impl DualStoreRepository {
    /// Wraps a migrated connection using the context's graph and retry policy.
    pub fn new(conn: Connection, context: &CoreContext) -> StoreResult<Self> {
        Ok(Self::with_parts(
            conn,
            context.graph(),
            context.retry_policy(),
            context.config().risk_query.clone(),
        )?
        .with_classifier(context.classifier()))
    }

    /// Builds a repository from explicit parts.
    pub fn with_parts(
        conn: Connection,
        graph: Arc<dyn NoteGraphStore>,
        retry: RetryPolicy,
        risk_query: impl Into<String>,
    ) -> StoreResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self {
            conn,
            graph,
            retry,
            risk_query: risk_query.into(),
            risks: Vec::new(),
            classifier: None,
        })
    }

    /// Keeps `classifier` trained on corrected documents whose content is edited.
    pub fn with_classifier(mut self, classifier: Arc<SharedClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Local store connection, for read-only inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// In-memory risk collection in arrival order.
    pub fn in_memory_risks(&self) -> &[Risk] {
        &self.risks
    }

    // ---------------------------------------------------------------------
    // Risks
    // ---------------------------------------------------------------------

    /// Loads every risk note from the note graph.
    ///
    /// Malformed notes are skipped and reported; each parsed risk is
    /// reconciled into the local store (keeping its local category) and
    /// replaces the in-memory collection.
    ///
    /// # Errors
    /// - `StoreError::Graph` when the search itself fails after retries.
    pub fn load_risks(&mut self) -> StoreResult<BatchReport> {
        let started_at = Instant::now();
        let query = self.risk_query.clone();
        let notes = self
            .retry
            .run("search", &query, || self.graph.search(&query))
            .map_err(|err| {
                error!(
                    "event=risks_load module=store status=error error_code={} error={}",
                    err.code(),
                    err
                );
                StoreError::Graph(err)
            })?;

        let mut report = BatchReport::default();
        let mut loaded = Vec::with_capacity(notes.len());
        for note in &notes {
            let result = parse_note(note)
                .map_err(StoreError::from)
                .and_then(|risk| self.reconcile_local(risk));
            match result {
                Ok(risk) => {
                    report.record(&note.id, Ok(()));
                    loaded.push(risk);
                }
                Err(err) => {
                    warn!(
                        "event=risk_load_item module=store status=skipped note_id={} error_code={} error={}",
                        note.id,
                        err.code(),
                        err
                    );
                    report.record(&note.id, Err(err));
                }
            }
        }
        self.risks = loaded;

        info!(
            "event=risks_load module=store status=ok attempted={} loaded={} skipped={} duration_ms={}",
            report.attempted,
            report.persisted.len(),
            report.failures.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Adds a risk created by the user.
    ///
    /// # Errors
    /// - `Duplicate` when the id already exists locally.
    /// - `UnknownCategory` when `category` was never added.
    /// - `Malformed` when title/description/impact break the note convention.
    /// - `WriteThrough` when the note graph rejected the new note; the local
    ///   record and in-memory entry are kept.
    pub fn add_risk(&mut self, new_risk: NewRisk) -> StoreResult<Risk> {
        let id = new_risk
            .id
            .as_deref()
            .and_then(normalize_record_id)
            .unwrap_or_else(new_record_id);
        let risk = Risk {
            id,
            title: new_risk.title,
            ranking_tier: new_risk.ranking_tier,
            description: new_risk.description,
            impact: new_risk.impact,
            category: new_risk.category,
        };
        let note = format_note(&risk)?;
        self.ensure_category(risk.category.as_deref())?;

        SqliteRiskStore::try_new(&self.conn)?.insert_risk(&risk)?;
        self.upsert_in_memory(risk.clone());
        debug!("event=risk_add module=store status=local_ok risk_id={}", risk.id);

        self.write_through(&risk.id, "create_note", |graph| graph.create_note(&note))?;
        Ok(risk)
    }

    /// Category stored locally for `risk_id`; `None` for unknown risks.
    pub fn stored_category(&self, risk_id: &str) -> StoreResult<Option<String>> {
        Ok(SqliteRiskStore::try_new(&self.conn)?
            .get_risk(risk_id)?
            .and_then(|stored| stored.category))
    }

    /// Appends a risk to the in-memory collection only.
    ///
    /// A risk with the same id is replaced in place so ids stay unique.
    pub fn append_risk(&mut self, risk: Risk) {
        self.upsert_in_memory(risk);
    }

    /// Persists one in-memory risk: local upsert, then note-graph update of
    /// title and tier.
    pub fn persist_risk(&mut self, risk_id: &str) -> StoreResult<()> {
        let risk = self
            .risks
            .iter()
            .find(|risk| risk.id == risk_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(risk_id.to_string()))?;

        SqliteRiskStore::try_new(&self.conn)?.upsert_note_fields(&risk)?;
        let patch = risk_note_patch(&risk);
        self.write_through(&risk.id, "update_note", |graph| {
            graph.update_note(&risk.id, &patch)
        })
    }

    /// Applies `patch` to one risk in both stores and in memory.
    ///
    /// # Errors
    /// - `NotFound` when `risk_id` is unknown locally; nothing changes.
    /// - `UnknownCategory`/`Malformed` before any write.
    /// - `WriteThrough` after the local write succeeded.
    pub fn update_risk(&mut self, risk_id: &str, patch: &RiskPatch) -> StoreResult<Risk> {
        let store = SqliteRiskStore::try_new(&self.conn)?;
        let mut risk = store
            .get_risk(risk_id)?
            .ok_or_else(|| StoreError::NotFound(risk_id.to_string()))?;
        if patch.is_empty() {
            return Ok(risk);
        }

        patch.apply_to(&mut risk);
        validate_note_fields(&risk)?;
        if let Some(category) = &patch.category {
            self.ensure_category(category.as_deref())?;
        }

        store.update_risk(&risk)?;
        self.upsert_in_memory(risk.clone());
        debug!("event=risk_update module=store status=local_ok risk_id={risk_id}");

        if patch.touches_note_fields() {
            let note_patch = NotePatch {
                title: patch.title.clone(),
                ranking_tier: patch.ranking_tier,
                description: patch.description.clone(),
                impact: patch.impact.clone(),
                classification: None,
            };
            self.write_through(risk_id, "update_note", |graph| {
                graph.update_note(risk_id, &note_patch)
            })?;
        }
        Ok(risk)
    }

    /// Removes one risk from both stores and from memory.
    pub fn delete_risk(&mut self, risk_id: &str) -> StoreResult<()> {
        SqliteRiskStore::try_new(&self.conn)?.delete_risk(risk_id)?;
        self.risks.retain(|risk| risk.id != risk_id);
        self.write_through_delete(risk_id)
    }

    pub fn get_risk(&self, risk_id: &str) -> StoreResult<Option<Risk>> {
        Ok(SqliteRiskStore::try_new(&self.conn)?.get_risk(risk_id)?)
    }

    /// Lists risks from the local store in insertion order.
    pub fn list_risks(&self) -> StoreResult<Vec<Risk>> {
        Ok(SqliteRiskStore::try_new(&self.conn)?.list_risks()?)
    }

    /// Writes every in-memory risk's title and tier to the note graph.
    ///
    /// Each risk is attempted independently; failures are collected.
    pub fn save_risks(&self) -> BatchReport {
        let started_at = Instant::now();
        let mut report = BatchReport::default();
        for risk in &self.risks {
            let patch = risk_note_patch(risk);
            let result = self
                .retry
                .run("update_note", &risk.id, || {
                    self.graph.update_note(&risk.id, &patch)
                })
                .map_err(|error| StoreError::WriteThrough {
                    record_id: risk.id.clone(),
                    error,
                });
            if let Err(err) = &result {
                warn!(
                    "event=risk_save_item module=store status=error risk_id={} error_code={} error={}",
                    risk.id,
                    err.code(),
                    err
                );
            }
            report.record(&risk.id, result);
        }

        let status = if report.is_complete() { "ok" } else { "partial" };
        info!(
            "event=risks_save module=store status={} attempted={} persisted={} failed={} duration_ms={}",
            status,
            report.attempted,
            report.persisted.len(),
            report.failures.len(),
            started_at.elapsed().as_millis()
        );
        report
    }

    // ---------------------------------------------------------------------
    // Risk matrix categories
    // ---------------------------------------------------------------------

    /// Adds a category; returns `false` when it already existed.
    pub fn add_category(&self, name: &str) -> StoreResult<bool> {
        let name = normalize_category(name)?;
        Ok(SqliteRiskStore::try_new(&self.conn)?.insert_category(&name)?)
    }

    /// Removes a category; its risks become uncategorized.
    pub fn remove_category(&mut self, name: &str) -> StoreResult<()> {
        SqliteRiskStore::try_new(&self.conn)?.delete_category(name)?;
        for risk in &mut self.risks {
            if risk.category.as_deref() == Some(name) {
                risk.category = None;
            }
        }
        Ok(())
    }

    /// Assigns (or clears) one risk's category. Local store only.
    pub fn set_risk_category(&mut self, risk_id: &str, category: Option<&str>) -> StoreResult<Risk> {
        let patch = RiskPatch {
            category: Some(category.map(str::to_string)),
            ..RiskPatch::default()
        };
        self.update_risk(risk_id, &patch)
    }

    /// Reads the risk matrix from the local store.
    pub fn risk_matrix(&self) -> StoreResult<RiskMatrix> {
        let store = SqliteRiskStore::try_new(&self.conn)?;
        Ok(RiskMatrix {
            categories: store.list_categories()?,
            risks: store.list_risks()?,
        })
    }

    // ---------------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------------

    pub fn add_document(&mut self, new_document: NewDocument) -> StoreResult<Document> {
        let id = new_document
            .id
            .as_deref()
            .and_then(normalize_record_id)
            .unwrap_or_else(new_record_id);
        let document = Document::new(id, new_document.content);

        SqliteDocumentStore::try_new(&self.conn)?.insert_document(&document)?;
        debug!(
            "event=document_add module=store status=local_ok doc_id={}",
            document.id
        );

        let note = Note::new(
            document.id.clone(),
            document_note_title(&document),
            document.content.clone(),
        );
        self.write_through(&document.id, "create_note", |graph| graph.create_note(&note))?;
        Ok(document)
    }

    /// Applies `patch` to one document. Only a classification change is
    /// mirrored to the note graph.
    ///
    /// A `Predicted` label never replaces a stored `Corrected` one. Editing
    /// the content of a corrected document retrains the classifier first.
    pub fn update_document(
        &mut self,
        document_id: &str,
        patch: &DocumentPatch,
    ) -> StoreResult<Document> {
        let store = SqliteDocumentStore::try_new(&self.conn)?;
        let mut document = store
            .get_document(document_id)?
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;

        let content_changed = patch
            .content
            .as_ref()
            .is_some_and(|content| *content != document.content);
        if let Some(content) = &patch.content {
            document.content = content.clone();
        }
        let label_changed = match &patch.classification {
            Some(Classification::Predicted(label)) => document.apply_prediction(label.clone()),
            Some(corrected @ Classification::Corrected(label)) => {
                let changed = document.classification.as_ref() != Some(corrected);
                document.apply_correction(label.clone());
                changed
            }
            None => false,
        };
        if content_changed {
            self.retrain_corrected(&document)?;
        }
        store.update_document(&document)?;

        if label_changed {
            let note_patch = NotePatch {
                classification: document.label().map(str::to_string),
                ..NotePatch::default()
            };
            self.write_through(document_id, "update_note", |graph| {
                graph.update_note(document_id, &note_patch)
            })?;
        }
        Ok(document)
    }

    pub fn delete_document(&mut self, document_id: &str) -> StoreResult<()> {
        SqliteDocumentStore::try_new(&self.conn)?.delete_document(document_id)?;
        self.write_through_delete(document_id)
    }

    pub fn get_document(&self, document_id: &str) -> StoreResult<Option<Document>> {
        Ok(SqliteDocumentStore::try_new(&self.conn)?.get_document(document_id)?)
    }

    pub fn list_documents(&self) -> StoreResult<Vec<Document>> {
        Ok(SqliteDocumentStore::try_new(&self.conn)?.list_documents()?)
    }

    /// Documents carrying a user correction, oldest update first.
    pub fn list_corrected_documents(&self) -> StoreResult<Vec<Document>> {
        Ok(SqliteDocumentStore::try_new(&self.conn)?.list_corrected()?)
    }

    // ---------------------------------------------------------------------
    // Contacts
    // ---------------------------------------------------------------------

    /// Adds a contact; a blank id is replaced with a generated one.
    pub fn add_contact(&mut self, contact: Contact) -> StoreResult<Contact> {
        let id = normalize_record_id(&contact.id).unwrap_or_else(new_record_id);
        let contact = Contact {
            id,
            fields: contact.fields,
        };

        SqliteContactStore::try_new(&self.conn)?.insert_contact(&contact)?;
        let note = Note::new(
            contact.id.clone(),
            contact.display_name().to_string(),
            contact_note_body(&contact),
        );
        self.write_through(&contact.id, "create_note", |graph| graph.create_note(&note))?;
        Ok(contact)
    }

    pub fn update_contact(&mut self, contact_id: &str, patch: &ContactPatch) -> StoreResult<Contact> {
        let store = SqliteContactStore::try_new(&self.conn)?;
        let mut contact = store
            .get_contact(contact_id)?
            .ok_or_else(|| StoreError::NotFound(contact_id.to_string()))?;

        let previous_name = contact.display_name().to_string();
        for key in &patch.unset {
            contact.fields.remove(key);
        }
        for (key, value) in &patch.set {
            contact.fields.insert(key.clone(), value.clone());
        }
        store.update_contact(&contact)?;

        if contact.display_name() != previous_name {
            let note_patch = NotePatch {
                title: Some(contact.display_name().to_string()),
                ..NotePatch::default()
            };
            self.write_through(contact_id, "update_note", |graph| {
                graph.update_note(contact_id, &note_patch)
            })?;
        }
        Ok(contact)
    }

    pub fn delete_contact(&mut self, contact_id: &str) -> StoreResult<()> {
        SqliteContactStore::try_new(&self.conn)?.delete_contact(contact_id)?;
        self.write_through_delete(contact_id)
    }

    pub fn get_contact(&self, contact_id: &str) -> StoreResult<Option<Contact>> {
        Ok(SqliteContactStore::try_new(&self.conn)?.get_contact(contact_id)?)
    }

    pub fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
        Ok(SqliteContactStore::try_new(&self.conn)?.list_contacts()?)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn reconcile_local(&self, mut risk: Risk) -> StoreResult<Risk> {
        let store = SqliteRiskStore::try_new(&self.conn)?;
        store.upsert_note_fields(&risk)?;
        risk.category = store
            .get_risk(&risk.id)?
            .and_then(|stored| stored.category);
        Ok(risk)
    }

    fn retrain_corrected(&self, document: &Document) -> StoreResult<()> {
        let (Some(classifier), Some(Classification::Corrected(label))) =
            (&self.classifier, &document.classification)
        else {
            return Ok(());
        };
        match classifier.update(document, label) {
            Ok(()) => {
                debug!(
                    "event=document_retrain module=store status=ok doc_id={}",
                    document.id
                );
                Ok(())
            }
            Err(ClassifierError::NotInitialized) => {
                debug!(
                    "event=document_retrain module=store status=skipped doc_id={} reason=not_initialized",
                    document.id
                );
                Ok(())
            }
            Err(err) => Err(StoreError::Classifier(err)),
        }
    }

    fn ensure_category(&self, category: Option<&str>) -> StoreResult<()> {
        let Some(category) = category else {
            return Ok(());
        };
        if SqliteRiskStore::try_new(&self.conn)?.category_exists(category)? {
            Ok(())
        } else {
            Err(StoreError::UnknownCategory(category.to_string()))
        }
    }

    fn upsert_in_memory(&mut self, risk: Risk) {
        match self.risks.iter_mut().find(|current| current.id == risk.id) {
            Some(current) => *current = risk,
            None => self.risks.push(risk),
        }
    }

    fn write_through(
        &self,
        record_id: &str,
        operation: &str,
        mut call: impl FnMut(&dyn NoteGraphStore) -> Result<(), GraphError>,
    ) -> StoreResult<()> {
        self.retry
            .run(operation, record_id, || call(self.graph.as_ref()))
            .map_err(|error| {
                error!(
                    "event=write_through module=store status=error operation={} record_id={} error_code={} error={}",
                    operation,
                    record_id,
                    error.code(),
                    error
                );
                StoreError::WriteThrough {
                    record_id: record_id.to_string(),
                    error,
                }
            })
    }

    fn write_through_delete(&self, record_id: &str) -> StoreResult<()> {
        match self.write_through(record_id, "delete_note", |graph| graph.delete_note(record_id)) {
            Err(StoreError::WriteThrough {
                error: GraphError::NoteNotFound(_),
                ..
            }) => {
                debug!("event=write_through module=store status=ok operation=delete_note record_id={record_id} note=already_absent");
                Ok(())
            }
            other => other,
        }
    }
}

fn risk_note_patch(risk: &Risk) -> NotePatch {
    NotePatch {
        title: Some(risk.title.clone()),
        ranking_tier: risk.ranking_tier,
        ..NotePatch::default()
    }
}

fn normalize_category(name: &str) -> StoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidCategory(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn document_note_title(document: &Document) -> String {
    document
        .content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(DOCUMENT_TITLE_MAX_CHARS).collect())
        .unwrap_or_else(|| document.id.clone())
}

fn contact_note_body(contact: &Contact) -> String {
    contact
        .fields
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{contact_note_body, document_note_title, normalize_category, StoreError};
    use crate::model::contact::Contact;
    use crate::model::document::Document;

    #[test]
    fn document_title_uses_first_non_blank_line() {
        let document = Document::new("d1", "\n  Quarterly audit  \nbody");
        assert_eq!(document_note_title(&document), "Quarterly audit");
    }

    #[test]
    fn document_title_falls_back_to_id() {
        let document = Document::new("d1", "  \n ");
        assert_eq!(document_note_title(&document), "d1");
    }

    #[test]
    fn document_title_is_capped() {
        let document = Document::new("d1", "x".repeat(200));
        assert_eq!(document_note_title(&document).chars().count(), 80);
    }

    #[test]
    fn blank_category_is_rejected() {
        assert!(matches!(
            normalize_category("   "),
            Err(StoreError::InvalidCategory(_))
        ));
        assert_eq!(normalize_category(" Ops ").unwrap(), "Ops");
    }

    #[test]
    fn contact_body_lists_fields_in_key_order() {
        let contact = Contact::new("c1")
            .with_field("name", "Ada")
            .with_field("email", "ada@example.org");
        assert_eq!(contact_note_body(&contact), "email: ada@example.org\nname: Ada");
    }
}
