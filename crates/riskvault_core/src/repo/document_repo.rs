//! Document repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `label` and `classification_state` are both NULL or both set.
//! - Persisted state strings are `predicted|corrected` only.

use crate::model::document::{Classification, Document};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    content,
    label,
    classification_state
FROM documents";

/// Repository interface for documents.
pub trait DocumentStore {
    fn insert_document(&self, document: &Document) -> RepoResult<()>;
    fn update_document(&self, document: &Document) -> RepoResult<()>;
    fn get_document(&self, id: &str) -> RepoResult<Option<Document>>;
    fn delete_document(&self, id: &str) -> RepoResult<()>;
    fn list_documents(&self) -> RepoResult<Vec<Document>>;
    /// Documents whose label was supplied by the user, oldest update first.
    fn list_corrected(&self) -> RepoResult<Vec<Document>>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_documents(&self, sql: &str) -> RepoResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn insert_document(&self, document: &Document) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1);",
            [document.id.as_str()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            return Err(RepoError::Duplicate(document.id.clone()));
        }

        let (label, state) = classification_columns(document.classification.as_ref());
        self.conn.execute(
            "INSERT INTO documents (id, content, label, classification_state)
             VALUES (?1, ?2, ?3, ?4);",
            params![document.id, document.content, label, state],
        )?;
        Ok(())
    }

    fn update_document(&self, document: &Document) -> RepoResult<()> {
        let (label, state) = classification_columns(document.classification.as_ref());
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                content = ?2,
                label = ?3,
                classification_state = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![document.id, document.content, label, state],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(document.id.clone()));
        }
        Ok(())
    }

    fn get_document(&self, id: &str) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_document_row(row)?)),
            None => Ok(None),
        }
    }

    fn delete_document(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_documents(&self) -> RepoResult<Vec<Document>> {
        self.query_documents(&format!(
            "{DOCUMENT_SELECT_SQL} ORDER BY created_at ASC, id ASC;"
        ))
    }

    fn list_corrected(&self) -> RepoResult<Vec<Document>> {
        self.query_documents(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE classification_state = 'corrected'
             ORDER BY updated_at ASC, id ASC;"
        ))
    }
}

fn classification_columns(
    classification: Option<&Classification>,
) -> (Option<&str>, Option<&'static str>) {
    match classification {
        Some(value) => (Some(value.label()), Some(value.state_str())),
        None => (None, None),
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let label: Option<String> = row.get("label")?;
    let state: Option<String> = row.get("classification_state")?;
    let classification = match (label, state.as_deref()) {
        (None, None) => None,
        (Some(label), Some("predicted")) => Some(Classification::Predicted(label)),
        (Some(label), Some("corrected")) => Some(Classification::Corrected(label)),
        (label, state) => {
            return Err(RepoError::InvalidData(format!(
                "invalid classification pair label={label:?} state={state:?} in documents"
            )));
        }
    };

    Ok(Document {
        id: row.get("id")?,
        content: row.get("content")?,
        classification,
    })
}
