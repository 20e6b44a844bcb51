//! Contact repository contracts and SQLite implementation.
//!
//! Contact fields are stored as one JSON object column.

use crate::model::contact::Contact;
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

/// Repository interface for contacts.
pub trait ContactStore {
    fn insert_contact(&self, contact: &Contact) -> RepoResult<()>;
    fn update_contact(&self, contact: &Contact) -> RepoResult<()>;
    fn get_contact(&self, id: &str) -> RepoResult<Option<Contact>>;
    fn delete_contact(&self, id: &str) -> RepoResult<()>;
    fn list_contacts(&self) -> RepoResult<Vec<Contact>>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ContactStore for SqliteContactStore<'_> {
    fn insert_contact(&self, contact: &Contact) -> RepoResult<()> {
        if self.get_contact(&contact.id)?.is_some() {
            return Err(RepoError::Duplicate(contact.id.clone()));
        }
        self.conn.execute(
            "INSERT INTO contacts (id, fields_json) VALUES (?1, ?2);",
            params![contact.id, encode_fields(contact)?],
        )?;
        Ok(())
    }

    fn update_contact(&self, contact: &Contact) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE contacts
             SET fields_json = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![contact.id, encode_fields(contact)?],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(contact.id.clone()));
        }
        Ok(())
    }

    fn get_contact(&self, id: &str) -> RepoResult<Option<Contact>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, fields_json FROM contacts WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_contact_row(row)?)),
            None => Ok(None),
        }
    }

    fn delete_contact(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM contacts WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, fields_json FROM contacts ORDER BY created_at ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(parse_contact_row(row)?);
        }
        Ok(contacts)
    }
}

fn encode_fields(contact: &Contact) -> RepoResult<String> {
    serde_json::to_string(&contact.fields).map_err(|err| {
        RepoError::InvalidData(format!("cannot encode contact `{}` fields: {err}", contact.id))
    })
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let id: String = row.get("id")?;
    let raw: String = row.get("fields_json")?;
    let fields: BTreeMap<String, String> = serde_json::from_str(&raw).map_err(|err| {
        RepoError::InvalidData(format!("invalid fields_json for contact `{id}`: {err}"))
    })?;
    Ok(Contact { id, fields })
}
