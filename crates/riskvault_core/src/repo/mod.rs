//! Local structured store repositories.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per record kind.
//! - Isolate SQLite query details from dual-store orchestration.
//!
//! # Invariants
//! - Repositories only accept connections migrated to `latest_version()`.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to DB transport errors.

pub mod contact_repo;
pub mod document_repo;
pub mod risk_repo;

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::RecordId;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Local store error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(RecordId),
    Duplicate(RecordId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Duplicate(id) => write!(f, "record already exists: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "local store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that were not opened through `db::open_db*`.
pub fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
