//! Local SQLite store holding risks, categories, documents and contacts.
//!
//! The note graph stays the source of note text; this store keeps the
//! records that must survive without it (categories, corrected labels,
//! contact fields) and answers every local read.
//!
//! # Invariants
//! - `open_db*` hands out connections already at the latest schema.
//! - A file written by a newer build is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or migrate the local store.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// File carries a schema this build does not know.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "local store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
