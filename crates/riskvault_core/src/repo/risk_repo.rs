//! Risk matrix repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Risks list in insertion order (`position ASC`).
//! - `upsert_note_fields` never touches `category`; the local store owns it.
//! - Deleting a category leaves its risks uncategorized (FK `SET NULL`).

use crate::model::risk::{RankingTier, Risk};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RISK_SELECT_SQL: &str = "SELECT
    id,
    title,
    ranking_tier,
    description,
    impact,
    category
FROM risks";

/// Repository interface for the local risk matrix.
pub trait RiskStore {
    fn insert_risk(&self, risk: &Risk) -> RepoResult<()>;
    /// Inserts or refreshes note-derived fields, keeping any stored category.
    fn upsert_note_fields(&self, risk: &Risk) -> RepoResult<()>;
    fn update_risk(&self, risk: &Risk) -> RepoResult<()>;
    fn get_risk(&self, id: &str) -> RepoResult<Option<Risk>>;
    fn delete_risk(&self, id: &str) -> RepoResult<()>;
    fn list_risks(&self) -> RepoResult<Vec<Risk>>;

    /// Inserts a category; returns `false` when it already existed.
    fn insert_category(&self, name: &str) -> RepoResult<bool>;
    fn delete_category(&self, name: &str) -> RepoResult<()>;
    fn category_exists(&self, name: &str) -> RepoResult<bool>;
    fn list_categories(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed risk matrix repository.
pub struct SqliteRiskStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRiskStore<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RiskStore for SqliteRiskStore<'_> {
    fn insert_risk(&self, risk: &Risk) -> RepoResult<()> {
        if risk_exists(self.conn, &risk.id)? {
            return Err(RepoError::Duplicate(risk.id.clone()));
        }

        self.conn.execute(
            "INSERT INTO risks (
                id,
                title,
                ranking_tier,
                description,
                impact,
                category,
                position
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                (SELECT COALESCE(MAX(position), 0) + 1 FROM risks)
            );",
            params![
                risk.id,
                risk.title,
                risk.ranking_tier.map(RankingTier::as_str),
                risk.description,
                risk.impact,
                risk.category,
            ],
        )?;
        Ok(())
    }

    fn upsert_note_fields(&self, risk: &Risk) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO risks (
                id,
                title,
                ranking_tier,
                description,
                impact,
                position
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                (SELECT COALESCE(MAX(position), 0) + 1 FROM risks)
            )
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                ranking_tier = excluded.ranking_tier,
                description = excluded.description,
                impact = excluded.impact,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                risk.id,
                risk.title,
                risk.ranking_tier.map(RankingTier::as_str),
                risk.description,
                risk.impact,
            ],
        )?;
        Ok(())
    }

    fn update_risk(&self, risk: &Risk) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE risks
             SET
                title = ?2,
                ranking_tier = ?3,
                description = ?4,
                impact = ?5,
                category = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                risk.id,
                risk.title,
                risk.ranking_tier.map(RankingTier::as_str),
                risk.description,
                risk.impact,
                risk.category,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(risk.id.clone()));
        }
        Ok(())
    }

    fn get_risk(&self, id: &str) -> RepoResult<Option<Risk>> {
        let row = self
            .conn
            .query_row(
                &format!("{RISK_SELECT_SQL} WHERE id = ?1;"),
                [id],
                read_risk_row,
            )
            .optional()?;
        row.map(finish_risk_row).transpose()
    }

    fn delete_risk(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM risks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_risks(&self) -> RepoResult<Vec<Risk>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RISK_SELECT_SQL} ORDER BY position ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut risks = Vec::new();
        while let Some(row) = rows.next()? {
            risks.push(finish_risk_row(read_risk_row(row)?)?);
        }
        Ok(risks)
    }

    fn insert_category(&self, name: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO risk_categories (name) VALUES (?1);",
            [name],
        )?;
        Ok(changed == 1)
    }

    fn delete_category(&self, name: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM risk_categories WHERE name = ?1;", [name])?;
        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }
        Ok(())
    }

    fn category_exists(&self, name: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM risk_categories WHERE name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM risk_categories ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(row.get("name")?);
        }
        Ok(categories)
    }
}

struct RawRiskRow {
    risk: Risk,
    ranking_tier: Option<String>,
}

fn read_risk_row(row: &Row<'_>) -> rusqlite::Result<RawRiskRow> {
    Ok(RawRiskRow {
        risk: Risk {
            id: row.get("id")?,
            title: row.get("title")?,
            ranking_tier: None,
            description: row.get("description")?,
            impact: row.get("impact")?,
            category: row.get("category")?,
        },
        ranking_tier: row.get("ranking_tier")?,
    })
}

fn finish_risk_row(raw: RawRiskRow) -> RepoResult<Risk> {
    let mut risk = raw.risk;
    risk.ranking_tier = match raw.ranking_tier {
        Some(value) => Some(value.parse::<RankingTier>().map_err(|_| {
            RepoError::InvalidData(format!("invalid ranking tier `{value}` in risks.ranking_tier"))
        })?),
        None => None,
    };
    Ok(risk)
}

fn risk_exists(conn: &Connection, id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM risks WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
