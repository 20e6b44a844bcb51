//! Risk domain model.
//!
//! # Responsibility
//! - Define the risk record and its severity tier.
//! - Provide stable string forms used by note titles and SQLite columns.
//!
//! # Invariants
//! - `id` matches the note id of the risk's source note in the note graph.
//! - `category` is owned by the local store and never derived from note text.

use super::RecordId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Severity tier produced by connectivity ranking.
///
/// Ordering follows severity: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingTier {
    Low,
    Medium,
    High,
}

impl RankingTier {
    /// Stable lowercase form used in note titles and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for RankingTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for tier words outside `low|medium|high`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTierError(pub String);

impl Display for UnknownTierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown ranking tier `{}`; expected low|medium|high",
            self.0
        )
    }
}

impl Error for UnknownTierError {}

impl FromStr for RankingTier {
    type Err = UnknownTierError;

    /// Parses a tier word case-insensitively, ignoring surrounding whitespace.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownTierError(value.trim().to_string())),
        }
    }
}

/// Canonical risk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub id: RecordId,
    pub title: String,
    /// `None` when the source note title carried no tier yet.
    pub ranking_tier: Option<RankingTier>,
    /// First body line of the source note.
    pub description: String,
    /// Second body line of the source note.
    pub impact: String,
    /// Risk-matrix grouping; stored verbatim, never inferred.
    pub category: Option<String>,
}

impl Risk {
    pub fn new(
        id: impl Into<RecordId>,
        title: impl Into<String>,
        description: impl Into<String>,
        impact: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ranking_tier: None,
            description: description.into(),
            impact: impact.into(),
            category: None,
        }
    }

    /// Returns a copy with the given tier applied.
    pub fn with_tier(mut self, tier: RankingTier) -> Self {
        self.ranking_tier = Some(tier);
        self
    }

    /// Whether note-derived fields match, ignoring the local-only `category`.
    pub fn same_note_fields(&self, other: &Risk) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.ranking_tier == other.ranking_tier
            && self.description == other.description
            && self.impact == other.impact
    }
}

/// Input for explicit risk addition. `id: None` asks the repository to assign one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRisk {
    pub id: Option<RecordId>,
    pub title: String,
    pub ranking_tier: Option<RankingTier>,
    pub description: String,
    pub impact: String,
    pub category: Option<String>,
}

/// Partial update for one risk. `None` leaves the field untouched.
///
/// `category: Some(None)` clears the category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskPatch {
    pub title: Option<String>,
    pub ranking_tier: Option<RankingTier>,
    pub description: Option<String>,
    pub impact: Option<String>,
    pub category: Option<Option<String>>,
}

impl RiskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.ranking_tier.is_none()
            && self.description.is_none()
            && self.impact.is_none()
            && self.category.is_none()
    }

    /// Applies this patch to `risk` in place.
    pub fn apply_to(&self, risk: &mut Risk) {
        if let Some(title) = &self.title {
            risk.title = title.clone();
        }
        if let Some(tier) = self.ranking_tier {
            risk.ranking_tier = Some(tier);
        }
        if let Some(description) = &self.description {
            risk.description = description.clone();
        }
        if let Some(impact) = &self.impact {
            risk.impact = impact.clone();
        }
        if let Some(category) = &self.category {
            risk.category = category.clone();
        }
    }

    /// Whether this patch touches fields mirrored in the note graph.
    pub fn touches_note_fields(&self) -> bool {
        self.title.is_some()
            || self.ranking_tier.is_some()
            || self.description.is_some()
            || self.impact.is_some()
    }
}

/// Aggregate view of risks grouped by locally managed categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskMatrix {
    /// Sorted category names.
    pub categories: Vec<String>,
    /// Risks in insertion order.
    pub risks: Vec<Risk>,
}

impl RiskMatrix {
    /// Risks assigned to `category`, in matrix order.
    pub fn risks_in(&self, category: &str) -> Vec<&Risk> {
        self.risks
            .iter()
            .filter(|risk| risk.category.as_deref() == Some(category))
            .collect()
    }

    /// Risks with no category assigned.
    pub fn uncategorized(&self) -> Vec<&Risk> {
        self.risks
            .iter()
            .filter(|risk| risk.category.is_none())
            .collect()
    }
}
