//! Note-graph wire records.
//!
//! # Responsibility
//! - Model notes exactly as the note-graph store exposes them.
//! - Model the partial field update sent back on write-through.

use super::risk::RankingTier;
use super::RecordId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[\p{L}\p{N}_-]+").expect("valid tag regex"));

/// Tag marking notes that describe a risk.
pub const RISK_TAG: &str = "#risk";

/// A raw note as stored in the note graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: RecordId,
    pub title: String,
    pub body: String,
}

impl Note {
    pub fn new(id: impl Into<RecordId>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }

    /// Whether the note carries `tag` as a whole tag in its title or body.
    ///
    /// Matching ignores case and the leading `#`; `#risky` is not `#risk`.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().trim_start_matches('#').to_lowercase();
        if wanted.is_empty() {
            return false;
        }
        [self.title.as_str(), self.body.as_str()]
            .into_iter()
            .flat_map(|text| TAG_RE.find_iter(text))
            .any(|found| found.as_str()[1..].to_lowercase() == wanted)
    }
}

/// Field update sent to the note graph. `None` leaves the field untouched.
///
/// `description` and `impact` replace body lines 0 and 1 only, so links and
/// tags further down the body survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub ranking_tier: Option<RankingTier>,
    pub classification: Option<String>,
    pub description: Option<String>,
    pub impact: Option<String>,
}
