//! Risk note text convention.
//!
//! A risk note looks like:
//!
//! ```text
//! title: "<Title> - <Tier>"
//! body:  "<description>\n<impact>\n#risk"
//! ```
//!
//! # Invariants
//! - Title segment 0 is the risk title, segment 1 the tier (may be blank).
//! - Body line 0 is the description, line 1 the impact; later lines are ignored.
//! - `parse_note(format_note(r)) == r` for every risk `format_note` accepts.

use crate::model::note::{Note, RISK_TAG};
use crate::model::risk::{RankingTier, Risk};
use crate::model::RecordId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Separator between title and tier in a risk note title.
pub const TITLE_SEPARATOR: &str = " - ";

/// Reason a note could not be read as a risk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    MissingTitleSeparator,
    MissingBodyLines { found: usize },
    UnknownTier(String),
    EmptyTitle,
    PaddedTitle,
    SeparatorInTitle,
    LineBreakInField(&'static str),
}

impl Display for MalformedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitleSeparator => {
                write!(f, "title has no `{}` separator", TITLE_SEPARATOR.trim())
            }
            Self::MissingBodyLines { found } => {
                write!(f, "body needs description and impact lines, found {found}")
            }
            Self::UnknownTier(value) => write!(f, "unknown ranking tier `{value}`"),
            Self::EmptyTitle => write!(f, "title is empty"),
            Self::PaddedTitle => write!(f, "title has leading or trailing whitespace"),
            Self::SeparatorInTitle => write!(f, "title must not contain `{TITLE_SEPARATOR}`"),
            Self::LineBreakInField(field) => write!(f, "field `{field}` must be a single line"),
        }
    }
}

/// Note text does not follow the risk note convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedNoteError {
    pub note_id: RecordId,
    pub reason: MalformedReason,
}

impl MalformedNoteError {
    fn new(note_id: &str, reason: MalformedReason) -> Self {
        Self {
            note_id: note_id.to_string(),
            reason,
        }
    }
}

impl Display for MalformedNoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed risk note `{}`: {}", self.note_id, self.reason)
    }
}

impl Error for MalformedNoteError {}

/// Parses one risk note into a `Risk`.
///
/// # Errors
/// - `MissingTitleSeparator` when the title has no `" - "`.
/// - `MissingBodyLines` when the body has fewer than two lines.
/// - `UnknownTier` when the tier segment is not `low|medium|high`.
pub fn parse_note(note: &Note) -> Result<Risk, MalformedNoteError> {
    let mut segments = note.title.split(TITLE_SEPARATOR);
    let title = segments.next().unwrap_or_default();
    let tier_text = segments
        .next()
        .ok_or_else(|| MalformedNoteError::new(&note.id, MalformedReason::MissingTitleSeparator))?;

    let title = title.trim();
    if title.is_empty() {
        return Err(MalformedNoteError::new(&note.id, MalformedReason::EmptyTitle));
    }

    let ranking_tier = if tier_text.trim().is_empty() {
        None
    } else {
        Some(tier_text.parse::<RankingTier>().map_err(|err| {
            MalformedNoteError::new(&note.id, MalformedReason::UnknownTier(err.0))
        })?)
    };

    let lines: Vec<&str> = note
        .body
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if lines.len() < 2 {
        return Err(MalformedNoteError::new(
            &note.id,
            MalformedReason::MissingBodyLines { found: lines.len() },
        ));
    }

    Ok(Risk {
        id: note.id.clone(),
        title: title.to_string(),
        ranking_tier,
        description: lines[0].to_string(),
        impact: lines[1].to_string(),
        category: None,
    })
}

/// Formats a risk title in the `"<Title> - <Tier>"` convention.
///
/// A missing tier leaves the segment blank so the separator survives.
pub fn format_title(title: &str, tier: Option<RankingTier>) -> String {
    match tier {
        Some(tier) => format!("{title}{TITLE_SEPARATOR}{tier}"),
        None => format!("{title}{TITLE_SEPARATOR}"),
    }
}

/// Formats a risk back into note text, tagged with `#risk`.
///
/// # Errors
/// Rejects risks whose text could not be parsed back unchanged: empty titles,
/// titles containing the separator and multi-line description or impact.
pub fn format_note(risk: &Risk) -> Result<Note, MalformedNoteError> {
    validate_note_fields(risk)?;
    Ok(Note {
        id: risk.id.clone(),
        title: format_title(&risk.title, risk.ranking_tier),
        body: format!("{}\n{}\n{RISK_TAG}", risk.description, risk.impact),
    })
}

/// Checks that a risk's note-mirrored fields survive a format/parse cycle.
pub fn validate_note_fields(risk: &Risk) -> Result<(), MalformedNoteError> {
    if risk.title.trim().is_empty() {
        return Err(MalformedNoteError::new(&risk.id, MalformedReason::EmptyTitle));
    }
    if risk.title.trim() != risk.title {
        return Err(MalformedNoteError::new(&risk.id, MalformedReason::PaddedTitle));
    }
    if risk.title.contains(TITLE_SEPARATOR) {
        return Err(MalformedNoteError::new(
            &risk.id,
            MalformedReason::SeparatorInTitle,
        ));
    }
    for (field, value) in [("description", &risk.description), ("impact", &risk.impact)] {
        if value.contains(['\n', '\r']) {
            return Err(MalformedNoteError::new(
                &risk.id,
                MalformedReason::LineBreakInField(field),
            ));
        }
    }
    Ok(())
}
