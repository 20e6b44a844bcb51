//! Document domain model and classification lifecycle.
//!
//! # Invariants
//! - Classification moves `None -> Predicted -> Corrected`.
//! - A classified document never returns to `None`.
//! - A `Corrected` label is only replaced by another correction.

use super::RecordId;
use serde::{Deserialize, Serialize};

/// Category label assigned to a document.
pub type Label = String;

/// Classification state of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum Classification {
    /// Label produced by the classifier.
    Predicted(Label),
    /// Label supplied by the user.
    Corrected(Label),
}

impl Classification {
    pub fn label(&self) -> &str {
        match self {
            Self::Predicted(label) | Self::Corrected(label) => label,
        }
    }

    pub fn is_corrected(&self) -> bool {
        matches!(self, Self::Corrected(_))
    }

    /// Stable state string stored in SQLite.
    pub fn state_str(&self) -> &'static str {
        match self {
            Self::Predicted(_) => "predicted",
            Self::Corrected(_) => "corrected",
        }
    }
}

/// Tracked document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    pub content: String,
    pub classification: Option<Classification>,
}

impl Document {
    pub fn new(id: impl Into<RecordId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            classification: None,
        }
    }

    /// Records a classifier prediction unless the user already corrected it.
    ///
    /// Returns `true` when the stored classification changed.
    pub fn apply_prediction(&mut self, label: Label) -> bool {
        match &self.classification {
            Some(Classification::Corrected(_)) => false,
            Some(Classification::Predicted(current)) if *current == label => false,
            _ => {
                self.classification = Some(Classification::Predicted(label));
                true
            }
        }
    }

    /// Records a user correction, overwriting any earlier label.
    pub fn apply_correction(&mut self, label: Label) {
        self.classification = Some(Classification::Corrected(label));
    }

    pub fn label(&self) -> Option<&str> {
        self.classification.as_ref().map(Classification::label)
    }
}

/// Input for explicit document addition. `id: None` asks the repository to assign one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    pub id: Option<RecordId>,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::{Classification, Document};

    #[test]
    fn prediction_does_not_override_correction() {
        let mut doc = Document::new("d1", "quarterly budget");
        assert!(doc.apply_prediction("finance".to_string()));
        doc.apply_correction("planning".to_string());
        assert!(!doc.apply_prediction("finance".to_string()));
        assert_eq!(
            doc.classification,
            Some(Classification::Corrected("planning".to_string()))
        );
    }

    #[test]
    fn correction_is_allowed_without_prior_prediction() {
        let mut doc = Document::new("d2", "lease contract");
        doc.apply_correction("legal".to_string());
        assert_eq!(doc.label(), Some("legal"));
    }
}
