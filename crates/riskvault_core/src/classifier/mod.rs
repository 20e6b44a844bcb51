//! Incremental document classification.
//!
//! # Responsibility
//! - Define the `IncrementalClassifier` capability (`predict` + `update`).
//! - Provide the process-wide `SharedClassifier` handle with read/write exclusion.
//!
//! # Invariants
//! - `predict` never mutates model state.
//! - `update` is fully applied before any later `predict`/`update` observes it.
//! - Using the handle before a model is installed is a startup-ordering bug
//!   reported as `ClassifierError::NotInitialized`.

pub mod features;
pub mod naive_bayes;

use crate::model::document::{Document, Label};
use log::{debug, error};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::RwLock;

pub use naive_bayes::TermFrequencyClassifier;

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Classifier capability errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    /// No model installed in the shared handle yet.
    NotInitialized,
    /// Model has not seen a single labeled example.
    NoTrainingData,
    /// Correction label is blank.
    EmptyLabel,
    /// A previous holder of the model lock panicked.
    Poisoned,
}

impl Display for ClassifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "classifier used before initialization"),
            Self::NoTrainingData => write!(f, "classifier has no labeled examples yet"),
            Self::EmptyLabel => write!(f, "classification label must not be empty"),
            Self::Poisoned => write!(f, "classifier state lock is poisoned"),
        }
    }
}

impl Error for ClassifierError {}

/// Online classifier refined one labeled example at a time.
pub trait IncrementalClassifier: Send + Sync {
    /// Predicts a label from current parameters without changing them.
    fn predict(&self, document: &Document) -> ClassifierResult<Label>;

    /// Learns from one corrected example.
    ///
    /// Re-submitting the same `(document, label)` must not change later
    /// predictions.
    fn update(&mut self, document: &Document, label: &str) -> ClassifierResult<()>;

    /// Number of labeled examples currently learned.
    fn example_count(&self) -> usize;
}

/// Process-wide classifier slot shared by services.
///
/// `predict` calls share a read lock; `update` takes the write lock, so the
/// two never interleave even when callers run on OS threads.
pub struct SharedClassifier {
    model: RwLock<Option<Box<dyn IncrementalClassifier>>>,
}

impl Default for SharedClassifier {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl SharedClassifier {
    /// Creates an empty slot; calls fail until `install` runs.
    pub fn uninitialized() -> Self {
        Self {
            model: RwLock::new(None),
        }
    }

    /// Creates a slot holding `model`.
    pub fn with_model(model: impl IncrementalClassifier + 'static) -> Self {
        Self {
            model: RwLock::new(Some(Box::new(model))),
        }
    }

    /// Installs (or replaces) the model.
    pub fn install(&self, model: Box<dyn IncrementalClassifier>) -> ClassifierResult<()> {
        let mut slot = self.model.write().map_err(|_| ClassifierError::Poisoned)?;
        *slot = Some(model);
        debug!("event=classifier_install module=classifier status=ok");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.model.read().map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn example_count(&self) -> ClassifierResult<usize> {
        let slot = self.model.read().map_err(|_| ClassifierError::Poisoned)?;
        let model = slot.as_ref().ok_or(ClassifierError::NotInitialized)?;
        Ok(model.example_count())
    }

    pub fn predict(&self, document: &Document) -> ClassifierResult<Label> {
        let slot = self.model.read().map_err(|_| ClassifierError::Poisoned)?;
        let Some(model) = slot.as_ref() else {
            error!(
                "event=classifier_predict module=classifier status=error error_code=not_initialized doc_id={}",
                document.id
            );
            return Err(ClassifierError::NotInitialized);
        };
        model.predict(document)
    }

    pub fn update(&self, document: &Document, label: &str) -> ClassifierResult<()> {
        let mut slot = self.model.write().map_err(|_| ClassifierError::Poisoned)?;
        let Some(model) = slot.as_mut() else {
            error!(
                "event=classifier_update module=classifier status=error error_code=not_initialized doc_id={}",
                document.id
            );
            return Err(ClassifierError::NotInitialized);
        };
        model.update(document, label)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassifierError, SharedClassifier, TermFrequencyClassifier};
    use crate::model::document::Document;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn calls_before_install_report_not_initialized() {
        let shared = SharedClassifier::uninitialized();
        let doc = Document::new("d1", "text");
        assert_eq!(shared.predict(&doc), Err(ClassifierError::NotInitialized));
        assert_eq!(
            shared.update(&doc, "label"),
            Err(ClassifierError::NotInitialized)
        );
        assert!(!shared.is_initialized());
    }

    #[test]
    fn install_enables_calls() {
        let shared = SharedClassifier::uninitialized();
        shared
            .install(Box::new(TermFrequencyClassifier::new()))
            .expect("install");
        let doc = Document::new("d1", "invoice payment due");
        shared.update(&doc, "finance").expect("update");
        assert_eq!(shared.predict(&doc).expect("predict"), "finance");
    }

    #[test]
    fn concurrent_predictions_and_updates_stay_consistent() {
        let shared = Arc::new(SharedClassifier::with_model(TermFrequencyClassifier::new()));
        shared
            .update(&Document::new("seed", "tax invoice receipt"), "finance")
            .expect("seed update");

        let mut handles = Vec::new();
        for worker in 0..4 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                for idx in 0..25 {
                    let doc = Document::new(format!("w{worker}-{idx}"), "tax invoice receipt");
                    if idx % 5 == 0 {
                        shared.update(&doc, "finance").expect("update");
                    } else {
                        assert_eq!(shared.predict(&doc).expect("predict"), "finance");
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker should not panic");
        }
        assert_eq!(shared.example_count().expect("count"), 1 + 4 * 5);
    }
}
