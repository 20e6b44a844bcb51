//! Document classification use-cases.
//!
//! # Responsibility
//! - Predict labels for stored documents and record user corrections.
//! - Rebuild the in-process model from persisted corrections at startup.
//!
//! # Invariants
//! - A corrected document is never re-predicted; `classify` returns it as is.
//! - `correct` trains the model before the label is written durably, so a
//!   store failure leaves the model ahead of the store, never behind it.

use crate::classifier::{ClassifierError, SharedClassifier};
use crate::context::CoreContext;
use crate::model::document::{Classification, Document};
use crate::service::dual_store::{DocumentPatch, DualStoreRepository, StoreError};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum ClassificationError {
    Classifier(ClassifierError),
    Store(StoreError),
}

impl Display for ClassificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classifier(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ClassificationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Classifier(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ClassifierError> for ClassificationError {
    fn from(value: ClassifierError) -> Self {
        Self::Classifier(value)
    }
}

impl From<StoreError> for ClassificationError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type ClassificationResult<T> = Result<T, ClassificationError>;

/// Use-case service over the shared classifier and the repository.
pub struct ClassificationService {
    classifier: Arc<SharedClassifier>,
}

impl ClassificationService {
    pub fn new(context: &CoreContext) -> Self {
        Self::with_classifier(context.classifier())
    }

    pub fn with_classifier(classifier: Arc<SharedClassifier>) -> Self {
        Self { classifier }
    }

    /// Predicts and stores a label for one document.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when `document_id` is unknown.
    /// - `ClassifierError::NotInitialized` / `NoTrainingData` from the model.
    pub fn classify(
        &self,
        repo: &mut DualStoreRepository,
        document_id: &str,
    ) -> ClassificationResult<Document> {
        let mut document = load_document(repo, document_id)?;
        if document
            .classification
            .as_ref()
            .is_some_and(Classification::is_corrected)
        {
            debug!("event=document_classify module=classification status=skipped doc_id={document_id} reason=corrected");
            return Ok(document);
        }

        let label = self.classifier.predict(&document)?;
        if document.apply_prediction(label) {
            let patch = DocumentPatch {
                classification: document.classification.clone(),
                ..DocumentPatch::default()
            };
            document = repo.update_document(document_id, &patch)?;
        }
        info!(
            "event=document_classify module=classification status=ok doc_id={} label={}",
            document_id,
            document.label().unwrap_or_default()
        );
        Ok(document)
    }

    /// Records a user correction: trains the model, then stores the label.
    ///
    /// Repeating the same correction leaves the model unchanged.
    pub fn correct(
        &self,
        repo: &mut DualStoreRepository,
        document_id: &str,
        label: &str,
    ) -> ClassificationResult<Document> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ClassifierError::EmptyLabel.into());
        }
        let mut document = load_document(repo, document_id)?;

        self.classifier.update(&document, label)?;
        document.apply_correction(label.to_string());
        let patch = DocumentPatch {
            classification: document.classification.clone(),
            ..DocumentPatch::default()
        };
        let document = repo.update_document(document_id, &patch)?;

        info!(
            "event=document_correct module=classification status=ok doc_id={document_id} label={label}"
        );
        Ok(document)
    }

    /// Retrains the model from every corrected document in the local store.
    ///
    /// Returns the number of corrections replayed.
    pub fn replay_corrections(&self, repo: &DualStoreRepository) -> ClassificationResult<usize> {
        let corrected = repo.list_corrected_documents()?;
        let mut replayed = 0;
        for document in &corrected {
            if let Some(label) = document.label() {
                self.classifier.update(document, label)?;
                replayed += 1;
            }
        }
        info!(
            "event=classifier_replay module=classification status=ok replayed={replayed}"
        );
        Ok(replayed)
    }
}

fn load_document(repo: &DualStoreRepository, document_id: &str) -> ClassificationResult<Document> {
    repo.get_document(document_id)?
        .ok_or_else(|| StoreError::NotFound(document_id.to_string()).into())
}
