//! Multinomial naive Bayes over document term counts.
//!
//! # Invariants
//! - At most one labeled example is kept per document id; a new correction
//!   replaces the previous one.
//! - All learned statistics are integer counts, so replaying an identical
//!   correction restores bit-identical state.
//! - Ties in posterior score resolve to the lexicographically smallest label.

use super::features::{term_counts, TermCounts};
use super::{ClassifierError, ClassifierResult, IncrementalClassifier};
use crate::model::document::{Document, Label};
use crate::model::RecordId;
use std::collections::{BTreeMap, HashMap};

/// Laplace smoothing constant.
const SMOOTHING: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Example {
    label: Label,
    counts: TermCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LabelStats {
    documents: u64,
    term_counts: TermCounts,
    total_terms: u64,
}

/// Online text classifier keyed by document identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermFrequencyClassifier {
    examples: HashMap<RecordId, Example>,
    labels: BTreeMap<Label, LabelStats>,
    vocabulary: TermCounts,
}

impl TermFrequencyClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known labels in sorted order.
    pub fn labels(&self) -> Vec<&str> {
        self.labels.keys().map(String::as_str).collect()
    }

    fn add_example(&mut self, example: &Example) {
        let stats = self.labels.entry(example.label.clone()).or_default();
        stats.documents += 1;
        for (term, count) in &example.counts {
            *stats.term_counts.entry(term.clone()).or_insert(0) += count;
            stats.total_terms += count;
            *self.vocabulary.entry(term.clone()).or_insert(0) += count;
        }
    }

    fn remove_example(&mut self, example: &Example) {
        if let Some(stats) = self.labels.get_mut(&example.label) {
            stats.documents = stats.documents.saturating_sub(1);
            for (term, count) in &example.counts {
                decrement(&mut stats.term_counts, term, *count);
                stats.total_terms = stats.total_terms.saturating_sub(*count);
            }
            if stats.documents == 0 {
                self.labels.remove(&example.label);
            }
        }
        for (term, count) in &example.counts {
            decrement(&mut self.vocabulary, term, *count);
        }
    }

    fn log_score(&self, stats: &LabelStats, counts: &TermCounts, total_documents: u64) -> f64 {
        let vocabulary_size = self.vocabulary.len() as f64;
        let denominator = stats.total_terms as f64 + SMOOTHING * vocabulary_size;
        let mut score = (stats.documents as f64 / total_documents as f64).ln();
        for (term, count) in counts {
            if !self.vocabulary.contains_key(term) {
                continue;
            }
            let in_label = stats.term_counts.get(term).copied().unwrap_or(0) as f64;
            score += *count as f64 * ((in_label + SMOOTHING) / denominator).ln();
        }
        score
    }
}

impl IncrementalClassifier for TermFrequencyClassifier {
    fn predict(&self, document: &Document) -> ClassifierResult<Label> {
        let total_documents: u64 = self.labels.values().map(|stats| stats.documents).sum();
        if total_documents == 0 {
            return Err(ClassifierError::NoTrainingData);
        }

        let counts = term_counts(&document.content);
        let mut best: Option<(&Label, f64)> = None;
        for (label, stats) in &self.labels {
            let score = self.log_score(stats, &counts, total_documents);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((label, score));
            }
        }

        best.map(|(label, _)| label.clone())
            .ok_or(ClassifierError::NoTrainingData)
    }

    fn update(&mut self, document: &Document, label: &str) -> ClassifierResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ClassifierError::EmptyLabel);
        }

        let example = Example {
            label: label.to_string(),
            counts: term_counts(&document.content),
        };
        if let Some(previous) = self.examples.remove(&document.id) {
            self.remove_example(&previous);
        }
        self.add_example(&example);
        self.examples.insert(document.id.clone(), example);
        Ok(())
    }

    fn example_count(&self) -> usize {
        self.examples.len()
    }
}

fn decrement(counts: &mut TermCounts, term: &str, amount: u64) {
    if let Some(value) = counts.get_mut(term) {
        *value = value.saturating_sub(amount);
        if *value == 0 {
            counts.remove(term);
        }
    }
}
