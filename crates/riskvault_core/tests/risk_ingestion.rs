mod common;

use common::{repo_over, risk_body, ScriptedGraph};
use riskvault_core::{
    IngestError, IngestOutcome, IngestStage, NoteGraphStore, RankingTier, RetryPolicy,
    RiskIngestor, RiskObserved, StoreError,
};
use std::sync::Arc;

fn ingestor_over(graph: &Arc<ScriptedGraph>) -> RiskIngestor {
    let handle: Arc<dyn NoteGraphStore> = graph.clone();
    RiskIngestor::with_parts(handle, RetryPolicy::no_retry())
}

fn observed(graph: &ScriptedGraph, id: &str, title: &str) -> RiskObserved {
    let note = riskvault_core::Note::new(id, title, risk_body("desc", "impact"));
    graph.inner.insert_note(note.clone()).unwrap();
    RiskObserved::new(note)
}

#[test]
fn events_are_ranked_and_persisted_in_arrival_order() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let mut ingestor = ingestor_over(&graph);
    graph.set_connections("busy", 12);
    graph.set_connections("quiet", 3);

    ingestor.submit(observed(&graph, "busy", "Busy hub - "));
    ingestor.submit(observed(&graph, "quiet", "Quiet leaf - "));
    assert_eq!(ingestor.pending(), 2);

    let outcomes = ingestor.drain(&mut repo);

    let tiers: Vec<_> = outcomes
        .iter()
        .map(|outcome| outcome.risk().and_then(|risk| risk.ranking_tier))
        .collect();
    assert_eq!(tiers, vec![Some(RankingTier::High), Some(RankingTier::Low)]);

    let ids: Vec<_> = repo
        .in_memory_risks()
        .iter()
        .map(|risk| risk.id.as_str())
        .collect();
    assert_eq!(ids, vec!["busy", "quiet"]);

    let local: Vec<_> = repo.list_risks().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(local, vec!["busy".to_string(), "quiet".to_string()]);

    assert_eq!(graph.inner.note("busy").unwrap().title, "Busy hub - high");
    assert_eq!(graph.inner.note("quiet").unwrap().title, "Quiet leaf - low");
    assert_eq!(ingestor.pending(), 0);
}

#[test]
fn ranking_uses_a_fresh_count_for_every_event() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let ingestor = ingestor_over(&graph);

    graph.set_connections("r1", 6);
    let first = ingestor.handle(observed(&graph, "r1", "Drift - "), &mut repo);
    assert_eq!(first.risk().unwrap().ranking_tier, Some(RankingTier::Medium));

    graph.set_connections("r1", 11);
    let second = ingestor.handle(observed(&graph, "r1", "Drift - medium"), &mut repo);
    assert_eq!(second.risk().unwrap().ranking_tier, Some(RankingTier::High));

    assert_eq!(graph.calls_for("count_connections", "r1"), 2);
    assert_eq!(repo.in_memory_risks().len(), 1);
    assert_eq!(
        repo.get_risk("r1").unwrap().unwrap().ranking_tier,
        Some(RankingTier::High)
    );
}

#[test]
fn failed_event_does_not_block_later_events() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let mut ingestor = ingestor_over(&graph);

    ingestor.submit(RiskObserved::new(riskvault_core::Note::new(
        "broken",
        "No separator",
        risk_body("d", "i"),
    )));
    ingestor.submit(observed(&graph, "ok", "Fine - "));

    let outcomes = ingestor.drain(&mut repo);

    assert_eq!(outcomes.len(), 2);
    match &outcomes[0] {
        IngestOutcome::Failed {
            note_id,
            stage,
            error,
        } => {
            assert_eq!(note_id, "broken");
            assert_eq!(*stage, IngestStage::Parsed);
            assert!(matches!(error, IngestError::Malformed(_)));
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
    assert!(outcomes[1].is_persisted());
    assert_eq!(repo.list_risks().unwrap().len(), 1);
}

#[test]
fn persist_failure_keeps_appended_risk() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let ingestor = ingestor_over(&graph);
    graph.reject_updates_for("r1");

    let outcome = ingestor.handle(observed(&graph, "r1", "Leak - "), &mut repo);

    match outcome {
        IngestOutcome::Failed { stage, error, .. } => {
            assert_eq!(stage, IngestStage::Persisted);
            assert!(matches!(
                error,
                IngestError::Store(StoreError::WriteThrough { .. })
            ));
        }
        other => panic!("expected persist failure, got {other:?}"),
    }
    assert_eq!(repo.in_memory_risks().len(), 1);
    assert_eq!(
        repo.get_risk("r1").unwrap().unwrap().ranking_tier,
        Some(RankingTier::Low)
    );
}

#[test]
fn rerank_all_refreshes_every_in_memory_risk() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let mut ingestor = ingestor_over(&graph);
    ingestor.submit(observed(&graph, "a", "Alpha - "));
    ingestor.submit(observed(&graph, "b", "Beta - "));
    ingestor.drain(&mut repo);

    graph.set_connections("a", 20);
    graph.set_connections("b", 7);
    graph.reject_updates_for("b");
    let report = ingestor.rerank_all(&mut repo);

    assert_eq!(report.attempted, 2);
    assert_eq!(report.persisted, vec!["a".to_string()]);
    assert_eq!(report.failure_ids(), vec!["b"]);
    let tiers: Vec<_> = repo
        .in_memory_risks()
        .iter()
        .map(|risk| risk.ranking_tier)
        .collect();
    assert_eq!(tiers, vec![Some(RankingTier::High), Some(RankingTier::Medium)]);
    assert_eq!(graph.inner.note("a").unwrap().title, "Alpha - high");
}

#[test]
fn reingested_risk_keeps_its_local_category() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let ingestor = ingestor_over(&graph);
    graph.set_connections("r1", 2);

    assert!(ingestor
        .handle(observed(&graph, "r1", "Vendor lock-in - "), &mut repo)
        .is_persisted());
    repo.add_category("Ops").unwrap();
    repo.set_risk_category("r1", Some("Ops")).unwrap();

    graph.set_connections("r1", 7);
    let outcome = ingestor.handle(observed(&graph, "r1", "Vendor lock-in - low"), &mut repo);

    assert_eq!(outcome.risk().unwrap().category.as_deref(), Some("Ops"));
    assert_eq!(repo.in_memory_risks()[0].category.as_deref(), Some("Ops"));
    assert_eq!(
        repo.get_risk("r1").unwrap().unwrap().category.as_deref(),
        Some("Ops")
    );

    let report = ingestor.rerank_all(&mut repo);
    assert!(report.is_complete());
    assert_eq!(repo.in_memory_risks()[0].category.as_deref(), Some("Ops"));
}
