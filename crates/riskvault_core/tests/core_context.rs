use riskvault_core::{
    ConfigError, CoreConfig, CoreContext, GraphError, GraphResult, InMemoryNoteGraph, NewDocument,
    Note, NoteGraphStore, NotePatch, RiskIngestor, RiskObserved,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct StalledGraph;

impl NoteGraphStore for StalledGraph {
    fn search(&self, _query: &str) -> GraphResult<Vec<Note>> {
        thread::sleep(Duration::from_millis(300));
        Ok(Vec::new())
    }

    fn create_note(&self, _note: &Note) -> GraphResult<()> {
        Ok(())
    }

    fn update_note(&self, _note_id: &str, _patch: &NotePatch) -> GraphResult<()> {
        Ok(())
    }

    fn delete_note(&self, _note_id: &str) -> GraphResult<()> {
        Ok(())
    }

    fn count_connections(&self, _note_id: &str) -> GraphResult<u32> {
        thread::sleep(Duration::from_millis(300));
        Ok(0)
    }
}

#[test]
fn config_file_drives_the_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("vault.db");
    let config_path = dir.path().join("riskvault.json");
    std::fs::write(
        &config_path,
        format!(r#"{{"db_path": {:?}, "retry_max_attempts": 1}}"#, db_path.to_str().unwrap()),
    )
    .unwrap();

    let config = CoreConfig::load(&config_path).unwrap();
    let context = CoreContext::new(config, Arc::new(InMemoryNoteGraph::new())).unwrap();
    {
        let repo = context.open_repository().unwrap();
        repo.add_category("Ops").unwrap();
    }

    let repo = context.open_repository().unwrap();
    assert_eq!(repo.risk_matrix().unwrap().categories, vec!["Ops".to_string()]);
    assert!(db_path.exists());
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CoreConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn invalid_config_is_rejected_by_context() {
    let config = CoreConfig {
        retry_max_attempts: 0,
        ..CoreConfig::default()
    };
    assert!(CoreContext::new(config, Arc::new(InMemoryNoteGraph::new())).is_err());
}

#[test]
fn context_bounds_stalled_graph_calls() {
    let config = CoreConfig {
        graph_timeout_ms: 30,
        retry_max_attempts: 2,
        retry_initial_backoff_ms: 1,
        retry_max_backoff_ms: 1,
        ..CoreConfig::default()
    };
    let context = CoreContext::new(config, Arc::new(StalledGraph)).unwrap();
    let mut repo = context.open_repository().unwrap();

    assert!(matches!(
        repo.load_risks(),
        Err(riskvault_core::StoreError::Graph(GraphError::Timeout { .. }))
    ));

    let ingestor = RiskIngestor::new(&context);
    let outcome = ingestor.handle(
        RiskObserved::new(Note::new("r1", "Slow - ", "d\ni\n#risk")),
        &mut repo,
    );
    assert!(!outcome.is_persisted());
}

/// Graph whose `create_note` lands only after the guard gave up on it.
#[derive(Default)]
struct LateCreateGraph {
    inner: InMemoryNoteGraph,
    creates: AtomicUsize,
}

impl NoteGraphStore for LateCreateGraph {
    fn search(&self, query: &str) -> GraphResult<Vec<Note>> {
        self.inner.search(query)
    }

    fn create_note(&self, note: &Note) -> GraphResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(150));
        self.inner.create_note(note)
    }

    fn update_note(&self, note_id: &str, patch: &NotePatch) -> GraphResult<()> {
        self.inner.update_note(note_id, patch)
    }

    fn delete_note(&self, note_id: &str) -> GraphResult<()> {
        self.inner.delete_note(note_id)
    }

    fn count_connections(&self, note_id: &str) -> GraphResult<u32> {
        self.inner.count_connections(note_id)
    }
}

#[test]
fn retried_create_after_timeout_lands_once() {
    let graph = Arc::new(LateCreateGraph::default());
    let config = CoreConfig {
        graph_timeout_ms: 100,
        retry_max_attempts: 2,
        retry_initial_backoff_ms: 1,
        retry_max_backoff_ms: 1,
        ..CoreConfig::default()
    };
    let context = CoreContext::new(config, graph.clone()).unwrap();
    let mut repo = context.open_repository().unwrap();

    let document = repo
        .add_document(NewDocument {
            id: Some("d1".to_string()),
            content: "Audit plan".to_string(),
        })
        .unwrap();

    assert_eq!(document.id, "d1");
    assert_eq!(graph.creates.load(Ordering::SeqCst), 1);
    assert_eq!(graph.inner.note("d1").unwrap().title, "Audit plan");
}
