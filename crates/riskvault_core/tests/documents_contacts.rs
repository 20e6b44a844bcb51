mod common;

use common::{repo_over, ScriptedGraph};
use riskvault_core::{
    Classification, Contact, ContactPatch, DocumentPatch, GraphError, NewDocument, RetryPolicy,
    StoreError,
};
use std::collections::BTreeMap;

#[test]
fn add_document_writes_local_then_graph() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());

    let document = repo
        .add_document(NewDocument {
            id: Some("doc-1".to_string()),
            content: "Invoice 42\nline items".to_string(),
        })
        .unwrap();

    assert_eq!(document.classification, None);
    assert_eq!(repo.get_document("doc-1").unwrap(), Some(document));
    let note = graph.inner.note("doc-1").unwrap();
    assert_eq!(note.title, "Invoice 42");
    assert_eq!(note.body, "Invoice 42\nline items");
}

#[test]
fn duplicate_document_id_is_rejected() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    let new_document = NewDocument {
        id: Some("doc-1".to_string()),
        content: "first".to_string(),
    };
    repo.add_document(new_document.clone()).unwrap();

    let err = repo.add_document(new_document).unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(ref id) if id == "doc-1"));
    assert_eq!(graph.calls_for("create_note", "doc-1"), 1);
}

#[test]
fn classification_change_is_mirrored_to_graph() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    repo.add_document(NewDocument {
        id: Some("doc-1".to_string()),
        content: "budget".to_string(),
    })
    .unwrap();

    let patch = DocumentPatch {
        classification: Some(Classification::Corrected("finance".to_string())),
        ..DocumentPatch::default()
    };
    let updated = repo.update_document("doc-1", &patch).unwrap();
    assert_eq!(updated.label(), Some("finance"));
    assert_eq!(
        graph.inner.stored("doc-1").unwrap().classification.as_deref(),
        Some("finance")
    );

    // Same label again: no further write-through.
    repo.update_document("doc-1", &patch).unwrap();
    assert_eq!(graph.calls_for("update_note", "doc-1"), 1);

    let corrected = repo.list_corrected_documents().unwrap();
    assert_eq!(corrected.len(), 1);
}

#[test]
fn content_only_update_stays_local() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    repo.add_document(NewDocument {
        id: Some("doc-1".to_string()),
        content: "draft".to_string(),
    })
    .unwrap();

    let patch = DocumentPatch {
        content: Some("final".to_string()),
        ..DocumentPatch::default()
    };
    repo.update_document("doc-1", &patch).unwrap();

    assert_eq!(repo.get_document("doc-1").unwrap().unwrap().content, "final");
    assert_eq!(graph.calls_for("update_note", "doc-1"), 0);
}

#[test]
fn unknown_document_update_and_delete_fail() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());

    assert!(matches!(
        repo.update_document("ghost", &DocumentPatch::default()),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        repo.delete_document("ghost"),
        Err(StoreError::NotFound(_))
    ));
    assert!(graph.calls().is_empty());
}

#[test]
fn delete_document_removes_both_sides() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    repo.add_document(NewDocument {
        id: Some("doc-1".to_string()),
        content: "x".to_string(),
    })
    .unwrap();

    repo.delete_document("doc-1").unwrap();

    assert!(repo.list_documents().unwrap().is_empty());
    assert!(graph.inner.note("doc-1").is_none());
}

#[test]
fn contact_lifecycle_mirrors_display_name() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());

    let contact = repo
        .add_contact(
            Contact::new("c1")
                .with_field("name", "Ada Lovelace")
                .with_field("email", "ada@example.org"),
        )
        .unwrap();
    assert_eq!(graph.inner.note("c1").unwrap().title, "Ada Lovelace");

    let mut set = BTreeMap::new();
    set.insert("name".to_string(), "Countess Ada".to_string());
    let patch = ContactPatch {
        set,
        unset: vec!["email".to_string()],
    };
    let updated = repo.update_contact(&contact.id, &patch).unwrap();

    assert_eq!(updated.display_name(), "Countess Ada");
    assert!(!updated.fields.contains_key("email"));
    assert_eq!(repo.get_contact("c1").unwrap(), Some(updated));
    assert_eq!(graph.inner.note("c1").unwrap().title, "Countess Ada");

    repo.delete_contact("c1").unwrap();
    assert!(repo.list_contacts().unwrap().is_empty());
    assert!(graph.inner.note("c1").is_none());
}

#[test]
fn contact_write_through_failure_keeps_local_record() {
    let graph = ScriptedGraph::new();
    graph.reject_creates_for("c1");
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());

    let err = repo
        .add_contact(Contact::new("c1").with_field("name", "Grace"))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::WriteThrough {
            error: GraphError::Rejected(_),
            ..
        }
    ));
    assert_eq!(repo.list_contacts().unwrap().len(), 1);
}

#[test]
fn blank_contact_id_gets_generated() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());

    let contact = repo.add_contact(Contact::new("  ")).unwrap();

    assert!(uuid::Uuid::parse_str(&contact.id).is_ok());
    assert_eq!(graph.inner.note(&contact.id).unwrap().title, contact.id);
}

#[test]
fn prediction_never_replaces_a_stored_correction() {
    let graph = ScriptedGraph::new();
    let mut repo = repo_over(&graph, RetryPolicy::no_retry());
    repo.add_document(NewDocument {
        id: Some("d1".to_string()),
        content: "lease agreement".to_string(),
    })
    .unwrap();

    let corrected = DocumentPatch {
        classification: Some(Classification::Corrected("legal".to_string())),
        ..DocumentPatch::default()
    };
    repo.update_document("d1", &corrected).unwrap();

    let predicted = DocumentPatch {
        classification: Some(Classification::Predicted("finance".to_string())),
        ..DocumentPatch::default()
    };
    let updated = repo.update_document("d1", &predicted).unwrap();

    let legal = Some(Classification::Corrected("legal".to_string()));
    assert_eq!(updated.classification, legal);
    assert_eq!(repo.get_document("d1").unwrap().unwrap().classification, legal);
    assert_eq!(graph.calls_for("update_note", "d1"), 1);

    let recorrected = DocumentPatch {
        classification: Some(Classification::Corrected("finance".to_string())),
        ..DocumentPatch::default()
    };
    assert_eq!(
        repo.update_document("d1", &recorrected).unwrap().label(),
        Some("finance")
    );
}
