//! Use-case services over the local store and the note graph.
//!
//! # Responsibility
//! - Reconcile records across both stores (`dual_store`).
//! - Drive event ingestion and document classification on top of it.

pub mod classification_service;
pub mod dual_store;
pub mod ingest_service;
