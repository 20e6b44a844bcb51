//! Parsers for human-authored note text.
//!
//! # Responsibility
//! - Turn note-graph notes into validated domain records.
//! - Fail fast with typed errors at the parse boundary.

pub mod note_parser;
