//! Contact record. Plain data with no derived state.

use super::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field that names a contact; mirrored as the note title in the note graph.
pub const CONTACT_NAME_FIELD: &str = "name";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: RecordId,
    pub fields: BTreeMap<String, String>,
}

impl Contact {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Display name, falling back to the id when no `name` field exists.
    pub fn display_name(&self) -> &str {
        self.fields
            .get(CONTACT_NAME_FIELD)
            .map(String::as_str)
            .unwrap_or(self.id.as_str())
    }
}
