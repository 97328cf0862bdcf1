//! Record types for entity data.

use crate::{Fields, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the authoritative copy of a record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Only in local fallback storage; created while the server was unreachable.
    /// Records read back from local storage start out local.
    #[default]
    Local,
    /// Last observed from the server
    Remote,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

/// A record of any entity type.
///
/// Serializes as one flat object, `{"id": 2, "name": "Annex", ...}`, which
/// is the shape kept in local storage. The origin is derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique across remote and local records of one entity type
    pub id: RecordId,
    #[serde(skip)]
    pub origin: Origin,
    /// Field values keyed by form field name
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Create a record that exists only locally.
    pub fn new_local(id: RecordId, fields: Fields) -> Self {
        Self {
            id,
            origin: Origin::Local,
            fields,
        }
    }

    /// Create a record received from the server.
    pub fn new_remote(id: RecordId, fields: Fields) -> Self {
        Self {
            id,
            origin: Origin::Remote,
            fields,
        }
    }

    /// Check if the record exists only in local storage.
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Display text for a field; empty when absent.
    pub fn display(&self, field: &str) -> String {
        match self.fields.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Overlay edited fields onto this record's fields.
    pub fn merged_fields(&self, edits: &Fields) -> Fields {
        let mut fields = self.fields.clone();
        for (name, value) in edits {
            fields.insert(name.clone(), value.clone());
        }
        fields
    }

    /// Re-tag the record.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}
