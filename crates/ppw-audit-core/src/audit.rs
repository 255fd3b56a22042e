//! Audit row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of write an audit row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Entity created.
    #[serde(rename = "I")]
    Insert,
    /// Entity modified.
    #[serde(rename = "U")]
    Update,
    /// Entity removed.
    #[serde(rename = "D")]
    Delete,
}

impl EntryType {
    /// One-letter code stored in the audit table.
    pub fn code(&self) -> &'static str {
        match self {
            EntryType::Insert => "I",
            EntryType::Update => "U",
            EntryType::Delete => "D",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Content of one audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Kind of write.
    pub entry_type: EntryType,
    /// Entity type name.
    pub entity_name: String,
    /// Identity of the changed entity, serialized.
    pub entity_id: String,
    /// Changed property. Absent on delete rows.
    pub property_name: Option<String>,
    /// Serialized value before the write.
    pub old_value: Option<String>,
    /// Serialized value after the write.
    pub new_value: Option<String>,
    /// Who performed the write.
    pub created_by: String,
    /// When the write was audited.
    pub created_at: DateTime<Utc>,
    /// Shared marker for rows that belong to one logical operation.
    pub correlation_id: Option<String>,
}

/// A persistable audit row.
///
/// Implemented by the host's audit table type; the engine only builds rows
/// through [`from_entry`](AuditEntity::from_entry).
pub trait AuditEntity: Send + Sync + Sized + 'static {
    /// Identity type of the audit table.
    type Id: Clone + Send + Sync;

    /// Build a new, unsaved row.
    fn from_entry(entry: AuditEntry) -> Self;

    /// Row content.
    fn entry(&self) -> &AuditEntry;

    /// Mutable row content, for hooks that stamp cross-cutting state.
    fn entry_mut(&mut self) -> &mut AuditEntry;

    /// Identity, once assigned by the store.
    fn id(&self) -> Option<&Self::Id>;

    /// Assign the identity generated by the store.
    fn assign_id(&mut self, id: Self::Id);
}

/// Default audit row, generic over its identity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntity<Id> {
    /// Identity assigned on save.
    pub id: Option<Id>,
    /// Row content.
    #[serde(flatten)]
    pub entry: AuditEntry,
}

impl<Id: Clone + Send + Sync + 'static> AuditEntity for AuditLogEntity<Id> {
    type Id = Id;

    fn from_entry(entry: AuditEntry) -> Self {
        Self { id: None, entry }
    }

    fn entry(&self) -> &AuditEntry {
        &self.entry
    }

    fn entry_mut(&mut self) -> &mut AuditEntry {
        &mut self.entry
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    fn assign_id(&mut self, id: Id) {
        self.id = Some(id);
    }
}
