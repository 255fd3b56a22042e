//! Property definitions for entities.

use super::action::AuditLogAction;
use super::types::FieldType;

/// A mapped property of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Property name.
    pub name: String,
    /// Mapped type.
    pub field_type: FieldType,
    /// Whether the property has a public setter. Read-only properties are
    /// never audit-tracked.
    pub writable: bool,
    /// Operations for which this property is left out of the audit log.
    pub audit_exclude: AuditLogAction,
}

impl FieldDef {
    /// Create a new writable property.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            writable: true,
            audit_exclude: AuditLogAction::NONE,
        }
    }

    /// Create a read-only property.
    pub fn read_only(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            writable: false,
            ..Self::new(name, field_type)
        }
    }

    /// Exclude the property from the audit log for the given operations.
    pub fn exclude_from_audit(mut self, actions: AuditLogAction) -> Self {
        self.audit_exclude |= actions;
        self
    }
}
